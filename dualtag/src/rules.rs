//! Rule tables and chain-rule propagation.
//!
//! A [`RuleTable`] is built once from a [`Catalog`]: one [`UnaryRule`]
//! or [`BinaryRule`] per elementary operation of the chosen namespace,
//! holding the parsed partial derivatives. At dispatch time a rule
//! evaluates its partials at the operands' primals and combines them
//! with the operands' tangents:
//!
//! - one operand: `∂f/∂x · dx` per tangent component
//!   ([`propagate_unary`]),
//! - two operands: `∂f/∂x · dx + ∂f/∂y · dy` per component
//!   ([`propagate_binary`]), the total derivative.
//!
//! When only one operand of a binary operation belongs to the
//! intercepting session, the other contributes nothing and its partial
//! is never evaluated (see [`CallShape`]).

use crate::catalog::{Catalog, CatalogEntry, BASE_NAMESPACE};
use crate::dispatch;
use crate::dual::Num;
use crate::error::CatalogError;
use crate::expr::Expr;
use crate::ops::{BinaryOp, Op, UnaryOp};
use num_traits::Float;
use std::collections::HashMap;

/// The derivative rule of a one-argument operation.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryRule {
    pub op: UnaryOp,
    /// `∂f/∂x`
    pub dfdx: Expr,
}

/// The derivative rule of a two-argument operation.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryRule {
    pub op: BinaryOp,
    /// `∂f/∂x`
    pub dfdx: Expr,
    /// `∂f/∂y`
    pub dfdy: Expr,
}

/// Which operands of a binary operation carry a tangent of the
/// intercepting session.
#[derive(Debug, Clone, Copy)]
pub enum CallShape<'a, T> {
    /// Both operands.
    Both { dx: &'a [Num<T>], dy: &'a [Num<T>] },
    /// Only the first; the second is a constant.
    Left { dx: &'a [Num<T>] },
    /// Only the second; the first is a constant.
    Right { dy: &'a [Num<T>] },
}

impl UnaryRule {
    /// Output tangent for primal `x` with tangent `dx`.
    pub fn tangent<T: Float>(&self, x: &Num<T>, dx: &[Num<T>]) -> Vec<Num<T>> {
        propagate_unary(&self.dfdx.eval(x, x), dx)
    }
}

impl BinaryRule {
    /// Output tangent for primals `x`, `y` in the given call shape.
    pub fn tangent<T: Float>(&self, shape: CallShape<'_, T>, x: &Num<T>, y: &Num<T>) -> Vec<Num<T>> {
        match shape {
            CallShape::Both { dx, dy } => {
                propagate_binary(&self.dfdx.eval(x, y), dx, &self.dfdy.eval(x, y), dy)
            }
            CallShape::Left { dx } => propagate_unary(&self.dfdx.eval(x, y), dx),
            CallShape::Right { dy } => propagate_unary(&self.dfdy.eval(x, y), dy),
        }
    }
}

/// Chain rule for one argument: `dfdx · dx[i]` for every component.
pub fn propagate_unary<T: Float>(dfdx: &Num<T>, dx: &[Num<T>]) -> Vec<Num<T>> {
    dx.iter()
        .map(|d| dispatch::binary(BinaryOp::Mul, dfdx, d))
        .collect()
}

/// Total derivative for two arguments: `dfdx · dx[i] + dfdy · dy[i]`
/// for every component.
pub fn propagate_binary<T: Float>(
    dfdx: &Num<T>,
    dx: &[Num<T>],
    dfdy: &Num<T>,
    dy: &[Num<T>],
) -> Vec<Num<T>> {
    debug_assert_eq!(dx.len(), dy.len(), "tangents of one session differ in length");
    propagate_unary(dfdx, dx)
        .iter()
        .zip(propagate_unary(dfdy, dy).iter())
        .map(|(a, b)| dispatch::binary(BinaryOp::Add, a, b))
        .collect()
}

/// Derivative rules for every intercepted operation, keyed by operation
/// tag.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    namespace: String,
    unary: HashMap<UnaryOp, UnaryRule>,
    binary: HashMap<BinaryOp, BinaryRule>,
}

impl RuleTable {
    /// A table with no rules: every dual-valued operation panics.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from the [`BASE_NAMESPACE`] entries of `catalog`.
    ///
    /// ```
    /// use dualtag::{Catalog, RuleTable, UnaryOp};
    ///
    /// let rules = RuleTable::build(&Catalog::builtin()).unwrap();
    /// assert_eq!(rules.unary(UnaryOp::Sin).unwrap().dfdx.to_string(), "cos(x)");
    /// ```
    pub fn build(catalog: &Catalog) -> Result<Self, CatalogError> {
        Self::build_for(catalog, BASE_NAMESPACE)
    }

    /// Build from the entries of `catalog` in `namespace`.
    ///
    /// Entries of other namespaces, of arity other than 1 or 2, or whose
    /// name is not an elementary operation are skipped. Everything else
    /// must be well formed.
    pub fn build_for(catalog: &Catalog, namespace: &str) -> Result<Self, CatalogError> {
        let mut table = RuleTable {
            namespace: namespace.to_string(),
            ..Self::default()
        };

        for entry in catalog.iter().filter(|e| e.namespace == namespace) {
            if entry.arity != 1 && entry.arity != 2 {
                log::trace!("skipping `{}` with arity {}", entry.name, entry.arity);
                continue;
            }
            if entry.derivatives.len() != entry.arity {
                return Err(CatalogError::ExpressionCount {
                    namespace: entry.namespace.clone(),
                    name: entry.name.clone(),
                    arity: entry.arity,
                    found: entry.derivatives.len(),
                });
            }
            let Some(op) = Op::lookup(&entry.name, entry.arity) else {
                log::warn!(
                    "`{}.{}`/{} is not an elementary operation; not intercepted",
                    namespace,
                    entry.name,
                    entry.arity
                );
                continue;
            };

            let fresh = match op {
                Op::Unary(op) => table
                    .unary
                    .insert(
                        op,
                        UnaryRule {
                            op,
                            dfdx: parse(entry, 0)?,
                        },
                    )
                    .is_none(),
                Op::Binary(op) => table
                    .binary
                    .insert(
                        op,
                        BinaryRule {
                            op,
                            dfdx: parse(entry, 0)?,
                            dfdy: parse(entry, 1)?,
                        },
                    )
                    .is_none(),
            };
            if !fresh {
                return Err(CatalogError::Duplicate {
                    namespace: entry.namespace.clone(),
                    name: entry.name.clone(),
                    arity: entry.arity,
                });
            }
        }

        log::debug!(
            "rule table `{}`: {} unary and {} binary rules",
            table.namespace,
            table.unary.len(),
            table.binary.len()
        );
        Ok(table)
    }

    /// The namespace this table was built from.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The rule for a one-argument operation, if the table has one.
    pub fn unary(&self, op: UnaryOp) -> Option<&UnaryRule> {
        self.unary.get(&op)
    }

    /// The rule for a two-argument operation, if the table has one.
    pub fn binary(&self, op: BinaryOp) -> Option<&BinaryRule> {
        self.binary.get(&op)
    }

    /// Whether `op` has a rule.
    pub fn intercepts(&self, op: Op) -> bool {
        match op {
            Op::Unary(op) => self.unary.contains_key(&op),
            Op::Binary(op) => self.binary.contains_key(&op),
        }
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.unary.len() + self.binary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn parse(entry: &CatalogEntry, index: usize) -> Result<Expr, CatalogError> {
    let src = &entry.derivatives[index];
    Expr::parse(src, entry.arity).map_err(|source| CatalogError::Expression {
        name: entry.name.clone(),
        arity: entry.arity,
        index,
        expr: src.clone(),
        source,
    })
}
