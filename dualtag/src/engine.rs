//! The `diff` driver.
//!
//! An [`Engine`] owns a rule table and turns a scalar function into its
//! derivative at a point:
//!
//! 1. reject a seed that is not a scalar,
//! 2. open a fresh [`Context`] and seed `x` with a unit tangent,
//! 3. run the function with that context active,
//! 4. reject a result that is not a scalar,
//! 5. read the result's tangent, or zero if the result does not depend
//!    on the seed.
//!
//! Nested calls need nothing special: an inner `diff` opens its own
//! context on top of the outer one, and the dispatch layer keeps their
//! tangents apart.

use crate::catalog::Catalog;
use crate::context::Context;
use crate::dual::{Dual, Num};
use crate::error::{CatalogError, DiffError};
use crate::rules::RuleTable;
use crate::value::Value;
use num_traits::Float;
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Rule table built from [`Catalog::builtin`], shared by every default
/// engine.
static BASE: Lazy<Arc<RuleTable>> = Lazy::new(|| {
    Arc::new(RuleTable::build(&Catalog::builtin()).expect("builtin catalog is well formed"))
});

/// A forward-mode differentiation engine.
///
/// # Examples
///
/// ```
/// use dualtag::{Engine, Num};
///
/// let engine = Engine::default();
/// let d = engine.diff(|x: Num<f64>| x.sin() * 2.0, 0.0).unwrap();
/// assert_eq!(d.real(), Some(2.0));
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    rules: Arc<RuleTable>,
}

impl Engine {
    /// Build an engine from the base namespace of `catalog`.
    pub fn new(catalog: &Catalog) -> Result<Self, CatalogError> {
        Ok(Self::from_rules(RuleTable::build(catalog)?))
    }

    /// Wrap an already built rule table.
    pub fn from_rules(rules: RuleTable) -> Self {
        Engine {
            rules: Arc::new(rules),
        }
    }

    /// The rules every session of this engine differentiates with.
    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// A fresh session differentiating with this engine's rules.
    pub fn context(&self) -> Context {
        Context::new(Arc::clone(&self.rules))
    }

    /// Derivative of `f` at `x`.
    ///
    /// `x` may itself be a dual of an enclosing session, which is how
    /// derivatives nest.
    pub fn diff<T, F, X, Y>(&self, f: F, x: X) -> Result<Num<T>, DiffError>
    where
        T: Float,
        F: FnOnce(Num<T>) -> Y,
        X: Into<Value<T>>,
        Y: Into<Value<T>>,
    {
        self.value_and_diff(f, x).map(|(_, dy)| dy)
    }

    /// `f(x)` together with its derivative at `x`.
    ///
    /// ```
    /// use dualtag::{Engine, Num};
    ///
    /// let (y, dy) = Engine::default()
    ///     .value_and_diff(|x: Num<f64>| &x * &x + 1.0, 3.0)
    ///     .unwrap();
    /// assert_eq!(y.real(), Some(10.0));
    /// assert_eq!(dy.real(), Some(6.0));
    /// ```
    pub fn value_and_diff<T, F, X, Y>(&self, f: F, x: X) -> Result<(Num<T>, Num<T>), DiffError>
    where
        T: Float,
        F: FnOnce(Num<T>) -> Y,
        X: Into<Value<T>>,
        Y: Into<Value<T>>,
    {
        let x = scalar(x.into()).map_err(|found| DiffError::UnsupportedInput { found })?;

        let ctx = self.context();
        let seed = Num::from(Dual::wrap(ctx.clone(), x, vec![Num::Real(T::one())]));
        log::trace!("context #{}: seeded", ctx.id());

        let y: Value<T> = {
            let _scope = ctx.enter();
            f(seed).into()
        };
        let y = scalar(y).map_err(|found| DiffError::UnsupportedOutput { found })?;

        match y.as_dual() {
            Some(d) if d.owner() == &ctx => {
                log::trace!("context #{}: extracting tangent", ctx.id());
                let primal = d.primal(&ctx).clone();
                let tangent = d.tangent(&ctx)[0].clone();
                Ok((primal, tangent))
            }
            _ => {
                log::trace!(
                    "context #{}: result does not depend on the seed",
                    ctx.id()
                );
                Ok((y, Num::Real(T::zero())))
            }
        }
    }
}

impl Default for Engine {
    /// An engine over the builtin catalog.
    fn default() -> Self {
        Engine {
            rules: Arc::clone(&BASE),
        }
    }
}

/// Derivative of `f` at `x` with the builtin rules.
///
/// ```
/// use dualtag::{diff, Num};
///
/// // d/dx x·e^x = (1 + x)·e^x
/// let d = diff(|x: Num<f64>| &x * x.exp(), 0.0).unwrap();
/// assert_eq!(d.real(), Some(1.0));
///
/// // Derivatives nest: d/dx [x · d/dy y²|y=x] = d/dx 2x² = 4x
/// let d = diff(
///     |x: Num<f64>| {
///         let inner = diff(|y: Num<f64>| &y * &y, x.clone()).unwrap();
///         x * inner
///     },
///     3.0,
/// )
/// .unwrap();
/// assert_eq!(d.real(), Some(12.0));
/// ```
pub fn diff<T, F, X, Y>(f: F, x: X) -> Result<Num<T>, DiffError>
where
    T: Float,
    F: FnOnce(Num<T>) -> Y,
    X: Into<Value<T>>,
    Y: Into<Value<T>>,
{
    Engine::default().diff(f, x)
}

fn scalar<T>(value: Value<T>) -> Result<Num<T>, String> {
    match value {
        Value::Scalar(n) if n.is_scalar() => Ok(n),
        other => Err(other.describe()),
    }
}
