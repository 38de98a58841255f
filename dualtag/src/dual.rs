//! Session-tagged dual numbers.
//!
//! A dual value represents `primal + tangent·ε` where `ε² = 0`, just
//! like an ordinary dual number, with one addition: it is stamped with
//! the [`Context`] that created it. The tangent is only meaningful to
//! that context.
//!
//! Nesting falls out of the representation. The primal and tangent of
//! a dual are themselves [`Num`]s, so when `diff` is called inside a
//! traced function, the inner session's primal can be a dual of the
//! outer session:
//!
//! ```text
//! Dual(inner, primal: Dual(outer, 3, [1]), tangent: [1])
//! ```
//!
//! Each layer only ever combines tangents with its own owner, which is
//! what keeps nested derivatives apart.
//!
//! # Example
//!
//! ```
//! use dualtag::{Dual, Engine, Num};
//!
//! let ctx = Engine::default().context();
//! let x = Num::from(Dual::wrap(ctx.clone(), Num::Real(3.0), vec![Num::Real(1.0)]));
//!
//! let y = &x * &x;   // y = x²
//!
//! let d = y.as_dual().unwrap();
//! assert_eq!(d.primal(&ctx).real(), Some(9.0));
//! assert_eq!(d.tangent(&ctx)[0].real(), Some(6.0));
//! ```

use crate::context::Context;
use num_traits::Float;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// An immutable `(primal, tangent)` pair owned by one session.
///
/// The tangent holds one component per seed direction of the owning
/// session; the scalar [`diff`](crate::diff) API always seeds exactly
/// one.
#[derive(Debug, Clone)]
pub struct Dual<T> {
    owner: Context,
    primal: Num<T>,
    tangent: Vec<Num<T>>,
}

impl<T> Dual<T> {
    /// Construct a dual value owned by `owner`.
    pub fn wrap(owner: Context, primal: Num<T>, tangent: Vec<Num<T>>) -> Self {
        Dual {
            owner,
            primal,
            tangent,
        }
    }

    /// The session that owns this value.
    pub fn owner(&self) -> &Context {
        &self.owner
    }

    /// The primal value, read on behalf of `ctx`.
    ///
    /// # Panics
    ///
    /// Panics if `ctx` does not own this value. Reading another
    /// session's dual would mix its perturbation into the wrong
    /// derivative.
    pub fn primal(&self, ctx: &Context) -> &Num<T> {
        self.check_owner(ctx);
        &self.primal
    }

    /// The tangent components, read on behalf of `ctx`.
    ///
    /// # Panics
    ///
    /// Panics if `ctx` does not own this value.
    pub fn tangent(&self, ctx: &Context) -> &[Num<T>] {
        self.check_owner(ctx);
        &self.tangent
    }

    /// Whether the primal bottoms out in a plain number.
    pub fn is_scalar(&self) -> bool {
        self.primal.is_scalar()
    }

    fn check_owner(&self, ctx: &Context) {
        assert!(
            self.owner == *ctx,
            "context mismatch: dual value owned by {:?} unwrapped under {:?}",
            self.owner,
            ctx
        );
    }
}

/// A scalar flowing through traced code: either a plain number or a
/// dual value of some session.
///
/// Arithmetic on `Num` is intercepted (see the operator impls and the
/// elementary methods such as [`Num::sin`]); on two plain numbers it is
/// exactly the float arithmetic of `T`.
#[derive(Debug, Clone)]
pub enum Num<T> {
    /// A number no session is differentiating.
    Real(T),
    /// A dual value, shared because nested layers refer to it.
    Dual(Rc<Dual<T>>),
}

impl<T> Num<T> {
    /// A plain number.
    pub fn constant(value: T) -> Self {
        Num::Real(value)
    }

    /// The plain number, if this is not a dual value.
    pub fn real(&self) -> Option<T>
    where
        T: Copy,
    {
        match self {
            Num::Real(v) => Some(*v),
            Num::Dual(_) => None,
        }
    }

    /// The dual value, if this is one.
    pub fn as_dual(&self) -> Option<&Dual<T>> {
        match self {
            Num::Real(_) => None,
            Num::Dual(d) => Some(d),
        }
    }

    /// The session owning the outermost layer, if any.
    pub fn owner(&self) -> Option<&Context> {
        self.as_dual().map(Dual::owner)
    }

    /// Whether the outermost layer is a dual owned by `ctx`.
    pub fn is_owned_by(&self, ctx: &Context) -> bool {
        self.owner() == Some(ctx)
    }

    /// Whether this is a scalar all the way down through any dual
    /// layers.
    pub fn is_scalar(&self) -> bool {
        match self {
            Num::Real(_) => true,
            Num::Dual(d) => d.is_scalar(),
        }
    }

    /// The number at the bottom of every dual layer.
    ///
    /// This is the value traced code observes when it compares or
    /// prints a `Num`; no tangent is read.
    pub fn value(&self) -> T
    where
        T: Copy,
    {
        let mut num = self;
        loop {
            match num {
                Num::Real(v) => return *v,
                Num::Dual(d) => num = &d.primal,
            }
        }
    }
}

macro_rules! float_nums {
    ($($float:ty),*) => {$(
        impl From<$float> for Num<$float> {
            fn from(value: $float) -> Self {
                Num::Real(value)
            }
        }
    )*};
}

float_nums!(f32, f64);

impl<T> From<Dual<T>> for Num<T> {
    fn from(dual: Dual<T>) -> Self {
        Num::Dual(Rc::new(dual))
    }
}

/// Compares innermost primal values; tangents are ignored.
impl<T: Float> PartialEq for Num<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

impl<T: Float> PartialEq<T> for Num<T> {
    fn eq(&self, other: &T) -> bool {
        self.value() == *other
    }
}

/// Orders by innermost primal values, so traced code can branch.
impl<T: Float> PartialOrd for Num<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value().partial_cmp(&other.value())
    }
}

impl<T: Float> PartialOrd<T> for Num<T> {
    fn partial_cmp(&self, other: &T) -> Option<Ordering> {
        self.value().partial_cmp(other)
    }
}

impl<T: fmt::Display> fmt::Display for Num<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Num::Real(v) => write!(f, "{}", v),
            Num::Dual(d) => {
                write!(f, "({}", d.primal)?;
                for t in &d.tangent {
                    write!(f, " + {}·ε{}", t, d.owner.id())?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleTable;
    use std::sync::Arc;

    fn context() -> Context {
        Context::new(Arc::new(RuleTable::empty()))
    }

    fn seed(ctx: &Context, primal: Num<f64>) -> Num<f64> {
        Num::from(Dual::wrap(ctx.clone(), primal, vec![Num::Real(1.0)]))
    }

    #[test]
    fn owner_reads_back_what_was_wrapped() {
        let ctx = context();
        let d = Dual::wrap(ctx.clone(), Num::Real(2.5), vec![Num::Real(1.0)]);

        assert_eq!(d.owner(), &ctx);
        assert_eq!(d.primal(&ctx).real(), Some(2.5));
        assert_eq!(d.tangent(&ctx).len(), 1);
        assert_eq!(d.tangent(&ctx)[0].real(), Some(1.0));
    }

    #[test]
    #[should_panic(expected = "context mismatch")]
    fn reading_under_a_foreign_context_panics() {
        let owner = context();
        let stranger = context();
        let d = Dual::wrap(owner, Num::Real(2.5), vec![Num::Real(1.0)]);
        let _ = d.tangent(&stranger);
    }

    #[test]
    fn nested_layers_are_scalar_and_expose_the_innermost_value() {
        let outer = context();
        let inner = context();
        let x = seed(&inner, seed(&outer, Num::Real(3.0)));

        assert!(x.is_scalar());
        assert!(x.is_owned_by(&inner));
        assert!(!x.is_owned_by(&outer));
        assert_eq!(x.value(), 3.0);
        assert_eq!(x.real(), None);
    }

    #[test]
    fn comparisons_use_primal_values() {
        let ctx = context();
        let x = seed(&ctx, Num::Real(3.0));

        assert!(x > Num::Real(2.0));
        assert!(x < 4.0);
        assert_eq!(x, 3.0);
    }

    #[test]
    fn display_shows_every_layer() {
        let ctx = context();
        let x = Num::from(Dual::wrap(ctx.clone(), Num::Real(3.0), vec![Num::Real(2.0)]));
        assert_eq!(x.to_string(), format!("(3 + 2·ε{})", ctx.id()));
        assert_eq!(Num::Real(1.5).to_string(), "1.5");
    }

    #[test]
    fn conversions_pick_the_layer_from_the_argument() {
        let ctx = context();
        let d = Num::from(Dual::wrap(ctx.clone(), Num::Real(3.0_f64), vec![Num::Real(1.0)]));
        assert!(d.is_owned_by(&ctx));

        let r = Num::from(2.0_f64);
        assert_eq!(r.real(), Some(2.0));
        assert_eq!(Num::from(0.5_f32).real(), Some(0.5_f32));
    }
}
