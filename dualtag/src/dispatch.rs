//! Operation interception.
//!
//! Every arithmetic operator and elementary method on [`Num`] funnels
//! into [`unary`] or [`binary`]. With no dual operand they evaluate the
//! operation on the plain numbers and nothing else. Otherwise one
//! session intercepts: the owner of the operands that ranks highest by
//! [`Context::precedence`], which while tracing is the innermost active
//! session among them. Then:
//!
//! 1. operands owned by that session are unwrapped to primal and
//!    tangent; all other operands (plain numbers, duals of outer or
//!    unrelated sessions) are passed through unchanged as constants,
//! 2. the operation is applied to the primals, recursing so that any
//!    remaining dual layers are handled by their own sessions,
//! 3. the session's rule computes the output tangent,
//! 4. the result is wrapped as a new dual of the same session.
//!
//! Because a session only ever reads its own tangents, a derivative
//! taken inside another derivative cannot leak into it.

use crate::context::Context;
use crate::dual::{Dual, Num};
use crate::ops::{BinaryOp, Op, UnaryOp};
use crate::rules::CallShape;
use num_traits::Float;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Apply a one-argument operation.
///
/// # Panics
///
/// Panics if the operand is a dual whose session has no rule for `op`.
pub fn unary<T: Float>(op: UnaryOp, x: &Num<T>) -> Num<T> {
    let d = match x {
        Num::Real(v) => return Num::Real(op.eval(*v)),
        Num::Dual(d) => d,
    };
    let ctx = d.owner();
    let px = d.primal(ctx);

    let rule = ctx
        .rules()
        .unary(op)
        .unwrap_or_else(|| missing_rule(Op::Unary(op), ctx));
    let primal = unary(op, px);
    let tangent = rule.tangent(px, d.tangent(ctx));

    Num::from(Dual::wrap(ctx.clone(), primal, tangent))
}

/// Apply a two-argument operation.
///
/// # Panics
///
/// Panics if the intercepting session has no rule for `op`.
pub fn binary<T: Float>(op: BinaryOp, x: &Num<T>, y: &Num<T>) -> Num<T> {
    let ctx = match intercepting(x, y) {
        Some(ctx) => ctx.clone(),
        None => return Num::Real(op.eval(x.value(), y.value())),
    };
    let (px, dx) = split(x, &ctx);
    let (py, dy) = split(y, &ctx);

    let shape = match (dx, dy) {
        (Some(dx), Some(dy)) => CallShape::Both { dx, dy },
        (Some(dx), None) => CallShape::Left { dx },
        (None, Some(dy)) => CallShape::Right { dy },
        (None, None) => unreachable!("the intercepting session owns an operand"),
    };

    let rule = ctx
        .rules()
        .binary(op)
        .unwrap_or_else(|| missing_rule(Op::Binary(op), &ctx));
    let primal = binary(op, px, py);
    let tangent = rule.tangent(shape, px, py);

    Num::from(Dual::wrap(ctx, primal, tangent))
}

/// The session that intercepts an operation on `x` and `y`, if either
/// is a dual.
fn intercepting<'a, T>(x: &'a Num<T>, y: &'a Num<T>) -> Option<&'a Context> {
    match (x.owner(), y.owner()) {
        (Some(a), Some(b)) if b.precedence() > a.precedence() => Some(b),
        (Some(a), _) => Some(a),
        (None, b) => b,
    }
}

/// Unwrap `n` if `ctx` owns it; otherwise it is a constant to `ctx`.
fn split<'a, T>(n: &'a Num<T>, ctx: &Context) -> (&'a Num<T>, Option<&'a [Num<T>]>) {
    match n {
        Num::Dual(d) if d.owner() == ctx => (d.primal(ctx), Some(d.tangent(ctx))),
        _ => (n, None),
    }
}

fn missing_rule(op: Op, ctx: &Context) -> ! {
    panic!(
        "no derivative rule for `{}` in {:?} (rule table `{}`)",
        op,
        ctx,
        ctx.rules().namespace()
    )
}

// ── Elementary methods ─────────────────────────────────────────

macro_rules! unary_methods {
    ($($(#[$doc:meta])* $method:ident => $op:ident;)*) => {
        impl<T: Float> Num<T> {
            $(
                $(#[$doc])*
                pub fn $method(&self) -> Num<T> {
                    unary(UnaryOp::$op, self)
                }
            )*
        }
    };
}

unary_methods! {
    /// `1 / self`
    recip => Inv;
    abs => Abs;
    /// `-1` or `1` by sign; `±0` and NaN map to themselves.
    ///
    /// Unlike `Float::signum`, which gives `1` for `0`.
    sign => Sign;
    sqrt => Sqrt;
    cbrt => Cbrt;
    /// `e^self`
    exp => Exp;
    /// `2^self`
    exp2 => Exp2;
    /// `e^self - 1`, accurate near zero.
    exp_m1 => Expm1;
    /// Natural logarithm.
    ln => Log;
    log2 => Log2;
    log10 => Log10;
    /// `ln(1 + self)`, accurate near zero.
    ln_1p => Log1p;
    sin => Sin;
    cos => Cos;
    tan => Tan;
    asin => Asin;
    acos => Acos;
    atan => Atan;
    sinh => Sinh;
    cosh => Cosh;
    tanh => Tanh;
    asinh => Asinh;
    acosh => Acosh;
    atanh => Atanh;
}

impl<T: Float> Num<T> {
    /// `self` raised to `n`.
    ///
    /// ```
    /// use dualtag::{diff, Num};
    ///
    /// let d = diff(|x: Num<f64>| x.powf(3.0), 2.0).unwrap();
    /// assert_eq!(d.real(), Some(12.0));
    /// ```
    pub fn powf(&self, n: T) -> Num<T> {
        // x^0 is 1 for every x, NaN included. The power rule would
        // evaluate 0 · 0^-1 at x = 0.
        if n == T::zero() {
            return Num::Real(T::one());
        }
        binary(BinaryOp::Pow, self, &Num::Real(n))
    }

    /// `self` raised to the integer `n`.
    pub fn powi(&self, n: i32) -> Num<T> {
        let n = num_traits::cast(n).unwrap_or_else(T::nan);
        self.powf(n)
    }

    /// `self` raised to `exponent`, differentiating through both.
    pub fn pow(&self, exponent: &Num<T>) -> Num<T> {
        binary(BinaryOp::Pow, self, exponent)
    }

    /// Four-quadrant arctangent of `self / other`.
    pub fn atan2(&self, other: &Num<T>) -> Num<T> {
        binary(BinaryOp::Atan2, self, other)
    }

    /// `sqrt(self² + other²)` without intermediate overflow.
    pub fn hypot(&self, other: &Num<T>) -> Num<T> {
        binary(BinaryOp::Hypot, self, other)
    }
}

// ── Operators ──────────────────────────────────────────────────

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $op:ident) => {
        impl<T: Float> $trait for Num<T> {
            type Output = Num<T>;
            fn $method(self, rhs: Num<T>) -> Num<T> {
                binary(BinaryOp::$op, &self, &rhs)
            }
        }

        impl<'a, T: Float> $trait<&'a Num<T>> for Num<T> {
            type Output = Num<T>;
            fn $method(self, rhs: &'a Num<T>) -> Num<T> {
                binary(BinaryOp::$op, &self, rhs)
            }
        }

        impl<'a, T: Float> $trait<Num<T>> for &'a Num<T> {
            type Output = Num<T>;
            fn $method(self, rhs: Num<T>) -> Num<T> {
                binary(BinaryOp::$op, self, &rhs)
            }
        }

        impl<'a, 'b, T: Float> $trait<&'b Num<T>> for &'a Num<T> {
            type Output = Num<T>;
            fn $method(self, rhs: &'b Num<T>) -> Num<T> {
                binary(BinaryOp::$op, self, rhs)
            }
        }

        impl<T: Float> $trait<T> for Num<T> {
            type Output = Num<T>;
            fn $method(self, rhs: T) -> Num<T> {
                binary(BinaryOp::$op, &self, &Num::Real(rhs))
            }
        }

        impl<'a, T: Float> $trait<T> for &'a Num<T> {
            type Output = Num<T>;
            fn $method(self, rhs: T) -> Num<T> {
                binary(BinaryOp::$op, self, &Num::Real(rhs))
            }
        }
    };
}

binary_operator!(Add, add, Add);
binary_operator!(Sub, sub, Sub);
binary_operator!(Mul, mul, Mul);
binary_operator!(Div, div, Div);

/// Plain float on the left: `2.0 * x`.
macro_rules! scalar_lhs_operators {
    ($($float:ty),*) => {$(
        impl Add<Num<$float>> for $float {
            type Output = Num<$float>;
            fn add(self, rhs: Num<$float>) -> Num<$float> {
                binary(BinaryOp::Add, &Num::Real(self), &rhs)
            }
        }

        impl Sub<Num<$float>> for $float {
            type Output = Num<$float>;
            fn sub(self, rhs: Num<$float>) -> Num<$float> {
                binary(BinaryOp::Sub, &Num::Real(self), &rhs)
            }
        }

        impl Mul<Num<$float>> for $float {
            type Output = Num<$float>;
            fn mul(self, rhs: Num<$float>) -> Num<$float> {
                binary(BinaryOp::Mul, &Num::Real(self), &rhs)
            }
        }

        impl Div<Num<$float>> for $float {
            type Output = Num<$float>;
            fn div(self, rhs: Num<$float>) -> Num<$float> {
                binary(BinaryOp::Div, &Num::Real(self), &rhs)
            }
        }

        impl<'a> Mul<&'a Num<$float>> for $float {
            type Output = Num<$float>;
            fn mul(self, rhs: &'a Num<$float>) -> Num<$float> {
                binary(BinaryOp::Mul, &Num::Real(self), rhs)
            }
        }
    )*};
}

scalar_lhs_operators!(f32, f64);

impl<T: Float> Neg for Num<T> {
    type Output = Num<T>;
    fn neg(self) -> Num<T> {
        unary(UnaryOp::Neg, &self)
    }
}

impl<'a, T: Float> Neg for &'a Num<T> {
    type Output = Num<T>;
    fn neg(self) -> Num<T> {
        unary(UnaryOp::Neg, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CatalogEntry, BASE_NAMESPACE};
    use crate::rules::RuleTable;
    use std::sync::Arc;

    fn base_context() -> Context {
        Context::new(Arc::new(RuleTable::build(&Catalog::builtin()).unwrap()))
    }

    fn seed(ctx: &Context, primal: impl Into<Num<f64>>) -> Num<f64> {
        Num::from(Dual::wrap(ctx.clone(), primal.into(), vec![Num::Real(1.0)]))
    }

    /// Primal and single tangent component under `ctx`.
    fn parts(n: &Num<f64>, ctx: &Context) -> (Num<f64>, Num<f64>) {
        let d = n.as_dual().expect("a dual value");
        (d.primal(ctx).clone(), d.tangent(ctx)[0].clone())
    }

    #[test]
    fn plain_numbers_pass_through_bit_for_bit() {
        let x = 0.3_f64;
        let y = -1.7_f64;
        let traced = (Num::Real(x).sin() * y + Num::Real(y).exp()) / Num::Real(x).hypot(&Num::Real(y));
        let plain = (x.sin() * y + y.exp()) / x.hypot(y);

        assert_eq!(traced.real().map(f64::to_bits), Some(plain.to_bits()));
    }

    #[test]
    fn sign_keeps_zero_and_nan() {
        for (x, expected) in [(-2.5, -1.0), (0.5, 1.0), (0.0, 0.0), (-0.0, -0.0)] {
            let s: f64 = Num::Real(x).sign().real().unwrap();
            assert_eq!(s.to_bits(), f64::to_bits(expected), "sign({x})");
        }
        assert!(Num::Real(f64::NAN).sign().real().unwrap().is_nan());
    }

    #[test]
    fn zeroth_power_is_constant() {
        let ctx = base_context();
        let zero = seed(&ctx, 0.0);
        assert_eq!(zero.powi(0).real(), Some(1.0));
        assert_eq!(seed(&ctx, -3.0).powf(0.0).real(), Some(1.0));
        assert_eq!(Num::Real(f64::NAN).powf(0.0).real(), Some(f64::NAN.powf(0.0)));

        // Non-zero exponents still go through the power rule at zero.
        let (value, d) = parts(&zero.powi(2), &ctx);
        assert_eq!(value, 0.0);
        assert_eq!(d, 0.0);
    }

    #[test]
    fn both_operands_in_the_session_use_the_total_derivative() {
        let ctx = base_context();
        let x = seed(&ctx, 3.0);

        let (value, tangent) = parts(&(&x * &x), &ctx);
        assert_eq!(value, 9.0);
        assert_eq!(tangent, 6.0);

        let (value, tangent) = parts(&(&x + &x), &ctx);
        assert_eq!(value, 6.0);
        assert_eq!(tangent, 2.0);
    }

    #[test]
    fn constant_operands_contribute_no_tangent() {
        let ctx = base_context();
        let x = seed(&ctx, 3.0);

        let (_, left) = parts(&(&x * 5.0), &ctx);
        assert_eq!(left, 5.0);

        let (value, right) = parts(&(2.0 / x.clone()), &ctx);
        assert_eq!(value, 2.0 / 3.0);
        assert!((right.value() - (-2.0 / 9.0)).abs() < 1e-15);

        let (_, sub) = parts(&(10.0 - x), &ctx);
        assert_eq!(sub, -1.0);
    }

    #[test]
    fn unary_operations_follow_the_chain_rule() {
        let ctx = base_context();
        let x = seed(&ctx, 0.5);

        let (value, tangent) = parts(&(&x * 2.0).sin(), &ctx);
        assert_eq!(value, 1.0_f64.sin());
        assert_eq!(tangent, 2.0 * 1.0_f64.cos());

        let (_, tangent) = parts(&-&x, &ctx);
        assert_eq!(tangent, -1.0);
    }

    #[test]
    fn outer_duals_are_constants_to_the_inner_session() {
        let outer = base_context();
        let inner = base_context();
        let _outer_scope = outer.enter();
        let x = seed(&outer, 2.0);
        let _inner_scope = inner.enter();
        let y = seed(&inner, 5.0);

        // x·y: the inner session sees x as a constant
        let product = &x * &y;
        assert!(product.is_owned_by(&inner));
        let (primal, tangent) = parts(&product, &inner);

        // ... and its primal is still a dual of the outer session
        assert!(primal.is_owned_by(&outer));
        let (value, outer_tangent) = parts(&primal, &outer);
        assert_eq!(value, 10.0);
        assert_eq!(outer_tangent, 5.0);

        // ∂(x·y)/∂y = x, itself carrying the outer tangent 1
        assert!(tangent.is_owned_by(&outer));
        let (value, outer_tangent) = parts(&tangent, &outer);
        assert_eq!(value, 2.0);
        assert_eq!(outer_tangent, 1.0);
    }

    #[test]
    fn the_innermost_active_session_intercepts_regardless_of_operand_order() {
        let outer = base_context();
        let inner = base_context();
        let _outer_scope = outer.enter();
        let _inner_scope = inner.enter();
        let x = seed(&outer, 1.0);
        let y = seed(&inner, 1.0);

        assert!((&x + &y).is_owned_by(&inner));
        assert!((&y + &x).is_owned_by(&inner));
    }

    #[test]
    fn unrelated_sessions_behave_as_under_their_own_rules() {
        let unrelated = base_context();
        let x = seed(&unrelated, 0.25);
        let (value, tangent) = parts(&x.exp(), &unrelated);
        assert_eq!(value, 0.25_f64.exp());
        assert_eq!(tangent, 0.25_f64.exp());
    }

    #[test]
    #[should_panic(expected = "no derivative rule for `sin/1`")]
    fn missing_rules_panic_with_the_operation_name() {
        let catalog: Catalog = [CatalogEntry::new(BASE_NAMESPACE, "*", 2, ["y", "x"])]
            .into_iter()
            .collect();
        let ctx = Context::new(Arc::new(RuleTable::build(&catalog).unwrap()));
        let _ = seed(&ctx, 1.0).sin();
    }

    #[test]
    fn powers_and_two_argument_functions() {
        let ctx = base_context();
        let x = seed(&ctx, 2.0);

        let (_, d) = parts(&x.powi(3), &ctx);
        assert_eq!(d, 12.0);

        // d/dx x^x = x^x (ln x + 1)
        let (_, d) = parts(&x.pow(&x), &ctx);
        assert!((d.value() - 4.0 * (2.0_f64.ln() + 1.0)).abs() < 1e-12);

        // d/dx atan2(x, 1) = 1 / (1 + x²)
        let (_, d) = parts(&x.atan2(&Num::Real(1.0)), &ctx);
        assert!((d.value() - 0.2).abs() < 1e-15);

        // d/dx hypot(x, 3) = x / hypot(x, 3)
        let (_, d) = parts(&x.hypot(&Num::Real(3.0)), &ctx);
        assert!((d.value() - 2.0 / 13.0_f64.sqrt()).abs() < 1e-15);
    }
}
