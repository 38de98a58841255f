//! Inputs and outputs at the `diff` boundary.
//!
//! [`diff`](crate::diff) is scalar-to-scalar. Its seed and the traced
//! function's result are converted into a [`Value`] first, so a caller
//! that hands over (or returns) a collection gets an
//! [`UnsupportedInput`](crate::DiffError::UnsupportedInput) or
//! [`UnsupportedOutput`](crate::DiffError::UnsupportedOutput) error
//! instead of a silently wrong number.

use crate::dual::Num;

/// A scalar or an array of values.
#[derive(Debug, Clone)]
pub enum Value<T> {
    Scalar(Num<T>),
    Array(Vec<Value<T>>),
}

impl<T> Value<T> {
    /// Whether this is a scalar, recursively through dual layers.
    pub fn is_scalar(&self) -> bool {
        match self {
            Value::Scalar(n) => n.is_scalar(),
            Value::Array(_) => false,
        }
    }

    /// The scalar, or `None` for an array.
    pub fn into_scalar(self) -> Option<Num<T>> {
        match self {
            Value::Scalar(n) if n.is_scalar() => Some(n),
            _ => None,
        }
    }

    /// Human-readable shape, used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Value::Scalar(Num::Real(_)) => "a number".to_string(),
            Value::Scalar(Num::Dual(_)) => "a dual number".to_string(),
            Value::Array(items) if items.len() == 1 => "an array of 1 value".to_string(),
            Value::Array(items) => format!("an array of {} values", items.len()),
        }
    }
}

impl<T> From<Num<T>> for Value<T> {
    fn from(n: Num<T>) -> Self {
        Value::Scalar(n)
    }
}

macro_rules! float_values {
    ($($float:ty),*) => {$(
        impl From<$float> for Value<$float> {
            fn from(v: $float) -> Self {
                Value::Scalar(Num::Real(v))
            }
        }
    )*};
}

float_values!(f32, f64);

impl<T, V: Into<Value<T>>> From<Vec<V>> for Value<T> {
    fn from(items: Vec<V>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T, V: Into<Value<T>>, const N: usize> From<[V; N]> for Value<T> {
    fn from(items: [V; N]) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T, A: Into<Value<T>>, B: Into<Value<T>>> From<(A, B)> for Value<T> {
    fn from((a, b): (A, B)) -> Self {
        Value::Array(vec![a.into(), b.into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_scalars() {
        let v = Value::from(2.5_f64);
        assert!(v.is_scalar());
        assert_eq!(v.describe(), "a number");
        assert_eq!(v.into_scalar().and_then(|n| n.real()), Some(2.5));

        assert!(Value::from(Num::Real(1.0_f32)).is_scalar());
    }

    #[test]
    fn collections_are_not_scalars() {
        let v: Value<f64> = vec![1.0, 2.0, 3.0].into();
        assert!(!v.is_scalar());
        assert_eq!(v.describe(), "an array of 3 values");

        let v: Value<f64> = [Num::Real(1.0)].into();
        assert!(!v.is_scalar());
        assert_eq!(v.describe(), "an array of 1 value");
        assert!(v.into_scalar().is_none());

        let v: Value<f64> = (1.0, Num::Real(2.0)).into();
        assert_eq!(v.describe(), "an array of 2 values");
    }
}
