//! Error types.
//!
//! Two layers can fail:
//!
//! - **Setup** ([`CatalogError`]): building a [`RuleTable`] from a
//!   derivative-rule catalog. These are fatal before any
//!   differentiation happens.
//! - **Calls** ([`DiffError`]): a single [`diff`] request whose seed
//!   or result is not a scalar.
//!
//! Unwrapping a dual value under a context that does not own it is a
//! programming error and panics instead (see [`Dual::primal`]).
//!
//! [`RuleTable`]: crate::RuleTable
//! [`diff`]: crate::diff
//! [`Dual::primal`]: crate::Dual::primal

use thiserror::Error;

/// Failure of a single differentiation request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// The seed point was not a plain scalar.
    #[error("unsupported input: expected a scalar seed, got {found}")]
    UnsupportedInput {
        /// Shape of the rejected seed.
        found: String,
    },

    /// The traced function returned something other than a scalar.
    #[error("unsupported output: expected the function to return a scalar, got {found}")]
    UnsupportedOutput {
        /// Shape of the rejected result.
        found: String,
    },
}

/// A derivative-rule catalog that cannot be turned into a rule table.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// An entry carries the wrong number of derivative expressions for
    /// its declared arity.
    #[error("`{namespace}.{name}` declares arity {arity} but carries {found} derivative expression(s)")]
    ExpressionCount {
        /// Namespace of the offending entry.
        namespace: String,
        /// Operation name of the offending entry.
        name: String,
        /// Declared arity.
        arity: usize,
        /// Number of expressions actually present.
        found: usize,
    },

    /// A derivative expression failed to parse.
    #[error("derivative {index} of `{name}`/{arity} (`{expr}`): {source}")]
    Expression {
        /// Operation name.
        name: String,
        /// Declared arity.
        arity: usize,
        /// Which partial (0 for `∂/∂x`, 1 for `∂/∂y`).
        index: usize,
        /// The expression text.
        expr: String,
        /// Why it was rejected.
        #[source]
        source: ExprError,
    },

    /// The same operation is registered twice in one namespace.
    #[error("`{namespace}.{name}` with arity {arity} is registered more than once")]
    Duplicate {
        /// Namespace of the duplicated entry.
        namespace: String,
        /// Operation name.
        name: String,
        /// Arity.
        arity: usize,
    },

    /// The catalog document is not valid JSON for a catalog.
    #[cfg(feature = "serde")]
    #[error("malformed catalog document: {0}")]
    Json(#[from] serde_json::Error),
}

/// A derivative expression that could not be parsed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// A character outside the expression grammar.
    #[error("unexpected character `{0}`")]
    UnexpectedChar(char),

    /// A numeric literal that does not parse as a number.
    #[error("invalid number `{0}`")]
    InvalidNumber(String),

    /// The input ended in the middle of an expression.
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// A token in a position where it is not allowed.
    #[error("unexpected {0}")]
    UnexpectedToken(String),

    /// An identifier that is neither a placeholder for this arity nor a
    /// known constant.
    #[error("unknown placeholder `{0}`")]
    UnknownPlaceholder(String),

    /// A call to a name that is not an elementary operation of that
    /// arity.
    #[error("unknown function `{name}` with {arity} argument(s)")]
    UnknownFunction {
        /// Called name.
        name: String,
        /// Number of arguments at the call site.
        arity: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_errors_render_the_rejected_shape() {
        let err = DiffError::UnsupportedOutput {
            found: "an array of 2 values".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unsupported output: expected the function to return a scalar, got an array of 2 values"
        );
    }

    #[test]
    fn expression_errors_chain_their_source() {
        use std::error::Error as _;

        let err = CatalogError::Expression {
            name: "sin".to_string(),
            arity: 1,
            index: 0,
            expr: "cos(y)".to_string(),
            source: ExprError::UnknownPlaceholder("y".to_string()),
        };
        assert!(err.to_string().starts_with("derivative 0 of `sin`/1"));
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("unknown placeholder `y`"));
    }
}
