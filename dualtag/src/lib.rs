//! Forward-mode automatic differentiation with session-tagged dual
//! numbers.
//!
//! This crate differentiates ordinary Rust closures over [`Num`]:
//!
//! - **Dual values** ([`Dual`]) carry a primal and a tangent, stamped with
//!   the [`Context`] of the `diff` call that created them
//! - **Rule tables** ([`RuleTable`]) are generated from a declarative
//!   [`Catalog`] of derivative expressions instead of being hard-coded
//! - **Dispatch** ([`dispatch`]) intercepts every elementary operation and
//!   applies the chain rule for the innermost session involved
//!
//! # Differentiation
//!
//! Use [`diff`] for functions f: ℝ → ℝ:
//!
//! ```
//! use dualtag::{diff, Num};
//!
//! // f(x) = x² + 2x
//! let f = |x: Num<f64>| &x * &x + 2.0 * x;
//!
//! // f'(3) = 2·3 + 2 = 8
//! let d = diff(f, 3.0).unwrap();
//! assert_eq!(d.real(), Some(8.0));
//! ```
//!
//! # Nested derivatives
//!
//! A traced function may call [`diff`] itself. Each call opens its own
//! session, so an inner derivative treats the outer variable as a
//! constant and the outer derivative still sees through the inner one:
//!
//! ```
//! use dualtag::{diff, Num};
//!
//! // d/dx [x · d/dy (x + y)] = d/dx [x · 1] = 1
//! let d = diff(
//!     |x: Num<f64>| {
//!         let inner = diff(|y: Num<f64>| &x + &y, 1.0).unwrap();
//!         &x * &inner
//!     },
//!     1.0,
//! )
//! .unwrap();
//! assert_eq!(d.real(), Some(1.0));
//!
//! // Second derivatives: d²/dx² x³ = 6x
//! let d2 = diff(|x: Num<f64>| diff(|y: Num<f64>| y.powi(3), x).unwrap(), 2.0).unwrap();
//! assert_eq!(d2.real(), Some(12.0));
//! ```
//!
//! # Custom rules
//!
//! An [`Engine`] is built from any catalog. Operations of its
//! [`BASE_NAMESPACE`] that the catalog leaves out cannot be
//! differentiated by that engine:
//!
//! ```
//! use dualtag::{Catalog, CatalogEntry, Engine, Num, BASE_NAMESPACE};
//!
//! let catalog: Catalog = [
//!     CatalogEntry::new(BASE_NAMESPACE, "*", 2, ["y", "x"]),
//!     CatalogEntry::new(BASE_NAMESPACE, "exp", 1, ["exp(x)"]),
//! ]
//! .into_iter()
//! .collect();
//!
//! let engine = Engine::new(&catalog).unwrap();
//! let d = engine.diff(|x: Num<f64>| &x * x.exp(), 0.0).unwrap();
//! assert_eq!(d.real(), Some(1.0));
//! ```
//!
//! # Errors
//!
//! `diff` is scalar-to-scalar. A collection as seed or result is a
//! [`DiffError`]:
//!
//! ```
//! use dualtag::{diff, DiffError, Num};
//!
//! let err = diff(|x: Num<f64>| vec![x.sin(), x.cos()], 0.0).unwrap_err();
//! assert!(matches!(err, DiffError::UnsupportedOutput { .. }));
//! ```
//!
//! Malformed catalogs fail when the engine is built, with a
//! [`CatalogError`].

pub mod catalog;
pub mod context;
pub mod dispatch;
pub mod dual;
pub mod engine;
pub mod error;
pub mod expr;
pub mod ops;
pub mod rules;
pub mod value;

pub use catalog::{Catalog, CatalogEntry, BASE_NAMESPACE};
pub use context::{ActiveScope, Context};
pub use dual::{Dual, Num};
pub use engine::{diff, Engine};
pub use error::{CatalogError, DiffError, ExprError};
pub use expr::Expr;
pub use ops::{BinaryOp, Op, UnaryOp};
pub use rules::{propagate_binary, propagate_unary, BinaryRule, CallShape, RuleTable, UnaryRule};
pub use value::Value;
