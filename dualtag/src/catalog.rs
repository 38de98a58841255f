//! Derivative-rule catalogs.
//!
//! A catalog is an enumerable list of `(namespace, name, arity,
//! derivatives)` entries. Each derivative is an [`Expr`](crate::Expr)
//! source string over the placeholders `x` and `y`, one per operand:
//! entry `("base", "*", 2, ["y", "x"])` states `∂(x·y)/∂x = y` and
//! `∂(x·y)/∂y = x`.
//!
//! The engine only consumes a catalog; [`RuleTable::build`] filters it to
//! one namespace and parses the expressions. [`Catalog::builtin`]
//! provides the elementary operations of the [`BASE_NAMESPACE`] and a
//! few rules from a `special` namespace the engine does not intercept.
//!
//! With the `serde` feature, catalogs are (de)serializable as a JSON
//! array of entries:
//!
//! ```
//! # #[cfg(feature = "serde")]
//! # {
//! use dualtag::Catalog;
//!
//! let catalog = Catalog::from_json(r#"[
//!     { "namespace": "base", "name": "sin", "arity": 1, "derivatives": ["cos(x)"] }
//! ]"#).unwrap();
//!
//! assert_eq!(catalog.len(), 1);
//! assert_eq!(catalog.entries()[0].derivatives, ["cos(x)"]);
//! # }
//! ```
//!
//! [`RuleTable::build`]: crate::RuleTable::build

#[cfg(feature = "serde")]
use crate::error::CatalogError;

/// The namespace holding the elementary operations the engine
/// intercepts.
pub const BASE_NAMESPACE: &str = "base";

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CatalogEntry {
    pub namespace: String,
    pub name: String,
    pub arity: usize,
    /// One expression per operand, in operand order.
    pub derivatives: Vec<String>,
}

impl CatalogEntry {
    /// An entry with one derivative expression per operand.
    pub fn new<I, S>(namespace: &str, name: &str, arity: usize, derivatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CatalogEntry {
            namespace: namespace.to_string(),
            name: name.to_string(),
            arity,
            derivatives: derivatives.into_iter().map(Into::into).collect(),
        }
    }
}

/// An ordered collection of catalog entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

const BASE_UNARY: &[(&str, &str)] = &[
    ("-", "-1"),
    ("inv", "-1 / x ^ 2"),
    ("abs", "sign(x)"),
    ("sign", "0"),
    ("sqrt", "0.5 / sqrt(x)"),
    ("cbrt", "1 / (3 * cbrt(x) ^ 2)"),
    ("exp", "exp(x)"),
    ("exp2", "exp2(x) * log(2)"),
    ("expm1", "exp(x)"),
    ("log", "1 / x"),
    ("log2", "1 / (x * log(2))"),
    ("log10", "1 / (x * log(10))"),
    ("log1p", "1 / (1 + x)"),
    ("sin", "cos(x)"),
    ("cos", "-sin(x)"),
    ("tan", "1 + tan(x) ^ 2"),
    ("asin", "1 / sqrt(1 - x ^ 2)"),
    ("acos", "-1 / sqrt(1 - x ^ 2)"),
    ("atan", "1 / (1 + x ^ 2)"),
    ("sinh", "cosh(x)"),
    ("cosh", "sinh(x)"),
    ("tanh", "1 - tanh(x) ^ 2"),
    ("asinh", "1 / sqrt(x ^ 2 + 1)"),
    ("acosh", "1 / sqrt(x ^ 2 - 1)"),
    ("atanh", "1 / (1 - x ^ 2)"),
];

const BASE_BINARY: &[(&str, &str, &str)] = &[
    ("+", "1", "1"),
    ("-", "1", "-1"),
    ("*", "y", "x"),
    ("/", "1 / y", "-x / y ^ 2"),
    ("^", "y * x ^ (y - 1)", "x ^ y * log(x)"),
    ("atan", "y / (x ^ 2 + y ^ 2)", "-x / (x ^ 2 + y ^ 2)"),
    ("hypot", "x / hypot(x, y)", "y / hypot(x, y)"),
];

const SPECIAL_UNARY: &[(&str, &str)] = &[
    ("erf", "2 / sqrt(pi) * exp(-x ^ 2)"),
    ("erfc", "-2 / sqrt(pi) * exp(-x ^ 2)"),
];

impl Catalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> Self {
        let base_unary = BASE_UNARY
            .iter()
            .map(|&(name, dfdx)| CatalogEntry::new(BASE_NAMESPACE, name, 1, [dfdx]));
        let base_binary = BASE_BINARY
            .iter()
            .map(|&(name, dfdx, dfdy)| CatalogEntry::new(BASE_NAMESPACE, name, 2, [dfdx, dfdy]));
        let special = SPECIAL_UNARY
            .iter()
            .map(|&(name, dfdx)| CatalogEntry::new("special", name, 1, [dfdx]));

        base_unary.chain(base_binary).chain(special).collect()
    }

    /// Append an entry; order is kept.
    pub fn push(&mut self, entry: CatalogEntry) {
        self.entries.push(entry);
    }

    /// All entries, in insertion order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, CatalogEntry> {
        self.entries.iter()
    }

    /// Number of entries, across all namespaces.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load a catalog from a JSON array of entries.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render as a pretty-printed JSON array of entries.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl FromIterator<CatalogEntry> for Catalog {
    fn from_iter<I: IntoIterator<Item = CatalogEntry>>(iter: I) -> Self {
        Catalog {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<CatalogEntry> for Catalog {
    fn extend<I: IntoIterator<Item = CatalogEntry>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a CatalogEntry;
    type IntoIter = std::slice::Iter<'a, CatalogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
