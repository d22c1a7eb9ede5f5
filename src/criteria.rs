//! Neutral Search Criteria
//!
//! `TigerStyle`: Pure data, no I/O. The backend-independent description of
//! a search, sort and pagination request. Each backend owns its own
//! translator; only this input shape is shared.
//!
//! Field order is insertion order, which the translators preserve.

use crate::value::Value;

// =============================================================================
// Conditions
// =============================================================================

/// A single per-field search condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Direct equality on the field
    Equals(Value),
    /// Regular-expression match on the field
    Matches(String),
    /// Two-sided numeric range.
    ///
    /// A bound of `0.0` counts as absent, mirroring the contract's
    /// truthiness rule. With both bounds present the document backend
    /// emits independent exclusive comparisons while the relational
    /// backend emits one inclusive `BETWEEN`; callers must not rely on
    /// boundary-inclusive semantics.
    Range {
        /// Lower bound (exclusive on the document backend)
        greater_than: Option<f64>,
        /// Upper bound (exclusive on the document backend)
        less_than: Option<f64>,
    },
}

impl Condition {
    /// Range with both bounds.
    #[must_use]
    pub fn range(greater_than: f64, less_than: f64) -> Self {
        Self::Range {
            greater_than: Some(greater_than),
            less_than: Some(less_than),
        }
    }

    /// Range with only a lower bound.
    #[must_use]
    pub fn greater_than(bound: f64) -> Self {
        Self::Range {
            greater_than: Some(bound),
            less_than: None,
        }
    }

    /// Range with only an upper bound.
    #[must_use]
    pub fn less_than(bound: f64) -> Self {
        Self::Range {
            greater_than: None,
            less_than: Some(bound),
        }
    }
}

/// A range bound is applied only when present and non-zero.
#[must_use]
pub(crate) fn bound_present(bound: Option<f64>) -> Option<f64> {
    bound.filter(|b| *b != 0.0)
}

// =============================================================================
// Search
// =============================================================================

/// An insertion-ordered set of per-field conditions.
///
/// A field carrying `None` is semantically equivalent to the field being
/// omitted entirely; it never reaches a translated query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Search {
    fields: Vec<(String, Option<Condition>)>,
}

impl Search {
    /// Create an empty search (matches everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition.
    #[must_use]
    pub fn equals(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.field(field, Condition::Equals(value.into()))
    }

    /// Add a pattern-match condition.
    #[must_use]
    pub fn matches(self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.field(field, Condition::Matches(pattern.into()))
    }

    /// Add any condition.
    #[must_use]
    pub fn field(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.fields.push((field.into(), Some(condition)));
        self
    }

    /// Add an explicitly unset field.
    ///
    /// Kept for parity with callers that build criteria from optional
    /// inputs; translators skip it.
    #[must_use]
    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.fields.push((field.into(), None));
        self
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Condition>)> {
        self.fields
            .iter()
            .map(|(field, condition)| (field.as_str(), condition.as_ref()))
    }

    /// True when no fields were supplied at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// =============================================================================
// Sort
// =============================================================================

/// Translated sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

impl SortOrder {
    /// Direction semantics: any value `<= 0` means descending.
    #[must_use]
    pub fn from_direction(direction: i32) -> Self {
        if direction > 0 {
            Self::Ascending
        } else {
            Self::Descending
        }
    }
}

/// An insertion-ordered sort specification.
///
/// The document backend honors every entry; the relational backend honors
/// only the first (documented asymmetry of the contract).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    keys: Vec<(String, i32)>,
}

impl Sort {
    /// Sort by one field; `1`/`-1` are the conventional directions.
    #[must_use]
    pub fn by(field: impl Into<String>, direction: i32) -> Self {
        Self {
            keys: vec![(field.into(), direction)],
        }
    }

    /// Add a secondary sort key.
    #[must_use]
    pub fn then(mut self, field: impl Into<String>, direction: i32) -> Self {
        self.keys.push((field.into(), direction));
        self
    }

    /// Iterate keys in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.keys.iter().map(|(field, dir)| (field.as_str(), *dir))
    }

    /// First sort key, if any.
    #[must_use]
    pub fn first(&self) -> Option<(&str, i32)> {
        self.keys.first().map(|(field, dir)| (field.as_str(), *dir))
    }
}
