//! Row-filtering predicate algebra.
//!
//! Defines [`Selector`], the composable boolean predicate evaluated against
//! an [`Entry`], and [`Condition`], the comparison kind of a leaf. The same
//! selector value has two evaluation paths: the in-memory evaluator here
//! ([`Selector::matches`]) and a backend-native translation (for
//! query-capable backends). Both paths must select identical row sets for
//! any (selector, entry) pair; that equivalence is the correctness invariant
//! the whole storage design rests on.

use serde::{Deserialize, Serialize};

use crate::entry::Entry;

/// Comparison kind of a selector leaf.
///
/// All comparisons are case-sensitive and operate on the string value of
/// the named key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    /// Field value equals the literal.
    Equals,
    /// Field value starts with the literal.
    StartsWith,
    /// Field value ends with the literal.
    EndsWith,
    /// Field value contains the literal.
    Contains,
}

impl Condition {
    fn eval(self, field: &str, literal: &str) -> bool {
        match self {
            Self::Equals => field == literal,
            Self::StartsWith => field.starts_with(literal),
            Self::EndsWith => field.ends_with(literal),
            Self::Contains => field.contains(literal),
        }
    }
}

/// Composable row-filtering predicate over an [`Entry`].
///
/// Built recursively from constants, key/literal comparison leaves, and the
/// negation/conjunction/disjunction combinators. Backends translate a
/// selector into their native query mechanism; in-memory evaluation uses
/// [`matches`](Selector::matches) directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Selector {
    /// Always-true / always-false constant.
    Constant(bool),
    /// Comparison of the named key's value against a literal.
    Condition {
        /// Name of the key the comparison reads.
        key: String,
        /// Comparison kind.
        op: Condition,
        /// Literal the field value is compared against.
        value: String,
    },
    /// Logical negation.
    Not(Box<Selector>),
    /// Logical conjunction, short-circuit.
    And(Box<Selector>, Box<Selector>),
    /// Logical disjunction, short-circuit.
    Or(Box<Selector>, Box<Selector>),
}

impl Selector {
    /// Constant selector: matches everything (`true`) or nothing (`false`).
    #[must_use]
    pub fn constant(value: bool) -> Self {
        Self::Constant(value)
    }

    /// Equality leaf: the named key's value equals `value`.
    ///
    /// # Panics
    ///
    /// Panics if the key is empty after trimming.
    #[must_use]
    pub fn eq(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::condition(key, Condition::Equals, value)
    }

    /// Prefix leaf: the named key's value starts with `value`.
    ///
    /// # Panics
    ///
    /// Panics if the key is empty after trimming.
    #[must_use]
    pub fn starts_with(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::condition(key, Condition::StartsWith, value)
    }

    /// Suffix leaf: the named key's value ends with `value`.
    ///
    /// # Panics
    ///
    /// Panics if the key is empty after trimming.
    #[must_use]
    pub fn ends_with(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::condition(key, Condition::EndsWith, value)
    }

    /// Substring leaf: the named key's value contains `value`.
    ///
    /// # Panics
    ///
    /// Panics if the key is empty after trimming.
    #[must_use]
    pub fn contains(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::condition(key, Condition::Contains, value)
    }

    /// Comparison leaf with an explicit [`Condition`].
    ///
    /// # Panics
    ///
    /// Panics if the key is empty after trimming.
    #[must_use]
    pub fn condition(key: impl Into<String>, op: Condition, value: impl Into<String>) -> Self {
        let key = key.into();
        assert!(!key.trim().is_empty(), "selector key must be non-empty");
        Self::Condition {
            key,
            op,
            value: value.into(),
        }
    }

    /// Logical negation of this selector.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Conjunction: both this selector and `other` must match.
    #[must_use]
    pub fn and(self, other: Selector) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Disjunction: this selector or `other` must match.
    #[must_use]
    pub fn or(self, other: Selector) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Evaluates this selector against an entry.
    ///
    /// Constants short-circuit; comparisons read the named key's value
    /// case-sensitively and evaluate to `false` when the key is absent;
    /// combinators recurse with standard boolean short-circuit.
    #[must_use]
    pub fn matches(&self, entry: &Entry) -> bool {
        match self {
            Self::Constant(value) => *value,
            Self::Condition { key, op, value } => entry
                .get(key)
                .is_some_and(|field| op.eval(field, value)),
            Self::Not(inner) => !inner.matches(entry),
            Self::And(a, b) => a.matches(entry) && b.matches(entry),
            Self::Or(a, b) => a.matches(entry) || b.matches(entry),
        }
    }
}
