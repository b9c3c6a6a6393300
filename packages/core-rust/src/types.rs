//! Value kind descriptors and unit schema types.
//!
//! Defines [`DataType`], the enumerated value kind a backend uses to choose
//! physical column types, and [`UnitKeys`], the insertion-ordered mapping of
//! key name to [`DataType`] that makes up a unit's schema.

use serde::{Deserialize, Serialize};

/// Enumerated value kind for a unit key.
///
/// Purely descriptive: the storage layer treats all values as text and
/// backends consult the kind (and its length bound) when choosing physical
/// column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    /// Integer-number value.
    Integer,
    /// Real-number value.
    Real,
    /// Text of maximum length of 255 characters.
    TinyText,
    /// Text of maximum length of 1023 characters.
    MediumText,
    /// Text of maximum length of 10119 characters.
    LongText,
    /// Text of unlimited length.
    Text,
}

impl DataType {
    /// Maximum stored length in characters, or `None` when unbounded.
    ///
    /// Number kinds are unbounded from the storage layer's point of view.
    #[must_use]
    pub fn max_length(self) -> Option<usize> {
        match self {
            Self::TinyText => Some(255),
            Self::MediumText => Some(1023),
            Self::LongText => Some(10_119),
            Self::Integer | Self::Real | Self::Text => None,
        }
    }
}

/// Insertion-ordered mapping of key name to [`DataType`].
///
/// A unit's schema: each key name appears exactly once, in the order it was
/// first inserted. Exactly one of the keys is designated the unit's primary
/// key, tracked by the owning unit rather than here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitKeys {
    columns: Vec<(String, DataType)>,
}

impl UnitKeys {
    /// Creates an empty key set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a key set from `(name, type)` pairs, in order.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, DataType)>,
        K: Into<String>,
    {
        let mut keys = Self::new();
        for (name, data_type) in pairs {
            keys.insert(name, data_type);
        }
        keys
    }

    /// Inserts a key, replacing the type in place if the name is present.
    ///
    /// # Panics
    ///
    /// Panics if the key name is empty after trimming.
    pub fn insert(&mut self, key: impl Into<String>, data_type: DataType) {
        let key = key.into();
        assert!(!key.trim().is_empty(), "unit key name must be non-empty");

        if let Some(slot) = self.columns.iter_mut().find(|(name, _)| *name == key) {
            slot.1 = data_type;
        } else {
            self.columns.push((key, data_type));
        }
    }

    /// Type of the named key, or `None` if absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<DataType> {
        self.columns
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, data_type)| *data_type)
    }

    /// Whether the named key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.columns.iter().any(|(name, _)| name == key)
    }

    /// Key names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// `(name, type)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, DataType)> {
        self.columns
            .iter()
            .map(|(name, data_type)| (name.as_str(), *data_type))
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the key set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_length_bounds_text_kinds_only() {
        assert_eq!(DataType::TinyText.max_length(), Some(255));
        assert_eq!(DataType::MediumText.max_length(), Some(1023));
        assert_eq!(DataType::LongText.max_length(), Some(10_119));
        assert_eq!(DataType::Text.max_length(), None);
        assert_eq!(DataType::Integer.max_length(), None);
        assert_eq!(DataType::Real.max_length(), None);
    }

    #[test]
    fn insert_preserves_insertion_order() {
        let mut keys = UnitKeys::new();
        keys.insert("username", DataType::TinyText);
        keys.insert("salt", DataType::MediumText);
        keys.insert("password", DataType::LongText);

        let names: Vec<&str> = keys.names().collect();
        assert_eq!(names, vec!["username", "salt", "password"]);
    }

    #[test]
    fn insert_replaces_type_in_place() {
        let mut keys = UnitKeys::new();
        keys.insert("login_session", DataType::TinyText);
        keys.insert("email", DataType::MediumText);
        keys.insert("login_session", DataType::Text);

        assert_eq!(keys.len(), 2);
        assert_eq!(keys.get("login_session"), Some(DataType::Text));
        let names: Vec<&str> = keys.names().collect();
        assert_eq!(names, vec!["login_session", "email"]);
    }

    #[test]
    fn get_and_contains_reflect_membership() {
        let keys = UnitKeys::from_pairs([("id", DataType::Integer)]);

        assert!(keys.contains("id"));
        assert_eq!(keys.get("id"), Some(DataType::Integer));
        assert!(!keys.contains("missing"));
        assert_eq!(keys.get("missing"), None);
    }

    #[test]
    #[should_panic(expected = "non-empty")]
    fn blank_key_name_panics() {
        let mut keys = UnitKeys::new();
        keys.insert("   ", DataType::Text);
    }
}
