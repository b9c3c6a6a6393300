//! Row representation for the storage layer.
//!
//! Defines [`Entry`], an insertion-ordered mapping of key name to string
//! value, and [`Datum`], the borrowed key/value pair yielded by entry
//! iteration. Entries are the unit of data exchanged with every storage
//! operation; any entry handed out by a read operation is a deep copy, so
//! caller mutation can never reach into backend or cache state.

use serde::{Deserialize, Serialize};

/// One row, as an insertion-ordered mapping of key name to string value.
///
/// Keys are non-empty (after trimming) and appear at most once, in the order
/// they were first put. Absence of a key is distinguishable from a present
/// but empty value: [`get`](Entry::get) returns `None` only for absent keys,
/// and [`contains_key`](Entry::contains_key) is the presence check.
///
/// `Clone` performs a deep copy; mutating a clone never affects the source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    fields: Vec<(String, String)>,
}

impl Entry {
    /// Creates an empty entry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an entry from `(key, value)` pairs, in order.
    ///
    /// # Panics
    ///
    /// Panics if any key is empty after trimming.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut entry = Self::new();
        for (key, value) in pairs {
            entry.put(key, value);
        }
        entry
    }

    /// Value of the named key, or `None` if the key is absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Sets a key's value, replacing in place if the key is present.
    ///
    /// Replacement preserves the key's original position in field order.
    ///
    /// # Panics
    ///
    /// Panics if the key is empty after trimming.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        assert!(!key.trim().is_empty(), "entry key must be non-empty");

        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(name, _)| *name == key) {
            slot.1 = value;
        } else {
            self.fields.push((key, value));
        }
    }

    /// Whether the named key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(name, _)| name == key)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the entry has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields as [`Datum`] items, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Datum<'_>> {
        self.fields.iter().map(|(key, value)| Datum { key, value })
    }

    /// Copy of this entry restricted to the named keys.
    ///
    /// Fields appear in the order the keys are requested; requested keys
    /// absent from the entry are skipped.
    #[must_use]
    pub fn project(&self, keys: &[String]) -> Self {
        let mut projected = Self::new();
        for key in keys {
            if let Some(value) = self.get(key) {
                projected.put(key.clone(), value.to_string());
            }
        }
        projected
    }

    /// Overlays every field of `subset` onto this entry.
    ///
    /// Keys already present are replaced in place; new keys are appended.
    /// This is the partial-update payload semantics: only the keys present
    /// in the subset are touched.
    pub fn apply(&mut self, subset: &Entry) {
        for datum in subset.iter() {
            self.put(datum.key, datum.value);
        }
    }
}

impl<'a> IntoIterator for &'a Entry {
    type Item = Datum<'a>;
    type IntoIter = std::vec::IntoIter<Datum<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter().collect::<Vec<_>>().into_iter()
    }
}

/// A single immutable key/value pair borrowed from an [`Entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datum<'a> {
    /// Field name.
    pub key: &'a str,
    /// Field value.
    pub value: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_is_independently_mutable() {
        let original = Entry::from_pairs([("username", "alice"), ("email", "a@example.com")]);

        let mut copy = original.clone();
        assert_eq!(copy, original);

        copy.put("username", "mallory");
        copy.put("extra", "field");

        assert_eq!(original.get("username"), Some("alice"));
        assert!(!original.contains_key("extra"));
    }

    #[test]
    fn absent_key_is_distinct_from_empty_value() {
        let entry = Entry::from_pairs([("salt", "")]);

        assert!(entry.contains_key("salt"));
        assert_eq!(entry.get("salt"), Some(""));
        assert!(!entry.contains_key("password"));
        assert_eq!(entry.get("password"), None);
    }

    #[test]
    fn put_replaces_in_place_preserving_order() {
        let mut entry = Entry::from_pairs([("a", "1"), ("b", "2"), ("c", "3")]);
        entry.put("b", "20");

        let keys: Vec<&str> = entry.iter().map(|d| d.key).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(entry.get("b"), Some("20"));
    }

    #[test]
    fn iteration_yields_data_in_insertion_order() {
        let entry = Entry::from_pairs([("z", "26"), ("a", "1"), ("m", "13")]);

        let pairs: Vec<(&str, &str)> = entry.iter().map(|d| (d.key, d.value)).collect();
        assert_eq!(pairs, vec![("z", "26"), ("a", "1"), ("m", "13")]);

        let mut looped = Vec::new();
        for datum in &entry {
            looped.push(datum.key);
        }
        assert_eq!(looped, vec!["z", "a", "m"]);
    }

    #[test]
    fn project_keeps_only_requested_keys() {
        let entry = Entry::from_pairs([("username", "alice"), ("salt", "s"), ("hash", "h")]);

        let projected = entry.project(&["hash".to_string(), "username".to_string()]);

        let keys: Vec<&str> = projected.iter().map(|d| d.key).collect();
        assert_eq!(keys, vec!["hash", "username"]);
        assert!(!projected.contains_key("salt"));
    }

    #[test]
    fn project_skips_absent_keys() {
        let entry = Entry::from_pairs([("a", "1")]);
        let projected = entry.project(&["a".to_string(), "missing".to_string()]);

        assert_eq!(projected.len(), 1);
        assert_eq!(projected.get("a"), Some("1"));
    }

    #[test]
    fn apply_overlays_only_subset_keys() {
        let mut row = Entry::from_pairs([("username", "alice"), ("hash", "old"), ("ip", "1.2.3.4")]);
        let subset = Entry::from_pairs([("hash", "new"), ("last_active", "12345")]);

        row.apply(&subset);

        assert_eq!(row.get("hash"), Some("new"));
        assert_eq!(row.get("username"), Some("alice"));
        assert_eq!(row.get("ip"), Some("1.2.3.4"));
        assert_eq!(row.get("last_active"), Some("12345"));
    }

    #[test]
    #[should_panic(expected = "non-empty")]
    fn blank_key_panics() {
        let mut entry = Entry::new();
        entry.put("  ", "value");
    }
}
