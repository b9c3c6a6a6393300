//! Passive listeners notified after mutating storage operations.
//!
//! Defines [`StorageObserver`], the callback interface invoked by
//! [`WrapperStorage`](super::WrapperStorage) after each successful mutation
//! and before close, and [`CompositeObserver`], the wrapper's internal
//! fan-out over the registered observer list.

use std::sync::Arc;

use gridstore_core::{DataType, Entry, Selector, UnitKeys};

/// Observer of mutating storage operations.
///
/// Every method has a no-op default, so implementations override only the
/// events they care about. Callbacks run synchronously on the caller's task,
/// in registration order, after the leading backend has accepted the
/// mutation — observers must not block significantly or they stall the
/// caller.
///
/// Used as `Arc<dyn StorageObserver>`.
#[allow(unused_variables)]
pub trait StorageObserver: Send + Sync {
    /// Called immediately before the storage closes.
    fn before_close(&self) {}

    /// Called after a unit is created.
    fn after_create_unit(&self, unit: &str, keys: &UnitKeys) {}

    /// Called after a unit is renamed.
    fn after_rename_unit(&self, unit: &str, new_name: &str) {}

    /// Called after a unit's rows are cleared.
    fn after_erase_unit(&self, unit: &str) {}

    /// Called after a unit is dropped.
    fn after_remove_unit(&self, unit: &str) {}

    /// Called after a key is added to a unit's schema.
    fn after_add_key(&self, unit: &str, key: &str, data_type: DataType) {}

    /// Called after a row is appended.
    fn after_add_entry(&self, unit: &str, entry: &Entry) {}

    /// Called after a partial update is applied.
    fn after_update_entries(&self, unit: &str, subset: &Entry, selector: &Selector) {}

    /// Called after matching rows are removed.
    fn after_remove_entries(&self, unit: &str, selector: &Selector) {}
}

/// Fan-out over a list of observers, notified in registration order.
///
/// Registration is identity-based: adding the same `Arc` twice keeps a
/// single registration.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn StorageObserver>>,
}

impl CompositeObserver {
    /// Creates an empty composite.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer unless the same instance is already registered.
    pub fn add(&mut self, observer: Arc<dyn StorageObserver>) {
        if !self.contains(&observer) {
            self.observers.push(observer);
        }
    }

    /// Unregisters an observer by instance identity.
    pub fn remove(&mut self, observer: &Arc<dyn StorageObserver>) {
        self.observers.retain(|o| !Arc::ptr_eq(o, observer));
    }

    /// Unregisters every observer.
    pub fn clear(&mut self) {
        self.observers.clear();
    }

    /// Whether the given instance is registered.
    #[must_use]
    pub fn contains(&self, observer: &Arc<dyn StorageObserver>) -> bool {
        self.observers.iter().any(|o| Arc::ptr_eq(o, observer))
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether no observers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl StorageObserver for CompositeObserver {
    fn before_close(&self) {
        for observer in &self.observers {
            observer.before_close();
        }
    }

    fn after_create_unit(&self, unit: &str, keys: &UnitKeys) {
        for observer in &self.observers {
            observer.after_create_unit(unit, keys);
        }
    }

    fn after_rename_unit(&self, unit: &str, new_name: &str) {
        for observer in &self.observers {
            observer.after_rename_unit(unit, new_name);
        }
    }

    fn after_erase_unit(&self, unit: &str) {
        for observer in &self.observers {
            observer.after_erase_unit(unit);
        }
    }

    fn after_remove_unit(&self, unit: &str) {
        for observer in &self.observers {
            observer.after_remove_unit(unit);
        }
    }

    fn after_add_key(&self, unit: &str, key: &str, data_type: DataType) {
        for observer in &self.observers {
            observer.after_add_key(unit, key, data_type);
        }
    }

    fn after_add_entry(&self, unit: &str, entry: &Entry) {
        for observer in &self.observers {
            observer.after_add_entry(unit, entry);
        }
    }

    fn after_update_entries(&self, unit: &str, subset: &Entry, selector: &Selector) {
        for observer in &self.observers {
            observer.after_update_entries(unit, subset, selector);
        }
    }

    fn after_remove_entries(&self, unit: &str, selector: &Selector) {
        for observer in &self.observers {
            observer.after_remove_entries(unit, selector);
        }
    }
}
