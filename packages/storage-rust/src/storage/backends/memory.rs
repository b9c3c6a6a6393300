//! In-memory [`Storage`] implementation.
//!
//! Reference backend holding every unit in process memory behind a
//! [`RwLock`]. Suitable for tests, ephemeral data, and as the executable
//! model of the contract semantics backends must honor: `None` versus
//! empty-list select results, deep-copied reads, selector filtering via
//! [`Selector::matches`], and autobatch queueing.

use std::collections::BTreeMap;

use async_trait::async_trait;
use gridstore_core::{DataType, Entry, Selector, UnitKeys};
use parking_lot::RwLock;

use crate::storage::contract::Storage;
use crate::storage::error::{StorageError, StorageResult};

/// One unit's schema and rows.
#[derive(Debug, Clone)]
struct UnitData {
    keys: UnitKeys,
    primary_key: String,
    entries: Vec<Entry>,
}

/// A queued mutation, applied when the batch executes.
#[derive(Debug, Clone)]
enum Mutation {
    CreateUnit {
        unit: String,
        keys: UnitKeys,
        primary_key: String,
    },
    RenameUnit {
        unit: String,
        new_name: String,
    },
    EraseUnit {
        unit: String,
    },
    RemoveUnit {
        unit: String,
    },
    AddKey {
        unit: String,
        key: String,
        data_type: DataType,
    },
    AddEntry {
        unit: String,
        entry: Entry,
    },
    UpdateEntries {
        unit: String,
        subset: Entry,
        selector: Selector,
    },
    RemoveEntries {
        unit: String,
        selector: Selector,
    },
}

#[derive(Default)]
struct MemoryState {
    connected: bool,
    autobatch: bool,
    units: BTreeMap<String, UnitData>,
    batch: Vec<Mutation>,
}

/// In-memory storage over [`RwLock`]-guarded state.
///
/// Units live in a `BTreeMap` so `unit_names` ordering is deterministic.
/// All operations are synchronous under the lock; the async signatures
/// exist to satisfy the backend contract.
#[derive(Default)]
pub struct MemoryStorage {
    state: RwLock<MemoryState>,
}

impl MemoryStorage {
    /// Creates a new, disconnected `MemoryStorage` with no units.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the mutation when autobatch is on, applies it otherwise.
    fn mutate(&self, mutation: Mutation) -> StorageResult<()> {
        let mut state = self.state.write();
        ensure_connected(&state)?;
        if state.autobatch {
            state.batch.push(mutation);
            Ok(())
        } else {
            apply(&mut state.units, mutation)
        }
    }
}

fn ensure_connected(state: &MemoryState) -> StorageResult<()> {
    if state.connected {
        Ok(())
    } else {
        Err(StorageError::NotConnected)
    }
}

/// Applies one mutation to the unit map, validating as it goes.
fn apply(units: &mut BTreeMap<String, UnitData>, mutation: Mutation) -> StorageResult<()> {
    match mutation {
        Mutation::CreateUnit {
            unit,
            keys,
            primary_key,
        } => {
            if unit.trim().is_empty() {
                return Err(StorageError::InvalidArgument(
                    "unit name must be non-empty".into(),
                ));
            }
            if units.contains_key(&unit) {
                return Err(StorageError::UnitExists(unit));
            }
            if !keys.contains(&primary_key) {
                return Err(StorageError::InvalidArgument(format!(
                    "primary key {primary_key:?} is not among the unit's keys"
                )));
            }
            units.insert(
                unit,
                UnitData {
                    keys,
                    primary_key,
                    entries: Vec::new(),
                },
            );
            Ok(())
        }
        Mutation::RenameUnit { unit, new_name } => {
            if new_name.trim().is_empty() {
                return Err(StorageError::InvalidArgument(
                    "unit name must be non-empty".into(),
                ));
            }
            if unit == new_name {
                return Err(StorageError::InvalidArgument(
                    "rename target equals the current unit name".into(),
                ));
            }
            if units.contains_key(&new_name) {
                return Err(StorageError::UnitExists(new_name));
            }
            let data = units
                .remove(&unit)
                .ok_or(StorageError::UnknownUnit(unit))?;
            units.insert(new_name, data);
            Ok(())
        }
        Mutation::EraseUnit { unit } => {
            let data = units
                .get_mut(&unit)
                .ok_or(StorageError::UnknownUnit(unit))?;
            data.entries.clear();
            Ok(())
        }
        Mutation::RemoveUnit { unit } => {
            units
                .remove(&unit)
                .map(|_| ())
                .ok_or(StorageError::UnknownUnit(unit))
        }
        Mutation::AddKey {
            unit,
            key,
            data_type,
        } => {
            if key.trim().is_empty() {
                return Err(StorageError::InvalidArgument(
                    "key name must be non-empty".into(),
                ));
            }
            let data = units
                .get_mut(&unit)
                .ok_or_else(|| StorageError::UnknownUnit(unit.clone()))?;
            if data.keys.contains(&key) {
                return Err(StorageError::KeyExists { unit, key });
            }
            // Existing rows observe the new key with an empty value.
            for entry in &mut data.entries {
                entry.put(key.clone(), "");
            }
            data.keys.insert(key, data_type);
            Ok(())
        }
        Mutation::AddEntry { unit, entry } => {
            let data = units
                .get_mut(&unit)
                .ok_or_else(|| StorageError::UnknownUnit(unit.clone()))?;
            for datum in entry.iter() {
                if !data.keys.contains(datum.key) {
                    return Err(StorageError::UnknownKey {
                        unit,
                        key: datum.key.to_string(),
                    });
                }
            }
            // Normalize to schema order, backfilling absent keys empty.
            let mut row = Entry::new();
            for (name, _) in data.keys.iter() {
                row.put(name, entry.get(name).unwrap_or(""));
            }
            data.entries.push(row);
            Ok(())
        }
        Mutation::UpdateEntries {
            unit,
            subset,
            selector,
        } => {
            let data = units
                .get_mut(&unit)
                .ok_or_else(|| StorageError::UnknownUnit(unit.clone()))?;
            for datum in subset.iter() {
                if !data.keys.contains(datum.key) {
                    return Err(StorageError::UnknownKey {
                        unit,
                        key: datum.key.to_string(),
                    });
                }
            }
            for entry in &mut data.entries {
                if selector.matches(entry) {
                    entry.apply(&subset);
                }
            }
            Ok(())
        }
        Mutation::RemoveEntries { unit, selector } => {
            let data = units
                .get_mut(&unit)
                .ok_or(StorageError::UnknownUnit(unit))?;
            data.entries.retain(|entry| !selector.matches(entry));
            Ok(())
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn connect(&self) -> StorageResult<()> {
        let mut state = self.state.write();
        if state.connected {
            return Err(StorageError::AlreadyConnected);
        }
        state.connected = true;
        Ok(())
    }

    async fn is_connected(&self) -> StorageResult<bool> {
        Ok(self.state.read().connected)
    }

    async fn ping(&self) -> StorageResult<()> {
        // A liveness probe reopens a dropped connection rather than failing.
        let mut state = self.state.write();
        state.connected = true;
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        let mut state = self.state.write();
        ensure_connected(&state)?;
        state.connected = false;
        state.batch.clear();
        Ok(())
    }

    async fn unit_names(&self) -> StorageResult<Vec<String>> {
        let state = self.state.read();
        ensure_connected(&state)?;
        Ok(state.units.keys().cloned().collect())
    }

    async fn keys(&self, unit: &str) -> StorageResult<Option<UnitKeys>> {
        let state = self.state.read();
        ensure_connected(&state)?;
        Ok(state.units.get(unit).map(|data| data.keys.clone()))
    }

    async fn primary_key(&self, unit: &str) -> StorageResult<Option<String>> {
        let state = self.state.read();
        ensure_connected(&state)?;
        Ok(state.units.get(unit).map(|data| data.primary_key.clone()))
    }

    async fn select_entries(
        &self,
        unit: &str,
        keys: Option<&[String]>,
        selector: Option<&Selector>,
    ) -> StorageResult<Option<Vec<Entry>>> {
        let state = self.state.read();
        ensure_connected(&state)?;
        let Some(data) = state.units.get(unit) else {
            return Ok(None);
        };

        let rows = data
            .entries
            .iter()
            .filter(|entry| selector.is_none_or(|s| s.matches(entry)))
            .map(|entry| keys.map_or_else(|| entry.clone(), |names| entry.project(names)))
            .collect();
        Ok(Some(rows))
    }

    async fn create_unit(
        &self,
        unit: &str,
        keys: &UnitKeys,
        primary_key: &str,
    ) -> StorageResult<()> {
        self.mutate(Mutation::CreateUnit {
            unit: unit.to_string(),
            keys: keys.clone(),
            primary_key: primary_key.to_string(),
        })
    }

    async fn rename_unit(&self, unit: &str, new_name: &str) -> StorageResult<()> {
        self.mutate(Mutation::RenameUnit {
            unit: unit.to_string(),
            new_name: new_name.to_string(),
        })
    }

    async fn erase_unit(&self, unit: &str) -> StorageResult<()> {
        self.mutate(Mutation::EraseUnit {
            unit: unit.to_string(),
        })
    }

    async fn remove_unit(&self, unit: &str) -> StorageResult<()> {
        self.mutate(Mutation::RemoveUnit {
            unit: unit.to_string(),
        })
    }

    async fn add_key(&self, unit: &str, key: &str, data_type: DataType) -> StorageResult<()> {
        self.mutate(Mutation::AddKey {
            unit: unit.to_string(),
            key: key.to_string(),
            data_type,
        })
    }

    async fn add_entry(&self, unit: &str, entry: &Entry) -> StorageResult<()> {
        self.mutate(Mutation::AddEntry {
            unit: unit.to_string(),
            entry: entry.clone(),
        })
    }

    async fn update_entries(
        &self,
        unit: &str,
        subset: &Entry,
        selector: &Selector,
    ) -> StorageResult<()> {
        self.mutate(Mutation::UpdateEntries {
            unit: unit.to_string(),
            subset: subset.clone(),
            selector: selector.clone(),
        })
    }

    async fn remove_entries(&self, unit: &str, selector: &Selector) -> StorageResult<()> {
        self.mutate(Mutation::RemoveEntries {
            unit: unit.to_string(),
            selector: selector.clone(),
        })
    }

    fn is_autobatch_enabled(&self) -> bool {
        self.state.read().autobatch
    }

    async fn set_autobatch_enabled(&self, enabled: bool) {
        self.state.write().autobatch = enabled;
    }

    async fn execute_batch(&self) -> StorageResult<()> {
        let mut state = self.state.write();
        ensure_connected(&state)?;
        let pending = std::mem::take(&mut state.batch);
        // First failure aborts; the applied prefix stays, the rest is dropped.
        for mutation in pending {
            apply(&mut state.units, mutation)?;
        }
        Ok(())
    }

    async fn clear_batch(&self) -> StorageResult<()> {
        let mut state = self.state.write();
        ensure_connected(&state)?;
        state.batch.clear();
        Ok(())
    }
}
