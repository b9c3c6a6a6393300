//! The backend contract every concrete storage must satisfy.
//!
//! Defines [`Storage`], the uniform interface over heterogeneous backends
//! (relational SQL engines, flat-file stores, in-memory reference
//! implementations). The decorating [`WrapperStorage`](super::WrapperStorage)
//! implements the same trait, so callers hold one `Arc<dyn Storage>`
//! regardless of how many layers sit underneath.

use async_trait::async_trait;
use gridstore_core::{DataType, Entry, Selector, UnitKeys};

use super::error::StorageResult;

/// Backend-agnostic tabular storage.
///
/// A storage holds named *units* (logical tables), each with an ordered
/// key-to-[`DataType`] schema, one designated primary key, and a list of
/// [`Entry`] rows. All fallible operations report backend I/O failures and
/// usage violations through [`StorageError`](super::StorageError).
///
/// Contract rules implementations must honor:
///
/// - `select_entries` returns `None` for "unit does not exist" and
///   `Some(vec![])` for "unit exists, no matching rows" — the two are
///   distinct signals. `keys` and `primary_key` use the same `None`
///   convention.
/// - Every [`Entry`] handed out by a read is a deep copy, never an alias
///   into internal state.
/// - Selector filtering must agree with [`Selector::matches`]: the native
///   translation of a selector and the in-memory evaluator select identical
///   row sets for identical inputs.
/// - When autobatch is enabled, mutating calls queue until
///   [`execute_batch`](Storage::execute_batch). This is a backend
///   optimization hint only.
///
/// Used as `Arc<dyn Storage>`.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Opens the backend connection. Connecting twice is a usage error.
    async fn connect(&self) -> StorageResult<()>;

    /// Whether the backend connection is currently open.
    async fn is_connected(&self) -> StorageResult<bool>;

    /// Liveness check, safe to call on a possibly-stale connection.
    ///
    /// Implementations should attempt reconnection or report failure without
    /// treating a routine liveness probe as fatal.
    async fn ping(&self) -> StorageResult<()>;

    /// Closes the backend connection. Closing while disconnected is a usage
    /// error.
    async fn close(&self) -> StorageResult<()>;

    /// Names of every unit this storage holds.
    async fn unit_names(&self) -> StorageResult<Vec<String>>;

    /// The named unit's key schema, or `None` if the unit does not exist.
    async fn keys(&self, unit: &str) -> StorageResult<Option<UnitKeys>>;

    /// The named unit's primary key, or `None` if the unit does not exist.
    async fn primary_key(&self, unit: &str) -> StorageResult<Option<String>>;

    /// Reads rows from a unit with optional column projection and row
    /// filtering.
    ///
    /// `keys = None` selects every column; `selector = None` selects every
    /// row. Returns `None` if the unit does not exist, `Some(vec![])` if it
    /// exists with no matching rows.
    async fn select_entries(
        &self,
        unit: &str,
        keys: Option<&[String]>,
        selector: Option<&Selector>,
    ) -> StorageResult<Option<Vec<Entry>>>;

    /// Reads every row and column of a unit.
    async fn select_all(&self, unit: &str) -> StorageResult<Option<Vec<Entry>>> {
        self.select_entries(unit, None, None).await
    }

    /// Creates a unit. Fails if a unit with that name exists or if
    /// `primary_key` is not one of the supplied keys. No implicit creation
    /// happens anywhere else.
    async fn create_unit(
        &self,
        unit: &str,
        keys: &UnitKeys,
        primary_key: &str,
    ) -> StorageResult<()>;

    /// Renames a unit. Renaming to the current name is a usage error.
    async fn rename_unit(&self, unit: &str, new_name: &str) -> StorageResult<()>;

    /// Clears a unit's rows, keeping its schema.
    async fn erase_unit(&self, unit: &str) -> StorageResult<()>;

    /// Drops a unit entirely. Removing a nonexistent unit is an error.
    async fn remove_unit(&self, unit: &str) -> StorageResult<()>;

    /// Adds a key to a unit's schema. Existing rows observe the new key with
    /// an empty value. Adding a key the unit already has is an error.
    async fn add_key(&self, unit: &str, key: &str, data_type: DataType) -> StorageResult<()>;

    /// Appends a row. Keys absent from the entry are stored empty; keys
    /// outside the unit's schema are an error.
    async fn add_entry(&self, unit: &str, entry: &Entry) -> StorageResult<()>;

    /// Applies the keys present in `subset` to every row matching
    /// `selector`, leaving other keys and non-matching rows untouched.
    async fn update_entries(
        &self,
        unit: &str,
        subset: &Entry,
        selector: &Selector,
    ) -> StorageResult<()>;

    /// Removes every row matching `selector`.
    async fn remove_entries(&self, unit: &str, selector: &Selector) -> StorageResult<()>;

    /// Whether mutating calls currently queue instead of applying.
    fn is_autobatch_enabled(&self) -> bool;

    /// Turns autobatching on or off.
    ///
    /// Async because decorators coordinate the flag across replicas.
    async fn set_autobatch_enabled(&self, enabled: bool);

    /// Applies every queued mutation, in queue order.
    async fn execute_batch(&self) -> StorageResult<()>;

    /// Discards every queued mutation without applying it.
    async fn clear_batch(&self) -> StorageResult<()>;
}
