//! Decorating storage that adds caching, mirroring, and change notification.
//!
//! [`WrapperStorage`] composes one authoritative ("leading") backend with
//! zero or more asynchronously-updated mirror backends and an optional
//! fully-preloaded in-memory cache. Reads come from the cache when enabled;
//! writes go to the leading backend first (its outcome is authoritative),
//! then to the cache, and are propagated to mirrors on a single background
//! worker that preserves submission order. Registered
//! [`StorageObserver`](super::StorageObserver)s are notified synchronously
//! after each successful mutation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use gridstore_core::{DataType, Entry, Selector, UnitKeys};
use tokio::sync::{oneshot, Mutex};
use tracing::{trace, warn};

use super::contract::Storage;
use super::error::{StorageError, StorageResult};
use super::observer::{CompositeObserver, StorageObserver};
use super::worker::{BackgroundRunnable, BackgroundWorker};

/// Cache strategy for a [`WrapperStorage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// No caching; every read delegates to the leading backend.
    Disabled,
    /// Full in-memory materialization per unit, populated by
    /// [`WrapperStorage::preload`]. Reads never touch the leading backend.
    Preloaded,
}

/// Per-unit materialized snapshot held by the preloaded cache.
#[derive(Debug, Clone)]
struct PreloadedUnitCache {
    keys: UnitKeys,
    primary_key: String,
    entries: Vec<Entry>,
}

/// A registered mirror: the secondary backend plus its unit-name remapping
/// table (leading name to mirror name; unmapped names pass through).
struct Mirror {
    storage: Arc<dyn Storage>,
    unit_mappings: HashMap<String, String>,
}

impl Mirror {
    fn mapped_unit(&self, unit: &str) -> String {
        self.unit_mappings
            .get(unit)
            .cloned()
            .unwrap_or_else(|| unit.to_string())
    }
}

/// A mutating operation replayed against a mirror's remapped unit.
enum MirrorOp {
    CreateUnit { keys: UnitKeys, primary_key: String },
    RenameUnit { new_name: String },
    EraseUnit,
    RemoveUnit,
    AddKey { key: String, data_type: DataType },
    AddEntry { entry: Entry },
    UpdateEntries { subset: Entry, selector: Selector },
    RemoveEntries { selector: Selector },
}

/// Work item for the mirror worker. `targets` snapshots the mirror registry
/// at submission time, so later registry changes never affect queued work.
enum MirrorTask {
    Unit {
        targets: Vec<(Arc<dyn Storage>, String)>,
        op: MirrorOp,
    },
    Ping {
        targets: Vec<Arc<dyn Storage>>,
    },
    ExecuteBatch {
        targets: Vec<Arc<dyn Storage>>,
    },
    Barrier(oneshot::Sender<()>),
}

/// Executes mirror tasks one at a time, in submission order.
///
/// Failures are logged at warning severity and swallowed: a mirror that
/// cannot keep up drifts from the leading backend, it never fails the
/// caller and never stops propagation to other mirrors.
struct MirrorRunnable;

#[async_trait]
impl BackgroundRunnable for MirrorRunnable {
    type Task = MirrorTask;

    async fn run(&mut self, task: MirrorTask) {
        match task {
            MirrorTask::Unit { targets, op } => {
                for (storage, unit) in &targets {
                    if let Err(err) = replay_on_mirror(storage.as_ref(), unit, &op).await {
                        warn!(unit = %unit, error = %err, "mirror propagation failed");
                    }
                }
            }
            MirrorTask::Ping { targets } => {
                for storage in &targets {
                    if let Err(err) = storage.ping().await {
                        warn!(error = %err, "storage ping failed");
                    }
                }
            }
            MirrorTask::ExecuteBatch { targets } => {
                for storage in &targets {
                    if let Err(err) = storage.execute_batch().await {
                        warn!(error = %err, "mirror batch execution failed");
                    }
                }
            }
            MirrorTask::Barrier(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

async fn replay_on_mirror(
    storage: &dyn Storage,
    unit: &str,
    op: &MirrorOp,
) -> StorageResult<()> {
    match op {
        MirrorOp::CreateUnit { keys, primary_key } => {
            storage.create_unit(unit, keys, primary_key).await
        }
        MirrorOp::RenameUnit { new_name } => storage.rename_unit(unit, new_name).await,
        MirrorOp::EraseUnit => storage.erase_unit(unit).await,
        MirrorOp::RemoveUnit => storage.remove_unit(unit).await,
        MirrorOp::AddKey { key, data_type } => {
            // Pre-provisioned mirrors may already carry a superset schema.
            let existing = storage.keys(unit).await?;
            if existing.is_some_and(|keys| keys.contains(key)) {
                return Ok(());
            }
            storage.add_key(unit, key, *data_type).await
        }
        MirrorOp::AddEntry { entry } => storage.add_entry(unit, entry).await,
        MirrorOp::UpdateEntries { subset, selector } => {
            storage.update_entries(unit, subset, selector).await
        }
        MirrorOp::RemoveEntries { selector } => storage.remove_entries(unit, selector).await,
    }
}

/// State guarded by the wrapper's single lock. Every public operation
/// acquires it for its full duration, which is what makes leading-backend
/// and cache mutations observe invocation order.
struct WrapperState {
    connected: bool,
    mirrors: Vec<Mirror>,
    observers: CompositeObserver,
    cache: BTreeMap<String, PreloadedUnitCache>,
}

/// Decorating [`Storage`] over one leading backend, with optional preloaded
/// caching, best-effort mirroring, and observer notification.
///
/// The background worker is created at construction and lives for the
/// object's lifetime; it exits once the wrapper is dropped and the task
/// channel closes. In-flight mirror work cannot be cancelled.
pub struct WrapperStorage {
    leading: Arc<dyn Storage>,
    cache_mode: CacheMode,
    state: Mutex<WrapperState>,
    worker: BackgroundWorker<MirrorRunnable>,
}

impl WrapperStorage {
    /// Creates a wrapper over `leading` with the given cache mode.
    #[must_use]
    pub fn new(leading: Arc<dyn Storage>, cache_mode: CacheMode) -> Self {
        Self {
            leading,
            cache_mode,
            state: Mutex::new(WrapperState {
                connected: false,
                mirrors: Vec::new(),
                observers: CompositeObserver::new(),
                cache: BTreeMap::new(),
            }),
            worker: BackgroundWorker::start(MirrorRunnable),
        }
    }

    /// The authoritative backend this wrapper decorates.
    #[must_use]
    pub fn leading(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.leading)
    }

    /// Replaces the entire cache content with fresh snapshots of the named
    /// units pulled from the leading backend.
    ///
    /// The only bulk-population path; callers invoke it after
    /// [`connect`](Storage::connect). A no-op when caching is disabled.
    /// Naming a unit the leading backend does not have is an error and
    /// leaves the cache partially populated.
    pub async fn preload(&self, units: &[&str]) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        trace!(?units, "wrapper preload");
        ensure_connected(&state)?;
        if self.cache_mode != CacheMode::Preloaded {
            return Ok(());
        }

        state.cache.clear();
        for unit in units {
            let keys = self
                .leading
                .keys(unit)
                .await?
                .ok_or_else(|| StorageError::UnknownUnit((*unit).to_string()))?;
            let primary_key = self
                .leading
                .primary_key(unit)
                .await?
                .ok_or_else(|| StorageError::UnknownUnit((*unit).to_string()))?;
            let entries = self
                .leading
                .select_all(unit)
                .await?
                .ok_or_else(|| StorageError::UnknownUnit((*unit).to_string()))?;

            state.cache.insert(
                (*unit).to_string(),
                PreloadedUnitCache {
                    keys,
                    primary_key,
                    entries,
                },
            );
        }
        Ok(())
    }

    /// Registers `storage` as a mirror with pass-through unit naming.
    pub async fn mirror_storage(&self, storage: Arc<dyn Storage>) {
        self.mirror_storage_mapped(storage, HashMap::new()).await;
    }

    /// Registers `storage` as a mirror with a unit-name remapping table
    /// (leading name to mirror name). Registering the same instance twice
    /// keeps the first registration.
    pub async fn mirror_storage_mapped(
        &self,
        storage: Arc<dyn Storage>,
        unit_mappings: HashMap<String, String>,
    ) {
        let mut state = self.state.lock().await;
        if !state
            .mirrors
            .iter()
            .any(|mirror| Arc::ptr_eq(&mirror.storage, &storage))
        {
            state.mirrors.push(Mirror {
                storage,
                unit_mappings,
            });
        }
    }

    /// Unregisters a mirror by instance identity. Work already queued for
    /// it still executes.
    pub async fn unmirror_storage(&self, storage: &Arc<dyn Storage>) {
        let mut state = self.state.lock().await;
        state
            .mirrors
            .retain(|mirror| !Arc::ptr_eq(&mirror.storage, storage));
    }

    /// Unregisters every mirror.
    pub async fn unmirror_all(&self) {
        self.state.lock().await.mirrors.clear();
    }

    /// Registers an observer unless the same instance already is.
    pub async fn add_observer(&self, observer: Arc<dyn StorageObserver>) {
        self.state.lock().await.observers.add(observer);
    }

    /// Unregisters an observer by instance identity.
    pub async fn delete_observer(&self, observer: &Arc<dyn StorageObserver>) {
        self.state.lock().await.observers.remove(observer);
    }

    /// Unregisters every observer.
    pub async fn delete_observers(&self) {
        self.state.lock().await.observers.clear();
    }

    /// Number of registered observers.
    pub async fn count_observers(&self) -> usize {
        self.state.lock().await.observers.len()
    }

    /// Completes once every previously submitted mirror task has executed.
    ///
    /// The synchronization point for tests and orderly shutdown; there is
    /// no other way to await mirror propagation.
    pub async fn flush_mirrors(&self) {
        let (ack, done) = oneshot::channel();
        self.submit(MirrorTask::Barrier(ack)).await;
        let _ = done.await;
    }

    fn cache_enabled(&self) -> bool {
        self.cache_mode == CacheMode::Preloaded
    }

    /// Hands a task to the mirror worker. The worker only dies when the
    /// wrapper is dropped, so a failed hand-off is just logged.
    async fn submit(&self, task: MirrorTask) {
        if let Err(err) = self.worker.submit(task).await {
            warn!(error = %err, "mirror worker unavailable");
        }
    }

    /// Submits `op` for replay against every registered mirror's remapped
    /// unit name.
    async fn walk_mirrors(&self, state: &WrapperState, unit: &str, op: MirrorOp) {
        if state.mirrors.is_empty() {
            return;
        }
        let targets = state
            .mirrors
            .iter()
            .map(|mirror| (Arc::clone(&mirror.storage), mirror.mapped_unit(unit)))
            .collect();
        self.submit(MirrorTask::Unit { targets, op }).await;
    }
}

fn ensure_connected(state: &WrapperState) -> StorageResult<()> {
    if state.connected {
        Ok(())
    } else {
        Err(StorageError::NotConnected)
    }
}

#[async_trait]
impl Storage for WrapperStorage {
    async fn connect(&self) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        trace!("wrapper connect");
        if state.connected {
            return Err(StorageError::AlreadyConnected);
        }

        self.leading.connect().await?;
        for mirror in &state.mirrors {
            mirror.storage.connect().await?;
        }
        state.connected = true;
        Ok(())
    }

    async fn is_connected(&self) -> StorageResult<bool> {
        let _state = self.state.lock().await;
        trace!("wrapper is_connected");
        self.leading.is_connected().await
    }

    async fn ping(&self) -> StorageResult<()> {
        let state = self.state.lock().await;
        trace!("wrapper ping");

        // Liveness probes are fire-and-forget: the leading backend and all
        // mirrors are pinged on the worker and failures only logged.
        let mut targets = Vec::with_capacity(state.mirrors.len() + 1);
        targets.push(Arc::clone(&self.leading));
        targets.extend(state.mirrors.iter().map(|m| Arc::clone(&m.storage)));
        drop(state);

        self.submit(MirrorTask::Ping { targets }).await;
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        trace!("wrapper close");
        ensure_connected(&state)?;

        state.observers.before_close();

        self.leading.close().await?;
        for mirror in &state.mirrors {
            mirror.storage.close().await?;
        }
        state.connected = false;
        Ok(())
    }

    async fn unit_names(&self) -> StorageResult<Vec<String>> {
        let state = self.state.lock().await;
        trace!("wrapper unit_names");
        ensure_connected(&state)?;

        if self.cache_enabled() {
            Ok(state.cache.keys().cloned().collect())
        } else {
            self.leading.unit_names().await
        }
    }

    async fn keys(&self, unit: &str) -> StorageResult<Option<UnitKeys>> {
        let state = self.state.lock().await;
        trace!(unit, "wrapper keys");
        ensure_connected(&state)?;

        if self.cache_enabled() {
            Ok(state.cache.get(unit).map(|cached| cached.keys.clone()))
        } else {
            self.leading.keys(unit).await
        }
    }

    async fn primary_key(&self, unit: &str) -> StorageResult<Option<String>> {
        let state = self.state.lock().await;
        trace!(unit, "wrapper primary_key");
        ensure_connected(&state)?;

        if self.cache_enabled() {
            Ok(state
                .cache
                .get(unit)
                .map(|cached| cached.primary_key.clone()))
        } else {
            self.leading.primary_key(unit).await
        }
    }

    async fn select_entries(
        &self,
        unit: &str,
        keys: Option<&[String]>,
        selector: Option<&Selector>,
    ) -> StorageResult<Option<Vec<Entry>>> {
        let state = self.state.lock().await;
        trace!(unit, "wrapper select_entries");
        ensure_connected(&state)?;

        if self.cache_enabled() {
            let Some(cached) = state.cache.get(unit) else {
                return Ok(None);
            };
            let rows = cached
                .entries
                .iter()
                .filter(|entry| selector.is_none_or(|s| s.matches(entry)))
                .map(|entry| keys.map_or_else(|| entry.clone(), |names| entry.project(names)))
                .collect();
            Ok(Some(rows))
        } else {
            self.leading.select_entries(unit, keys, selector).await
        }
    }

    async fn create_unit(
        &self,
        unit: &str,
        keys: &UnitKeys,
        primary_key: &str,
    ) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        trace!(unit, primary_key, "wrapper create_unit");
        ensure_connected(&state)?;

        self.leading.create_unit(unit, keys, primary_key).await?;

        self.walk_mirrors(
            &state,
            unit,
            MirrorOp::CreateUnit {
                keys: keys.clone(),
                primary_key: primary_key.to_string(),
            },
        )
        .await;

        if self.cache_enabled() && !state.cache.contains_key(unit) {
            state.cache.insert(
                unit.to_string(),
                PreloadedUnitCache {
                    keys: keys.clone(),
                    primary_key: primary_key.to_string(),
                    entries: Vec::new(),
                },
            );
        }

        state.observers.after_create_unit(unit, keys);
        Ok(())
    }

    async fn rename_unit(&self, unit: &str, new_name: &str) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        trace!(unit, new_name, "wrapper rename_unit");
        ensure_connected(&state)?;
        if unit == new_name {
            return Err(StorageError::InvalidArgument(
                "rename target equals the current unit name".into(),
            ));
        }

        self.leading.rename_unit(unit, new_name).await?;

        // Each mirror renames from its mapped old name to the new leading
        // name; the mapping entry is dropped so future lookups pass through.
        let mut targets = Vec::with_capacity(state.mirrors.len());
        for mirror in &mut state.mirrors {
            let mapped = mirror
                .unit_mappings
                .remove(unit)
                .unwrap_or_else(|| unit.to_string());
            targets.push((Arc::clone(&mirror.storage), mapped));
        }
        if !targets.is_empty() {
            self.submit(MirrorTask::Unit {
                targets,
                op: MirrorOp::RenameUnit {
                    new_name: new_name.to_string(),
                },
            })
            .await;
        }

        if let Some(cached) = state.cache.remove(unit) {
            state.cache.insert(new_name.to_string(), cached);
        }

        state.observers.after_rename_unit(unit, new_name);
        Ok(())
    }

    async fn erase_unit(&self, unit: &str) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        trace!(unit, "wrapper erase_unit");
        ensure_connected(&state)?;

        self.leading.erase_unit(unit).await?;
        self.walk_mirrors(&state, unit, MirrorOp::EraseUnit).await;

        if let Some(cached) = state.cache.get_mut(unit) {
            cached.entries.clear();
        }

        state.observers.after_erase_unit(unit);
        Ok(())
    }

    async fn remove_unit(&self, unit: &str) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        trace!(unit, "wrapper remove_unit");
        ensure_connected(&state)?;

        self.leading.remove_unit(unit).await?;

        // The mapping entry goes with the unit.
        let mut targets = Vec::with_capacity(state.mirrors.len());
        for mirror in &mut state.mirrors {
            let mapped = mirror
                .unit_mappings
                .remove(unit)
                .unwrap_or_else(|| unit.to_string());
            targets.push((Arc::clone(&mirror.storage), mapped));
        }
        if !targets.is_empty() {
            self.submit(MirrorTask::Unit {
                targets,
                op: MirrorOp::RemoveUnit,
            })
            .await;
        }

        state.cache.remove(unit);

        state.observers.after_remove_unit(unit);
        Ok(())
    }

    async fn add_key(&self, unit: &str, key: &str, data_type: DataType) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        trace!(unit, key, "wrapper add_key");
        ensure_connected(&state)?;

        self.leading.add_key(unit, key, data_type).await?;

        self.walk_mirrors(
            &state,
            unit,
            MirrorOp::AddKey {
                key: key.to_string(),
                data_type,
            },
        )
        .await;

        if let Some(cached) = state.cache.get_mut(unit) {
            for entry in &mut cached.entries {
                entry.put(key, "");
            }
            cached.keys.insert(key, data_type);
        }

        state.observers.after_add_key(unit, key, data_type);
        Ok(())
    }

    async fn add_entry(&self, unit: &str, entry: &Entry) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        trace!(unit, "wrapper add_entry");
        ensure_connected(&state)?;

        self.leading.add_entry(unit, entry).await?;

        self.walk_mirrors(
            &state,
            unit,
            MirrorOp::AddEntry {
                entry: entry.clone(),
            },
        )
        .await;

        if let Some(cached) = state.cache.get_mut(unit) {
            // Cache rows carry every schema key, absent payload keys empty,
            // mirroring what the leading backend persists.
            let mut row = Entry::new();
            for (name, _) in cached.keys.iter() {
                row.put(name, entry.get(name).unwrap_or(""));
            }
            cached.entries.push(row);
        }

        state.observers.after_add_entry(unit, entry);
        Ok(())
    }

    async fn update_entries(
        &self,
        unit: &str,
        subset: &Entry,
        selector: &Selector,
    ) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        trace!(unit, "wrapper update_entries");
        ensure_connected(&state)?;

        self.leading.update_entries(unit, subset, selector).await?;

        self.walk_mirrors(
            &state,
            unit,
            MirrorOp::UpdateEntries {
                subset: subset.clone(),
                selector: selector.clone(),
            },
        )
        .await;

        if let Some(cached) = state.cache.get_mut(unit) {
            for entry in &mut cached.entries {
                if selector.matches(entry) {
                    entry.apply(subset);
                }
            }
        }

        state.observers.after_update_entries(unit, subset, selector);
        Ok(())
    }

    async fn remove_entries(&self, unit: &str, selector: &Selector) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        trace!(unit, "wrapper remove_entries");
        ensure_connected(&state)?;

        self.leading.remove_entries(unit, selector).await?;

        self.walk_mirrors(
            &state,
            unit,
            MirrorOp::RemoveEntries {
                selector: selector.clone(),
            },
        )
        .await;

        if let Some(cached) = state.cache.get_mut(unit) {
            cached.entries.retain(|entry| !selector.matches(entry));
        }

        state.observers.after_remove_entries(unit, selector);
        Ok(())
    }

    fn is_autobatch_enabled(&self) -> bool {
        self.leading.is_autobatch_enabled()
    }

    async fn set_autobatch_enabled(&self, enabled: bool) {
        let state = self.state.lock().await;
        self.leading.set_autobatch_enabled(enabled).await;
        for mirror in &state.mirrors {
            mirror.storage.set_autobatch_enabled(enabled).await;
        }
    }

    async fn execute_batch(&self) -> StorageResult<()> {
        let state = self.state.lock().await;
        trace!("wrapper execute_batch");
        ensure_connected(&state)?;

        self.leading.execute_batch().await?;

        if !state.mirrors.is_empty() {
            let targets = state
                .mirrors
                .iter()
                .map(|mirror| Arc::clone(&mirror.storage))
                .collect();
            drop(state);
            self.submit(MirrorTask::ExecuteBatch { targets }).await;
        }
        Ok(())
    }

    async fn clear_batch(&self) -> StorageResult<()> {
        let state = self.state.lock().await;
        trace!("wrapper clear_batch");
        ensure_connected(&state)?;

        self.leading.clear_batch().await?;
        for mirror in &state.mirrors {
            if let Err(err) = mirror.storage.clear_batch().await {
                warn!(error = %err, "mirror batch clear failed");
            }
        }
        Ok(())
    }
}
