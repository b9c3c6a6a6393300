//! `GridStore` Storage — the backend contract plus a decorating wrapper with
//! write-through caching, multi-target mirroring, and change notification.

pub mod storage;

pub use storage::{
    backends::MemoryStorage, translate_selector, CacheMode, CompositeObserver, Storage,
    StorageError, StorageObserver, StorageResult, WrapperStorage,
};
