//! Backend-agnostic tabular storage for the `GridStore` engine.
//!
//! Provides the trait and supporting types for the layered storage
//! architecture:
//!
//! - [`Storage`]: the backend contract (lifecycle, unit management, CRUD,
//!   selector queries, batching) every concrete backend satisfies
//! - [`WrapperStorage`]: the decorating implementation that adds an optional
//!   preloaded cache, best-effort asynchronous mirroring, and observer
//!   notification on top of any leading backend
//! - [`StorageObserver`] / [`CompositeObserver`]: passive listeners invoked
//!   after mutating operations complete
//! - [`backends`]: concrete backend implementations
//! - [`translate_selector`]: the textual SQL form of a selector for
//!   query-capable backend adapters

pub mod backends;
pub mod contract;
pub mod error;
pub mod observer;
pub mod sql;
pub mod worker;
pub mod wrapper;

pub use contract::Storage;
pub use error::{StorageError, StorageResult};
pub use observer::{CompositeObserver, StorageObserver};
pub use sql::translate_selector;
pub use wrapper::{CacheMode, WrapperStorage};
