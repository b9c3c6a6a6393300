//! Concrete [`Storage`](super::Storage) backends.
//!
//! Relational and flat-file backends live outside this crate; they only
//! need to satisfy the [`Storage`](super::Storage) contract. The in-memory
//! backend here is the reference implementation used by tests and as the
//! executable model of the contract semantics.

pub mod memory;

pub use memory::MemoryStorage;
