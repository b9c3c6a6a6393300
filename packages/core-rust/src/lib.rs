//! `GridStore` Core — unit/entry data model and the selector predicate algebra.

pub mod entry;
pub mod selector;
pub mod types;

pub use entry::{Datum, Entry};
pub use selector::{Condition, Selector};
pub use types::{DataType, UnitKeys};
