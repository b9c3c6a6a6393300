//! Error type shared by every storage operation.
//!
//! Two failure classes flow through [`StorageError`]: opaque backend I/O
//! failures ([`StorageError::Backend`]) and usage/precondition violations
//! (every other variant). The leading backend's outcome is authoritative for
//! a logical operation; mirror propagation failures never become a
//! `StorageError` the caller sees — they are logged and swallowed by the
//! wrapper.

/// Convenience alias for storage operation results.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error returned by [`Storage`](super::Storage) operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Backend I/O failure: connection lost, malformed statement, disk error.
    /// Always surfaced to the caller of the originating operation.
    #[error("backend failure: {0}")]
    Backend(anyhow::Error),

    /// Operation invoked before `connect()` (or after `close()`).
    #[error("storage is not connected")]
    NotConnected,

    /// `connect()` invoked on an already-connected storage.
    #[error("storage is already connected")]
    AlreadyConnected,

    /// Unit creation or rename targeting a name that is already taken.
    #[error("unit {0:?} already exists")]
    UnitExists(String),

    /// Operation addressed a unit the storage does not have.
    #[error("unknown unit {0:?}")]
    UnknownUnit(String),

    /// `add_key` for a key the unit already carries.
    #[error("key {key:?} already exists in unit {unit:?}")]
    KeyExists {
        /// Unit the key was added to.
        unit: String,
        /// The duplicate key name.
        key: String,
    },

    /// An entry or update payload referenced a key outside the unit's schema.
    #[error("unknown key {key:?} in unit {unit:?}")]
    UnknownKey {
        /// Unit the operation addressed.
        unit: String,
        /// The unrecognized key name.
        key: String,
    },

    /// Malformed argument (blank unit name, rename to the same name, primary
    /// key not among the unit's keys).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl StorageError {
    /// Wraps an opaque backend/driver failure.
    pub fn backend(err: impl Into<anyhow::Error>) -> Self {
        Self::Backend(err.into())
    }

    /// Whether this is a usage/precondition violation rather than a backend
    /// I/O failure. Usage errors are programming mistakes and are never
    /// worth retrying.
    #[must_use]
    pub fn is_usage(&self) -> bool {
        !matches!(self, Self::Backend(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_are_not_usage_errors() {
        let err = StorageError::backend(std::io::Error::other("connection reset"));
        assert!(!err.is_usage());
    }

    #[test]
    fn precondition_errors_are_usage_errors() {
        assert!(StorageError::NotConnected.is_usage());
        assert!(StorageError::AlreadyConnected.is_usage());
        assert!(StorageError::UnitExists("accounts".into()).is_usage());
        assert!(StorageError::UnknownUnit("accounts".into()).is_usage());
        assert!(StorageError::InvalidArgument("rename to same name".into()).is_usage());
    }

    #[test]
    fn display_names_the_offending_unit() {
        let err = StorageError::UnknownUnit("sessions".into());
        assert!(err.to_string().contains("sessions"));

        let err = StorageError::KeyExists {
            unit: "accounts".into(),
            key: "email".into(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("accounts"));
        assert!(rendered.contains("email"));
    }
}
