//! Error types for session storage and state operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for durable storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result alias for session state operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Failures raised by a [`crate::KeyValueStore`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem access failed.
    #[error("storage io failed during {operation}")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// File backing the store.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The backing file did not hold a JSON object of strings.
    #[error("storage file is malformed")]
    Format {
        /// File backing the store.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// An in-process lock was poisoned by a panicking writer.
    #[error("storage lock poisoned during {operation}")]
    Poisoned {
        /// Operation identifier.
        operation: &'static str,
    },
    /// The platform storage surface refused the operation.
    #[error("storage unavailable during {operation}: {detail}")]
    Unavailable {
        /// Operation identifier.
        operation: &'static str,
        /// Platform-supplied detail.
        detail: String,
    },
}

/// Failures raised by [`crate::SessionStore`] and [`crate::SessionContext`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// Durable storage rejected a read or write.
    #[error("session storage failed during {operation}")]
    Storage {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying storage error.
        #[source]
        source: StorageError,
    },
    /// The persisted principal exists but does not parse.
    #[error("stored session data is corrupt")]
    CorruptSessionData {
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// The principal could not be serialised.
    #[error("failed to serialize principal")]
    Serialize {
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

impl SessionError {
    pub(crate) const fn storage(operation: &'static str, source: StorageError) -> Self {
        Self::Storage { operation, source }
    }
}
