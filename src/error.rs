//! Error types for the cache storage handler.
//!
//! Engine failures are split into two groups:
//!
//! - **Semantic** errors ([`Error::KeyExists`], [`Error::KeyNotFound`]) describe
//!   a normal outcome of a conditional operation and are returned to callers
//!   as-is.
//! - **Passthrough** errors (everything else) come from the storage engine,
//!   the filesystem, or the runtime. They are logged where the handler returns
//!   them and then propagated unchanged.

use std::path::PathBuf;

use tracing::error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Storage handler errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Conditional insert found the key already present.
    #[error("key exists")]
    KeyExists,

    /// The operation required an existing key.
    #[error("key not found")]
    KeyNotFound,

    /// Writing would grow the database past its configured bound.
    #[error("storage full: database would exceed {limit} bytes")]
    StorageFull { limit: u64 },

    /// A stored record is shorter than the fixed entry header.
    #[error("corrupt entry: record is {len} bytes, header needs 8")]
    CorruptEntry { len: usize },

    /// Storage path exists but is not a directory.
    #[error("storage path exists and is not a directory: {path:?}")]
    NotADirectory { path: PathBuf },

    /// Any failure reported by redb.
    #[error("storage engine error: {0}")]
    Engine(#[from] redb::Error),

    /// IO error with context.
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns true for [`Error::KeyNotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound)
    }

    /// Returns true for the semantic categories (`KeyExists`, `KeyNotFound`).
    #[must_use]
    pub fn is_semantic(&self) -> bool {
        matches!(self, Self::KeyExists | Self::KeyNotFound)
    }
}

// redb reports failures through one error type per API family. They all
// collapse into the passthrough category.
macro_rules! engine_error {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Error {
                fn from(err: $ty) -> Self {
                    Self::Engine(err.into())
                }
            }
        )+
    };
}

engine_error!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Logs passthrough failures for `op` and hands the result back unchanged.
///
/// Semantic errors are part of the normal request flow and are not logged.
pub(crate) fn translate<T>(op: &'static str, result: Result<T>) -> Result<T> {
    if let Err(err) = &result
        && !err.is_semantic()
    {
        error!(op, error = %err, "Storage operation failed");
    }
    result
}
