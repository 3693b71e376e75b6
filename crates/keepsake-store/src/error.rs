//! Error types for the keepsake-store crate.
//!
//! All storage operations return [`StoreError`] via [`StoreResult`].
//! Reads generally degrade instead of failing (see [`crate::CachedStorage`]),
//! so most of these variants surface from writes and migrations.

use thiserror::Error;

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite operation failed. The backing store is treated as unavailable.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The backing store could not be reached (poisoned lock, bad path, ...).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A value could not be serialized for writing. Nothing was written.
    #[error("cannot encode value for `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A persisted value is malformed for the requested type.
    #[error("malformed value for `{key}`: {reason}")]
    Decode { key: String, reason: String },

    /// A schema migration failed. The version marker was not advanced.
    #[error("migration v{version} failed: {message}")]
    Migration { version: u32, message: String },

    /// The requested record was not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// An invalid argument was provided to a store operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration could not be loaded or parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl StoreError {
    /// Whether this error means the backing store itself is unreachable,
    /// as opposed to a problem with the data or the caller's input.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Sqlite(_) | Self::Unavailable(_))
    }

    /// Shorthand for a [`StoreError::Decode`].
    pub(crate) fn decode(key: &str, reason: impl Into<String>) -> Self {
        Self::Decode {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
