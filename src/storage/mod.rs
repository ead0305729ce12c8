//! Storage layer
//!
//! Owns the on-disk layout. Every database is a directory under the storage
//! root; each of its tables is one JSON file:
//!
//! ```text
//! /{storage_path}/
//!   /shop/
//!     /tables/
//!       items.json
//!       orders.json
//!   /library/
//!     /tables/
//! ```

pub mod repository;

pub use repository::DbRepository;

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the storage layer
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: &'static str },

    #[error("Database '{name}' already exists")]
    AlreadyExists { name: String },

    #[error("Database '{name}' does not exist")]
    NotFound { name: String },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt table file '{path}': {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize table '{table}': {source}")]
    Serialize {
        table: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| StorageError::Io { path, source }
    }
}
