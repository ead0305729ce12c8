//! Error types for the database service
//!
//! Every service operation fails with exactly one [`Error`]. Storage
//! failures never leak as [`StorageError`]; they are wrapped once into
//! [`Error::Service`], which keeps the original as its source.

use thiserror::Error;

use crate::schema::RowId;
use crate::storage::StorageError;
use crate::validation::SchemeError;

/// The main error type for database operations
#[derive(Debug, Error)]
pub enum Error {
    // ==========================================================================
    // Argument Errors
    // ==========================================================================
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: &'static str },

    // ==========================================================================
    // Database Errors
    // ==========================================================================
    #[error("Database name '{name}' has invalid format")]
    InvalidDatabaseName { name: String },

    #[error("Database '{name}' already exists")]
    DatabaseAlreadyExists { name: String },

    #[error("Database '{name}' does not exist")]
    DatabaseNotFound { name: String },

    // ==========================================================================
    // Table Errors
    // ==========================================================================
    #[error("Table '{table}' already exists in database '{database}'")]
    TableAlreadyExists { database: String, table: String },

    #[error("Table '{table}' does not exist in database '{database}'")]
    TableNotFound { database: String, table: String },

    #[error("Invalid table scheme: {source}")]
    InvalidTableScheme {
        #[source]
        source: SchemeError,
    },

    #[error("Attribute '{attribute}' does not exist in table '{table}'")]
    AttributeNotFound { table: String, attribute: String },

    // ==========================================================================
    // Row Errors
    // ==========================================================================
    #[error("Row {id} does not exist in table '{table}'")]
    RowNotFound { table: String, id: RowId },

    #[error("Row does not fit the scheme of table '{table}'")]
    InvalidRow { table: String },

    // ==========================================================================
    // Storage Errors
    // ==========================================================================
    #[error("{message}")]
    Service {
        message: String,
        #[source]
        source: StorageError,
    },
}

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, Error>;

/// Broad class of an error, for mapping onto response codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request itself was malformed or invalid
    BadRequest,
    /// A target the request depends on does not exist
    NotFound,
    /// The request would create something that already exists
    Conflict,
    /// Storage failed; details must not be shown to external callers
    Internal,
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        tracing::warn!("Storage failure: {}", err);
        Error::Service {
            message: "Storage operation failed".to_string(),
            source: err,
        }
    }
}

impl From<SchemeError> for Error {
    fn from(err: SchemeError) -> Self {
        Error::InvalidTableScheme { source: err }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument { .. }
            | Error::InvalidDatabaseName { .. }
            | Error::InvalidTableScheme { .. }
            | Error::InvalidRow { .. }
            | Error::AttributeNotFound { .. } => ErrorKind::BadRequest,
            Error::DatabaseNotFound { .. }
            | Error::TableNotFound { .. }
            | Error::RowNotFound { .. } => ErrorKind::NotFound,
            Error::DatabaseAlreadyExists { .. } | Error::TableAlreadyExists { .. } => {
                ErrorKind::Conflict
            }
            Error::Service { .. } => ErrorKind::Internal,
        }
    }

    /// Message safe to show to an external caller
    ///
    /// Storage failures are reduced to a generic message; the cause stays
    /// available through [`std::error::Error::source`].
    pub fn public_message(&self) -> String {
        match self {
            Error::Service { .. } => "Internal storage error".to_string(),
            other => other.to_string(),
        }
    }

    /// Returns a user-friendly suggestion for fixing the error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::InvalidDatabaseName { .. } => {
                Some("Use a non-blank name that is a legal file name")
            }
            Error::DatabaseNotFound { .. } => Some("Create the database first with: create-db <name>"),
            Error::TableNotFound { .. } => {
                Some("Create the table first with: create-table <db> <table> --attr name:type")
            }
            Error::InvalidTableScheme { .. } => {
                Some("Give the table at least one attribute with a unique name and a known type")
            }
            Error::InvalidRow { .. } => {
                Some("Supply one value per attribute, each matching the attribute's type")
            }
            _ => None,
        }
    }
}
