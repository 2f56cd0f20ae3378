//! Error types for heap storage and scan execution.

use std::fmt;

use thiserror::Error;

use crate::catalog::RelationKind;

/// Result type alias using [`HeapScanError`].
pub type Result<T> = std::result::Result<T, HeapScanError>;

/// Why a relation could not be opened for scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessFailure {
    /// No relation with that name exists.
    NotFound,
    /// The relation exists but cannot be scanned sequentially.
    WrongRelationKind(RelationKind),
    /// Another session holds a conflicting table lock.
    LockConflict,
}

impl fmt::Display for AccessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessFailure::NotFound => write!(f, "relation does not exist"),
            AccessFailure::WrongRelationKind(kind) => {
                write!(f, "relation is a {}, not a table", kind.name())
            }
            AccessFailure::LockConflict => write!(f, "relation is exclusively locked"),
        }
    }
}

/// Error types for heapscan operations.
#[derive(Debug, Error)]
pub enum HeapScanError {
    /// A relation could not be opened or locked.
    #[error("Access error on '{table}': {reason}")]
    AccessError {
        table: String,
        reason: AccessFailure,
    },

    /// Allocation of scan resources failed.
    #[error("Resource exhaustion: {0}")]
    ResourceExhaustion(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Schema-related errors (duplicate table, bad column list, etc.).
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Type mismatch errors.
    #[error("Type error: expected {expected}, got {actual}")]
    TypeError { expected: String, actual: String },

    /// General execution errors.
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// Operation not valid for the current scan strategy.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The scan has already been shut down.
    #[error("Scan on '{0}' is closed")]
    ScanClosed(String),

    // ==================== Storage Errors ====================
    /// General storage/I/O error.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Page-related errors.
    #[error("Page error: {0}")]
    PageError(String),

    /// Buffer pool errors.
    #[error("Buffer pool error: {0}")]
    BufferPoolError(String),

    /// Checksum validation failure.
    #[error("Checksum mismatch: {0}")]
    ChecksumError(String),

    /// Catalog persistence errors.
    #[error("Catalog error: {0}")]
    CatalogError(String),

    /// Transaction bookkeeping errors.
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// CSV import error.
    #[error("Import error: {0}")]
    ImportError(String),
}

impl HeapScanError {
    /// Builds an [`HeapScanError::AccessError`] for `table`.
    pub fn access(table: impl Into<String>, reason: AccessFailure) -> Self {
        HeapScanError::AccessError {
            table: table.into(),
            reason,
        }
    }

    /// Returns true if this error is an access failure.
    #[must_use]
    pub fn is_access_error(&self) -> bool {
        matches!(self, HeapScanError::AccessError { .. })
    }
}
