//! Database error types.

use thiserror::Error;

/// Database operation errors.
#[derive(Error, Debug, Clone)]
pub enum DbError {
    /// Table already exists
    #[error("Table '{0}' already exists")]
    TableAlreadyExists(String),

    /// Table not found
    #[error("Table '{table}' not found")]
    TableNotFound { table: String },

    /// Table name cannot be used as a snapshot file name
    #[error("Invalid table name '{name}': {reason}")]
    InvalidTableName { name: String, reason: &'static str },

    /// Record not found
    #[error("Record {id} not found in table '{table}'")]
    RecordNotFound { table: String, id: u64 },

    /// Stored or persisted value is not a well-formed record
    #[error("Invalid payload for record {id} in table '{table}': {reason}")]
    InvalidPayload {
        table: String,
        id: u64,
        reason: String,
    },

    /// Identifier counter reached the end of the id space
    #[error("Record id space exhausted for table '{table}'")]
    IdSpaceExhausted { table: String },

    /// Lock poisoned (RwLock poisoned)
    #[error("Lock poisoned")]
    LockPoisoned,

    /// I/O error during persistence
    #[error("I/O error: {0}")]
    IoError(String),

    /// Transient I/O error that may succeed on retry
    #[error("Transient I/O error: {0}")]
    TransientIoError(String),

    /// Disk full error during persistence
    #[error("Disk full: {0}")]
    DiskFull(String),

    /// Malformed JSON in the catalog or a table file
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// One or more tables could not be written during save
    #[error("Failed to save {} table(s): {}", .failures.len(), summarize(.failures))]
    SaveFailed { failures: Vec<TableSaveError> },
}

/// A single table's failure inside [`DbError::SaveFailed`].
#[derive(Error, Debug, Clone)]
#[error("{table}: {error}")]
pub struct TableSaveError {
    /// Name of the table that failed
    pub table: String,
    /// Underlying error
    pub error: DbError,
}

impl DbError {
    /// Returns true for table and record lookup misses.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DbError::TableNotFound { .. } | DbError::RecordNotFound { .. }
        )
    }

    /// Returns true for file-system failures.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            DbError::IoError(_) | DbError::TransientIoError(_) | DbError::DiskFull(_)
        )
    }
}

fn summarize(failures: &[TableSaveError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
