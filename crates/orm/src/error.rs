//! Error types for the migration system
//!
//! A step whose target state is already present is not an error; those
//! cases are reported through [`StepOutcome`](crate::migrations::StepOutcome).
//! Everything here aborts the current runner invocation.

use thiserror::Error;

/// Result type alias for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Error types for migration operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MigrationError {
    /// The database rejected a schema mutation (type conflict, permission, lock)
    #[error("Migration {id} failed on {target}: {message}")]
    MutationFailure {
        id: String,
        target: String,
        message: String,
    },

    /// The mutation ran but the ledger row could not be written or committed
    #[error("Migration {id} ran but could not be recorded in the ledger: {message}")]
    LedgerWriteFailure { id: String, message: String },

    /// An existing column does not match the declared descriptor
    #[error("Migration {id} found {target} as {found}, expected {expected}")]
    DescriptorMismatch {
        id: String,
        target: String,
        expected: String,
        found: String,
    },

    /// The ledger references a step that is not part of the catalog
    #[error("Migration {0} is recorded as applied but is not defined")]
    UnknownMigration(String),

    /// The catalog itself is malformed (duplicate or unordered versions)
    #[error("Invalid migration catalog: {0}")]
    InvalidCatalog(String),

    /// The ledger table could not be created or read
    #[error("Failed to read migration ledger: {0}")]
    LedgerRead(String),

    /// Low-level database error, mapped to a richer variant by the runner
    #[error("Database error: {0}")]
    Database(String),

    /// Invalid runner or connection configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl MigrationError {
    /// Message of the underlying engine error, without the variant prefix
    pub fn engine_message(&self) -> String {
        match self {
            MigrationError::Database(msg) | MigrationError::LedgerRead(msg) => msg.clone(),
            MigrationError::MutationFailure { message, .. }
            | MigrationError::LedgerWriteFailure { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Id of the step that failed, when the error is tied to one
    pub fn migration_id(&self) -> Option<&str> {
        match self {
            MigrationError::MutationFailure { id, .. }
            | MigrationError::LedgerWriteFailure { id, .. }
            | MigrationError::DescriptorMismatch { id, .. } => Some(id),
            MigrationError::UnknownMigration(id) => Some(id),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for MigrationError {
    fn from(err: sqlx::Error) -> Self {
        MigrationError::Database(err.to_string())
    }
}
