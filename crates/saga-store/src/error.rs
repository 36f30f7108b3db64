use common::TransactionId;
use thiserror::Error;

use crate::Version;

/// Errors that can occur when interacting with the saga store.
#[derive(Debug, Error)]
pub enum SagaStoreError {
    /// The stored version no longer matches the version the writer read.
    /// Callers re-read the saga and retry.
    #[error("Version conflict for saga {transaction_id}: expected version {expected}")]
    VersionConflict {
        transaction_id: TransactionId,
        expected: Version,
    },

    /// No saga exists for the transaction.
    #[error("Saga not found: {0}")]
    NotFound(TransactionId),

    /// A stored value could not be mapped back into a record.
    #[error("Corrupt saga row: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SagaStoreError {
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, SagaStoreError::VersionConflict { .. })
    }
}

/// Result type for saga store operations.
pub type Result<T> = std::result::Result<T, SagaStoreError>;
