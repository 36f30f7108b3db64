//! Saga error types.

use bus::BusError;
use common::TransactionId;
use saga_store::SagaStoreError;
use thiserror::Error;

use crate::StepStatus;

/// Errors that can occur during saga operations.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The saga breaks a step-ordering or status invariant.
    #[error("Invalid saga: {0}")]
    Invalid(String),

    /// A step status change not allowed by the step state machine.
    #[error("Illegal transition for step '{step_id}': {from} -> {to}")]
    IllegalTransition {
        step_id: String,
        from: StepStatus,
        to: StepStatus,
    },

    /// No step exists at the index.
    #[error("Step index {0} out of range")]
    StepIndex(usize),

    /// No saga exists for the transaction.
    #[error("Saga not found: {0}")]
    NotFound(TransactionId),

    /// A saga with this transaction id is already stored.
    #[error("Saga already exists: {0}")]
    AlreadyExists(TransactionId),

    /// The saga store failed.
    #[error("Saga store error: {0}")]
    Store(#[from] SagaStoreError),

    /// Publishing a step command failed.
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SagaError {
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, SagaError::Store(e) if e.is_version_conflict())
    }

    /// Failures worth redelivering the triggering message for.
    pub fn is_transient(&self) -> bool {
        matches!(self, SagaError::Store(_) | SagaError::Bus(_))
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
