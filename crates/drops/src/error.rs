use thiserror::Error;

/// Errors raised by the drop registry and processor.
#[derive(Debug, Error)]
pub enum DropError {
    /// No drop with this id exists for the tenant.
    #[error("Drop not found: {0}")]
    NotFound(u32),

    /// The drop is held by a different character.
    #[error("Drop {drop_id} reserved by another party ({reserved_by})")]
    ReservedByAnother { drop_id: u32, reserved_by: u32 },

    /// The builder was missing required values.
    #[error("Invalid drop: {0}")]
    Invalid(String),

    /// A compare-and-set kept losing to concurrent writers.
    #[error("Drop {0} was modified concurrently")]
    Contended(u32),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Bus error: {0}")]
    Bus(#[from] bus::BusError),
}

impl DropError {
    /// Infrastructure failures that are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DropError::Redis(_) | DropError::Bus(_) | DropError::Contended(_)
        )
    }
}

/// Result type for drop operations.
pub type Result<T> = std::result::Result<T, DropError>;
