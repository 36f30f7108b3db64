use thiserror::Error;

/// Errors raised while producing or consuming bus messages.
#[derive(Debug, Error)]
pub enum BusError {
    /// The transport rejected a publish.
    #[error("Publish to topic {topic} failed: {reason}")]
    Publish { topic: String, reason: String },

    /// A required header was absent or malformed.
    #[error("Missing or invalid header: {0}")]
    InvalidHeader(&'static str),

    /// The message value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A consumer failed to process a message.
    #[error("Handler error: {0}")]
    Handler(String),
}

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
