use thiserror::Error;

/// Errors raised by quest transitions.
#[derive(Debug, Error)]
pub enum QuestError {
    #[error("Quest {0} is not defined")]
    DefinitionNotFound(u32),

    #[error("Quest {0} is already started")]
    AlreadyStarted(u32),

    #[error("Quest {0} is already completed")]
    AlreadyCompleted(u32),

    #[error("Quest {0} is not started")]
    NotStarted(u32),

    #[error("Repeat interval of quest {0} has not elapsed")]
    IntervalNotElapsed(u32),

    #[error("Quest {0} has expired")]
    Expired(u32),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Bus error: {0}")]
    Bus(#[from] bus::BusError),
}

impl QuestError {
    /// Code reported on quest error events.
    pub fn code(&self) -> &'static str {
        match self {
            QuestError::DefinitionNotFound(_) => "definition_not_found",
            QuestError::AlreadyStarted(_) => "already_started",
            QuestError::AlreadyCompleted(_) => "already_completed",
            QuestError::NotStarted(_) => "not_started",
            QuestError::IntervalNotElapsed(_) => "interval_not_elapsed",
            QuestError::Expired(_) => "expired",
            QuestError::Serialization(_) | QuestError::Bus(_) => "unknown",
        }
    }
}

/// Result type for quest operations.
pub type Result<T> = std::result::Result<T, QuestError>;
