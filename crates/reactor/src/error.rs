use thiserror::Error;

/// Errors raised while evaluating reactor scripts or running their operations.
#[derive(Debug, Error)]
pub enum ReactorError {
    #[error("Unknown condition type: {0}")]
    UnknownConditionType(String),

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Invalid condition value: {0}")]
    InvalidValue(String),

    #[error("Operation {operation} is missing parameter {param}")]
    MissingParam {
        operation: &'static str,
        param: &'static str,
    },

    #[error("Invalid value {value:?} for parameter {param}")]
    InvalidParam { param: &'static str, value: String },

    /// Reading a script file failed.
    #[error("Script I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Saga error: {0}")]
    Saga(#[from] saga::SagaError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Bus error: {0}")]
    Bus(#[from] bus::BusError),
}

/// Result type for reactor operations.
pub type Result<T> = std::result::Result<T, ReactorError>;
