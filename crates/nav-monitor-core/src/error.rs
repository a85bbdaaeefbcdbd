use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum NavMonitorError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: Uuid },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Evaluation failure for covenant {covenant}: {reason}")]
    EvaluationFailure { covenant: Uuid, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for NavMonitorError {
    fn from(e: serde_json::Error) -> Self {
        NavMonitorError::SerializationError(e.to_string())
    }
}
