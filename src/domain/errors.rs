//! Domain errors for the taskloom orchestrator.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur while orchestrating a task.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("Subtask not found: {sub_task_id} in task {task_id}")]
    SubTaskNotFound { task_id: Uuid, sub_task_id: String },

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Decomposition failed: {0}")]
    DecompositionFailed(String),

    #[error("Agent assignment failed: {0}")]
    AssignmentFailed(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for DomainError {
    fn from(err: reqwest::Error) -> Self {
        DomainError::ExternalService(err.to_string())
    }
}
