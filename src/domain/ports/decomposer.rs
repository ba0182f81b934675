//! Decomposer port - splits a task description into subtask seeds.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::SubTaskSeed;

/// Decomposition collaborator (usually an LLM).
///
/// Failures are recoverable: the coordinator falls back to a static
/// template, so implementations should return errors rather than guessing.
#[async_trait]
pub trait Decomposer: Send + Sync {
    async fn decompose(&self, task_description: &str) -> DomainResult<Vec<SubTaskSeed>>;
}
