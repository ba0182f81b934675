//! Agent provider ports.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Agent;

/// Fabricates a fresh agent for a subtask description.
#[async_trait]
pub trait AgentGenerator: Send + Sync {
    async fn generate(&self, sub_task_description: &str) -> DomainResult<Agent>;
}

/// Searches an external catalogue for existing agents.
#[async_trait]
pub trait AgentDiscovery: Send + Sync {
    async fn discover(&self, query: &str) -> DomainResult<Vec<Agent>>;
}
