//! Execution ports for agent code.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;

/// Everything the primary executor needs to run one subtask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Opaque agent code
    pub agent_code: String,
    pub sub_task_description: String,
    /// Subtask input
    pub input: serde_json::Value,
    /// Surrounding context: task description, agent name, upstream outputs
    pub context: serde_json::Value,
}

/// Result of a primary execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutput {
    pub output: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub execution_time_ms: Option<u64>,
}

/// Result of a sandboxed run. `success == false` counts as a failure even
/// though the call itself returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxOutcome {
    pub output: String,
    pub success: bool,
    pub execution_time_ms: u64,
    #[serde(default)]
    pub error: Option<String>,
}

/// Primary execution path (e.g. remote LLM-driven execution).
#[async_trait]
pub trait PrimaryExecutor: Send + Sync {
    async fn execute(&self, request: &ExecutionRequest) -> DomainResult<ExecutionOutput>;
}

/// Fallback execution path (local run of the agent code).
#[async_trait]
pub trait SandboxExecutor: Send + Sync {
    async fn execute_sandboxed(&self, agent_code: &str) -> DomainResult<SandboxOutcome>;
}
