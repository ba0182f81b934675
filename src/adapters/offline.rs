//! Network-free collaborators for `--offline` runs and tests.

use async_trait::async_trait;
use serde_json::json;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::SubTaskSeed;
use crate::domain::ports::{Decomposer, ExecutionOutput, ExecutionRequest, PrimaryExecutor};

/// Primary executor that completes every subtask with a fixed echo.
#[derive(Debug, Clone, Default)]
pub struct OfflineExecutor;

#[async_trait]
impl PrimaryExecutor for OfflineExecutor {
    async fn execute(&self, request: &ExecutionRequest) -> DomainResult<ExecutionOutput> {
        let agent = request
            .context
            .get("agent_name")
            .and_then(|v| v.as_str())
            .unwrap_or("agent");
        let upstream = request
            .context
            .get("upstream")
            .and_then(|v| v.as_object())
            .map_or(0, serde_json::Map::len);

        Ok(ExecutionOutput {
            output: format!("{agent} completed: {}", request.sub_task_description),
            data: json!({ "offline": true, "upstream_results": upstream }),
            logs: Vec::new(),
            execution_time_ms: Some(0),
        })
    }
}

/// Decomposer that always declines, so the static templates are used.
#[derive(Debug, Clone, Default)]
pub struct OfflineDecomposer;

#[async_trait]
impl Decomposer for OfflineDecomposer {
    async fn decompose(&self, _task_description: &str) -> DomainResult<Vec<SubTaskSeed>> {
        Err(DomainError::ExternalService("offline mode".to_string()))
    }
}
