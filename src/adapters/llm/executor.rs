use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

use super::client::LlmClient;
use super::error::LlmError;
use crate::domain::errors::DomainResult;
use crate::domain::ports::{ExecutionOutput, ExecutionRequest, PrimaryExecutor};

const SYSTEM_PROMPT: &str = "You are an agent runtime. Act as the agent whose code is given, \
perform the subtask with the provided input and context, and reply with the result text only.";

/// Primary execution through the Messages API.
pub struct LlmExecutor {
    client: Arc<LlmClient>,
}

impl LlmExecutor {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self { client }
    }
}

fn render_prompt(request: &ExecutionRequest) -> String {
    format!(
        "Agent code:\n```\n{}\n```\n\nSubtask: {}\n\nInput:\n{}\n\nContext:\n{}",
        request.agent_code,
        request.sub_task_description,
        serde_json::to_string_pretty(&request.input).unwrap_or_default(),
        serde_json::to_string_pretty(&request.context).unwrap_or_default(),
    )
}

#[async_trait]
impl PrimaryExecutor for LlmExecutor {
    #[instrument(skip_all, fields(sub_task = %request.sub_task_description))]
    async fn execute(&self, request: &ExecutionRequest) -> DomainResult<ExecutionOutput> {
        let started = Instant::now();
        let response = self
            .client
            .complete(Some(SYSTEM_PROMPT), &render_prompt(request))
            .await?;

        let output = response.text();
        if output.trim().is_empty() {
            return Err(LlmError::EmptyResponse.into());
        }

        Ok(ExecutionOutput {
            output,
            data: json!({
                "model": response.model,
                "stop_reason": response.stop_reason,
                "usage": response.usage,
            }),
            logs: vec![format!("response {}", response.id)],
            execution_time_ms: u64::try_from(started.elapsed().as_millis()).ok(),
        })
    }
}
