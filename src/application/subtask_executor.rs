//! Subtask executor: runs one subtask through its bound agent.
//!
//! The primary executor is tried first; on error the sandbox runs the agent
//! code locally. A sandbox outcome with `success == false` counts as a
//! failure. Every transition is a single [`TaskStore::update`], so each one
//! is logged, observed and persisted.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AgentResult, AgentStatus, LogEntry, SubTaskStatus, Task};
use crate::domain::ports::{ExecutionRequest, PrimaryExecutor, SandboxExecutor};
use crate::services::task_store::TaskStore;

/// Everything captured at start time, carried into the settle step.
struct Started {
    agent_id: String,
    agent_name: String,
    request: ExecutionRequest,
}

pub struct SubtaskExecutor {
    store: TaskStore,
    primary: Arc<dyn PrimaryExecutor>,
    sandbox: Arc<dyn SandboxExecutor>,
}

impl SubtaskExecutor {
    pub fn new(
        store: TaskStore,
        primary: Arc<dyn PrimaryExecutor>,
        sandbox: Arc<dyn SandboxExecutor>,
    ) -> Self {
        Self {
            store,
            primary,
            sandbox,
        }
    }

    /// Execute one subtask and return the status it settled in.
    ///
    /// Executor failures never escape; only store errors (unknown task or
    /// subtask) do.
    #[instrument(skip(self))]
    pub async fn execute(&self, task_id: Uuid, sub_task_id: &str) -> DomainResult<SubTaskStatus> {
        let Some(started) = self
            .store
            .update(task_id, |task| start(task, sub_task_id))
            .await?
        else {
            return Ok(SubTaskStatus::Error);
        };

        let clock = Instant::now();
        let outcome = match self.primary.execute(&started.request).await {
            Ok(output) => Ok(AgentResult {
                output: output.output,
                data: output.data,
                logs: output.logs,
                execution_time_ms: output
                    .execution_time_ms
                    .unwrap_or_else(|| elapsed_ms(clock)),
            }),
            Err(primary_err) => {
                self.store
                    .update(task_id, |task| {
                        task.append_log(
                            LogEntry::warn(format!(
                                "Primary execution failed for {sub_task_id}: {primary_err}; trying sandbox"
                            ))
                            .with_sub_task(sub_task_id)
                            .with_agent(Some(started.agent_id.as_str())),
                        );
                        Ok(())
                    })
                    .await?;
                self.run_sandboxed(&started.request.agent_code).await
            }
        };

        self.store
            .update(task_id, |task| settle(task, sub_task_id, &started, outcome))
            .await
    }

    async fn run_sandboxed(&self, agent_code: &str) -> Result<AgentResult, String> {
        match self.sandbox.execute_sandboxed(agent_code).await {
            Ok(outcome) if outcome.success => Ok(AgentResult {
                output: outcome.output,
                data: serde_json::Value::Null,
                logs: Vec::new(),
                execution_time_ms: outcome.execution_time_ms,
            }),
            Ok(outcome) => Err(outcome
                .error
                .unwrap_or_else(|| "sandbox run reported failure".to_string())),
            Err(err) => Err(err.to_string()),
        }
    }
}

fn elapsed_ms(clock: Instant) -> u64 {
    u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Mark the subtask and its agent running and build the request.
///
/// Returns `None` when no agent is bound; the subtask is failed in place.
fn start(task: &mut Task, sub_task_id: &str) -> DomainResult<Option<Started>> {
    let sub_task = task
        .sub_task(sub_task_id)
        .cloned()
        .ok_or_else(|| DomainError::SubTaskNotFound {
            task_id: task.id,
            sub_task_id: sub_task_id.to_string(),
        })?;

    let Some(agent) = task.agent_for(&sub_task).cloned() else {
        let message = format!("No agent bound to subtask {sub_task_id}");
        let entry = task.sub_task_mut(sub_task_id)?;
        entry.status = SubTaskStatus::Error;
        entry.error = Some(message.clone());
        entry.completed_at = Some(Utc::now());
        task.append_log(LogEntry::error(message).with_sub_task(sub_task_id));
        return Ok(None);
    };

    let upstream: serde_json::Map<String, serde_json::Value> = sub_task
        .dependencies
        .iter()
        .filter_map(|dep| task.sub_task(dep))
        .map(|dep| {
            let value = match (dep.status, &dep.output, &dep.error) {
                (SubTaskStatus::Completed, Some(output), _) => json!({ "output": output }),
                (_, _, Some(error)) => json!({ "error": error }),
                _ => json!({ "status": dep.status.as_str() }),
            };
            (dep.id.clone(), value)
        })
        .collect();

    let failed_upstream: Vec<&str> = sub_task
        .dependencies
        .iter()
        .filter_map(|dep| task.sub_task(dep))
        .filter(|dep| dep.status == SubTaskStatus::Error)
        .map(|dep| dep.id.as_str())
        .collect();
    if !failed_upstream.is_empty() {
        let message = format!(
            "Subtask {sub_task_id} runs although dependencies failed: {}",
            failed_upstream.join(", ")
        );
        task.append_log(LogEntry::warn(message).with_sub_task(sub_task_id));
    }

    let request = ExecutionRequest {
        agent_code: agent.code.clone().unwrap_or_default(),
        sub_task_description: sub_task.description.clone(),
        input: sub_task.input.clone(),
        context: json!({
            "task_description": task.description,
            "agent_name": agent.name,
            "upstream": upstream,
        }),
    };

    let entry = task.sub_task_mut(sub_task_id)?;
    entry.status = SubTaskStatus::Running;
    entry.started_at = Some(Utc::now());
    if let Some(bound) = task.agent_mut(&agent.id) {
        bound.status = AgentStatus::Running;
    }
    task.append_log(
        LogEntry::info(format!("Running {} with agent {}", sub_task.description, agent.name))
            .with_sub_task(sub_task_id)
            .with_agent(Some(agent.id.as_str())),
    );

    Ok(Some(Started {
        agent_id: agent.id,
        agent_name: agent.name,
        request,
    }))
}

fn settle(
    task: &mut Task,
    sub_task_id: &str,
    started: &Started,
    outcome: Result<AgentResult, String>,
) -> DomainResult<SubTaskStatus> {
    let now = Utc::now();
    let status = match outcome {
        Ok(result) => {
            let entry = task.sub_task_mut(sub_task_id)?;
            entry.status = SubTaskStatus::Completed;
            entry.output = Some(result.output.clone());
            entry.completed_at = Some(now);
            if let Some(agent) = task.agent_mut(&started.agent_id) {
                agent.status = AgentStatus::Completed;
                agent.result = Some(result);
            }
            task.append_log(
                LogEntry::success(format!("Agent {} completed {sub_task_id}", started.agent_name))
                    .with_sub_task(sub_task_id)
                    .with_agent(Some(started.agent_id.as_str())),
            );
            SubTaskStatus::Completed
        }
        Err(message) => {
            let entry = task.sub_task_mut(sub_task_id)?;
            entry.status = SubTaskStatus::Error;
            entry.error = Some(message.clone());
            entry.completed_at = Some(now);
            if let Some(agent) = task.agent_mut(&started.agent_id) {
                agent.status = AgentStatus::Error;
                agent.error = Some(message.clone());
            }
            task.append_log(
                LogEntry::error(format!("Subtask {sub_task_id} failed: {message}"))
                    .with_sub_task(sub_task_id)
                    .with_agent(Some(started.agent_id.as_str())),
            );
            SubTaskStatus::Error
        }
    };
    Ok(status)
}
