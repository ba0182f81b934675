//! Task domain model.
//!
//! A task is the unit of user work. It moves through a fixed lifecycle
//! (`pending -> analyzing -> planning -> executing -> completed | error`),
//! owns the subtasks and agents produced during planning, and keeps an
//! append-only log of everything that happened to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::agent::Agent;
use super::classification::{Complexity, TaskType};
use super::subtask::{SubTask, SubTaskStatus};
use crate::domain::errors::{DomainError, DomainResult};

/// Lifecycle phase of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Submitted, nothing has run yet
    Pending,
    /// Classifying type and complexity
    Analyzing,
    /// Decomposing into subtasks and assigning agents
    Planning,
    /// Running execution groups
    Executing,
    /// All groups settled and the report is available
    Completed,
    /// An unrecovered error stopped the pipeline
    Error,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Analyzing => "analyzing",
            Self::Planning => "planning",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "analyzing" => Some(Self::Analyzing),
            "planning" => Some(Self::Planning),
            "executing" => Some(Self::Executing),
            "completed" | "complete" => Some(Self::Completed),
            "error" | "failed" => Some(Self::Error),
            _ => None,
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Valid transitions from this status.
    pub fn valid_transitions(&self) -> Vec<TaskStatus> {
        match self {
            Self::Pending => vec![Self::Analyzing],
            Self::Analyzing => vec![Self::Planning, Self::Error],
            Self::Planning => vec![Self::Executing, Self::Error],
            Self::Executing => vec![Self::Completed, Self::Error],
            Self::Completed | Self::Error => vec![],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a user-facing log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Success,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Success => "success",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line in a task's log stream. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            sub_task_id: None,
            agent_id: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    #[must_use]
    pub fn with_sub_task(mut self, sub_task_id: impl Into<String>) -> Self {
        self.sub_task_id = Some(sub_task_id.into());
        self
    }

    #[must_use]
    pub fn with_agent(mut self, agent_id: Option<&str>) -> Self {
        self.agent_id = agent_id.map(str::to_string);
        self
    }
}

/// A user-submitted unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: Uuid,
    /// Free-text description as submitted
    pub description: String,
    /// Current lifecycle phase
    pub status: TaskStatus,
    /// Type label computed during analysis
    #[serde(default)]
    pub task_type: Option<TaskType>,
    /// Complexity label computed during analysis
    #[serde(default)]
    pub complexity: Option<Complexity>,
    /// Batch-style work that should run under the lower concurrency bound
    #[serde(default)]
    pub resource_intensive: bool,
    /// Decomposed steps, populated once during planning
    #[serde(default)]
    pub sub_tasks: Vec<SubTask>,
    /// Agents bound to the subtasks, populated once during planning
    #[serde(default)]
    pub agents: Vec<Agent>,
    /// Append-only log stream
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Aggregated report, only set on successful completion
    pub result: Option<String>,
}

impl Task {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            status: TaskStatus::default(),
            task_type: None,
            complexity: None,
            resource_intensive: false,
            sub_tasks: Vec::new(),
            agents: Vec::new(),
            logs: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
        }
    }

    /// Mark the task as batch-style work.
    #[must_use]
    pub fn with_resource_intensive(mut self, resource_intensive: bool) -> Self {
        self.resource_intensive = resource_intensive;
        self
    }

    /// Move to `next`, enforcing the lifecycle.
    ///
    /// `started_at` is stamped on entry into `executing`, `completed_at` on
    /// entry into either terminal state.
    pub fn transition_to(&mut self, next: TaskStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }

        let now = Utc::now();
        if next == TaskStatus::Executing && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if next.is_terminal() {
            self.completed_at = Some(now);
        }
        self.status = next;
        Ok(())
    }

    /// Append a log entry, mirroring it to tracing.
    pub fn append_log(&mut self, entry: LogEntry) {
        let sub_task = entry.sub_task_id.as_deref().unwrap_or("-");
        match entry.level {
            LogLevel::Info | LogLevel::Success => {
                tracing::info!(task_id = %self.id, sub_task, log_level = %entry.level, "{}", entry.message);
            }
            LogLevel::Warn => tracing::warn!(task_id = %self.id, sub_task, "{}", entry.message),
            LogLevel::Error => tracing::error!(task_id = %self.id, sub_task, "{}", entry.message),
        }
        self.logs.push(entry);
    }

    /// Install the planned subtasks and agents.
    ///
    /// Membership is fixed once set; a second call is rejected.
    pub fn install_plan(&mut self, sub_tasks: Vec<SubTask>, agents: Vec<Agent>) -> DomainResult<()> {
        if !self.sub_tasks.is_empty() || !self.agents.is_empty() {
            return Err(DomainError::ValidationFailed(format!(
                "task {} already has a plan",
                self.id
            )));
        }
        if sub_tasks.is_empty() {
            return Err(DomainError::ValidationFailed(
                "a plan needs at least one subtask".to_string(),
            ));
        }
        for sub_task in &sub_tasks {
            match sub_task.agent_id.as_deref() {
                Some(agent_id) if agents.iter().any(|a| a.id == agent_id) => {}
                Some(agent_id) => return Err(DomainError::AgentNotFound(agent_id.to_string())),
                None => {
                    return Err(DomainError::ValidationFailed(format!(
                        "subtask {} has no agent",
                        sub_task.id
                    )))
                }
            }
        }
        self.sub_tasks = sub_tasks;
        self.agents = agents;
        Ok(())
    }

    pub fn sub_task(&self, id: &str) -> Option<&SubTask> {
        self.sub_tasks.iter().find(|s| s.id == id)
    }

    pub fn sub_task_mut(&mut self, id: &str) -> DomainResult<&mut SubTask> {
        let task_id = self.id;
        self.sub_tasks
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| DomainError::SubTaskNotFound {
                task_id,
                sub_task_id: id.to_string(),
            })
    }

    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn agent_mut(&mut self, id: &str) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|a| a.id == id)
    }

    /// The agent bound to a subtask, if any.
    pub fn agent_for(&self, sub_task: &SubTask) -> Option<&Agent> {
        sub_task.agent_id.as_deref().and_then(|id| self.agent(id))
    }

    pub fn count_sub_tasks(&self, status: SubTaskStatus) -> usize {
        self.sub_tasks.iter().filter(|s| s.status == status).count()
    }
}
