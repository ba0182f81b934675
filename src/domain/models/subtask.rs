//! Subtask domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a decomposed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubTaskStatus {
    /// Planned, not yet scheduled
    Pending,
    /// Scheduled in the current execution group, waiting for a slot
    Waiting,
    /// Currently executing
    Running,
    /// Finished successfully
    Completed,
    /// Both execution paths failed
    Error,
}

impl Default for SubTaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl SubTaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Waiting => "waiting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl std::fmt::Display for SubTaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A step as returned by a decomposition collaborator, before it is bound
/// to an agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTaskSeed {
    #[serde(default)]
    pub id: Option<String>,
    pub description: String,
    #[serde(default)]
    pub dependencies: Option<Vec<String>>,
}

impl SubTaskSeed {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: None,
            description: description.into(),
            dependencies: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = Some(ids.into_iter().map(Into::into).collect());
        self
    }
}

/// A decomposed unit of work inside a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTask {
    /// Unique within the owning task
    pub id: String,
    pub description: String,
    /// Subtask ids that must complete first
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub status: SubTaskStatus,
    /// Agent executing this step
    #[serde(default)]
    pub agent_id: Option<String>,
    /// Context handed to the agent
    #[serde(default)]
    pub input: serde_json::Value,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SubTask {
    /// Create a subtask. Duplicate dependency ids are collapsed, keeping the
    /// first occurrence.
    pub fn new(id: impl Into<String>, description: impl Into<String>, dependencies: Vec<String>) -> Self {
        let mut deduped: Vec<String> = Vec::with_capacity(dependencies.len());
        for dep in dependencies {
            if !deduped.contains(&dep) {
                deduped.push(dep);
            }
        }

        Self {
            id: id.into(),
            description: description.into(),
            dependencies: deduped,
            status: SubTaskStatus::default(),
            agent_id: None,
            input: serde_json::Value::Null,
            output: None,
            error: None,
            started_at: None,
            completed_at: None,
        }
    }

    #[must_use]
    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = input;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependencies_are_deduplicated_in_order() {
        let sub_task = SubTask::new(
            "c",
            "merge",
            vec!["b".to_string(), "a".to_string(), "b".to_string()],
        );
        assert_eq!(sub_task.dependencies, vec!["b", "a"]);
        assert_eq!(sub_task.status, SubTaskStatus::Pending);
    }

    #[test]
    fn test_seed_deserializes_with_optional_fields() {
        let seed: SubTaskSeed = serde_json::from_str(r#"{"description":"Collect data"}"#).unwrap();
        assert_eq!(seed.description, "Collect data");
        assert!(seed.id.is_none());
        assert!(seed.dependencies.is_none());

        let seed: SubTaskSeed =
            serde_json::from_str(r#"{"id":"s2","description":"Analyze","dependencies":["s1"]}"#).unwrap();
        assert_eq!(seed, SubTaskSeed::new("Analyze").with_id("s2").depends_on(["s1"]));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(SubTaskStatus::Completed.is_terminal());
        assert!(SubTaskStatus::Error.is_terminal());
        assert!(!SubTaskStatus::Waiting.is_terminal());
    }
}
