//! Task classification labels.
//!
//! Type and complexity are only used to pick a fallback decomposition
//! template when the decomposition collaborator is unavailable.

use serde::{Deserialize, Serialize};

/// Broad kind of work a task asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Research,
    Development,
    Analysis,
    Writing,
    General,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Development => "development",
            Self::Analysis => "analysis",
            Self::Writing => "writing",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rough size of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

impl Default for Complexity {
    fn default() -> Self {
        Self::Medium
    }
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Medium => "medium",
            Self::Complex => "complex",
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a [`TaskClassifier`](crate::domain::ports::TaskClassifier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub task_type: TaskType,
    pub complexity: Complexity,
}

impl Classification {
    pub const fn new(task_type: TaskType, complexity: Complexity) -> Self {
        Self {
            task_type,
            complexity,
        }
    }
}
