//! Agent domain model.
//!
//! An agent is an executable unit (usually a generated code stub) bound to
//! one or more subtasks. The scheduler treats its code as opaque and hands
//! it to the execution collaborators.

use serde::{Deserialize, Serialize};

/// Status of an agent. Mirrors the subtask it is currently bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Running,
    Completed,
    Error,
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an agent came from. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentSource {
    Generated,
    Github,
    Local,
}

impl AgentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Github => "github",
            Self::Local => "local",
        }
    }
}

/// Declared capability of an agent. Not enforced at runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub returns: String,
}

impl Skill {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            returns: "string".to_string(),
        }
    }
}

/// Normalized outcome of a successful agent run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub output: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub logs: Vec<String>,
    pub execution_time_ms: u64,
}

/// An executable unit bound to subtasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub skills: Vec<Skill>,
    pub status: AgentStatus,
    pub source: AgentSource,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub result: Option<AgentResult>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Agent {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        source: AgentSource,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            skills: Vec::new(),
            status: AgentStatus::default(),
            source,
            code: None,
            result: None,
            error: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_skills(mut self, skills: Vec<Skill>) -> Self {
        self.skills = skills;
        self
    }

    /// Text used by keyword matching: name, description and skill names.
    pub fn searchable_text(&self) -> String {
        let mut text = format!("{} {}", self.name, self.description);
        for skill in &self.skills {
            text.push(' ');
            text.push_str(&skill.name);
        }
        text
    }
}
