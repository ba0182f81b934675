//! Deterministic agent fabrication from subtask descriptions.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Agent, AgentSource, Skill};
use crate::domain::ports::AgentGenerator;
use crate::services::agent_assigner::keywords;

const MAX_NAME_WORDS: usize = 3;

/// Builds an agent whose name and skills come from the description's
/// keywords and whose code is a Python stub printing a JSON result line.
#[derive(Debug, Clone)]
pub struct TemplateAgentGenerator {
    source: AgentSource,
}

impl TemplateAgentGenerator {
    pub fn new() -> Self {
        Self {
            source: AgentSource::Generated,
        }
    }

    /// Generator used when the primary generator fails.
    pub fn local() -> Self {
        Self {
            source: AgentSource::Local,
        }
    }

    pub fn build(&self, description: &str) -> Agent {
        let words = ordered_keywords(description);
        let picked: Vec<&str> = words.iter().take(MAX_NAME_WORDS).map(String::as_str).collect();

        let slug = if picked.is_empty() {
            "agent".to_string()
        } else {
            picked.join("-")
        };
        let name = if picked.is_empty() {
            "General Agent".to_string()
        } else {
            let mut title: Vec<String> = picked.iter().map(|w| capitalize(w)).collect();
            title.push("Agent".to_string());
            title.join(" ")
        };
        let skills = picked
            .iter()
            .map(|word| Skill::new(format!("{word}_step")))
            .collect();

        Agent::new(
            format!("{}-{slug}", self.source.as_str()),
            name.clone(),
            format!("Handles: {description}"),
            self.source,
        )
        .with_skills(skills)
        .with_code(render_stub(&name, description, None))
    }
}

impl Default for TemplateAgentGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentGenerator for TemplateAgentGenerator {
    async fn generate(&self, sub_task_description: &str) -> DomainResult<Agent> {
        Ok(self.build(sub_task_description))
    }
}

/// Python source for an agent stub. Strings are embedded as JSON literals,
/// which Python accepts verbatim.
pub fn render_stub(name: &str, description: &str, reference: Option<&str>) -> String {
    let quote = |s: &str| serde_json::Value::from(s).to_string();
    format!(
        r#"import json

AGENT = {name}
SUBTASK = {description}
REFERENCE = {reference}


def run():
    result = {{"agent": AGENT, "result": "completed: " + SUBTASK}}
    if REFERENCE:
        result["reference"] = REFERENCE
    return result


if __name__ == "__main__":
    print(json.dumps(run()))
"#,
        name = quote(name),
        description = quote(description),
        reference = reference.map_or_else(|| "None".to_string(), quote),
    )
}

/// Keywords in order of first appearance.
fn ordered_keywords(text: &str) -> Vec<String> {
    let wanted = keywords(text);
    let mut seen = HashSet::new();
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|word| wanted.contains(word) && seen.insert(word.clone()))
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
