use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::client::LlmClient;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::SubTaskSeed;
use crate::domain::ports::Decomposer;

const SYSTEM_PROMPT: &str = "You break a task into small, independently executable subtasks. \
Reply with a JSON array only. Each element has an \"id\" (short slug), a \"description\" \
and a \"dependencies\" array listing the ids it needs first.";

/// Decomposition through the Messages API.
pub struct LlmDecomposer {
    client: Arc<LlmClient>,
}

impl LlmDecomposer {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Decomposer for LlmDecomposer {
    #[instrument(skip(self))]
    async fn decompose(&self, task_description: &str) -> DomainResult<Vec<SubTaskSeed>> {
        let prompt = format!("Task:\n{task_description}\n\nReturn the subtasks as a JSON array.");
        let response = self.client.complete(Some(SYSTEM_PROMPT), &prompt).await?;
        let seeds = parse_seeds(&response.text())?;
        debug!(count = seeds.len(), "Decomposed task");
        Ok(seeds)
    }
}

/// Parse the first JSON array of seeds found anywhere in `text`.
pub fn parse_seeds(text: &str) -> DomainResult<Vec<SubTaskSeed>> {
    let mut from = 0;
    while let Some(offset) = text[from..].find('[') {
        let start = from + offset;
        if let Some(candidate) = balanced_array(&text[start..]) {
            if let Ok(seeds) = serde_json::from_str::<Vec<SubTaskSeed>>(candidate) {
                return Ok(seeds);
            }
        }
        from = start + 1;
    }
    Err(DomainError::DecompositionFailed(
        "no JSON array of subtasks in response".to_string(),
    ))
}

/// The bracket-balanced prefix of `text`, which must start with `[`.
fn balanced_array(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=index]);
                }
            }
            _ => {}
        }
    }
    None
}
