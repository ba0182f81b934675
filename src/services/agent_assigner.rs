//! Binds exactly one agent to every subtask.
//!
//! Discovery is tried first; a discovered agent is used only when it shares
//! enough keywords with the subtask. Otherwise an agent is generated, and if
//! generation fails the local fallback generator is used.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Agent, SubTask};
use crate::domain::ports::{AgentDiscovery, AgentGenerator};

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "into", "about", "your", "you", "are",
    "was", "will", "have", "has", "its", "all", "any", "our", "their", "them", "then", "than",
];

/// Lowercase word tokens of length >= 3, minus stop words.
pub fn keywords(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= 3)
        .map(str::to_lowercase)
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .collect()
}

pub fn keyword_overlap(a: &str, b: &str) -> usize {
    let left = keywords(a);
    keywords(b).iter().filter(|word| left.contains(*word)).count()
}

pub struct AgentAssigner {
    discovery: Option<Arc<dyn AgentDiscovery>>,
    generator: Arc<dyn AgentGenerator>,
    fallback: Arc<dyn AgentGenerator>,
    min_keyword_overlap: usize,
}

impl AgentAssigner {
    pub fn new(
        generator: Arc<dyn AgentGenerator>,
        fallback: Arc<dyn AgentGenerator>,
        min_keyword_overlap: usize,
    ) -> Self {
        Self {
            discovery: None,
            generator,
            fallback,
            min_keyword_overlap,
        }
    }

    #[must_use]
    pub fn with_discovery(mut self, discovery: Arc<dyn AgentDiscovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// Pick or create an agent for one subtask description.
    pub async fn assign(&self, description: &str) -> DomainResult<Agent> {
        if let Some(agent) = self.discover(description).await {
            return Ok(agent);
        }

        match self.generator.generate(description).await {
            Ok(agent) => Ok(agent),
            Err(err) => {
                warn!(error = %err, "Agent generation failed, using local template");
                self.fallback
                    .generate(description)
                    .await
                    .map_err(|e| DomainError::AssignmentFailed(e.to_string()))
            }
        }
    }

    async fn discover(&self, description: &str) -> Option<Agent> {
        let discovery = self.discovery.as_ref()?;
        let candidates = match discovery.discover(description).await {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(error = %err, "Agent discovery failed");
                return None;
            }
        };

        let chosen = candidates.into_iter().find(|agent| {
            keyword_overlap(description, &agent.searchable_text()) >= self.min_keyword_overlap
        });
        if let Some(agent) = &chosen {
            debug!(agent = %agent.name, "Using discovered agent");
        }
        chosen
    }

    /// Assign agents to every subtask, in order.
    ///
    /// Sets each subtask's `agent_id` and returns the agents. Agent IDs are
    /// made unique within the set.
    pub async fn assign_all(&self, sub_tasks: &mut [SubTask]) -> DomainResult<Vec<Agent>> {
        let mut agents: Vec<Agent> = Vec::with_capacity(sub_tasks.len());
        let mut taken: HashSet<String> = HashSet::new();

        for sub_task in sub_tasks.iter_mut() {
            let mut agent = self.assign(&sub_task.description).await?;
            if !taken.insert(agent.id.clone()) {
                agent.id = format!("{}-{}", agent.id, sub_task.id);
                taken.insert(agent.id.clone());
            }
            sub_task.agent_id = Some(agent.id.clone());
            agents.push(agent);
        }

        Ok(agents)
    }
}

impl std::fmt::Debug for AgentAssigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentAssigner")
            .field("discovery", &self.discovery.is_some())
            .field("min_keyword_overlap", &self.min_keyword_overlap)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::AgentSource;
    use async_trait::async_trait;

    struct FixedGenerator {
        source: AgentSource,
        fail: bool,
    }

    #[async_trait]
    impl AgentGenerator for FixedGenerator {
        async fn generate(&self, description: &str) -> DomainResult<Agent> {
            if self.fail {
                return Err(DomainError::ExternalService("generator offline".to_string()));
            }
            Ok(Agent::new("generated", description, description, self.source))
        }
    }

    struct StaticDiscovery(DomainResult<Vec<Agent>>);

    #[async_trait]
    impl AgentDiscovery for StaticDiscovery {
        async fn discover(&self, _query: &str) -> DomainResult<Vec<Agent>> {
            match &self.0 {
                Ok(agents) => Ok(agents.clone()),
                Err(err) => Err(DomainError::ExternalService(err.to_string())),
            }
        }
    }

    fn assigner(generator_fails: bool) -> AgentAssigner {
        AgentAssigner::new(
            Arc::new(FixedGenerator { source: AgentSource::Generated, fail: generator_fails }),
            Arc::new(FixedGenerator { source: AgentSource::Local, fail: false }),
            2,
        )
    }

    #[test]
    fn test_keywords_filter_short_and_stop_words() {
        let words = keywords("Scrape the NEWS from a site, and parse it");
        let mut sorted: Vec<_> = words.into_iter().collect();
        sorted.sort();
        assert_eq!(sorted, vec!["news", "parse", "scrape", "site"]);
        assert_eq!(keyword_overlap("scrape news sites", "news scrape tool"), 2);
    }

    #[tokio::test]
    async fn test_prefers_matching_discovered_agent() {
        let discovered = vec![
            Agent::new("gh-1", "weather-bot", "forecasts", AgentSource::Github),
            Agent::new("gh-2", "news-scraper", "scrape news headlines", AgentSource::Github),
        ];
        let assigner = assigner(false).with_discovery(Arc::new(StaticDiscovery(Ok(discovered))));

        let agent = assigner.assign("Scrape today's news headlines").await.unwrap();
        assert_eq!(agent.id, "gh-2");
    }

    #[tokio::test]
    async fn test_weak_match_falls_through_to_generator() {
        let discovered = vec![Agent::new("gh-1", "news-bot", "misc", AgentSource::Github)];
        let assigner = assigner(false).with_discovery(Arc::new(StaticDiscovery(Ok(discovered))));

        let agent = assigner.assign("Scrape news headlines").await.unwrap();
        assert_eq!(agent.source, AgentSource::Generated);
    }

    #[tokio::test]
    async fn test_discovery_error_and_generator_error_use_fallback() {
        let assigner = assigner(true).with_discovery(Arc::new(StaticDiscovery(Err(
            DomainError::ExternalService("rate limited".to_string()),
        ))));

        let agent = assigner.assign("Draft an outline").await.unwrap();
        assert_eq!(agent.source, AgentSource::Local);
    }

    #[tokio::test]
    async fn test_assign_all_binds_unique_agents() {
        let mut sub_tasks = vec![
            SubTask::new("a", "first step", vec![]),
            SubTask::new("b", "second step", vec![]),
        ];
        let agents = assigner(false).assign_all(&mut sub_tasks).await.unwrap();

        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].id, "generated");
        assert_eq!(agents[1].id, "generated-b");
        assert_eq!(sub_tasks[1].agent_id.as_deref(), Some("generated-b"));
    }
}
