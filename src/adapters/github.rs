//! Agent discovery through the GitHub repository search API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::templates::render_stub;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Agent, AgentSource, DiscoveryConfig, Skill};
use crate::domain::ports::AgentDiscovery;
use crate::services::agent_assigner::keywords;

const MAX_QUERY_TERMS: usize = 5;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Repository>,
}

#[derive(Debug, Deserialize)]
struct Repository {
    full_name: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    html_url: String,
    #[serde(default)]
    topics: Vec<String>,
}

impl Repository {
    fn into_agent(self) -> Agent {
        let description = self.description.unwrap_or_default();
        let code = render_stub(&self.name, &description, Some(&self.html_url));
        Agent::new(
            format!("github-{}", self.full_name.replace('/', "-")),
            self.name,
            description,
            AgentSource::Github,
        )
        .with_skills(self.topics.into_iter().map(Skill::new).collect())
        .with_code(code)
    }
}

pub struct GithubAgentDiscovery {
    http: Client,
    base_url: String,
    max_results: usize,
}

impl GithubAgentDiscovery {
    pub fn new(config: &DiscoveryConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("taskloom"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        if let Some(token) = config.resolved_token() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .context("GitHub token is not a valid header value")?,
            );
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_results: config.max_results,
        })
    }

    /// Search terms for a description: its keywords, sorted, capped.
    fn query_for(description: &str) -> Option<String> {
        let mut terms: Vec<String> = keywords(description).into_iter().collect();
        terms.sort();
        terms.truncate(MAX_QUERY_TERMS);
        (!terms.is_empty()).then(|| terms.join(" "))
    }
}

#[async_trait]
impl AgentDiscovery for GithubAgentDiscovery {
    #[instrument(skip(self))]
    async fn discover(&self, query: &str) -> DomainResult<Vec<Agent>> {
        let Some(terms) = Self::query_for(query) else {
            return Ok(Vec::new());
        };

        let per_page = self.max_results.to_string();
        let response = self
            .http
            .get(format!("{}/search/repositories", self.base_url))
            .query(&[("q", terms.as_str()), ("per_page", per_page.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::ExternalService(format!(
                "GitHub search failed with {status}: {body}"
            )));
        }

        let found: SearchResponse = response.json().await?;
        debug!(count = found.items.len(), "GitHub search results");
        Ok(found
            .items
            .into_iter()
            .take(self.max_results)
            .map(Repository::into_agent)
            .collect())
    }
}
