//! Wiring of the store and coordinator from configuration.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::adapters::{
    GithubAgentDiscovery, InMemoryTaskPersistence, LlmClient, LlmDecomposer, LlmExecutor,
    OfflineDecomposer, OfflineExecutor, ProcessSandbox, SqliteTaskPersistence,
    TemplateAgentGenerator,
};
use crate::application::{SubtaskExecutor, TaskCoordinator};
use crate::domain::models::{Config, PersistenceBackend};
use crate::domain::ports::{Decomposer, PrimaryExecutor, TaskPersistence};
use crate::services::{AgentAssigner, KeywordClassifier, TaskStore};

/// Open the configured persistence backend and load existing tasks.
pub async fn open_store(config: &Config) -> Result<TaskStore> {
    let persistence: Arc<dyn TaskPersistence> = match config.persistence.backend {
        PersistenceBackend::Sqlite => Arc::new(
            SqliteTaskPersistence::connect(&config.persistence)
                .await
                .with_context(|| format!("Failed to open database {}", config.persistence.path))?,
        ),
        PersistenceBackend::Memory => Arc::new(InMemoryTaskPersistence::new()),
    };

    let store = TaskStore::new(persistence);
    let loaded = store.init().await.context("Failed to load tasks")?;
    info!(loaded, "Task store ready");
    Ok(store)
}

/// Build a coordinator over `store`.
///
/// Without an API key, or with `offline`, decomposition falls back to the
/// static templates and primary execution to the offline echo.
pub fn build_coordinator(config: &Config, store: TaskStore, offline: bool) -> Result<TaskCoordinator> {
    let llm = if offline {
        None
    } else {
        match LlmClient::new(&config.llm) {
            Ok(client) => Some(Arc::new(client)),
            Err(err) => {
                warn!(error = %err, "LLM client unavailable, running offline");
                None
            }
        }
    };

    let (decomposer, primary): (Arc<dyn Decomposer>, Arc<dyn PrimaryExecutor>) = match llm {
        Some(client) => (
            Arc::new(LlmDecomposer::new(Arc::clone(&client))),
            Arc::new(LlmExecutor::new(client)),
        ),
        None => (Arc::new(OfflineDecomposer), Arc::new(OfflineExecutor)),
    };

    let mut assigner = AgentAssigner::new(
        Arc::new(TemplateAgentGenerator::new()),
        Arc::new(TemplateAgentGenerator::local()),
        config.orchestration.min_keyword_overlap,
    );
    if config.discovery.enabled && !offline {
        assigner = assigner.with_discovery(Arc::new(GithubAgentDiscovery::new(&config.discovery)?));
    }

    let executor = SubtaskExecutor::new(
        store.clone(),
        primary,
        Arc::new(ProcessSandbox::new(&config.sandbox)),
    );

    Ok(TaskCoordinator::new(
        store,
        Arc::new(KeywordClassifier),
        decomposer,
        Arc::new(assigner),
        Arc::new(executor),
        config.orchestration.clone(),
    ))
}
