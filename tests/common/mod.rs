//! Common test utilities for integration tests
//!
//! Scripted collaborators whose behavior is keyed off markers in subtask
//! descriptions, plus a coordinator builder wired the way the CLI wires it.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskloom::adapters::{InMemoryTaskPersistence, TemplateAgentGenerator};
use taskloom::application::{SubtaskExecutor, TaskCoordinator};
use taskloom::domain::errors::{DomainError, DomainResult};
use taskloom::domain::models::{OrchestrationConfig, SubTaskSeed};
use taskloom::domain::ports::{
    Decomposer, ExecutionOutput, ExecutionRequest, PrimaryExecutor, SandboxExecutor,
    SandboxOutcome,
};
use taskloom::services::{AgentAssigner, KeywordClassifier, TaskStore};

/// Primary execution fails for descriptions containing this marker.
pub const FAIL_PRIMARY: &str = "FAIL_PRIMARY";
/// Sandbox execution fails for agent code containing this marker.
pub const FAIL_SANDBOX: &str = "FAIL_SANDBOX";

/// Returns a fixed seed list, or fails when none is given.
pub struct ScriptedDecomposer {
    seeds: Option<Vec<SubTaskSeed>>,
}

impl ScriptedDecomposer {
    pub fn returning(seeds: Vec<SubTaskSeed>) -> Self {
        Self { seeds: Some(seeds) }
    }

    pub fn failing() -> Self {
        Self { seeds: None }
    }
}

#[async_trait]
impl Decomposer for ScriptedDecomposer {
    async fn decompose(&self, _task_description: &str) -> DomainResult<Vec<SubTaskSeed>> {
        self.seeds
            .clone()
            .ok_or_else(|| DomainError::ExternalService("decomposer offline".to_string()))
    }
}

/// Primary executor that sleeps briefly, records peak parallelism and the
/// order subtasks started in.
#[derive(Default)]
pub struct RecordingExecutor {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    started: Mutex<Vec<String>>,
    delay: Duration,
}

impl RecordingExecutor {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl PrimaryExecutor for RecordingExecutor {
    async fn execute(&self, request: &ExecutionRequest) -> DomainResult<ExecutionOutput> {
        self.started
            .lock()
            .unwrap()
            .push(request.sub_task_description.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if request.sub_task_description.contains(FAIL_PRIMARY) {
            return Err(DomainError::ExecutionFailed("primary refused".to_string()));
        }
        Ok(ExecutionOutput {
            output: format!("done: {}", request.sub_task_description),
            ..ExecutionOutput::default()
        })
    }
}

#[derive(Default)]
pub struct ScriptedSandbox {
    pub calls: AtomicUsize,
}

#[async_trait]
impl SandboxExecutor for ScriptedSandbox {
    async fn execute_sandboxed(&self, agent_code: &str) -> DomainResult<SandboxOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if agent_code.contains(FAIL_SANDBOX) {
            return Ok(SandboxOutcome {
                output: String::new(),
                success: false,
                execution_time_ms: 1,
                error: Some("sandbox crashed".to_string()),
            });
        }
        Ok(SandboxOutcome {
            output: "sandbox output".to_string(),
            success: true,
            execution_time_ms: 1,
            error: None,
        })
    }
}

pub struct Harness {
    pub coordinator: TaskCoordinator,
    pub store: TaskStore,
    pub persistence: InMemoryTaskPersistence,
    pub executor: Arc<RecordingExecutor>,
    pub sandbox: Arc<ScriptedSandbox>,
}

pub fn orchestration(concurrency: usize, batch_concurrency: usize) -> OrchestrationConfig {
    OrchestrationConfig {
        concurrency,
        batch_concurrency,
        estimated_subtask_secs: 10,
        ..OrchestrationConfig::default()
    }
}

pub fn harness(decomposer: ScriptedDecomposer, config: OrchestrationConfig) -> Harness {
    let persistence = InMemoryTaskPersistence::new();
    let store = TaskStore::new(Arc::new(persistence.clone()));
    let executor = Arc::new(RecordingExecutor::with_delay(Duration::from_millis(30)));
    let sandbox = Arc::new(ScriptedSandbox::default());

    let assigner = AgentAssigner::new(
        Arc::new(TemplateAgentGenerator::new()),
        Arc::new(TemplateAgentGenerator::local()),
        config.min_keyword_overlap,
    );
    let subtask_executor = SubtaskExecutor::new(
        store.clone(),
        Arc::clone(&executor) as Arc<dyn PrimaryExecutor>,
        Arc::clone(&sandbox) as Arc<dyn SandboxExecutor>,
    );
    let coordinator = TaskCoordinator::new(
        store.clone(),
        Arc::new(KeywordClassifier),
        Arc::new(decomposer),
        Arc::new(assigner),
        Arc::new(subtask_executor),
        config,
    );

    Harness {
        coordinator,
        store,
        persistence,
        executor,
        sandbox,
    }
}

pub fn seed(id: &str, description: &str, deps: &[&str]) -> SubTaskSeed {
    SubTaskSeed::new(description)
        .with_id(id)
        .depends_on(deps.iter().copied())
}
