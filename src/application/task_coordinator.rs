use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::application::subtask_executor::SubtaskExecutor;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Classification, LogEntry, OrchestrationConfig, SubTask, SubTaskSeed, SubTaskStatus, Task,
    TaskStatus,
};
use crate::domain::ports::{Decomposer, TaskClassifier};
use crate::services::agent_assigner::AgentAssigner;
use crate::services::concurrency_limiter::ConcurrencyLimiter;
use crate::services::dependency_grouper::DependencyGrouper;
use crate::services::execution_plan::ExecutionPlan;
use crate::services::fallback_templates::template_for;
use crate::services::result_aggregator::aggregate;
use crate::services::task_store::TaskStore;

/// Planning preview: what a run would do, without executing anything.
#[derive(Debug, Clone)]
pub struct PlanPreview {
    pub classification: Classification,
    pub sub_tasks: Vec<SubTask>,
    pub plan: ExecutionPlan,
}

/// Drives a task through its lifecycle.
///
/// `pending -> analyzing -> planning -> executing -> completed`, with any
/// error escaping a phase moving the task to `error`. Groups of the
/// execution plan run one after another; the members of a group are
/// dispatched through a [`ConcurrencyLimiter`] and awaited together.
///
/// # Examples
///
/// ```no_run
/// use taskloom::application::TaskCoordinator;
/// use taskloom::domain::models::Task;
///
/// async fn example(coordinator: &TaskCoordinator) -> taskloom::domain::DomainResult<()> {
///     let id = coordinator.submit(Task::new("Research tide tables")).await;
///     let task = coordinator.run(id).await?;
///     println!("{}", task.result.unwrap_or_default());
///     Ok(())
/// }
/// ```
pub struct TaskCoordinator {
    store: TaskStore,
    classifier: Arc<dyn TaskClassifier>,
    decomposer: Arc<dyn Decomposer>,
    assigner: Arc<AgentAssigner>,
    executor: Arc<SubtaskExecutor>,
    grouper: DependencyGrouper,
    config: OrchestrationConfig,
}

impl TaskCoordinator {
    pub fn new(
        store: TaskStore,
        classifier: Arc<dyn TaskClassifier>,
        decomposer: Arc<dyn Decomposer>,
        assigner: Arc<AgentAssigner>,
        executor: Arc<SubtaskExecutor>,
        config: OrchestrationConfig,
    ) -> Self {
        Self {
            store,
            classifier,
            decomposer,
            assigner,
            executor,
            grouper: DependencyGrouper::new(),
            config,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Register a task without running it.
    pub async fn submit(&self, task: Task) -> Uuid {
        self.store.create(task).await
    }

    /// Run every phase of a task and return its final snapshot.
    ///
    /// Phase failures are recorded on the task (status `error` plus an error
    /// log) rather than returned; only an unknown task is an `Err`.
    #[instrument(skip(self))]
    pub async fn run(&self, task_id: Uuid) -> DomainResult<Task> {
        if let Err(err) = self.drive(task_id).await {
            error!(task_id = %task_id, error = %err, "Task failed");
            self.fail(task_id, &err.to_string()).await?;
        }
        self.store
            .get(task_id)
            .await
            .ok_or(DomainError::TaskNotFound(task_id))
    }

    /// Record that a run was abandoned before it finished.
    ///
    /// A task that has not started analysis, or has already finished, is
    /// left as it is.
    pub async fn mark_interrupted(&self, task_id: Uuid) -> DomainResult<()> {
        self.fail(task_id, "interrupted").await
    }

    async fn drive(&self, task_id: Uuid) -> DomainResult<()> {
        let classification = self.analyze(task_id).await?;
        self.plan(task_id, classification).await?;
        self.execute(task_id).await?;
        self.finish(task_id).await
    }

    #[instrument(skip(self))]
    async fn analyze(&self, task_id: Uuid) -> DomainResult<Classification> {
        let description = self
            .store
            .update(task_id, |task| {
                task.transition_to(TaskStatus::Analyzing)?;
                task.append_log(LogEntry::info("Analyzing task"));
                Ok(task.description.clone())
            })
            .await?;

        let classification = self.classifier.classify(&description);
        self.store
            .update(task_id, |task| {
                task.task_type = Some(classification.task_type);
                task.complexity = Some(classification.complexity);
                task.append_log(LogEntry::info(format!(
                    "Classified as {} ({})",
                    classification.task_type, classification.complexity
                )));
                Ok(())
            })
            .await?;

        Ok(classification)
    }

    #[instrument(skip(self))]
    async fn plan(&self, task_id: Uuid, classification: Classification) -> DomainResult<()> {
        let description = self
            .store
            .update(task_id, |task| {
                task.transition_to(TaskStatus::Planning)?;
                task.append_log(LogEntry::info("Decomposing task"));
                Ok(task.description.clone())
            })
            .await?;

        let seeds = match self.decomposer.decompose(&description).await {
            Ok(seeds) if seeds.iter().any(|s| !s.description.trim().is_empty()) => seeds,
            outcome => {
                let reason = match outcome {
                    Err(err) => err.to_string(),
                    Ok(_) => "decomposition returned no subtasks".to_string(),
                };
                self.store
                    .update(task_id, |task| {
                        task.append_log(LogEntry::warn(format!(
                            "Decomposition unavailable ({reason}); using {} template",
                            classification.task_type
                        )));
                        Ok(())
                    })
                    .await?;
                template_for(classification.task_type, classification.complexity)
            }
        };

        let mut sub_tasks = seeds_to_sub_tasks(&description, classification, seeds);
        let agents = self.assigner.assign_all(&mut sub_tasks).await?;

        self.store
            .update(task_id, |task| {
                let count = sub_tasks.len();
                task.install_plan(sub_tasks, agents)?;
                task.append_log(LogEntry::info(format!("Planned {count} subtasks")));
                Ok(())
            })
            .await
    }

    #[instrument(skip(self))]
    async fn execute(&self, task_id: Uuid) -> DomainResult<()> {
        let task = self
            .store
            .get(task_id)
            .await
            .ok_or(DomainError::TaskNotFound(task_id))?;

        let concurrency = self.config.concurrency_for(task.resource_intensive);
        let plan = self.grouper.build_plan(
            &task.sub_tasks,
            concurrency,
            Duration::from_secs(self.config.estimated_subtask_secs),
        );
        let limiter = ConcurrencyLimiter::new(concurrency)
            .map_err(|e| DomainError::ValidationFailed(e.to_string()))?;

        self.store
            .update(task_id, |task| {
                task.transition_to(TaskStatus::Executing)?;
                task.append_log(LogEntry::info(format!(
                    "Executing {} subtasks in {} groups (concurrency {concurrency}, estimated {}s)",
                    plan.total_sub_tasks(),
                    plan.total_groups(),
                    plan.estimated_time.as_secs()
                )));
                for unresolved in &plan.unresolved_dependencies {
                    task.append_log(
                        LogEntry::warn(format!(
                            "Dependency {} of {} is not a known subtask; treating it as satisfied",
                            unresolved.missing, unresolved.sub_task_id
                        ))
                        .with_sub_task(unresolved.sub_task_id.clone()),
                    );
                }
                for level in plan.forced_groups() {
                    task.append_log(LogEntry::warn(format!(
                        "Dependency cycle detected; group {} runs with unmet dependencies",
                        level + 1
                    )));
                }
                Ok(())
            })
            .await?;

        for group in &plan.parallel_groups {
            debug!(level = group.level, size = group.len(), "Dispatching group");
            self.store
                .update(task_id, |task| {
                    for id in &group.sub_task_ids {
                        task.sub_task_mut(id)?.status = SubTaskStatus::Waiting;
                    }
                    task.append_log(LogEntry::info(format!(
                        "Starting group {}/{}",
                        group.level + 1,
                        plan.total_groups()
                    )));
                    Ok(())
                })
                .await?;

            let runs = group
                .sub_task_ids
                .iter()
                .map(|id| limiter.submit(self.executor.execute(task_id, id)));
            for settled in join_all(runs).await {
                settled?;
            }
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn finish(&self, task_id: Uuid) -> DomainResult<()> {
        self.store
            .update(task_id, |task| {
                let report = aggregate(task);
                let completed = task.count_sub_tasks(SubTaskStatus::Completed);
                let failed = task.count_sub_tasks(SubTaskStatus::Error);
                task.result = Some(report);
                task.transition_to(TaskStatus::Completed)?;
                task.append_log(LogEntry::success(format!(
                    "Task completed: {completed} succeeded, {failed} failed"
                )));
                Ok(())
            })
            .await?;
        info!(task_id = %task_id, "Task completed");
        Ok(())
    }

    async fn fail(&self, task_id: Uuid, reason: &str) -> DomainResult<()> {
        self.store
            .update(task_id, |task| {
                if !task.status.can_transition_to(TaskStatus::Error) {
                    warn!(task_id = %task.id, status = %task.status, reason, "Task cannot move to error from its current state; leaving it unchanged");
                    return Ok(());
                }
                task.append_log(LogEntry::error(format!("Task failed: {reason}")));
                task.transition_to(TaskStatus::Error)
            })
            .await
    }

    /// Classify and plan `description` with the static templates, without
    /// calling any collaborator.
    pub fn preview(&self, description: &str) -> PlanPreview {
        let classification = self.classifier.classify(description);
        let seeds = template_for(classification.task_type, classification.complexity);
        let sub_tasks = seeds_to_sub_tasks(description, classification, seeds);
        let plan = self.grouper.build_plan(
            &sub_tasks,
            self.config.concurrency,
            Duration::from_secs(self.config.estimated_subtask_secs),
        );
        PlanPreview {
            classification,
            sub_tasks,
            plan,
        }
    }
}

/// Turn seeds into subtasks.
///
/// Missing IDs become `subtask-<n>`; a repeated ID gets a numeric suffix.
/// Seeds with a blank description are dropped.
fn seeds_to_sub_tasks(
    description: &str,
    classification: Classification,
    seeds: Vec<SubTaskSeed>,
) -> Vec<SubTask> {
    let mut used: HashSet<String> = HashSet::new();
    seeds
        .into_iter()
        .filter(|seed| !seed.description.trim().is_empty())
        .enumerate()
        .map(|(index, seed)| {
            let step = index + 1;
            let base = seed
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("subtask-{step}"));
            let mut id = base.clone();
            let mut suffix = 2;
            while !used.insert(id.clone()) {
                id = format!("{base}-{suffix}");
                suffix += 1;
            }

            SubTask::new(id, seed.description, seed.dependencies.unwrap_or_default()).with_input(
                json!({
                    "parent_task": description,
                    "step": step,
                    "task_type": classification.task_type,
                    "complexity": classification.complexity,
                }),
            )
        })
        .collect()
}
