//! End-to-end orchestration scenarios with scripted collaborators.

mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use common::{harness, orchestration, seed, ScriptedDecomposer, FAIL_PRIMARY, FAIL_SANDBOX};
use taskloom::domain::models::{LogLevel, SubTaskStatus, Task, TaskStatus, TaskType};
use taskloom::domain::ports::TaskClassifier;
use taskloom::domain::DomainError;
use taskloom::services::fallback_templates::template_for;
use taskloom::services::KeywordClassifier;
use taskloom::services::result_aggregator::aggregate;
use uuid::Uuid;

fn has_log(task: &Task, level: LogLevel, needle: &str) -> bool {
    task.logs
        .iter()
        .any(|entry| entry.level == level && entry.message.contains(needle))
}

#[tokio::test]
async fn test_linear_chain_runs_in_dependency_order() {
    let h = harness(
        ScriptedDecomposer::returning(vec![
            seed("a", "Collect sources", &[]),
            seed("b", "Compare sources", &["a"]),
            seed("c", "Write summary", &["b"]),
        ]),
        orchestration(4, 2),
    );

    let id = h.coordinator.submit(Task::new("Research solar panels")).await;
    let task = h.coordinator.run(id).await.unwrap();

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(
        h.executor.started(),
        vec!["Collect sources", "Compare sources", "Write summary"]
    );
    assert_eq!(h.executor.peak(), 1);
    assert!(task
        .sub_tasks
        .iter()
        .all(|s| s.status == SubTaskStatus::Completed && s.agent_id.is_some()));
    let report = task.result.as_deref().unwrap();
    assert!(report.contains("Completed: 3/3 subtasks"));
    assert!(report.contains("done: Write summary"));
    assert!(task.started_at.is_some() && task.completed_at.is_some());
}

#[tokio::test]
async fn test_parallel_group_respects_concurrency_limit() {
    let h = harness(
        ScriptedDecomposer::returning(vec![
            seed("root", "Plan the work", &[]),
            seed("x", "Branch x", &["root"]),
            seed("y", "Branch y", &["root"]),
            seed("z", "Branch z", &["root"]),
            seed("join", "Merge branches", &["x", "y", "z"]),
        ]),
        orchestration(2, 1),
    );

    let id = h.coordinator.submit(Task::new("Analyze three datasets")).await;
    let task = h.coordinator.run(id).await.unwrap();

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(h.executor.peak(), 2);
    let started = h.executor.started();
    assert_eq!(started.first().map(String::as_str), Some("Plan the work"));
    assert_eq!(started.last().map(String::as_str), Some("Merge branches"));
    assert!(has_log(&task, LogLevel::Info, "in 3 groups"));
}

#[tokio::test]
async fn test_resource_intensive_task_uses_batch_concurrency() {
    let h = harness(
        ScriptedDecomposer::returning(vec![
            seed("a", "Render frame one", &[]),
            seed("b", "Render frame two", &[]),
            seed("c", "Render frame three", &[]),
        ]),
        orchestration(4, 1),
    );

    let id = h
        .coordinator
        .submit(Task::new("Render the animation").with_resource_intensive(true))
        .await;
    let task = h.coordinator.run(id).await.unwrap();

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(h.executor.peak(), 1);
    assert!(has_log(&task, LogLevel::Info, "concurrency 1"));
}

#[tokio::test]
async fn test_primary_failure_falls_back_to_sandbox() {
    let h = harness(
        ScriptedDecomposer::returning(vec![seed(
            "a",
            &format!("Summarize notes {FAIL_PRIMARY}"),
            &[],
        )]),
        orchestration(2, 1),
    );

    let id = h.coordinator.submit(Task::new("Summarize meeting notes")).await;
    let task = h.coordinator.run(id).await.unwrap();

    let sub_task = task.sub_task("a").unwrap();
    assert_eq!(sub_task.status, SubTaskStatus::Completed);
    assert_eq!(sub_task.output.as_deref(), Some("sandbox output"));
    assert_eq!(h.sandbox.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert!(has_log(&task, LogLevel::Warn, "trying sandbox"));
    assert_eq!(task.status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_double_failure_settles_subtask_and_dependents_still_run() {
    let h = harness(
        ScriptedDecomposer::returning(vec![
            seed("a", &format!("Fetch data {FAIL_PRIMARY} {FAIL_SANDBOX}"), &[]),
            seed("b", "Chart the data", &["a"]),
        ]),
        orchestration(2, 1),
    );

    let id = h.coordinator.submit(Task::new("Chart the sales data")).await;
    let task = h.coordinator.run(id).await.unwrap();

    assert_eq!(task.status, TaskStatus::Completed);
    let failed = task.sub_task("a").unwrap();
    assert_eq!(failed.status, SubTaskStatus::Error);
    assert!(failed.error.as_deref().unwrap().contains("sandbox crashed"));
    assert_eq!(task.sub_task("b").unwrap().status, SubTaskStatus::Completed);
    assert!(has_log(&task, LogLevel::Warn, "runs although dependencies failed: a"));

    let report = task.result.as_deref().unwrap();
    assert!(report.contains("Completed: 1/2 subtasks"));
    assert!(report.contains("Failed: 1/2 subtasks"));
}

#[tokio::test]
async fn test_decomposer_failure_uses_template() {
    let h = harness(ScriptedDecomposer::failing(), orchestration(3, 1));

    let description = "Research tide tables";
    let classification = KeywordClassifier::new().classify(description);
    assert_eq!(classification.task_type, TaskType::Research);
    let expected: Vec<(String, Vec<String>)> =
        template_for(classification.task_type, classification.complexity)
            .into_iter()
            .map(|seed| (seed.description, seed.dependencies.unwrap_or_default()))
            .collect();

    let id = h.coordinator.submit(Task::new(description)).await;
    let task = h.coordinator.run(id).await.unwrap();

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.task_type, Some(classification.task_type));
    assert_eq!(task.complexity, Some(classification.complexity));
    assert!(has_log(&task, LogLevel::Warn, "Decomposition unavailable"));
    let planned: Vec<(String, Vec<String>)> = task
        .sub_tasks
        .iter()
        .map(|s| (s.description.clone(), s.dependencies.clone()))
        .collect();
    assert_eq!(planned, expected);
    assert!(task.sub_tasks.iter().all(|s| s.id.starts_with("step-")));
    assert!(task
        .sub_tasks
        .iter()
        .all(|s| s.status == SubTaskStatus::Completed));
}

#[tokio::test]
async fn test_empty_decomposition_uses_template() {
    let h = harness(ScriptedDecomposer::returning(Vec::new()), orchestration(3, 1));

    let id = h.coordinator.submit(Task::new("Do something useful")).await;
    let task = h.coordinator.run(id).await.unwrap();

    assert_eq!(task.status, TaskStatus::Completed);
    assert!(has_log(&task, LogLevel::Warn, "no subtasks"));
    assert!(!task.sub_tasks.is_empty());
}

#[tokio::test]
async fn test_dependency_cycle_is_broken_and_completes() {
    let h = harness(
        ScriptedDecomposer::returning(vec![
            seed("a", "Step a", &["b"]),
            seed("b", "Step b", &["a"]),
            seed("c", "Step c", &[]),
        ]),
        orchestration(3, 1),
    );

    let id = h.coordinator.submit(Task::new("Untangle the plan")).await;
    let task = h.coordinator.run(id).await.unwrap();

    assert_eq!(task.status, TaskStatus::Completed);
    assert!(has_log(&task, LogLevel::Warn, "Dependency cycle detected"));
    assert_eq!(h.executor.started()[0], "Step c");
    assert_eq!(task.count_sub_tasks(SubTaskStatus::Completed), 3);
}

#[tokio::test]
async fn test_unknown_dependency_is_treated_as_satisfied() {
    let h = harness(
        ScriptedDecomposer::returning(vec![seed("a", "Only step", &["ghost"])]),
        orchestration(2, 1),
    );

    let id = h.coordinator.submit(Task::new("Single step task")).await;
    let task = h.coordinator.run(id).await.unwrap();

    assert_eq!(task.status, TaskStatus::Completed);
    assert!(has_log(&task, LogLevel::Warn, "ghost"));
}

#[tokio::test]
async fn test_observed_states_are_monotonic() {
    let h = harness(
        ScriptedDecomposer::returning(vec![
            seed("a", "First", &[]),
            seed("b", "Second", &["a"]),
        ]),
        orchestration(2, 1),
    );

    let seen: Arc<Mutex<Vec<Task>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let _subscription = h.store.bus().subscribe(move |task: &Task| -> anyhow::Result<()> {
        sink.lock().unwrap().push(task.clone());
        Ok(())
    });

    let id = h.coordinator.submit(Task::new("Two step job")).await;
    h.coordinator.run(id).await.unwrap();

    let snapshots = seen.lock().unwrap().clone();
    let mut statuses: Vec<TaskStatus> = snapshots.iter().map(|t| t.status).collect();
    statuses.dedup();
    assert_eq!(
        statuses,
        vec![
            TaskStatus::Pending,
            TaskStatus::Analyzing,
            TaskStatus::Planning,
            TaskStatus::Executing,
            TaskStatus::Completed,
        ]
    );

    let rank = |status: SubTaskStatus| match status {
        SubTaskStatus::Pending => 0,
        SubTaskStatus::Waiting => 1,
        SubTaskStatus::Running => 2,
        SubTaskStatus::Completed | SubTaskStatus::Error => 3,
    };
    let mut last: HashMap<String, u8> = HashMap::new();
    for snapshot in &snapshots {
        for sub_task in &snapshot.sub_tasks {
            let now = rank(sub_task.status);
            let before = last.insert(sub_task.id.clone(), now).unwrap_or(0);
            assert!(now >= before, "{} went backwards", sub_task.id);
        }
    }
}

#[tokio::test]
async fn test_report_is_reproducible_from_final_state() {
    let h = harness(
        ScriptedDecomposer::returning(vec![
            seed("a", "Gather", &[]),
            seed("b", &format!("Broken {FAIL_PRIMARY} {FAIL_SANDBOX}"), &[]),
        ]),
        orchestration(2, 1),
    );

    let id = h.coordinator.submit(Task::new("Mixed outcome")).await;
    let task = h.coordinator.run(id).await.unwrap();

    let report = task.result.clone().unwrap();
    assert_eq!(aggregate(&task), report);
    assert_eq!(aggregate(&task), aggregate(&task));
}

#[tokio::test]
async fn test_every_mutation_is_persisted() {
    let h = harness(
        ScriptedDecomposer::returning(vec![seed("a", "Persist me", &[])]),
        orchestration(1, 1),
    );

    let id = h.coordinator.submit(Task::new("Persisted task")).await;
    h.coordinator.run(id).await.unwrap();
    h.store.dispose().await;

    assert!(h.persistence.save_count() >= 5);
    let snapshot = h.persistence.snapshot().await;
    assert_eq!(snapshot[&id].status, TaskStatus::Completed);
    assert!(snapshot[&id].result.is_some());
}

#[tokio::test]
async fn test_unknown_task_is_an_error() {
    let h = harness(ScriptedDecomposer::failing(), orchestration(1, 1));
    let result = h.coordinator.run(Uuid::new_v4()).await;
    assert!(matches!(result, Err(DomainError::TaskNotFound(_))));
}

#[tokio::test]
async fn test_interrupting_an_executing_task_marks_error() {
    let h = harness(
        ScriptedDecomposer::returning(vec![seed("a", "Long step", &[])]),
        orchestration(1, 1),
    );
    let id = h.coordinator.submit(Task::new("Interrupted job")).await;

    let run = h.coordinator.run(id);
    tokio::select! {
        _ = run => panic!("run should not finish before the interrupt"),
        _ = tokio::time::sleep(std::time::Duration::from_millis(10)) => {}
    }
    h.coordinator.mark_interrupted(id).await.unwrap();

    let task = h.store.get(id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Error);
    assert!(has_log(&task, LogLevel::Error, "interrupted"));
}

#[tokio::test]
async fn test_interrupting_a_pending_task_leaves_it_untouched() {
    let h = harness(ScriptedDecomposer::failing(), orchestration(1, 1));
    let id = h.coordinator.submit(Task::new("Never started")).await;

    h.coordinator.mark_interrupted(id).await.unwrap();

    let task = h.store.get(id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert!(task.logs.iter().all(|entry| entry.level != LogLevel::Error));
}

#[tokio::test]
async fn test_interrupting_a_completed_task_keeps_its_result() {
    let h = harness(
        ScriptedDecomposer::returning(vec![seed("a", "Only step", &[])]),
        orchestration(1, 1),
    );
    let id = h.coordinator.submit(Task::new("Finished job")).await;
    h.coordinator.run(id).await.unwrap();

    h.coordinator.mark_interrupted(id).await.unwrap();

    let task = h.store.get(id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.result.is_some());
    assert!(!has_log(&task, LogLevel::Error, "interrupted"));
}
