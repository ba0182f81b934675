use anyhow::{Context, Result};
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;

use crate::cli::output::progress::{create_spinner, print_line};
use crate::cli::output::style;
use crate::cli::service::{build_coordinator, open_store};
use crate::domain::models::{Config, Task, TaskStatus};
use crate::services::{ChannelListener, Subscription, TaskStore};

/// Handle `run`: create the task, stream its progress and print the report.
pub async fn handle_run(config: &Config, description: String, batch: bool, offline: bool, json: bool) -> Result<()> {
    let store = open_store(config).await?;
    let coordinator = build_coordinator(config, store.clone(), offline)?;

    let progress = watch_progress(&store, json);

    let task_id = coordinator
        .submit(Task::new(description).with_resource_intensive(batch))
        .await;

    let outcome = tokio::select! {
        finished = coordinator.run(task_id) => finished.context("Task run failed"),
        _ = tokio::signal::ctrl_c() => {
            warn!(task_id = %task_id, "Interrupted");
            coordinator.mark_interrupted(task_id).await?;
            store.get(task_id).await.context("Interrupted task disappeared")
        }
    };

    store.dispose().await;
    if let Some((subscription, printer)) = progress {
        subscription.unsubscribe();
        let _ = printer.await;
    }
    let task = outcome?;

    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
    } else {
        print_report(&task);
    }

    if task.status == TaskStatus::Error {
        anyhow::bail!("Task {} ended in error", task.id);
    }
    Ok(())
}

/// Subscribe a progress printer unless output is JSON.
fn watch_progress(store: &TaskStore, json: bool) -> Option<(Subscription, JoinHandle<()>)> {
    if json {
        return None;
    }
    let (listener, updates) = ChannelListener::new();
    let subscription = store.bus().subscribe(listener);
    Some((subscription, tokio::spawn(stream_progress(updates))))
}

/// Print new log lines as snapshots arrive until the bus lets go.
async fn stream_progress(mut updates: UnboundedReceiver<Task>) {
    let spinner = create_spinner("Submitting task");
    let mut seen: HashMap<Uuid, usize> = HashMap::new();

    while let Some(task) = updates.recv().await {
        let already = seen.entry(task.id).or_insert(0);
        for entry in task.logs.iter().skip(*already) {
            print_line(&spinner, &style::log_line(entry));
        }
        *already = task.logs.len();
        spinner.set_message(format!("{} ({})", task.status, task.description));
    }

    spinner.finish_and_clear();
}

fn print_report(task: &Task) {
    println!();
    println!("Task {} {}", task.id, style::task_status(task.status));
    if let Some(report) = &task.result {
        println!();
        println!("{report}");
    }
}
