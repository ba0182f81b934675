use anyhow::{bail, Result};
use uuid::Uuid;

use crate::cli::output::style;
use crate::cli::output::table::TableFormatter;
use crate::cli::service::open_store;
use crate::domain::models::{Config, Task};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Handle task show command
pub async fn handle_show(config: &Config, task_id: &str, json: bool) -> Result<()> {
    let store = open_store(config).await?;
    let tasks = store.list().await;
    let id = resolve_task_id(&tasks, task_id)?;
    let Some(task) = tasks.into_iter().find(|task| task.id == id) else {
        bail!("Task {id} not found. Use 'taskloom list' to see available tasks.");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
        return Ok(());
    }

    println!("Task Details:");
    println!("  ID: {}", task.id);
    println!("  Status: {}", style::task_status(task.status));
    println!("  Description: {}", task.description);
    if let (Some(task_type), Some(complexity)) = (task.task_type, task.complexity) {
        println!("  Classification: {task_type} ({complexity})");
    }
    println!("  Resource intensive: {}", task.resource_intensive);
    println!("  Created at: {}", task.created_at.format(TIME_FORMAT));
    if let Some(started_at) = task.started_at {
        println!("  Started at: {}", started_at.format(TIME_FORMAT));
    }
    if let Some(completed_at) = task.completed_at {
        println!("  Completed at: {}", completed_at.format(TIME_FORMAT));
    }

    if !task.sub_tasks.is_empty() {
        println!("\nSubtasks:");
        println!("{}", TableFormatter::new().format_sub_tasks(&task));
    }

    if !task.logs.is_empty() {
        println!("\nLog:");
        for entry in &task.logs {
            println!("  {} {}", entry.timestamp.format("%H:%M:%S"), style::log_line(entry));
        }
    }

    if let Some(result) = &task.result {
        println!("\n{result}");
    }
    Ok(())
}

/// Resolve a full ID or a unique prefix of one, like git short hashes.
pub fn resolve_task_id(tasks: &[Task], prefix: &str) -> Result<Uuid> {
    if let Ok(uuid) = Uuid::parse_str(prefix) {
        return Ok(uuid);
    }
    if prefix.is_empty() {
        bail!("ID prefix must not be empty");
    }
    if !prefix.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
        bail!("Invalid ID prefix '{prefix}': must contain only hex characters and dashes");
    }

    let needle = prefix.to_lowercase();
    let matches: Vec<Uuid> = tasks
        .iter()
        .map(|task| task.id)
        .filter(|id| id.to_string().starts_with(&needle))
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => bail!("No task found with ID prefix '{prefix}'"),
        _ => bail!(
            "Ambiguous ID prefix '{prefix}' matches {} tasks; use more characters",
            matches.len()
        ),
    }
}
