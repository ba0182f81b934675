use anyhow::{Context, Result};

use crate::cli::output::table::TableFormatter;
use crate::cli::service::open_store;
use crate::domain::models::{Config, TaskStatus};

/// Handle task list command
pub async fn handle_list(config: &Config, status: Option<String>, limit: usize, json: bool) -> Result<()> {
    let status_filter = status
        .as_deref()
        .map(|s| TaskStatus::from_str(s).with_context(|| format!("Unknown status: {s}")))
        .transpose()?;

    let store = open_store(config).await?;
    let mut tasks = store.list().await;
    tasks.reverse();
    let tasks: Vec<_> = tasks
        .into_iter()
        .filter(|task| status_filter.map_or(true, |s| task.status == s))
        .take(limit)
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    println!("{}", TableFormatter::new().format_tasks(&tasks));
    println!("\nShowing {} task(s)", tasks.len());
    Ok(())
}
