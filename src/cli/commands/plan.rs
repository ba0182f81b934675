use anyhow::Result;
use serde_json::json;

use crate::adapters::InMemoryTaskPersistence;
use crate::cli::output::table::TableFormatter;
use crate::cli::service::build_coordinator;
use crate::domain::models::Config;
use crate::services::TaskStore;
use std::sync::Arc;

/// Handle `plan`: classify, pick the fallback template and group it.
pub fn handle_plan(config: &Config, description: &str, json: bool) -> Result<()> {
    let store = TaskStore::new(Arc::new(InMemoryTaskPersistence::new()));
    let coordinator = build_coordinator(config, store, true)?;
    let preview = coordinator.preview(description);

    if json {
        let output = json!({
            "classification": preview.classification,
            "sub_tasks": preview.sub_tasks,
            "plan": preview.plan,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "Classification: {} ({})",
        preview.classification.task_type, preview.classification.complexity
    );
    println!("\nSubtasks:");
    for sub_task in &preview.sub_tasks {
        let deps = if sub_task.dependencies.is_empty() {
            String::new()
        } else {
            format!(" (after {})", sub_task.dependencies.join(", "))
        };
        println!("  {}: {}{deps}", sub_task.id, sub_task.description);
    }
    println!("\nExecution groups:");
    println!("{}", TableFormatter::new().format_plan(&preview.plan));
    println!(
        "\n{} subtasks in {} groups, estimated {}s",
        preview.plan.total_sub_tasks(),
        preview.plan.total_groups(),
        preview.plan.estimated_time.as_secs()
    );
    Ok(())
}
