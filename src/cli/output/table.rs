//! Table output formatting for CLI commands using comfy-table.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use super::truncate;
use crate::domain::models::{SubTaskStatus, Task, TaskStatus};
use crate::services::ExecutionPlan;

/// Table formatter for CLI output
pub struct TableFormatter {
    use_colors: bool,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
        }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self { use_colors }
    }

    pub fn format_tasks(&self, tasks: &[Task]) -> String {
        let mut table = base_table();
        table.set_header(header(&["ID", "Description", "Status", "Subtasks", "Created"]));

        for task in tasks {
            let id = task.id.to_string();
            let done = task.count_sub_tasks(SubTaskStatus::Completed);
            let failed = task.count_sub_tasks(SubTaskStatus::Error);
            let progress = if failed > 0 {
                format!("{done}/{} ({failed} failed)", task.sub_tasks.len())
            } else {
                format!("{done}/{}", task.sub_tasks.len())
            };

            table.add_row(vec![
                Cell::new(&id[..8]),
                Cell::new(truncate(&task.description, 48)),
                self.colored(task.status.as_str(), task_status_color(task.status)),
                Cell::new(progress),
                Cell::new(task.created_at.format("%Y-%m-%d %H:%M").to_string()),
            ]);
        }
        table.to_string()
    }

    pub fn format_sub_tasks(&self, task: &Task) -> String {
        let mut table = base_table();
        table.set_header(header(&["ID", "Description", "Depends on", "Status", "Agent"]));

        for sub_task in &task.sub_tasks {
            let agent = task
                .agent_for(sub_task)
                .map_or_else(|| "-".to_string(), |a| a.name.clone());
            let dependencies = if sub_task.dependencies.is_empty() {
                "-".to_string()
            } else {
                sub_task.dependencies.join(", ")
            };

            table.add_row(vec![
                Cell::new(&sub_task.id),
                Cell::new(truncate(&sub_task.description, 48)),
                Cell::new(dependencies),
                self.colored(sub_task.status.as_str(), sub_task_status_color(sub_task.status)),
                Cell::new(agent),
            ]);
        }
        table.to_string()
    }

    pub fn format_plan(&self, plan: &ExecutionPlan) -> String {
        let mut table = base_table();
        table.set_header(header(&["Group", "Subtasks", "Note"]));

        for group in &plan.parallel_groups {
            let note = if group.forced {
                self.colored("cycle broken", Color::Yellow)
            } else {
                Cell::new("")
            };
            table.add_row(vec![
                Cell::new(group.level + 1),
                Cell::new(group.sub_task_ids.join(", ")),
                note,
            ]);
        }
        table.to_string()
    }

    fn colored(&self, text: &str, color: Color) -> Cell {
        if self.use_colors {
            Cell::new(text).fg(color)
        } else {
            Cell::new(text)
        }
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect()
}

fn supports_color() -> bool {
    // Respect NO_COLOR environment variable
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    true
}

fn task_status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Completed => Color::Green,
        TaskStatus::Error => Color::Red,
        TaskStatus::Executing => Color::Yellow,
        TaskStatus::Analyzing | TaskStatus::Planning => Color::Cyan,
        TaskStatus::Pending => Color::Blue,
    }
}

fn sub_task_status_color(status: SubTaskStatus) -> Color {
    match status {
        SubTaskStatus::Completed => Color::Green,
        SubTaskStatus::Error => Color::Red,
        SubTaskStatus::Running => Color::Yellow,
        SubTaskStatus::Pending | SubTaskStatus::Waiting => Color::DarkGrey,
    }
}
