//! Folds subtask outcomes into the final task report.
//!
//! Pure: the report depends only on the task snapshot, so aggregating the
//! same snapshot twice yields identical text.

use std::fmt::Write;

use crate::domain::models::{SubTask, SubTaskStatus, Task};

const COMPLETED_GLYPH: char = '✓';
const FAILED_GLYPH: char = '✗';
const OTHER_GLYPH: char = '…';

pub fn status_glyph(status: SubTaskStatus) -> char {
    match status {
        SubTaskStatus::Completed => COMPLETED_GLYPH,
        SubTaskStatus::Error => FAILED_GLYPH,
        _ => OTHER_GLYPH,
    }
}

/// Build the textual report for `task`.
pub fn aggregate(task: &Task) -> String {
    let total = task.sub_tasks.len();
    let completed: Vec<&SubTask> = by_status(task, |s| s == SubTaskStatus::Completed);
    let failed: Vec<&SubTask> = by_status(task, |s| s == SubTaskStatus::Error);
    let unsettled: Vec<&SubTask> = by_status(task, |s| !s.is_terminal());

    let mut report = String::new();
    let _ = writeln!(report, "# Task Report: {}", task.description);
    let _ = writeln!(report);
    let _ = writeln!(report, "Completed: {}/{} subtasks", completed.len(), total);
    let _ = writeln!(report, "Failed: {}/{} subtasks", failed.len(), total);

    write_section(&mut report, task, "Completed Subtasks", &completed);
    write_section(&mut report, task, "Failed Subtasks", &failed);
    if !unsettled.is_empty() {
        write_section(&mut report, task, "Unfinished Subtasks", &unsettled);
    }

    report
}

fn by_status(task: &Task, keep: impl Fn(SubTaskStatus) -> bool) -> Vec<&SubTask> {
    task.sub_tasks.iter().filter(|s| keep(s.status)).collect()
}

fn write_section(report: &mut String, task: &Task, title: &str, sub_tasks: &[&SubTask]) {
    let _ = writeln!(report);
    let _ = writeln!(report, "## {title}");
    if sub_tasks.is_empty() {
        let _ = writeln!(report, "(none)");
        return;
    }

    for sub_task in sub_tasks {
        let agent = task
            .agent_for(sub_task)
            .map_or("unassigned", |a| a.name.as_str());
        let _ = writeln!(
            report,
            "{} {} [agent: {}]",
            status_glyph(sub_task.status),
            sub_task.description,
            agent
        );
        if let Some(output) = sub_task.output.as_deref().filter(|o| !o.is_empty()) {
            for line in output.lines() {
                let _ = writeln!(report, "    {line}");
            }
        }
        if let Some(error) = &sub_task.error {
            let _ = writeln!(report, "    Error: {error}");
        }
    }
}
