//! Status and log-level styling via `console`.
//!
//! `console` drops the escape codes itself when stderr/stdout is not a
//! terminal or `NO_COLOR` is set.

use console::{style, StyledObject};

use crate::domain::models::{LogEntry, LogLevel, SubTaskStatus, TaskStatus};

pub fn task_status(status: TaskStatus) -> StyledObject<&'static str> {
    let text = status.as_str();
    match status {
        TaskStatus::Completed => style(text).green().bold(),
        TaskStatus::Error => style(text).red().bold(),
        TaskStatus::Executing => style(text).yellow(),
        TaskStatus::Analyzing | TaskStatus::Planning => style(text).cyan(),
        TaskStatus::Pending => style(text).blue(),
    }
}

pub fn sub_task_status(status: SubTaskStatus) -> StyledObject<&'static str> {
    let text = status.as_str();
    match status {
        SubTaskStatus::Completed => style(text).green(),
        SubTaskStatus::Error => style(text).red(),
        SubTaskStatus::Running => style(text).yellow(),
        _ => style(text).dim(),
    }
}

/// One streamed log line: `[level] message`.
pub fn log_line(entry: &LogEntry) -> String {
    let tag = format!("[{}]", entry.level.as_str());
    let tag = match entry.level {
        LogLevel::Info => style(tag).dim(),
        LogLevel::Warn => style(tag).yellow(),
        LogLevel::Error => style(tag).red().bold(),
        LogLevel::Success => style(tag).green(),
    };
    format!("{tag} {}", entry.message)
}
