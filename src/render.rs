// Text rendering of the task list for terminal output

use crate::config::DEFAULT_DATE_FORMAT;
use crate::models::Task;
use crate::store::TaskListStore;
use chrono::format::{Item, StrftimeItems};
use chrono::{Local, TimeZone};
use colored::Colorize;
use std::fmt::Display;
use std::fmt::Write;

/// Heading shown above the list
pub fn summary_line(count: usize) -> String {
    match count {
        0 => "You have no tasks. Add a task!".to_string(),
        1 => "You have 1 task".to_string(),
        n => format!("You have {} tasks", n),
    }
}

/// Format a millisecond timestamp in `tz`. Unusable format strings fall back to the default.
pub fn format_timestamp<Tz>(ms: i64, format: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let format = if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        DEFAULT_DATE_FORMAT
    } else {
        format
    };

    match tz.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format(format).to_string(),
        None => ms.to_string(),
    }
}

/// Format a millisecond timestamp in local time
pub fn format_local(ms: i64, format: &str) -> String {
    format_timestamp(ms, format, &Local)
}

/// One list row: position, short id, text and creation time
pub fn task_line(position: usize, task: &Task, date_format: &str) -> String {
    format!(
        "{:>3}. [{}] {}  ({})",
        position,
        task.short_id(),
        task.text,
        format_local(task.created_at, date_format)
    )
}

/// Whole screen: heading, error, rows and any edit in progress
pub fn render(store: &TaskListStore, date_format: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", summary_line(store.len()).bold());

    if let Some(error) = store.error() {
        let _ = writeln!(out, "{}", error.to_string().red());
    }

    for (i, task) in store.tasks().iter().enumerate() {
        let line = task_line(i + 1, task, date_format);
        if store.edit_session().target_id() == Some(task.id.as_str()) {
            let _ = writeln!(out, "{}", line.yellow());
        } else {
            let _ = writeln!(out, "{}", line);
        }
    }

    if let Some(draft) = store.edit_session().draft_text() {
        let _ = writeln!(out, "{} {}", "editing:".yellow(), draft);
    }

    out
}
