use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

use crate::error::Result;
use crate::model::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Pretty,
    Minimal,
}

fn status_label(task: &Task) -> String {
    if task.done {
        "done".green().to_string()
    } else {
        "pending".yellow().to_string()
    }
}

pub fn render_task(task: &Task, format: Format) -> Result<String> {
    Ok(match format {
        Format::Json => serde_json::to_string(task)?,
        Format::Pretty => format!(
            "[{}] {} ({})\n  created: {}",
            task.id,
            task.text,
            status_label(task),
            task.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        Format::Minimal => {
            let mark = if task.done { "x" } else { " " };
            format!("{:>4} [{}] {}", task.id, mark, truncate_text(&task.text, 60))
        }
    })
}

pub fn render_tasks(tasks: &[Task], format: Format) -> Result<String> {
    match format {
        Format::Json => Ok(serde_json::to_string(tasks)?),
        Format::Pretty if tasks.is_empty() => Ok("no tasks".to_string()),
        Format::Pretty => Ok(tasks
            .iter()
            .map(|t| render_task(t, Format::Pretty))
            .collect::<Result<Vec<_>>>()?
            .join("\n\n")),
        Format::Minimal => {
            let mut lines = vec![format!("{:>4} {:3} TEXT", "ID", "")];
            lines.push("-".repeat(40));
            for task in tasks {
                lines.push(render_task(task, Format::Minimal)?);
            }
            Ok(lines.join("\n"))
        }
    }
}

pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        let truncated: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        text.to_string()
    }
}

/// Print a serializable result as JSON, or `message` for human formats.
pub fn print_value<T: Serialize>(value: &T, message: &str, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(value)?),
        Format::Pretty | Format::Minimal => println!("{message}"),
    }
    Ok(())
}

pub fn print_task(task: &Task, format: Format) -> Result<()> {
    println!("{}", render_task(task, format)?);
    Ok(())
}

pub fn print_tasks(tasks: &[Task], format: Format) -> Result<()> {
    println!("{}", render_tasks(tasks, format)?);
    Ok(())
}
