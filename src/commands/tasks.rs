use serde_json::json;

use crate::error::Result;
use crate::output::{self, Format};
use crate::store::repo::{DeleteOutcome, DoneOutcome, TaskRepository, parse_task_id};

pub fn add(repo: &TaskRepository, user: &str, words: &[String], format: Format) -> Result<()> {
    let text = words
        .iter()
        .flat_map(|w| w.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ");
    let added = repo.add_task(user, &text)?;
    match format {
        Format::Json => output::print_value(&added, "", format),
        _ => {
            output::print_task(&added.task, format)?;
            println!("{} task(s) total", added.total);
            Ok(())
        }
    }
}

pub fn list(repo: &TaskRepository, user: &str, format: Format) -> Result<()> {
    let tasks = repo.list_tasks(user)?;
    output::print_tasks(&tasks, format)
}

pub fn done(repo: &TaskRepository, user: &str, id: &str, format: Format) -> Result<()> {
    let id = parse_task_id(Some(id))?;
    let outcome = repo.mark_done(user, id)?;
    let message = match outcome {
        DoneOutcome::Marked => format!("task {id} marked done"),
        DoneOutcome::AlreadyDone => format!("task {id} was already done"),
        DoneOutcome::NotFound => format!("task {id} not found"),
    };
    output::print_value(&json!({ "id": id, "outcome": outcome }), &message, format)
}

pub fn delete(repo: &TaskRepository, user: &str, id: &str, format: Format) -> Result<()> {
    let id = parse_task_id(Some(id))?;
    let outcome = repo.delete_task(user, id)?;
    let message = match &outcome {
        DeleteOutcome::Deleted(task) => format!("deleted task {id}: {}", task.text),
        DeleteOutcome::NotFound => format!("task {id} not found"),
    };
    output::print_value(&outcome, &message, format)
}

pub fn clear(repo: &TaskRepository, user: &str, format: Format) -> Result<()> {
    let cleared = repo.clear_tasks(user)?;
    output::print_value(
        &json!({ "cleared": cleared }),
        &format!("cleared {cleared} task(s)"),
        format,
    )
}
