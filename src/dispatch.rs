//! Chat command handling.
//!
//! Turns one inbound command line (`/add Buy milk`, `/done 2`, ...) into at
//! most one repository call and renders the reply text. Transport-agnostic:
//! whatever receives messages hands the line and the sender's id to
//! [`Dispatcher::handle`].

use tracing::{error, warn};

use crate::error::TodoError;
use crate::model::Task;
use crate::store::repo::{DeleteOutcome, DoneOutcome, TaskRepository, parse_task_id};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    /// Arguments joined with single spaces.
    Add(String),
    Tasks,
    /// Raw id argument, validated when handled.
    Done(Option<String>),
    Delete(Option<String>),
    Clear,
    Help,
    Unknown(String),
}

impl Command {
    /// Parse a command line. A leading `/` and a trailing `@botname` on the
    /// command word are optional; the rest is whitespace-separated arguments.
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Self::Unknown(String::new());
        };
        let name = head.strip_prefix('/').unwrap_or(head);
        let name = name.split('@').next().unwrap_or(name).to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        match name.as_str() {
            "start" => Self::Start,
            "add" => Self::Add(args.join(" ")),
            "tasks" | "list" => Self::Tasks,
            "done" => Self::Done(args.first().map(|s| s.to_string())),
            "delete" => Self::Delete(args.first().map(|s| s.to_string())),
            "clear" => Self::Clear,
            "help" => Self::Help,
            _ => Self::Unknown(name),
        }
    }
}

/// Reply text plus whether the command failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub is_error: bool,
}

impl Reply {
    fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    fn err(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

const COMMAND_LIST: &str = "\
/start - Show the welcome message
/add <task> - Add a new task
/tasks - Show your tasks
/done <id> - Mark a task as done
/delete <id> - Delete a task
/clear - Delete all of your tasks
/help - Show this help message";

pub fn welcome_text() -> String {
    format!("Hello!\n\nI'm your personal task list. Here's what I can do:\n\n{COMMAND_LIST}")
}

pub fn help_text() -> String {
    format!("Available commands:\n\n{COMMAND_LIST}\n\nExamples:\n/add Buy milk and bread\n/done 1")
}

/// One line per task: `<id>. [x] text` or `<id>. [ ] text`.
pub fn render_task_list(tasks: &[Task]) -> String {
    let mut out = String::from("Your tasks:\n");
    for task in tasks {
        let mark = if task.done { "x" } else { " " };
        out.push_str(&format!("\n{}. [{}] {}", task.id, mark, task.text));
    }
    out
}

pub struct Dispatcher {
    repo: TaskRepository,
}

impl Dispatcher {
    pub fn new(repo: TaskRepository) -> Self {
        Self { repo }
    }

    pub fn handle(&self, user_id: &str, line: &str) -> Reply {
        let command = Command::parse(line);
        match self.run(user_id, &command) {
            Ok(reply) => reply,
            Err(e) if e.is_validation() => Reply::err(usage_for(&command, &e)),
            Err(e) => {
                error!(user = user_id, command = ?command, error = %e, code = e.code(), "command failed");
                Reply::err(failure_for(&command))
            }
        }
    }

    fn run(&self, user_id: &str, command: &Command) -> crate::error::Result<Reply> {
        let reply = match command {
            Command::Start => Reply::ok(welcome_text()),
            Command::Help => Reply::ok(help_text()),
            Command::Unknown(name) => {
                warn!(user = user_id, command = %name, "unknown command");
                Reply::err(format!("Unknown command '{name}'. Send /help for the list."))
            }
            Command::Add(text) => {
                let added = self.repo.add_task(user_id, text)?;
                Reply::ok(format!(
                    "Task added! You now have {} task(s).",
                    added.total
                ))
            }
            Command::Tasks => {
                let tasks = self.repo.list_tasks(user_id)?;
                if tasks.is_empty() {
                    Reply::ok("You don't have any tasks yet! Use /add to create one.")
                } else {
                    Reply::ok(render_task_list(&tasks))
                }
            }
            Command::Done(arg) => {
                let id = parse_task_id(arg.as_deref())?;
                match self.repo.mark_done(user_id, id)? {
                    DoneOutcome::Marked => Reply::ok(format!("Great job! Task {id} marked as done!")),
                    DoneOutcome::AlreadyDone => {
                        Reply::ok(format!("Task {id} was already marked as done."))
                    }
                    DoneOutcome::NotFound => Reply::err(format!("Task {id} not found.")),
                }
            }
            Command::Delete(arg) => {
                let id = parse_task_id(arg.as_deref())?;
                match self.repo.delete_task(user_id, id)? {
                    DeleteOutcome::Deleted(task) => {
                        Reply::ok(format!("Task {id} has been deleted: {}", task.text))
                    }
                    DeleteOutcome::NotFound => Reply::err(format!("Task {id} not found.")),
                }
            }
            Command::Clear => match self.repo.clear_tasks(user_id)? {
                0 => Reply::ok("You have no tasks to clear!"),
                n => Reply::ok(format!("All clear! Deleted {n} task(s).")),
            },
        };
        Ok(reply)
    }
}

fn usage_for(command: &Command, err: &TodoError) -> String {
    match command {
        Command::Add(_) => "Please provide a task. Example: /add Buy groceries".to_string(),
        Command::Done(_) => format!("{err}. Example: /done 1"),
        Command::Delete(_) => format!("{err}. Example: /delete 1"),
        _ => err.to_string(),
    }
}

fn failure_for(command: &Command) -> String {
    let action = match command {
        Command::Add(_) => "adding the task",
        Command::Tasks => "loading your tasks",
        Command::Done(_) => "marking the task as done",
        Command::Delete(_) => "deleting the task",
        Command::Clear => "clearing your tasks",
        _ => "handling your command",
    };
    format!("An error occurred while {action}. Please try again.")
}
