use std::path::PathBuf;

use clap::{Parser, Subcommand};
use todo_bot::config::{Config, DEFAULT_DATA_FILE};
use todo_bot::dispatch::{self, Dispatcher};
use todo_bot::error::{Result, TodoError};
use todo_bot::output::Format;
use todo_bot::store::files::TaskStore;
use todo_bot::store::repo::TaskRepository;

#[derive(Parser)]
#[command(
    name = "todo-bot",
    version,
    about = "Per-user task lists behind chat commands",
    disable_help_subcommand = true
)]
struct Cli {
    /// JSON file holding every user's tasks
    #[arg(long, global = true, env = "TODO_BOT_DATA_FILE", default_value = DEFAULT_DATA_FILE)]
    data_file: PathBuf,
    /// Give up waiting for the store lock after this many milliseconds (default: wait)
    #[arg(long, global = true, env = "TODO_BOT_LOCK_TIMEOUT_MS")]
    lock_timeout_ms: Option<u64>,
    /// User whose tasks to operate on
    #[arg(long, global = true, env = "TODO_BOT_USER")]
    user: Option<String>,
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    format: Format,
    /// Log filter (e.g. `info`, `todo_bot=debug`)
    #[arg(long, global = true, env = "TODO_BOT_LOG")]
    log: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add {
        /// Task text; words are joined with single spaces
        #[arg(num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// List tasks
    Tasks,
    /// Mark a task as done
    Done {
        /// Task ID
        id: String,
    },
    /// Delete a task; later tasks are renumbered
    Delete {
        /// Task ID
        id: String,
    },
    /// Delete all of the user's tasks
    Clear,
    /// Show chat command help
    Help,
    /// Read chat commands (`/add ...`, `/tasks`, ...) from stdin and print replies
    Chat,
}

fn require_user(user: Option<&str>) -> Result<&str> {
    user.map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(TodoError::MissingArgument("--user"))
}

fn run(cli: Cli) -> Result<()> {
    let format = cli.format;
    let config = Config::new(cli.data_file).with_lock_timeout_ms(cli.lock_timeout_ms);
    let repo = TaskRepository::new(TaskStore::open(&config));
    let user = || require_user(cli.user.as_deref());

    match cli.command {
        Commands::Help => {
            println!("{}", dispatch::help_text());
            Ok(())
        }
        Commands::Add { text } => todo_bot::commands::tasks::add(&repo, user()?, &text, format),
        Commands::Tasks => todo_bot::commands::tasks::list(&repo, user()?, format),
        Commands::Done { id } => todo_bot::commands::tasks::done(&repo, user()?, &id, format),
        Commands::Delete { id } => {
            todo_bot::commands::tasks::delete(&repo, user()?, &id, format)
        }
        Commands::Clear => todo_bot::commands::tasks::clear(&repo, user()?, format),
        Commands::Chat => {
            let user = user()?;
            let dispatcher = Dispatcher::new(repo);
            let stdin = std::io::stdin();
            todo_bot::commands::chat::run(&dispatcher, user, stdin.lock(), std::io::stdout())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    todo_bot::logging::init(cli.log.as_deref());
    let format = cli.format;
    if let Err(e) = run(cli) {
        match format {
            Format::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "error": e.code(),
                        "message": e.to_string()
                    })
                );
            }
            _ => eprintln!("error: {e}"),
        }
        std::process::exit(1);
    }
}
