use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TodoError {
    #[error("task text cannot be empty")]
    EmptyTaskText,

    #[error("invalid task id '{0}': expected a positive integer")]
    InvalidTaskId(String),

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("locked by another process: {0}")]
    Locked(String),

    #[error("failed to persist {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TodoError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyTaskText => "empty_task_text",
            Self::InvalidTaskId(_) => "invalid_task_id",
            Self::MissingArgument(_) => "missing_argument",
            Self::Locked(_) => "locked",
            Self::Persist { .. } => "persist_failed",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
        }
    }

    /// Malformed or missing input that never reached the store.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyTaskText | Self::InvalidTaskId(_) | Self::MissingArgument(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TodoError>;
