//! Task and watcher error types

use crate::tools::ToolError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while setting up a watch binding
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("watch root does not exist: {}", .path.display())]
    MissingRoot { path: PathBuf },

    #[error("invalid watch pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("file watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Error returned when a task fails
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task '{0}' is not defined")]
    UnknownTask(String),

    #[error("task '{task}' failed: {error}")]
    Compile { task: String, error: ToolError },

    #[error("task '{task}' could not write {}: {error}", .path.display())]
    Write {
        task: String,
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("task '{task}': {error}")]
    Watch { task: String, error: WatchError },

    #[error("task '{task}' was aborted")]
    Aborted { task: String },
}

impl TaskError {
    /// Task that failed first
    pub fn task(&self) -> &str {
        match self {
            TaskError::UnknownTask(task) => task,
            TaskError::Compile { task, .. }
            | TaskError::Write { task, .. }
            | TaskError::Watch { task, .. }
            | TaskError::Aborted { task } => task,
        }
    }
}
