//! Compiler error types

use std::path::PathBuf;
use thiserror::Error;

/// Error types for external compiler invocations
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("input file not found: {}", .path.display())]
    MissingInput { path: PathBuf },

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {}: {stderr}", exit_label(.code))]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("'{program}' succeeded but produced no output at {}", .path.display())]
    NoOutput { program: String, path: PathBuf },

    #[error("timeout after {0} seconds")]
    Timeout(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}
