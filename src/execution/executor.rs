//! Compile executor - runs one compile task and replaces its output

use crate::{
    core::CompileTask,
    execution::TaskError,
    tools::{CompileRequest, Toolchain},
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Result of a successful compile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutcome {
    /// File that was replaced
    pub output: PathBuf,

    /// Size of the written artifact
    pub bytes: usize,
}

/// Executes compile tasks against a toolchain
#[derive(Debug, Clone)]
pub struct CompileExecutor {
    toolchain: Toolchain,
    root: PathBuf,
}

impl CompileExecutor {
    pub fn new(toolchain: Toolchain, root: PathBuf) -> Self {
        Self { toolchain, root }
    }

    /// Compile and write the output
    ///
    /// Nothing is written unless the compiler succeeds, so a failed run leaves
    /// the previous output in place.
    pub async fn execute(&self, task_id: &str, task: &CompileTask) -> Result<CompileOutcome, TaskError> {
        info!("Executing compile task: {} ({})", task_id, task.tool);

        let request = CompileRequest {
            task_id: task_id.to_string(),
            entry: task.entry.clone(),
            output_name: task.output_name(),
            root: self.root.clone(),
        };

        let artifact = self
            .toolchain
            .compiler(task.tool)
            .compile(&request)
            .await
            .map_err(|e| {
                error!("Compiler error for task {}: {}", task_id, e);
                TaskError::Compile {
                    task: task_id.to_string(),
                    error: e,
                }
            })?;

        let bytes = artifact.len();
        let output = task.output.clone();
        let target = output.clone();
        tokio::task::spawn_blocking(move || replace_file(&target, &artifact.bytes))
            .await
            .map_err(|_| TaskError::Aborted {
                task: task_id.to_string(),
            })?
            .map_err(|e| TaskError::Write {
                task: task_id.to_string(),
                path: output.clone(),
                error: e,
            })?;

        debug!("Wrote {} bytes to {}", bytes, output.display());

        Ok(CompileOutcome {
            output,
            bytes,
        })
    }
}

/// Replace `path` with `bytes` in one rename
///
/// The content goes to a temporary file in the same directory first, so
/// readers see either the old or the new file.
pub fn replace_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
