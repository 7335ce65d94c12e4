//! Subprocess runner shared by the bundler and the style chain

use crate::tools::{Artifact, ToolError};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Spawns one external program and waits for it to finish
#[derive(Debug, Clone)]
pub struct CommandRunner {
    /// Executable to spawn (looked up on PATH when not a path)
    program: String,

    /// Kill the child after this many seconds; wait forever when unset
    timeout_secs: Option<u64>,

    /// Extra environment for the child process
    env: BTreeMap<String, String>,
}

impl CommandRunner {
    pub fn new(program: impl Into<String>, timeout_secs: Option<u64>) -> Self {
        Self {
            program: program.into(),
            timeout_secs,
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    /// Run the program to completion in `cwd`
    ///
    /// # Errors
    /// Returns `ToolError` if:
    /// - The executable cannot be spawned
    /// - It exits with a non-zero status (stderr is captured into the error)
    /// - The configured timeout elapses
    pub async fn run(
        &self,
        args: &[String],
        extra_env: &[(String, String)],
        cwd: &Path,
    ) -> Result<Output, ToolError> {
        debug!("Spawning {} {}", self.program, args.join(" "));

        let mut command = Command::new(&self.program);
        command
            .args(args)
            .current_dir(cwd)
            .envs(&self.env)
            .envs(extra_env.iter().map(|(k, v)| (k, v)))
            .kill_on_drop(true);

        let output = match self.timeout_secs {
            Some(secs) => timeout(Duration::from_secs(secs), command.output())
                .await
                .map_err(|_| ToolError::Timeout(secs))?,
            None => command.output().await,
        }
        .map_err(|source| ToolError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            // Some tools report errors on stdout only
            let stderr = if stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr
            };
            warn!(
                "{} exited with code {:?}: {}",
                self.program,
                output.status.code(),
                stderr
            );
            return Err(ToolError::Failed {
                program: self.program.clone(),
                code: output.status.code(),
                stderr,
            });
        }

        Ok(output)
    }

    /// Run the program and read the file it was told to write
    pub async fn run_staged(
        &self,
        args: &[String],
        extra_env: &[(String, String)],
        cwd: &Path,
        staged: &Path,
    ) -> Result<Artifact, ToolError> {
        self.run(args, extra_env, cwd).await?;

        match tokio::fs::read(staged).await {
            Ok(bytes) => {
                debug!("{} produced {} bytes", self.program, bytes.len());
                Ok(Artifact::new(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ToolError::NoOutput {
                program: self.program.clone(),
                path: staged.to_path_buf(),
            }),
            Err(e) => Err(ToolError::Io(e)),
        }
    }
}

/// Fail fast on an input the tool would otherwise report less clearly
pub(crate) fn require_file(path: &Path) -> Result<(), ToolError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ToolError::MissingInput {
            path: path.to_path_buf(),
        })
    }
}
