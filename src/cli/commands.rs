//! CLI command definitions

use crate::core::config::DEFAULT_TASK;
use clap::Args;

/// Run a task
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Task to run
    #[arg(default_value = DEFAULT_TASK)]
    pub task: String,
}

/// List the configured tasks
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Also show what each task runs
    #[arg(long)]
    pub detailed: bool,
}

/// Validate the pipeline configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {}
