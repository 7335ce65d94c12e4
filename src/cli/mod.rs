//! Command-line interface

pub mod commands;
pub mod output;
pub mod reporter;

use clap::{Parser, Subcommand};
use commands::{ListCommand, RunCommand, ValidateCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Front-end asset build and watch tool
#[derive(Debug, Parser, Clone)]
#[command(name = "assets")]
#[command(version)]
#[command(about = "Compiles and watches front-end assets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the pipeline configuration file (default: assets.yaml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit one JSON object per event instead of styled output
    #[arg(long, global = true)]
    pub json: bool,

    /// Project root that paths and watch patterns are relative to
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a task
    Run(RunCommand),

    /// List the configured tasks
    List(ListCommand),

    /// Validate the pipeline configuration
    Validate(ValidateCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
