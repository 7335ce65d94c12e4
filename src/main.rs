use asset_pipeline::cli::commands::{ListCommand, RunCommand};
use asset_pipeline::cli::output::*;
use asset_pipeline::cli::reporter::TerminalReporter;
use asset_pipeline::cli::{Cli, Command};
use asset_pipeline::core::config::PipelineConfig;
use asset_pipeline::{ExecutionEngine, ExecutionStatus, Toolchain};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let root = project_root(&cli.root)?;

    // Execute command
    let status = match &cli.command {
        Command::Run(cmd) => run_task(cmd, &cli, &root).await?,
        Command::List(cmd) => list_tasks(cmd, &cli, &root)?,
        Command::Validate(_) => validate_config(&cli, &root)?,
    };

    if status == ExecutionStatus::Failed {
        std::process::exit(1);
    }

    Ok(())
}

fn project_root(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .with_context(|| format!("Project root {} does not exist", path.display()))
}

fn load_config(cli: &Cli, root: &Path) -> Result<PipelineConfig> {
    let (config, source) = PipelineConfig::load(root, cli.config.as_deref())
        .context("Failed to load pipeline config")?;

    match &source {
        Some(path) => info!("Loaded {} from {}", config.name, path.display()),
        None => info!("No {} in {}, using built-in tasks", asset_pipeline::core::config::DEFAULT_CONFIG_FILE, root.display()),
    }

    Ok(config)
}

async fn run_task(cmd: &RunCommand, cli: &Cli, root: &Path) -> Result<ExecutionStatus> {
    let config = load_config(cli, root)?;
    let toolchain = Toolchain::from_config(&config.tools);
    let graph = config.to_graph(root);

    if !cli.json {
        println!(
            "{} {} {}",
            INFO,
            style(&graph.name).bold(),
            style(root.display()).dim()
        );
    }

    let reporter = Arc::new(TerminalReporter::new(cli.json));
    let handler = Arc::clone(&reporter);
    let engine = Arc::new(
        ExecutionEngine::new(graph, toolchain).with_event_handler(move |event| handler.handle(&event)),
    );

    let started = Instant::now();
    let result = tokio::select! {
        result = engine.run(&cmd.task) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    let status = match result {
        Some(Ok(())) => ExecutionStatus::Completed,
        Some(Err(e)) => {
            error!("{:#}", anyhow::Error::new(e));
            ExecutionStatus::Failed
        }
        // Dropping the run future stops watchers and kills running compilers
        None => ExecutionStatus::Cancelled,
    };

    if !cli.json {
        println!(
            "\n{} {} {} in {}",
            if status == ExecutionStatus::Failed { CROSS } else { CHECK },
            style(&cmd.task).bold(),
            format_status(status),
            format_duration(started.elapsed())
        );
    }

    Ok(status)
}

fn list_tasks(cmd: &ListCommand, cli: &Cli, root: &Path) -> Result<ExecutionStatus> {
    let config = load_config(cli, root)?;
    let graph = config.to_graph(root);

    if cli.json {
        let tasks: Vec<_> = graph
            .tasks()
            .map(|task| {
                serde_json::json!({
                    "id": task.id,
                    "kind": task.kind_label(),
                    "description": task.description,
                    "runs": task.subtasks(),
                })
            })
            .collect();
        let data = serde_json::json!({ "pipeline": graph.name, "tasks": tasks });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(ExecutionStatus::Completed);
    }

    println!("{} Tasks in {}:", INFO, style(&graph.name).bold());
    for task in graph.tasks() {
        println!("{}", format_task(task, cmd.detailed));
    }

    Ok(ExecutionStatus::Completed)
}

fn validate_config(cli: &Cli, root: &Path) -> Result<ExecutionStatus> {
    let loaded = load_config(cli, root);

    // JSON mode prints the resolved config or the error, nothing else
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&validation_report(&loaded))?);
        return Ok(if loaded.is_ok() {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::Failed
        });
    }

    println!("{} Validating pipeline...", INFO);
    match loaded {
        Ok(config) => {
            println!("{} Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Tasks: {}", style(config.tasks.len()).cyan());
            println!("  Debounce: {}ms", style(config.watch.debounce_ms).cyan());
            Ok(ExecutionStatus::Completed)
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            Ok(ExecutionStatus::Failed)
        }
    }
}
