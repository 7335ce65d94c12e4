//! CLI output formatting

use crate::{
    core::{config::PipelineConfig, ExecutionStatus, Task, TaskKind},
    execution::ExecutionEvent,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static EYES: Emoji<'_, '_> = Emoji("👀 ", "* ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a spinner for an in-flight compile
pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let template = ProgressStyle::with_template("{spinner:.green} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(template);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
        ExecutionStatus::Cancelled => style("CANCELLED").yellow().to_string(),
    }
}

/// Format a duration the way progress lines show it
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Human-readable byte count
pub fn format_bytes(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// One line of `assets list`
pub fn format_task(task: &Task, detailed: bool) -> String {
    let mut line = format!(
        "  {} {}",
        style(&task.id).bold(),
        style(format!("[{}]", task.kind_label())).dim()
    );

    if let Some(description) = &task.description {
        line.push_str(&format!(" - {}", description));
    }

    if detailed {
        let detail = match &task.kind {
            TaskKind::Compile(compile) => format!(
                "{} {} → {}",
                compile.tool,
                compile.entry.display(),
                compile.output.display()
            ),
            TaskKind::Watch(watch) => format!("{} → {}", watch.patterns.join(", "), watch.run),
            TaskKind::Series(ids) => ids.join(" → "),
            TaskKind::Parallel(ids) => ids.join(" + "),
        };
        line.push_str(&format!("\n      {}", style(detail).dim()));
    }

    line
}

/// `validate --json` document: the resolved config, or the load error
pub fn validation_report(loaded: &anyhow::Result<PipelineConfig>) -> serde_json::Value {
    match loaded {
        Ok(config) => serde_json::json!({ "valid": true, "config": config }),
        Err(e) => serde_json::json!({ "valid": false, "error": format!("{:#}", e) }),
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::TaskStarted { task, kind, .. } => {
            format!("{} {} {}", SPINNER, style(task).cyan(), style(kind).dim())
        }
        ExecutionEvent::TaskCompleted {
            task,
            duration_ms,
            output,
            bytes,
            ..
        } => {
            let elapsed = format_duration(Duration::from_millis(*duration_ms));
            match (output, bytes) {
                (Some(output), Some(bytes)) => format!(
                    "{} {} → {} ({}, {})",
                    CHECK,
                    style(task).green(),
                    style(output).dim(),
                    format_bytes(*bytes),
                    elapsed
                ),
                _ => format!("{} {} ({})", CHECK, style(task).green(), elapsed),
            }
        }
        ExecutionEvent::TaskFailed { task, error, .. } => {
            format!("{} {}: {}", CROSS, style(task).red(), style(error).dim())
        }
        ExecutionEvent::WatchStarted { task, patterns, .. } => format!(
            "{} {} watching {}",
            EYES,
            style(task).cyan(),
            style(patterns.join(", ")).dim()
        ),
        ExecutionEvent::ChangeDetected {
            task,
            target,
            paths,
        } => {
            let changed = match paths.as_slice() {
                [single] => single.clone(),
                many => format!("{} files", many.len()),
            };
            format!(
                "{} {} changed, {} rebuilding {}",
                ROCKET,
                style(changed).dim(),
                style(task).dim(),
                style(target).cyan()
            )
        }
    }
}
