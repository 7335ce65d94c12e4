//! Task domain model

use crate::core::config::{TaskConfig, TaskKindConfig, ToolKind};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A single named unit of work
#[derive(Debug, Clone)]
pub struct Task {
    /// Unique task identifier
    pub id: String,

    /// Human-readable description
    pub description: Option<String>,

    /// What the task does
    pub kind: TaskKind,
}

#[derive(Debug, Clone)]
pub enum TaskKind {
    Compile(CompileTask),
    Watch(WatchTask),
    Series(Vec<String>),
    Parallel(Vec<String>),
}

/// Compile one entry point into one output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileTask {
    pub tool: ToolKind,

    /// Absolute entry path
    pub entry: PathBuf,

    /// Absolute output path, replaced on every successful run
    pub output: PathBuf,
}

impl CompileTask {
    /// File name the compiler is asked to produce
    pub fn output_name(&self) -> String {
        self.output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "out".to_string())
    }
}

/// Binding between glob patterns and a task to re-run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTask {
    /// Patterns as written, relative to the project root
    pub patterns: Vec<String>,

    /// Task re-run on change
    pub run: String,

    /// Quiet period before a rebuild starts
    pub debounce: Duration,
}

impl Task {
    /// Create a task from its config, resolving paths against `root`
    pub fn from_config(config: &TaskConfig, root: &Path, debounce: Duration) -> Self {
        let kind = match &config.kind {
            TaskKindConfig::Compile(compile) => TaskKind::Compile(CompileTask {
                tool: compile.tool,
                entry: resolve(root, &compile.entry),
                output: resolve(root, &compile.output),
            }),
            TaskKindConfig::Watch(watch) => TaskKind::Watch(WatchTask {
                patterns: watch.patterns.clone(),
                run: watch.run.clone(),
                debounce,
            }),
            TaskKindConfig::Series(ids) => TaskKind::Series(ids.clone()),
            TaskKindConfig::Parallel(ids) => TaskKind::Parallel(ids.clone()),
        };

        Task {
            id: config.id.clone(),
            description: config.description.clone(),
            kind,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            TaskKind::Compile(_) => "compile",
            TaskKind::Watch(_) => "watch",
            TaskKind::Series(_) => "series",
            TaskKind::Parallel(_) => "parallel",
        }
    }

    /// Task ids run by this task
    pub fn subtasks(&self) -> Vec<&str> {
        match &self.kind {
            TaskKind::Compile(_) => vec![],
            TaskKind::Watch(watch) => vec![watch.run.as_str()],
            TaskKind::Series(ids) | TaskKind::Parallel(ids) => ids.iter().map(String::as_str).collect(),
        }
    }
}

/// Join a config path onto the project root, dropping a leading `./`
pub fn resolve(root: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let relative = path.strip_prefix(".").unwrap_or(path);
    root.join(relative)
}
