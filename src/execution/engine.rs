//! Main execution engine - runs tasks from the task graph

use crate::{
    core::{CompileTask, TaskGraph, TaskKind, TaskState, WatchTask},
    execution::{CompileExecutor, CompileOutcome, TaskError, WatchBinding},
    tools::Toolchain,
};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur while tasks run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
    TaskStarted {
        run_id: Uuid,
        task: String,
        kind: String,
    },
    TaskCompleted {
        run_id: Uuid,
        task: String,
        kind: String,
        duration_ms: u64,
        /// Written file, for compile tasks
        output: Option<String>,
        bytes: Option<usize>,
    },
    TaskFailed {
        run_id: Uuid,
        task: String,
        kind: String,
        error: String,
    },
    WatchStarted {
        task: String,
        patterns: Vec<String>,
        roots: Vec<String>,
    },
    ChangeDetected {
        task: String,
        target: String,
        paths: Vec<String>,
    },
}

impl ExecutionEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Boxed task future (task runs nest, so the future is recursive)
pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'a>>;

/// Runs tasks from one task graph
pub struct ExecutionEngine {
    graph: TaskGraph,
    executor: CompileExecutor,
    event_handlers: Vec<EventHandler>,
    states: Mutex<HashMap<String, TaskState>>,
}

impl ExecutionEngine {
    pub fn new(graph: TaskGraph, toolchain: Toolchain) -> Self {
        let executor = CompileExecutor::new(toolchain, graph.root().to_path_buf());

        Self {
            graph,
            executor,
            event_handlers: Vec::new(),
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Add an event handler
    pub fn with_event_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
        self
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Latest state of a task
    pub fn task_state(&self, id: &str) -> TaskState {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .unwrap_or(TaskState::Pending)
    }

    /// Emit an event to all handlers
    fn emit(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    fn set_state(&self, id: &str, state: TaskState) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), state);
    }

    /// Run a task to completion
    ///
    /// Compile tasks finish when their output is written, series and parallel
    /// tasks when all subtasks do. Watch tasks only return on error.
    pub fn run<'a>(self: &'a Arc<Self>, id: &'a str) -> TaskFuture<'a> {
        Box::pin(async move {
            let task = self
                .graph
                .task(id)
                .ok_or_else(|| TaskError::UnknownTask(id.to_string()))?;

            let run_id = Uuid::new_v4();
            let kind = task.kind_label().to_string();
            let started_at = Utc::now();
            let started = Instant::now();

            self.set_state(id, TaskState::Running { started_at });
            self.emit(ExecutionEvent::TaskStarted {
                run_id,
                task: id.to_string(),
                kind: kind.clone(),
            });

            let result = match &task.kind {
                TaskKind::Compile(compile) => self.run_compile(id, compile).await.map(Some),
                TaskKind::Series(ids) => self.run_series(ids).await.map(|_| None),
                TaskKind::Parallel(ids) => self.run_parallel(id, ids).await.map(|_| None),
                TaskKind::Watch(watch) => self.run_watch(id, watch).await.map(|_| None),
            };

            match result {
                Ok(outcome) => {
                    info!("Task '{}' finished in {:?}", id, started.elapsed());
                    self.set_state(
                        id,
                        TaskState::Completed {
                            started_at,
                            completed_at: Utc::now(),
                        },
                    );
                    self.emit(ExecutionEvent::TaskCompleted {
                        run_id,
                        task: id.to_string(),
                        kind,
                        duration_ms: started.elapsed().as_millis() as u64,
                        output: outcome.as_ref().map(|o| o.output.display().to_string()),
                        bytes: outcome.as_ref().map(|o| o.bytes),
                    });
                    Ok(())
                }
                Err(e) => {
                    error!("Task '{}' failed: {}", id, e);
                    self.set_state(
                        id,
                        TaskState::Failed {
                            error: e.to_string(),
                            started_at,
                            failed_at: Utc::now(),
                        },
                    );
                    self.emit(ExecutionEvent::TaskFailed {
                        run_id,
                        task: id.to_string(),
                        kind,
                        error: e.to_string(),
                    });
                    Err(e)
                }
            }
        })
    }

    async fn run_compile(&self, id: &str, task: &CompileTask) -> Result<CompileOutcome, TaskError> {
        self.executor.execute(id, task).await
    }

    /// Run subtasks in order, stopping at the first failure
    async fn run_series(self: &Arc<Self>, ids: &[String]) -> Result<(), TaskError> {
        for child in ids {
            self.run(child).await?;
        }
        Ok(())
    }

    /// Run subtasks concurrently; the first failure aborts the rest
    async fn run_parallel(self: &Arc<Self>, id: &str, ids: &[String]) -> Result<(), TaskError> {
        let mut set = JoinSet::new();
        for child in ids {
            let engine = Arc::clone(self);
            let child = child.clone();
            set.spawn(async move { engine.run(&child).await });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    set.abort_all();
                    return Err(e);
                }
                Err(join_error) => {
                    warn!("Subtask of '{}' did not finish: {}", id, join_error);
                    set.abort_all();
                    return Err(TaskError::Aborted { task: id.to_string() });
                }
            }
        }

        Ok(())
    }

    /// Watch the task's patterns and re-run its target on every settled change
    async fn run_watch(self: &Arc<Self>, id: &str, task: &WatchTask) -> Result<(), TaskError> {
        let binding = WatchBinding::start(self.graph.root(), task).map_err(|e| TaskError::Watch {
            task: id.to_string(),
            error: e,
        })?;

        info!("Watching {} for '{}'", task.patterns.join(", "), task.run);
        self.emit(ExecutionEvent::WatchStarted {
            task: id.to_string(),
            patterns: task.patterns.clone(),
            roots: binding
                .roots()
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        });

        binding
            .serve(|paths| {
                let engine = Arc::clone(self);
                let watch_id = id.to_string();
                let target = task.run.clone();
                async move { engine.rebuild(&watch_id, &target, paths).await }
            })
            .await;

        Ok(())
    }

    /// One watcher-triggered run; failures are reported and the watcher stays armed
    async fn rebuild(self: &Arc<Self>, watch_id: &str, target: &str, paths: Vec<PathBuf>) {
        self.emit(ExecutionEvent::ChangeDetected {
            task: watch_id.to_string(),
            target: target.to_string(),
            paths: paths.iter().map(|p| p.display().to_string()).collect(),
        });

        if let Err(e) = self.run(target).await {
            warn!("Rebuild triggered by '{}' failed, still watching: {}", watch_id, e);
        }
    }
}
