//! Task graph - every registered task, built once and handed to the engine

use crate::core::{config::PipelineConfig, task::Task};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The full set of tasks for one project root
#[derive(Debug, Clone)]
pub struct TaskGraph {
    /// Pipeline name
    pub name: String,

    /// Directory every relative path and pattern is resolved against
    root: PathBuf,

    tasks: HashMap<String, Task>,

    /// Declaration order, for listings
    order: Vec<String>,
}

impl TaskGraph {
    /// Build a graph from a validated configuration
    pub fn from_config(config: &PipelineConfig, root: &Path) -> Self {
        let debounce = Duration::from_millis(config.watch.debounce_ms);

        let order: Vec<String> = config.tasks.iter().map(|t| t.id.clone()).collect();
        let tasks = config
            .tasks
            .iter()
            .map(|task_config| {
                let task = Task::from_config(task_config, root, debounce);
                (task.id.clone(), task)
            })
            .collect();

        TaskGraph {
            name: config.name.clone(),
            root: root.to_path_buf(),
            tasks,
            order,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get a task by ID
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    /// Tasks in declaration order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
