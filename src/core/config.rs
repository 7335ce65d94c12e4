//! Pipeline configuration from YAML

use crate::core::TaskGraph;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// File name looked up in the project root when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "assets.yaml";

/// Task run when the CLI is invoked without a task name
pub const DEFAULT_TASK: &str = "default";

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// External tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Watcher settings shared by all watch tasks
    #[serde(default)]
    pub watch: WatchSettings,

    /// Task definitions
    pub tasks: Vec<TaskConfig>,
}

/// Settings for the two external compilers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub bundler: BundlerConfig,

    #[serde(default)]
    pub styles: StyleConfig,
}

/// Module bundler invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundlerConfig {
    /// Executable to spawn
    pub program: String,

    /// Leading arguments (the bundler command itself when run through `npx`)
    pub args: Vec<String>,

    /// Project bundler config file; when unset a config is generated per build
    pub config: Option<String>,

    /// Source transform loader applied to every `.js` module (none when unset)
    pub loader: Option<String>,

    /// Abort on the first module error instead of emitting a degraded bundle
    pub bail: bool,

    /// Global symbols resolved to a module (the `$`/`jQuery` shim)
    pub provide: BTreeMap<String, String>,

    /// Kill the bundler after this many seconds (no limit when unset)
    pub timeout_secs: Option<u64>,

    /// Extra environment for the child process
    pub env: BTreeMap<String, String>,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        let mut provide = BTreeMap::new();
        provide.insert("$".to_string(), "jquery".to_string());
        provide.insert("jQuery".to_string(), "jquery".to_string());

        Self {
            program: "npx".to_string(),
            args: vec!["webpack".to_string()],
            config: None,
            loader: Some("babel-loader".to_string()),
            bail: true,
            provide,
            timeout_secs: None,
            env: BTreeMap::new(),
        }
    }
}

/// Style transform chain invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Executable to spawn
    pub program: String,

    /// Leading arguments
    pub args: Vec<String>,

    /// Utility/design-token configuration file
    pub config: String,

    /// Transform plugins, applied in order
    pub plugins: Vec<String>,

    /// Kill the style chain after this many seconds (no limit when unset)
    pub timeout_secs: Option<u64>,

    /// Extra environment for the child process
    pub env: BTreeMap<String, String>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            program: "npx".to_string(),
            args: vec!["postcss".to_string()],
            config: "./tailwind.config.js".to_string(),
            plugins: vec![
                "postcss-import".to_string(),
                "tailwindcss".to_string(),
                "autoprefixer".to_string(),
            ],
            timeout_secs: None,
            env: BTreeMap::new(),
        }
    }
}

/// Watcher settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    /// Quiet period after the last matching change before a rebuild starts
    pub debounce_ms: u64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self { debounce_ms: 100 }
    }
}

/// Task definition as written in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Unique task identifier (the name used on the command line)
    pub id: String,

    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,

    #[serde(flatten)]
    pub kind: TaskKindConfig,
}

/// What a task does
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKindConfig {
    /// Compile one entry point into one output file
    Compile(CompileConfig),
    /// Re-run a task whenever matching files change
    Watch(WatchConfig),
    /// Run tasks one after another, stopping at the first failure
    Series(Vec<String>),
    /// Run tasks concurrently
    Parallel(Vec<String>),
}

/// Which external compiler a compile task uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Bundler,
    Styles,
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolKind::Bundler => write!(f, "bundler"),
            ToolKind::Styles => write!(f, "styles"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    pub tool: ToolKind,
    pub entry: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Glob patterns relative to the project root
    pub patterns: Vec<String>,

    /// Task re-run on change
    pub run: String,
}

impl Default for PipelineConfig {
    /// The preen_test asset pipeline
    fn default() -> Self {
        let tasks = vec![
            TaskConfig {
                id: "styles".to_string(),
                description: Some("Compile the Tailwind entry stylesheet".to_string()),
                kind: TaskKindConfig::Compile(CompileConfig {
                    tool: ToolKind::Styles,
                    entry: "./preen_test/assets/styles/tailwind_entry.css".to_string(),
                    output: "./preen_test/static/css/main.css".to_string(),
                }),
            },
            TaskConfig {
                id: "scripts".to_string(),
                description: Some("Bundle the JavaScript entry point".to_string()),
                kind: TaskKindConfig::Compile(CompileConfig {
                    tool: ToolKind::Bundler,
                    entry: "./preen_test/assets/js/webpack_entry.js".to_string(),
                    output: "./preen_test/static/js/main.js".to_string(),
                }),
            },
            TaskConfig {
                id: "watch-scripts".to_string(),
                description: Some("Rebuild scripts when JavaScript sources change".to_string()),
                kind: TaskKindConfig::Watch(WatchConfig {
                    patterns: vec!["./apps/preen_test/assets/js/**/*.js".to_string()],
                    run: "scripts".to_string(),
                }),
            },
            TaskConfig {
                id: "watch-styles".to_string(),
                description: Some(
                    "Rebuild styles when stylesheets or the Tailwind config change".to_string(),
                ),
                kind: TaskKindConfig::Watch(WatchConfig {
                    patterns: vec![
                        "./apps/preen_test/**/*.css".to_string(),
                        "./tailwind.config.js".to_string(),
                    ],
                    run: "styles".to_string(),
                }),
            },
            TaskConfig {
                id: "watch".to_string(),
                description: Some("Run both watchers".to_string()),
                kind: TaskKindConfig::Parallel(vec![
                    "watch-scripts".to_string(),
                    "watch-styles".to_string(),
                ]),
            },
            TaskConfig {
                id: DEFAULT_TASK.to_string(),
                description: Some("Build styles, then scripts, then watch both".to_string()),
                kind: TaskKindConfig::Series(vec![
                    "styles".to_string(),
                    "scripts".to_string(),
                    "watch".to_string(),
                ]),
            },
        ];

        Self {
            name: "preen_test".to_string(),
            tools: ToolsConfig::default(),
            watch: WatchSettings::default(),
            tasks,
        }
    }
}

impl TaskConfig {
    /// Task ids this task refers to
    pub fn references(&self) -> Vec<&String> {
        match &self.kind {
            TaskKindConfig::Compile(_) => vec![],
            TaskKindConfig::Watch(watch) => vec![&watch.run],
            TaskKindConfig::Series(ids) | TaskKindConfig::Parallel(ids) => ids.iter().collect(),
        }
    }

    /// Short kind label for listings
    pub fn kind_label(&self) -> &'static str {
        match &self.kind {
            TaskKindConfig::Compile(_) => "compile",
            TaskKindConfig::Watch(_) => "watch",
            TaskKindConfig::Series(_) => "series",
            TaskKindConfig::Parallel(_) => "parallel",
        }
    }
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the configuration for a project root
    ///
    /// An explicit path must exist. Otherwise `assets.yaml` in the root is used
    /// when present, and the built-in pipeline when it is not.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                root.join(path)
            };
            return Ok((Self::from_file(&path)?, Some(path)));
        }

        let candidate = root.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            return Ok((Self::from_file(&candidate)?, Some(candidate)));
        }

        Ok((Self::default(), None))
    }

    /// Look up a task definition by id
    pub fn task(&self, id: &str) -> Option<&TaskConfig> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        // Check that all task IDs are unique
        let mut seen_ids = HashSet::new();
        for task in &self.tasks {
            if !seen_ids.insert(&task.id) {
                anyhow::bail!("Duplicate task ID: {}", task.id);
            }
        }

        for task in &self.tasks {
            for reference in task.references() {
                if !seen_ids.contains(reference) {
                    anyhow::bail!(
                        "Task '{}' references non-existent task '{}'",
                        task.id,
                        reference
                    );
                }
            }

            match &task.kind {
                TaskKindConfig::Compile(compile) => {
                    if compile.entry.trim().is_empty() || compile.output.trim().is_empty() {
                        anyhow::bail!("Task '{}' needs both an entry and an output", task.id);
                    }
                    if normalize(&compile.entry) == normalize(&compile.output) {
                        anyhow::bail!(
                            "Task '{}' would overwrite its own entry point '{}'",
                            task.id,
                            compile.entry
                        );
                    }
                }
                TaskKindConfig::Watch(watch) => {
                    if watch.patterns.is_empty() {
                        anyhow::bail!("Watch task '{}' has no patterns", task.id);
                    }
                }
                TaskKindConfig::Series(ids) | TaskKindConfig::Parallel(ids) => {
                    if ids.is_empty() {
                        anyhow::bail!("Task '{}' has no subtasks", task.id);
                    }
                }
            }
        }

        self.check_cycles()?;

        // A watcher re-running something that itself watches would never finish a rebuild
        for task in &self.tasks {
            if let TaskKindConfig::Watch(watch) = &task.kind {
                if self.contains_watch(&watch.run) {
                    anyhow::bail!(
                        "Watch task '{}' runs '{}', which never finishes because it watches too",
                        task.id,
                        watch.run
                    );
                }
            }
        }

        self.check_plugin_order()?;

        Ok(())
    }

    /// Check for cycles through series, parallel and watch references
    fn check_cycles(&self) -> Result<()> {
        let by_id: HashMap<&str, &TaskConfig> =
            self.tasks.iter().map(|t| (t.id.as_str(), t)).collect();
        let mut visited = HashSet::new();
        let mut recursion_stack = HashSet::new();

        for task in &self.tasks {
            if !visited.contains(task.id.as_str()) {
                Self::dfs_check(&task.id, &by_id, &mut visited, &mut recursion_stack)?;
            }
        }

        Ok(())
    }

    fn dfs_check<'a>(
        task_id: &'a str,
        by_id: &HashMap<&'a str, &'a TaskConfig>,
        visited: &mut HashSet<&'a str>,
        recursion_stack: &mut HashSet<&'a str>,
    ) -> Result<()> {
        visited.insert(task_id);
        recursion_stack.insert(task_id);

        if let Some(task) = by_id.get(task_id) {
            for reference in task.references() {
                if recursion_stack.contains(reference.as_str()) {
                    anyhow::bail!("Cycle detected in task graph involving task '{}'", reference);
                }
                if !visited.contains(reference.as_str()) {
                    Self::dfs_check(reference, by_id, visited, recursion_stack)?;
                }
            }
        }

        recursion_stack.remove(task_id);
        Ok(())
    }

    /// Whether running `id` would (transitively) start a watcher. Assumes no cycles.
    fn contains_watch(&self, id: &str) -> bool {
        match self.task(id).map(|t| &t.kind) {
            Some(TaskKindConfig::Watch(_)) => true,
            Some(TaskKindConfig::Series(ids)) | Some(TaskKindConfig::Parallel(ids)) => {
                ids.iter().any(|child| self.contains_watch(child))
            }
            _ => false,
        }
    }

    /// Imports are inlined before utilities are generated, prefixing runs last
    fn check_plugin_order(&self) -> Result<()> {
        let plugins = &self.tools.styles.plugins;
        let position = |name: &str| plugins.iter().position(|p| p == name);

        if let (Some(import), Some(tailwind)) = (position("postcss-import"), position("tailwindcss")) {
            if import > tailwind {
                anyhow::bail!("Style plugin 'postcss-import' must run before 'tailwindcss'");
            }
        }
        if let Some(prefixer) = position("autoprefixer") {
            if prefixer + 1 != plugins.len() {
                anyhow::bail!("Style plugin 'autoprefixer' must be the last plugin");
            }
        }

        Ok(())
    }

    /// Build the task graph rooted at `root`
    pub fn to_graph(&self, root: &Path) -> TaskGraph {
        TaskGraph::from_config(self, root)
    }
}

fn normalize(path: &str) -> &str {
    path.trim().trim_start_matches("./")
}
