//! File watchers - bind glob patterns to a task and re-run it on change
//!
//! Each binding owns one `notify` watcher feeding its own channel, and a
//! single consumer loop drains that channel. The loop awaits every run it
//! starts, so runs for one binding never overlap; changes that arrive during
//! a run are folded into exactly one follow-up run.

use crate::core::{task::WatchTask, WatchState};
use crate::execution::WatchError;
use ignore::overrides::{Override, OverrideBuilder};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

/// Gitignore-style glob set anchored at the project root
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    root: PathBuf,
    canonical_root: Option<PathBuf>,
    overrides: Override,
}

impl PatternMatcher {
    pub fn new(root: &Path, patterns: &[String]) -> Result<Self, WatchError> {
        let mut builder = OverrideBuilder::new(root);
        for pattern in patterns {
            builder
                .add(&anchored(pattern))
                .map_err(|e| WatchError::Pattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
        }
        let overrides = builder.build().map_err(|e| WatchError::Pattern {
            pattern: patterns.join(", "),
            message: e.to_string(),
        })?;

        Ok(Self {
            root: root.to_path_buf(),
            canonical_root: root.canonicalize().ok(),
            overrides,
        })
    }

    /// Whether a changed path is covered by any pattern
    ///
    /// Absolute paths outside the project root never match.
    pub fn matches(&self, path: &Path) -> bool {
        let relative = if path.is_absolute() {
            let stripped = path.strip_prefix(&self.root).ok().or_else(|| {
                self.canonical_root
                    .as_ref()
                    .and_then(|root| path.strip_prefix(root).ok())
            });
            match stripped {
                Some(relative) => relative,
                None => return false,
            }
        } else {
            path.strip_prefix(".").unwrap_or(path)
        };

        self.overrides.matched(relative, false).is_whitelist()
    }
}

/// Anchor a root-relative pattern so `a.js` does not also match `sub/a.js`
fn anchored(pattern: &str) -> String {
    format!("/{}", trim_relative(pattern))
}

fn trim_relative(pattern: &str) -> &str {
    pattern.trim_start_matches("./").trim_start_matches('/')
}

fn is_glob(component: &str) -> bool {
    component.contains(['*', '?', '[', '{'])
}

/// Directories to hand to the OS watcher for a set of patterns
///
/// The literal directory prefix of a glob is watched recursively. A pattern
/// naming one file watches its directory non-recursively, which survives
/// editors that save by replacing the file.
pub fn watch_roots(root: &Path, patterns: &[String]) -> Vec<(PathBuf, RecursiveMode)> {
    let mut roots: Vec<(PathBuf, RecursiveMode)> = Vec::new();

    for pattern in patterns {
        let parts: Vec<&str> = trim_relative(pattern)
            .split('/')
            .filter(|p| !p.is_empty() && *p != ".")
            .collect();

        let mut base = root.to_path_buf();
        let mut mode = RecursiveMode::Recursive;
        for (i, part) in parts.iter().enumerate() {
            if is_glob(part) {
                break;
            }
            if i + 1 == parts.len() {
                mode = RecursiveMode::NonRecursive;
                break;
            }
            base.push(part);
        }

        match roots.iter_mut().find(|(path, _)| *path == base) {
            Some(existing) => {
                if mode == RecursiveMode::Recursive {
                    existing.1 = RecursiveMode::Recursive;
                }
            }
            None => roots.push((base, mode)),
        }
    }

    roots
}

/// A live watch registration: OS watcher, its event channel, and the matcher
pub struct WatchBinding {
    matcher: PatternMatcher,
    roots: Vec<PathBuf>,
    debounce: Duration,
    events: UnboundedReceiver<PathBuf>,
    // Dropping the watcher ends the registration
    _watcher: RecommendedWatcher,
}

impl WatchBinding {
    /// Register the task's patterns with the OS watcher
    pub fn start(root: &Path, task: &WatchTask) -> Result<Self, WatchError> {
        let matcher = PatternMatcher::new(root, &task.patterns)?;
        let roots = watch_roots(root, &task.patterns);

        for (path, _) in &roots {
            if !path.is_dir() {
                return Err(WatchError::MissingRoot { path: path.clone() });
            }
        }

        let (tx, events) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    // Reads by the compilers themselves must not trigger rebuilds
                    if matches!(event.kind, EventKind::Access(_)) {
                        return;
                    }
                    for path in event.paths {
                        let _ = tx.send(path);
                    }
                }
                Err(e) => warn!("File watcher error: {}", e),
            },
            Config::default(),
        )?;

        for (path, mode) in &roots {
            debug!("Watching {} ({:?})", path.display(), mode);
            watcher.watch(path, *mode)?;
        }

        Ok(Self {
            matcher,
            roots: roots.into_iter().map(|(path, _)| path).collect(),
            debounce: task.debounce,
            events,
            _watcher: watcher,
        })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Run `on_change` for every settled batch of matching changes, forever
    pub async fn serve<F, Fut>(self, on_change: F)
    where
        F: FnMut(Vec<PathBuf>) -> Fut,
        Fut: Future<Output = ()>,
    {
        let WatchBinding {
            matcher,
            debounce,
            events,
            _watcher,
            ..
        } = self;
        serve_events(events, &matcher, debounce, on_change).await;
    }
}

/// Consumer loop for one binding
///
/// Returns when the sending side of `events` is closed.
pub async fn serve_events<F, Fut>(
    mut events: UnboundedReceiver<PathBuf>,
    matcher: &PatternMatcher,
    debounce: Duration,
    mut on_change: F,
) where
    F: FnMut(Vec<PathBuf>) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut state = WatchState::Idle;
    let mut pending: BTreeSet<PathBuf> = BTreeSet::new();

    loop {
        if state == WatchState::Idle {
            match events.recv().await {
                Some(path) if matcher.matches(&path) => {
                    pending.insert(path);
                    state = state.observe_change();
                }
                Some(path) => {
                    debug!("Ignoring change outside watched patterns: {}", path.display());
                    continue;
                }
                None => return,
            }
        }

        // Wait until matching changes stop arriving for one debounce period
        let mut deadline = Instant::now() + debounce;
        loop {
            match timeout_at(deadline, events.recv()).await {
                Ok(Some(path)) => {
                    if matcher.matches(&path) {
                        pending.insert(path);
                        deadline = Instant::now() + debounce;
                    }
                }
                Ok(None) => return,
                Err(_) => break,
            }
        }

        state = state.start_run();
        on_change(std::mem::take(&mut pending).into_iter().collect()).await;

        // Changes queued while the run was in flight earn one more run
        while let Ok(path) = events.try_recv() {
            if matcher.matches(&path) {
                pending.insert(path);
                state = state.observe_change();
            }
        }
        state = state.finish_run();
    }
}
