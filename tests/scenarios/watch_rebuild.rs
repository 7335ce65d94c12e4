//! Test: Watchers - matching changes rebuild the bound task, others are ignored
//!
//! These run against the real OS file watcher, so the waits are generous.

use crate::helpers::*;
use asset_pipeline::core::config::PipelineConfig;
use asset_pipeline::execution::{TaskError, WatchError};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const SETTLE: Duration = Duration::from_secs(5);

async fn start_watch(harness: &Harness, task: &'static str) -> JoinHandle<Result<(), TaskError>> {
    let engine = Arc::clone(&harness.engine);
    let handle = tokio::spawn(async move { engine.run(task).await });
    assert!(
        wait_for(SETTLE, || harness.watching(task)).await,
        "watcher '{}' did not start",
        task
    );
    // Let the OS registration settle before touching files
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle
}

#[tokio::test]
async fn test_js_change_rebuilds_scripts() {
    let project = Project::new();
    let harness = Harness::new(PipelineConfig::default(), project.root());
    let watch = start_watch(&harness, "watch-scripts").await;

    project.write("apps/preen_test/assets/js/menu.js", "export const menu = 1;");

    assert!(wait_for(SETTLE, || project.exists(SCRIPT_OUTPUT)).await);

    // Well past the debounce window: one write, one rebuild
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(harness.bundler.call_count(), 1);
    assert_eq!(harness.rebuilds_of("scripts"), 1);
    assert_eq!(harness.styles.call_count(), 0);
    assert!(project.read(SCRIPT_OUTPUT).contains("console.log(\"entry\");"));

    watch.abort();
}

#[tokio::test]
async fn test_tailwind_config_change_rebuilds_styles() {
    let project = Project::new();
    let harness = Harness::new(PipelineConfig::default(), project.root());
    let watch = start_watch(&harness, "watch-styles").await;

    project.write("tailwind.config.js", "module.exports = { theme: {} };\n");

    assert!(wait_for(SETTLE, || project.exists(STYLE_OUTPUT)).await);
    assert_eq!(harness.bundler.call_count(), 0);

    watch.abort();
}

#[tokio::test]
async fn test_new_css_file_rebuilds_styles() {
    let project = Project::new();
    let harness = Harness::new(PipelineConfig::default(), project.root());
    let watch = start_watch(&harness, "watch-styles").await;

    project.write("apps/preen_test/assets/css/card.css", ".card {}\n");

    assert!(wait_for(SETTLE, || harness.styles.call_count() >= 1).await);

    watch.abort();
}

#[tokio::test]
async fn test_unmatched_changes_never_rebuild() {
    let project = Project::new();
    let harness = Harness::new(PipelineConfig::default(), project.root());
    let watch = start_watch(&harness, "watch-scripts").await;

    project.write("apps/preen_test/assets/js/notes.txt", "not a script");
    project.write("apps/preen_test/assets/js/app.ts", "let a: number = 1;");
    tokio::time::sleep(Duration::from_millis(800)).await;

    assert_eq!(harness.bundler.call_count(), 0);
    assert_eq!(harness.rebuilds_of("scripts"), 0);
    assert!(!project.exists(SCRIPT_OUTPUT));

    watch.abort();
}

#[tokio::test]
async fn test_failed_rebuild_keeps_watching() {
    let project = Project::new();
    project.write(SCRIPT_ENTRY, &format!("{}\n", SYNTAX_ERROR));
    let harness = Harness::new(PipelineConfig::default(), project.root());
    let watch = start_watch(&harness, "watch-scripts").await;

    project.write("apps/preen_test/assets/js/app.js", "console.log(1);");
    assert!(wait_for(SETTLE, || harness.failed().contains(&"scripts".to_string())).await);
    assert!(!watch.is_finished());

    // Fix the entry, then touch a watched file again
    project.write(SCRIPT_ENTRY, "console.log(\"fixed\");\n");
    project.write("apps/preen_test/assets/js/app.js", "console.log(2);");

    assert!(wait_for(SETTLE, || project.exists(SCRIPT_OUTPUT)).await);
    assert!(project.read(SCRIPT_OUTPUT).contains("fixed"));

    watch.abort();
}

#[tokio::test]
async fn test_changes_during_rebuild_run_once_more() {
    let project = Project::new();
    let harness = Harness::with_compilers(
        PipelineConfig::default(),
        project.root(),
        MockCompiler::new("webpack").with_delay(Duration::from_millis(500)),
        MockCompiler::new("postcss"),
    );
    let watch = start_watch(&harness, "watch-scripts").await;

    project.write("apps/preen_test/assets/js/app.js", "console.log(1);");
    assert!(wait_for(SETTLE, || harness.bundler.call_count() == 1).await);

    // These land while the first rebuild is still compiling
    for i in 0..5 {
        project.write("apps/preen_test/assets/js/app.js", &format!("console.log({});", i));
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(wait_for(SETTLE, || harness.bundler.call_count() >= 2).await);
    tokio::time::sleep(Duration::from_millis(1200)).await;

    assert_eq!(harness.bundler.max_in_flight(), 1);
    assert_eq!(harness.bundler.call_count(), 2);

    watch.abort();
}

#[tokio::test]
async fn test_missing_watch_root_is_fatal() {
    let project = Project::new();
    std::fs::remove_dir_all(project.path("apps")).unwrap();
    let harness = Harness::new(PipelineConfig::default(), project.root());

    let err = harness.engine.run("watch-scripts").await.unwrap_err();

    assert!(matches!(
        err,
        TaskError::Watch {
            error: WatchError::MissingRoot { .. },
            ..
        }
    ));
    assert!(!harness.watching("watch-scripts"));
}
