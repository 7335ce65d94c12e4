//! Test: Default sequence - styles, then scripts, then both watchers

use crate::helpers::*;
use asset_pipeline::core::config::PipelineConfig;
use asset_pipeline::execution::{ExecutionEvent, TaskError};
use std::time::Duration;

fn started(task: &'static str) -> impl Fn(&ExecutionEvent) -> bool {
    move |event| matches!(event, ExecutionEvent::TaskStarted { task: t, .. } if t == task)
}

fn completed(task: &'static str) -> impl Fn(&ExecutionEvent) -> bool {
    move |event| matches!(event, ExecutionEvent::TaskCompleted { task: t, .. } if t == task)
}

#[tokio::test]
async fn test_default_orders_styles_scripts_then_watch() {
    let project = Project::new();
    let harness = Harness::new(PipelineConfig::default(), project.root());

    let engine = harness.engine.clone();
    let run = tokio::spawn(async move { engine.run("default").await });

    let watching = wait_for(Duration::from_secs(5), || {
        harness.watching("watch-scripts") && harness.watching("watch-styles")
    })
    .await;
    assert!(watching, "both watchers should start");

    // The default task never finishes on its own
    assert!(!run.is_finished());
    run.abort();

    let styles_done = harness.position(completed("styles")).unwrap();
    let scripts_started = harness.position(started("scripts")).unwrap();
    let scripts_done = harness.position(completed("scripts")).unwrap();
    let watch_started = harness.position(started("watch")).unwrap();

    assert!(styles_done < scripts_started);
    assert!(scripts_done < watch_started);
    assert!(project.exists(STYLE_OUTPUT));
    assert!(project.exists(SCRIPT_OUTPUT));
}

#[tokio::test]
async fn test_default_stops_when_styles_fail() {
    let project = Project::new();
    project.write(STYLE_ENTRY, &format!("{}\n", SYNTAX_ERROR));
    let harness = Harness::new(PipelineConfig::default(), project.root());

    let err = tokio::time::timeout(Duration::from_secs(5), harness.engine.run("default"))
        .await
        .expect("a failing series returns")
        .unwrap_err();

    assert_eq!(err.task(), "styles");
    assert_eq!(harness.bundler.call_count(), 0);
    assert!(harness.position(started("watch")).is_none());
    assert_eq!(harness.failed(), vec!["styles", "default"]);
    assert!(!project.exists(SCRIPT_OUTPUT));
}

#[tokio::test]
async fn test_parallel_subtasks_overlap() {
    let yaml = r#"
name: "Parallel build"
tasks:
  - id: "styles"
    compile: { tool: styles, entry: "preen_test/assets/styles/tailwind_entry.css", output: "out/main.css" }
  - id: "scripts"
    compile: { tool: bundler, entry: "preen_test/assets/js/webpack_entry.js", output: "out/main.js" }
  - id: "build"
    parallel: ["styles", "scripts"]
"#;
    let project = Project::new();
    let harness = Harness::with_compilers(
        PipelineConfig::from_yaml(yaml).unwrap(),
        project.root(),
        MockCompiler::new("webpack").with_delay(Duration::from_millis(200)),
        MockCompiler::new("postcss").with_delay(Duration::from_millis(200)),
    );

    harness.engine.run("build").await.unwrap();

    // Both compiles were in flight before either finished
    assert!(harness.position(started("scripts")).unwrap() < harness.position(completed("styles")).unwrap());
    assert!(harness.position(started("styles")).unwrap() < harness.position(completed("scripts")).unwrap());
    assert!(project.exists("out/main.css"));
    assert!(project.exists("out/main.js"));
}

#[tokio::test]
async fn test_parallel_failure_is_returned() {
    let yaml = r#"
name: "Parallel build"
tasks:
  - id: "styles"
    compile: { tool: styles, entry: "preen_test/assets/styles/tailwind_entry.css", output: "out/main.css" }
  - id: "scripts"
    compile: { tool: bundler, entry: "preen_test/assets/js/webpack_entry.js", output: "out/main.js" }
  - id: "build"
    parallel: ["styles", "scripts"]
"#;
    let project = Project::new();
    project.write(SCRIPT_ENTRY, &format!("{}\n", SYNTAX_ERROR));
    let harness = Harness::new(PipelineConfig::from_yaml(yaml).unwrap(), project.root());

    let err = harness.engine.run("build").await.unwrap_err();

    assert_eq!(err.task(), "scripts");
    assert!(harness.failed().contains(&"build".to_string()));
}

#[tokio::test]
async fn test_unknown_task_is_an_error() {
    let project = Project::new();
    let harness = Harness::new(PipelineConfig::default(), project.root());

    let err = harness.engine.run("deploy").await.unwrap_err();

    assert!(matches!(err, TaskError::UnknownTask(ref id) if id == "deploy"));
    assert_eq!(harness.bundler.call_count() + harness.styles.call_count(), 0);
}
