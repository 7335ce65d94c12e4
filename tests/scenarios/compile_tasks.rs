//! Test: Compile tasks - outputs reflect their entry, failures keep the old output

use crate::helpers::*;
use asset_pipeline::core::config::PipelineConfig;
use asset_pipeline::execution::TaskError;
use asset_pipeline::tools::ToolError;
use asset_pipeline::TaskState;

#[tokio::test]
async fn test_scripts_output_reflects_entry_and_imports() {
    let project = Project::new();
    let harness = Harness::new(PipelineConfig::default(), project.root());

    harness.engine.run("scripts").await.unwrap();

    let output = project.read(SCRIPT_OUTPUT);
    assert!(output.contains("export const util = 1;"));
    assert!(output.contains("console.log(\"entry\");"));
    // Imports come before the entry's own code
    assert!(output.find("util").unwrap() < output.find("entry").unwrap());

    assert_eq!(harness.bundler.calls(), vec!["scripts"]);
    assert_eq!(harness.styles.call_count(), 0);
}

#[tokio::test]
async fn test_styles_writes_single_output_file() {
    let project = Project::new();
    let harness = Harness::new(PipelineConfig::default(), project.root());

    harness.engine.run("styles").await.unwrap();

    assert_eq!(project.read(STYLE_OUTPUT), "@tailwind base;\n");
    let entries = std::fs::read_dir(project.path("preen_test/static/css")).unwrap().count();
    assert_eq!(entries, 1);
    assert!(matches!(harness.engine.task_state("styles"), TaskState::Completed { .. }));
}

#[tokio::test]
async fn test_rerun_with_unchanged_sources_is_byte_identical() {
    let project = Project::new();
    let harness = Harness::new(PipelineConfig::default(), project.root());

    harness.engine.run("scripts").await.unwrap();
    let first = std::fs::read(project.path(SCRIPT_OUTPUT)).unwrap();
    harness.engine.run("scripts").await.unwrap();
    let second = std::fs::read(project.path(SCRIPT_OUTPUT)).unwrap();

    assert_eq!(first, second);
    let files = std::fs::read_dir(project.path("preen_test/static/js")).unwrap().count();
    assert_eq!(files, 1);
    assert_eq!(harness.bundler.call_count(), 2);
}

#[tokio::test]
async fn test_rebuild_replaces_output_with_current_sources() {
    let project = Project::new();
    let harness = Harness::new(PipelineConfig::default(), project.root());

    harness.engine.run("scripts").await.unwrap();
    project.write("preen_test/assets/js/util.js", "export const util = 2;");
    harness.engine.run("scripts").await.unwrap();

    let output = project.read(SCRIPT_OUTPUT);
    assert!(output.contains("util = 2"));
    assert!(!output.contains("util = 1"));
}

#[tokio::test]
async fn test_syntax_error_keeps_previous_output() {
    let project = Project::new();
    let harness = Harness::new(PipelineConfig::default(), project.root());

    harness.engine.run("scripts").await.unwrap();
    let before = project.read(SCRIPT_OUTPUT);

    project.write(SCRIPT_ENTRY, &format!("{}: unexpected token\n", SYNTAX_ERROR));
    let err = harness.engine.run("scripts").await.unwrap_err();

    match &err {
        TaskError::Compile {
            task,
            error: ToolError::Failed { stderr, .. },
        } => {
            assert_eq!(task, "scripts");
            assert!(stderr.contains("SyntaxError"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(project.read(SCRIPT_OUTPUT), before);
    assert_eq!(harness.failed(), vec!["scripts"]);
}

#[tokio::test]
async fn test_missing_import_fails_without_output() {
    let project = Project::new();
    project.write(SCRIPT_ENTRY, "import \"./gone.js\";\n");
    let harness = Harness::new(PipelineConfig::default(), project.root());

    let err = harness.engine.run("scripts").await.unwrap_err();

    assert_eq!(err.task(), "scripts");
    assert!(err.to_string().contains("gone.js"));
    assert!(!project.exists(SCRIPT_OUTPUT));
}

#[tokio::test]
async fn test_missing_entry_is_reported() {
    let project = Project::new();
    std::fs::remove_file(project.path(STYLE_ENTRY)).unwrap();
    let harness = Harness::new(PipelineConfig::default(), project.root());

    let err = harness.engine.run("styles").await.unwrap_err();

    assert!(matches!(
        err,
        TaskError::Compile {
            error: ToolError::MissingInput { .. },
            ..
        }
    ));
    assert!(matches!(harness.engine.task_state("styles"), TaskState::Failed { .. }));
}
