//! Scenario-based tests for asset-pipeline

mod compile_tasks;
mod default_sequence;
mod watch_rebuild;
