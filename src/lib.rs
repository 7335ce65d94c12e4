//! asset-pipeline - compiles and watches the front-end assets of a web app

pub mod cli;
pub mod core;
pub mod execution;
pub mod tools;

// Re-export commonly used types
pub use core::config::PipelineConfig;
pub use core::{ExecutionStatus, Task, TaskGraph, TaskKind, TaskState, WatchState};
pub use execution::{ExecutionEngine, ExecutionEvent, TaskError, WatchError};
pub use tools::{Artifact, AssetCompiler, CompileRequest, ToolError, Toolchain};
