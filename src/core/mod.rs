//! Core domain models for the asset pipeline
//!
//! This module defines the task definitions, the task graph built from
//! configuration, and the runtime state of tasks and watchers.

pub mod config;
pub mod graph;
pub mod state;
pub mod task;

pub use graph::*;
pub use state::*;
pub use task::*;
