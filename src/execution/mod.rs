//! Task execution engine

pub mod engine;
pub mod error;
pub mod executor;
pub mod watch;

pub use engine::{EventHandler, ExecutionEngine, ExecutionEvent};
pub use error::{TaskError, WatchError};
pub use executor::{CompileExecutor, CompileOutcome};
pub use watch::{PatternMatcher, WatchBinding};
