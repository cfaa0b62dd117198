//! Execution engine module.
//!
//! This module drives updates of processing graphs and fans per-pixel work
//! out across worker threads.

pub mod dispatcher;
pub mod engine;
pub mod progress;

pub use dispatcher::{Dispatcher, OutputChunk};
pub use engine::{ExecutionEngine, ExecutionOptions, UpdatePlan, UpdateStats};
pub use progress::{ProgressCallback, ProgressTracker, ProgressUpdate, SkipReason};
