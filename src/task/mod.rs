//! Tasks: named units of work composed of a pipeline and dependencies.

pub mod builtin;
mod registry;
mod scheduler;

pub use registry::TaskRegistry;
pub use scheduler::Scheduler;

use std::path::PathBuf;
use std::time::Duration;

use crate::core::TransformError;
use crate::pipeline::Pipeline;

/// Task identifier (unique within a registry).
pub type TaskId = String;

/// A registered task: identifier, dependency list, pipeline.
#[derive(Debug)]
pub struct Task {
    pub name: TaskId,
    pub deps: Vec<TaskId>,
    pub pipeline: Pipeline,
}

// ============================================================================
// RunResult
// ============================================================================

/// Outcome of one task execution. Created per invocation, consumed by the
/// notifier, never persisted.
#[derive(Debug)]
pub struct RunResult {
    pub task: TaskId,
    pub outcome: RunOutcome,
}

#[derive(Debug)]
pub enum RunOutcome {
    Success {
        /// Declared outputs that exist after the run, with sizes
        artifacts: Vec<(PathBuf, u64)>,
        total_bytes: u64,
        elapsed: Duration,
    },
    Failed(TransformError),
    /// Not started because a dependency failed
    Skipped { failed_dep: TaskId },
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RunOutcome::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, RunOutcome::Failed(_))
    }
}
