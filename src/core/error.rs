//! Error taxonomy for task registration and pipeline execution.
//!
//! Registration-time errors (`RegistryError`) are fatal: the process must
//! refuse to start watch mode on a broken task graph. Execution-time errors
//! (`TransformError`) are recovered at the task boundary and reported via
//! the notifier without terminating a long-lived watch process.

use std::path::PathBuf;
use thiserror::Error;

use crate::task::TaskId;

// ============================================================================
// RegistryError
// ============================================================================

/// Errors raised while building or resolving the task graph.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("task `{0}` is already registered")]
    DuplicateTask(TaskId),

    #[error("task `{task}` depends on unknown task `{dependency}`")]
    UnknownDependency { task: TaskId, dependency: TaskId },

    #[error("dependency cycle: {}", path.join(" -> "))]
    CyclicDependency { path: Vec<TaskId> },

    #[error("tasks `{first}` and `{second}` both declare output `{}`", path.display())]
    OutputConflict {
        first: TaskId,
        second: TaskId,
        path: PathBuf,
    },

    #[error("unknown task `{0}`")]
    UnknownTask(TaskId),
}

// ============================================================================
// TransformError
// ============================================================================

/// A pipeline step failed.
///
/// Carries the capability name of the failing step; remaining steps are
/// never invoked once one fails (short-circuit).
#[derive(Debug, Error)]
#[error("transform `{step}` failed: {cause}")]
pub struct TransformError {
    /// Capability name of the failing step (e.g. "js-minify")
    pub step: String,
    #[source]
    pub cause: anyhow::Error,
}

impl TransformError {
    pub fn new(step: impl Into<String>, cause: anyhow::Error) -> Self {
        Self {
            step: step.into(),
            cause,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_display() {
        let err = RegistryError::DuplicateTask("style".into());
        assert!(format!("{err}").contains("already registered"));

        let err = RegistryError::CyclicDependency {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(format!("{err}"), "dependency cycle: a -> b -> a");

        let err = RegistryError::OutputConflict {
            first: "style".into(),
            second: "theme".into(),
            path: PathBuf::from("/dist/out.css"),
        };
        let display = format!("{err}");
        assert!(display.contains("style"));
        assert!(display.contains("/dist/out.css"));
    }

    #[test]
    fn test_transform_error_display() {
        let err = TransformError::new("bundle", anyhow::anyhow!("unexpected token"));
        let display = format!("{err}");
        assert!(display.contains("bundle"));
        assert!(display.contains("unexpected token"));
    }
}
