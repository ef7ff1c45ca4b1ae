//! Watch rules: glob patterns bound to task identifiers.
//!
//! Rules are registered once at startup and never mutated; they fire
//! repeatedly for the process lifetime.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::glob::GlobPattern;
use crate::task::TaskId;

#[derive(Debug, Clone)]
pub struct WatchRule {
    /// Directory the pattern is anchored to (watched recursively)
    base: PathBuf,
    pattern: GlobPattern,
    tasks: Vec<TaskId>,
    /// Fire a live-reload signal instead of running tasks
    reload_only: bool,
}

impl WatchRule {
    /// Bind a glob under `base` to one or more tasks.
    pub fn new(base: impl Into<PathBuf>, pattern: &str, tasks: Vec<TaskId>) -> Result<Self> {
        Ok(Self {
            base: base.into(),
            pattern: GlobPattern::new(pattern)?,
            tasks,
            reload_only: false,
        })
    }

    /// Rule that only broadcasts a reload signal (content produced outside
    /// the pipeline, e.g. server-rendered HTML in dist).
    pub fn reload_only(base: impl Into<PathBuf>, pattern: &str) -> Result<Self> {
        Ok(Self {
            base: base.into(),
            pattern: GlobPattern::new(pattern)?,
            tasks: Vec::new(),
            reload_only: true,
        })
    }

    /// Match an absolute changed path against this rule.
    pub fn matches(&self, path: &Path) -> bool {
        match path.strip_prefix(&self.base) {
            Ok(rel) => self.pattern.matches(rel),
            Err(_) => false,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn tasks(&self) -> &[TaskId] {
        &self.tasks
    }

    pub fn is_reload_only(&self) -> bool {
        self.reload_only
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}
