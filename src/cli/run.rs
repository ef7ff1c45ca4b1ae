//! One-shot task execution (`run`, `default`, `list`).

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::log;
use crate::notifier::Notifier;
use crate::task::{Scheduler, TaskRegistry};

/// Run `task` and its dependencies once.
///
/// Returns `false` if any task in the chain failed (the process exits
/// non-zero without touching results that did complete).
pub fn run_task(config: &Config, registry: Arc<TaskRegistry>, task: &str) -> Result<bool> {
    let scheduler = Scheduler::new(registry, config.run.workers)?;
    let results = scheduler.run(task)?;
    Notifier::new().report_all(&results);
    Ok(results.iter().all(|r| !r.is_failure()))
}

/// Print the registered task graph.
pub fn list_tasks(registry: &TaskRegistry) {
    for task in registry.tasks() {
        if task.deps.is_empty() {
            log!("list"; "{}", task.name);
        } else {
            log!("list"; "{} (deps: {})", task.name, task.deps.join(", "));
        }
    }
}
