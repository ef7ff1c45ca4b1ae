//! Dependency-ordered task execution.
//!
//! `run` resolves a topological order from the registry, then executes it in
//! waves: every task whose dependencies have completed runs in the current
//! wave, in parallel on a bounded rayon pool. A failure stops downstream
//! dependents from starting (they are reported as skipped) but lets
//! independent siblings in the same wave finish; all failures surface
//! together in the result vector.

use std::sync::Arc;

use anyhow::{Context, Result};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use super::{RunOutcome, RunResult, Task, TaskId, TaskRegistry};
use crate::core::RegistryError;

pub struct Scheduler {
    registry: Arc<TaskRegistry>,
    pool: rayon::ThreadPool,
}

impl Scheduler {
    /// Create a scheduler with a bounded worker pool.
    ///
    /// `workers == 0` uses available parallelism.
    pub fn new(registry: Arc<TaskRegistry>, workers: usize) -> Result<Self> {
        let threads = if workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            workers
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("gantry-worker-{i}"))
            .build()
            .context("failed to build worker pool")?;

        Ok(Self { registry, pool })
    }

    /// Execute `name` and its dependencies.
    ///
    /// Re-invoking re-executes every task in the order; results are never
    /// cached here (caching, if any, is an adapter concern).
    pub fn run(&self, name: &str) -> Result<Vec<RunResult>, RegistryError> {
        let order = self.registry.resolve_order(name)?;

        let mut results = Vec::with_capacity(order.len());
        let mut completed: FxHashSet<&str> = FxHashSet::default();
        // task -> dependency whose failure blocks it
        let mut failed: FxHashMap<&str, TaskId> = FxHashMap::default();

        let mut remaining: Vec<&Task> =
            order.iter().filter_map(|n| self.registry.get(n)).collect();

        while !remaining.is_empty() {
            // Propagate failures: dependents of a failed task never start
            let mut made_progress = false;
            remaining.retain(|task| {
                let blocked = task
                    .deps
                    .iter()
                    .find_map(|dep| failed.get(dep.as_str()).cloned());
                match blocked {
                    Some(failed_dep) => {
                        failed.insert(task.name.as_str(), failed_dep.clone());
                        results.push(RunResult {
                            task: task.name.clone(),
                            outcome: RunOutcome::Skipped { failed_dep },
                        });
                        made_progress = true;
                        false
                    }
                    None => true,
                }
            });

            let wave: Vec<&Task> = remaining
                .iter()
                .copied()
                .filter(|task| task.deps.iter().all(|d| completed.contains(d.as_str())))
                .collect();

            if wave.is_empty() {
                if made_progress {
                    continue;
                }
                // Acyclic order guarantees progress; nothing runnable means done
                break;
            }

            let wave_results: Vec<RunResult> = self
                .pool
                .install(|| wave.par_iter().map(|&task| execute(task)).collect());

            for result in wave_results {
                match &result.outcome {
                    RunOutcome::Success { .. } => {
                        if let Some(task) = self.registry.get(&result.task) {
                            completed.insert(task.name.as_str());
                        }
                    }
                    RunOutcome::Failed(_) => {
                        if let Some(task) = self.registry.get(&result.task) {
                            failed.insert(task.name.as_str(), task.name.clone());
                        }
                    }
                    RunOutcome::Skipped { .. } => {}
                }
                results.push(result);
            }

            let ran: FxHashSet<&str> = wave.iter().map(|t| t.name.as_str()).collect();
            remaining.retain(|task| !ran.contains(task.name.as_str()));
        }

        Ok(results)
    }
}

/// Run one task's pipeline.
fn execute(task: &Task) -> RunResult {
    crate::debug!("run"; "executing `{}`", task.name);

    let outcome = match task.pipeline.execute() {
        Ok(metrics) => RunOutcome::Success {
            total_bytes: metrics.total_bytes,
            artifacts: metrics.artifacts,
            elapsed: metrics.elapsed,
        },
        Err(err) => RunOutcome::Failed(err),
    };

    RunResult {
        task: task.name.clone(),
        outcome,
    }
}

// ============================================================================
// Tests
// ============================================================================
