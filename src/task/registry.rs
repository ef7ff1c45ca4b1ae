//! Task registry: the declarative task graph.
//!
//! Registration is strict: dependencies must already exist, names are
//! unique, and declared output paths may not collide across tasks. All graph
//! errors surface at registration time so a broken graph can never reach
//! watch mode.
//!
//! `register_group` admits forward and mutual references within one batch
//! (the graph is cycle-checked as a whole afterwards); on any failure the
//! registry rolls back to its pre-call state.

use rustc_hash::{FxHashMap, FxHashSet};

use super::{Task, TaskId};
use crate::core::RegistryError;
use crate::pipeline::Pipeline;

#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
    index: FxHashMap<TaskId, usize>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Dependencies must already be registered.
    pub fn register(
        &mut self,
        name: impl Into<TaskId>,
        deps: Vec<TaskId>,
        pipeline: Pipeline,
    ) -> Result<(), RegistryError> {
        let name = name.into();

        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateTask(name));
        }
        for dep in &deps {
            if !self.index.contains_key(dep) {
                return Err(RegistryError::UnknownDependency {
                    task: name,
                    dependency: dep.clone(),
                });
            }
        }
        self.check_output_conflicts(&name, &pipeline)?;

        self.insert(Task {
            name,
            deps,
            pipeline,
        });
        Ok(())
    }

    /// Register a batch of tasks that may reference each other in any order.
    ///
    /// The merged graph is validated (unknown deps, output conflicts, cycles)
    /// and the registry is left untouched if anything fails.
    pub fn register_group(
        &mut self,
        entries: Vec<(TaskId, Vec<TaskId>, Pipeline)>,
    ) -> Result<(), RegistryError> {
        let snapshot = self.tasks.len();

        let result = self.try_register_group(entries);
        if result.is_err() {
            // Roll back: no mutation persists after a failed registration
            self.tasks.truncate(snapshot);
            self.index.retain(|_, idx| *idx < snapshot);
        }
        result
    }

    fn try_register_group(
        &mut self,
        entries: Vec<(TaskId, Vec<TaskId>, Pipeline)>,
    ) -> Result<(), RegistryError> {
        for (name, deps, pipeline) in entries {
            if self.index.contains_key(&name) {
                return Err(RegistryError::DuplicateTask(name));
            }
            self.check_output_conflicts(&name, &pipeline)?;
            self.insert(Task {
                name,
                deps,
                pipeline,
            });
        }

        // Unknown dependency check over the merged graph
        for task in &self.tasks {
            for dep in &task.deps {
                if !self.index.contains_key(dep) {
                    return Err(RegistryError::UnknownDependency {
                        task: task.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        // Cycle check over the merged graph
        for task in &self.tasks {
            self.resolve_order(&task.name)?;
        }
        Ok(())
    }

    fn insert(&mut self, task: Task) {
        self.index.insert(task.name.clone(), self.tasks.len());
        self.tasks.push(task);
    }

    /// Reject pipelines whose declared outputs collide with a registered task.
    ///
    /// A declared directory conflicts with any declared path inside it, not
    /// just an exact match, so a file-granular declaration cannot hide under
    /// another task's directory-granular one.
    fn check_output_conflicts(
        &self,
        name: &TaskId,
        pipeline: &Pipeline,
    ) -> Result<(), RegistryError> {
        for output in pipeline.declared_outputs() {
            for task in &self.tasks {
                if task
                    .pipeline
                    .declared_outputs()
                    .iter()
                    .any(|declared| paths_overlap(declared, &output))
                {
                    return Err(RegistryError::OutputConflict {
                        first: task.name.clone(),
                        second: name.clone(),
                        path: output,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&idx| &self.tasks[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registered tasks in registration order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Topologically sorted task sequence ending in `name`.
    ///
    /// Depth-first traversal with a recursion-stack set; a back edge yields
    /// `CyclicDependencyError` carrying the cycle path.
    pub fn resolve_order(&self, name: &str) -> Result<Vec<TaskId>, RegistryError> {
        if !self.contains(name) {
            return Err(RegistryError::UnknownTask(name.to_string()));
        }

        let mut order = Vec::new();
        let mut visited = FxHashSet::default();
        let mut stack = Vec::new();
        self.visit(name, &mut visited, &mut stack, &mut order)?;
        Ok(order)
    }

    fn visit(
        &self,
        name: &str,
        visited: &mut FxHashSet<TaskId>,
        stack: &mut Vec<TaskId>,
        order: &mut Vec<TaskId>,
    ) -> Result<(), RegistryError> {
        if visited.contains(name) {
            return Ok(());
        }

        if let Some(pos) = stack.iter().position(|n| n == name) {
            let mut path: Vec<TaskId> = stack[pos..].to_vec();
            path.push(name.to_string());
            return Err(RegistryError::CyclicDependency { path });
        }

        let Some(task) = self.get(name) else {
            // Dangling dep inside a group batch; reported by the group check
            return Ok(());
        };

        stack.push(name.to_string());
        for dep in &task.deps {
            self.visit(dep, visited, stack, order)?;
        }
        stack.pop();

        visited.insert(name.to_string());
        order.push(name.to_string());
        Ok(())
    }
}

/// Component-wise equality or containment in either direction.
fn paths_overlap(a: &std::path::Path, b: &std::path::Path) -> bool {
    a == b || a.starts_with(b) || b.starts_with(a)
}

// ============================================================================
// Tests
// ============================================================================
