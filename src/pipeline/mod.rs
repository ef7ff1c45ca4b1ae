//! Asset pipeline: an ordered composition of transform steps.
//!
//! A `Pipeline` loads a file set from its input glob, threads the artifact
//! set through each step in order, and reports byte totals for its declared
//! outputs. Step order is fixed at construction; a failing step short-circuits
//! the remaining ones and surfaces a [`TransformError`] naming the step.
//!
//! ```text
//! InputSet ──▶ step 1 ──▶ step 2 ──▶ ... ──▶ declared outputs on disk
//!             (concat)   (minify)   (write)
//! ```

pub mod transform;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;

use crate::core::TransformError;
use crate::core::glob::GlobPattern;

// ============================================================================
// Artifact
// ============================================================================

/// One file flowing through a pipeline: a dist-relative path plus content.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Path relative to the step's destination (usually just a file name)
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes,
        }
    }

    /// File extension, lowercased.
    pub fn ext(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
    }
}

// ============================================================================
// StepOptions
// ============================================================================

/// Key-value configuration for one step.
///
/// Options are set at pipeline construction; per-task maps from
/// `[tasks.<name>]` in gantry.toml are merged in without overriding
/// construction-time values.
#[derive(Debug, Clone, Default)]
pub struct StepOptions(FxHashMap<String, String>);

impl StepOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }

    /// Required option, with a readable error naming the key.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .with_context(|| format!("missing required option `{key}`"))
    }

    /// Merge defaults that do not override existing keys.
    pub fn merge_defaults(&mut self, other: &std::collections::BTreeMap<String, String>) {
        for (key, value) in other {
            self.0.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
}

// ============================================================================
// Transform contract
// ============================================================================

/// Uniform wrapper around one external processing capability.
///
/// Adapters are pure function-like units: no shared mutable state between
/// invocations, safe to invoke concurrently for independent file sets.
pub trait Transform: Send + Sync {
    /// Capability name (stable, used in error reports and the registry).
    fn name(&self) -> &'static str;

    /// Output paths this step will produce, known before any execution.
    ///
    /// Used for registration-time conflict detection and post-run byte
    /// accounting. Steps that only transform in memory declare nothing.
    fn declared_outputs(&self, _opts: &StepOptions) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Apply the transform to the artifact set.
    fn apply(&self, inputs: Vec<Artifact>, opts: &StepOptions) -> Result<Vec<Artifact>>;
}

// ============================================================================
// Step
// ============================================================================

/// One configured pipeline step: an adapter plus its options.
#[derive(Clone)]
pub struct Step {
    adapter: Arc<dyn Transform>,
    options: StepOptions,
}

impl Step {
    pub fn new(adapter: Arc<dyn Transform>, options: StepOptions) -> Self {
        Self { adapter, options }
    }

    /// Look up a capability by name in the static adapter registry.
    pub fn capability(name: &str, options: StepOptions) -> Result<Self> {
        let adapter = transform::lookup(name)
            .with_context(|| format!("unknown transform capability `{name}`"))?;
        Ok(Self::new(adapter, options))
    }

    pub fn name(&self) -> &'static str {
        self.adapter.name()
    }

    pub fn declared_outputs(&self) -> Vec<PathBuf> {
        self.adapter.declared_outputs(&self.options)
    }

    pub fn options_mut(&mut self) -> &mut StepOptions {
        &mut self.options
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("adapter", &self.adapter.name())
            .field("options", &self.options)
            .finish()
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// File set feeding a pipeline: a base directory plus a glob over it.
#[derive(Debug, Clone)]
pub struct InputSet {
    pub base: PathBuf,
    pub pattern: GlobPattern,
}

impl InputSet {
    pub fn new(base: impl Into<PathBuf>, pattern: &str) -> Result<Self> {
        Ok(Self {
            base: base.into(),
            pattern: GlobPattern::new(pattern)?,
        })
    }
}

/// Byte accounting for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    /// Declared outputs that exist after the run, with sizes
    pub artifacts: Vec<(PathBuf, u64)>,
    pub total_bytes: u64,
    pub elapsed: Duration,
}

/// Ordered sequence of transform steps applied to a file set.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    input: Option<InputSet>,
    steps: Vec<Step>,
}

impl Pipeline {
    /// An empty pipeline (aggregate tasks like `default` carry no steps).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(input: InputSet) -> Self {
        Self {
            input: Some(input),
            steps: Vec::new(),
        }
    }

    /// Append a step. Order is fixed once the pipeline is registered.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Merge per-task option defaults into every step.
    pub fn merge_task_options(&mut self, options: &std::collections::BTreeMap<String, String>) {
        for step in &mut self.steps {
            step.options_mut().merge_defaults(options);
        }
    }

    /// Union of every step's declared output paths.
    pub fn declared_outputs(&self) -> Vec<PathBuf> {
        let mut outputs = Vec::new();
        for step in &self.steps {
            outputs.extend(step.declared_outputs());
        }
        outputs
    }

    /// Execute all steps in order.
    ///
    /// The first failing step aborts the run; later steps are never invoked.
    pub fn execute(&self) -> Result<PipelineMetrics, TransformError> {
        let started = std::time::Instant::now();

        let mut artifacts = match &self.input {
            Some(input) => {
                load_inputs(input).map_err(|cause| TransformError::new("source", cause))?
            }
            None => Vec::new(),
        };

        for step in &self.steps {
            artifacts = step
                .adapter
                .apply(artifacts, &step.options)
                .map_err(|cause| TransformError::new(step.name(), cause))?;
        }

        let mut metrics = measure_outputs(&self.declared_outputs());
        metrics.elapsed = started.elapsed();
        Ok(metrics)
    }
}

/// Load the input file set, sorted for deterministic concat order.
fn load_inputs(input: &InputSet) -> Result<Vec<Artifact>> {
    if !input.base.is_dir() {
        // Missing source directory yields an empty file set, matching the
        // behavior of a glob that matches nothing
        return Ok(Vec::new());
    }

    let mut artifacts = Vec::new();
    for entry in jwalk::WalkDir::new(&input.base).sort(true) {
        let entry = entry.with_context(|| format!("walking `{}`", input.base.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Ok(rel) = path.strip_prefix(&input.base) else {
            continue;
        };
        if !input.pattern.matches(rel) {
            continue;
        }
        let bytes =
            std::fs::read(&path).with_context(|| format!("reading `{}`", path.display()))?;
        artifacts.push(Artifact::new(rel.to_path_buf(), bytes));
    }
    Ok(artifacts)
}

/// Stat declared outputs after a run. Directories are walked and summed.
fn measure_outputs(outputs: &[PathBuf]) -> PipelineMetrics {
    let mut metrics = PipelineMetrics::default();
    for path in outputs {
        if path.is_file() {
            if let Ok(meta) = std::fs::metadata(path) {
                metrics.total_bytes += meta.len();
                metrics.artifacts.push((path.clone(), meta.len()));
            }
        } else if path.is_dir() {
            for entry in jwalk::WalkDir::new(path).sort(true).into_iter().flatten() {
                if entry.file_type().is_file()
                    && let Ok(meta) = entry.metadata()
                {
                    metrics.total_bytes += meta.len();
                    metrics.artifacts.push((entry.path(), meta.len()));
                }
            }
        }
    }
    metrics
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Test adapter that counts invocations and optionally fails.
    struct Probe {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Probe {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    impl Transform for Probe {
        fn name(&self) -> &'static str {
            "probe"
        }

        fn apply(&self, inputs: Vec<Artifact>, _opts: &StepOptions) -> Result<Vec<Artifact>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("probe failure");
            }
            Ok(inputs)
        }
    }

    #[test]
    fn test_empty_pipeline_succeeds() {
        let metrics = Pipeline::new().execute().unwrap();
        assert_eq!(metrics.total_bytes, 0);
        assert!(metrics.artifacts.is_empty());
    }

    #[test]
    fn test_first_step_failure_short_circuits() {
        let first = Probe::new(true);
        let second = Probe::new(false);

        let pipeline = Pipeline::new()
            .step(Step::new(first.clone(), StepOptions::new()))
            .step(Step::new(second.clone(), StepOptions::new()));

        let err = pipeline.execute().unwrap_err();
        assert_eq!(err.step, "probe");
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0, "short-circuit law");
    }

    #[test]
    fn test_steps_run_in_order() {
        let a = Probe::new(false);
        let b = Probe::new(false);
        let pipeline = Pipeline::new()
            .step(Step::new(a.clone(), StepOptions::new()))
            .step(Step::new(b.clone(), StepOptions::new()));

        pipeline.execute().unwrap();
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_load_inputs_filters_by_glob() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("sub")).unwrap();
        std::fs::write(temp.path().join("a.css"), "a{}").unwrap();
        std::fs::write(temp.path().join("sub/b.css"), "b{}").unwrap();
        std::fs::write(temp.path().join("c.txt"), "nope").unwrap();

        let input = InputSet::new(temp.path(), "**/*.css").unwrap();
        let artifacts = load_inputs(&input).unwrap();
        assert_eq!(artifacts.len(), 2);
        // sorted order: a.css before sub/b.css
        assert_eq!(artifacts[0].path, PathBuf::from("a.css"));
        assert_eq!(artifacts[1].path, PathBuf::from("sub/b.css"));
    }

    #[test]
    fn test_load_inputs_missing_base_is_empty() {
        let input = InputSet::new("/definitely/not/here", "**/*").unwrap();
        assert!(load_inputs(&input).unwrap().is_empty());
    }

    #[test]
    fn test_missing_option_error() {
        let opts = StepOptions::new();
        let err = opts.require("dest").unwrap_err();
        assert!(err.to_string().contains("dest"));
    }

    #[test]
    fn test_merge_defaults_does_not_override() {
        let mut opts = StepOptions::new().set("suffix", ".min");
        let mut task_opts = std::collections::BTreeMap::new();
        task_opts.insert("suffix".to_string(), ".compact".to_string());
        task_opts.insert("extra".to_string(), "1".to_string());

        opts.merge_defaults(&task_opts);
        assert_eq!(opts.get("suffix"), Some(".min"));
        assert_eq!(opts.get("extra"), Some("1"));
    }
}
