//! Persist artifacts under a destination directory.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::pipeline::{Artifact, StepOptions, Transform};

/// Writes every artifact to `dest`/`<artifact path>` and passes the set
/// through unchanged, so later steps (minify, another write) keep working
/// on the same stream.
///
/// Options:
/// - `dest`: destination directory (required)
/// - `outputs`: comma-separated artifact names this step will produce.
///   When present, output declaration is file-granular; otherwise the
///   destination directory itself is declared (conflict detection and byte
///   accounting then apply at directory granularity).
pub struct WriteDest;

impl Transform for WriteDest {
    fn name(&self) -> &'static str {
        "write"
    }

    fn declared_outputs(&self, opts: &StepOptions) -> Vec<PathBuf> {
        let Some(dest) = opts.get_path("dest") else {
            return Vec::new();
        };
        match opts.get("outputs") {
            Some(names) => names
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(|n| dest.join(n))
                .collect(),
            None => vec![dest],
        }
    }

    fn apply(&self, inputs: Vec<Artifact>, opts: &StepOptions) -> Result<Vec<Artifact>> {
        let dest = PathBuf::from(opts.require("dest")?);

        for artifact in &inputs {
            let out = dest.join(&artifact.path);
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating `{}`", parent.display()))?;
            }
            std::fs::write(&out, &artifact.bytes)
                .with_context(|| format!("writing `{}`", out.display()))?;
        }

        Ok(inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_persists_and_passes_through() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("out");
        let opts = StepOptions::new().set("dest", dest.to_string_lossy());

        let inputs = vec![
            Artifact::new("style.css", b"a{}".to_vec()),
            Artifact::new("nested/app.js", b"x()".to_vec()),
        ];
        let out = WriteDest.apply(inputs, &opts).unwrap();

        assert_eq!(out.len(), 2, "artifacts pass through");
        assert_eq!(std::fs::read(dest.join("style.css")).unwrap(), b"a{}");
        assert_eq!(std::fs::read(dest.join("nested/app.js")).unwrap(), b"x()");
    }

    #[test]
    fn test_declared_outputs_file_granular() {
        let opts = StepOptions::new()
            .set("dest", "/dist/assets/js")
            .set("outputs", "main.js, main.min.js");
        let declared = WriteDest.declared_outputs(&opts);
        assert_eq!(
            declared,
            vec![
                PathBuf::from("/dist/assets/js/main.js"),
                PathBuf::from("/dist/assets/js/main.min.js"),
            ]
        );
    }

    #[test]
    fn test_declared_outputs_directory_fallback() {
        let opts = StepOptions::new().set("dest", "/dist/assets/img");
        assert_eq!(
            WriteDest.declared_outputs(&opts),
            vec![PathBuf::from("/dist/assets/img")]
        );
    }
}
