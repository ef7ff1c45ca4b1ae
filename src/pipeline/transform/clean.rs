//! Empty a destination directory before downstream writes.

use anyhow::{Context, Result, bail};
use std::path::Path;

use crate::pipeline::{Artifact, StepOptions, Transform};

/// Removes the `dest` directory and recreates it empty. Artifacts pass
/// through unchanged. Declares no outputs.
pub struct Clean;

impl Transform for Clean {
    fn name(&self) -> &'static str {
        "clean"
    }

    fn apply(&self, inputs: Vec<Artifact>, opts: &StepOptions) -> Result<Vec<Artifact>> {
        let dest = Path::new(opts.require("dest")?);

        // Refuse obviously dangerous targets
        if dest.parent().is_none() {
            bail!("refusing to clean filesystem root");
        }

        if dest.exists() {
            std::fs::remove_dir_all(dest)
                .with_context(|| format!("removing `{}`", dest.display()))?;
        }
        std::fs::create_dir_all(dest)
            .with_context(|| format!("recreating `{}`", dest.display()))?;

        Ok(inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clean_empties_directory() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("dist");
        std::fs::create_dir_all(dest.join("assets")).unwrap();
        std::fs::write(dest.join("assets/old.css"), "stale").unwrap();

        let opts = StepOptions::new().set("dest", dest.to_string_lossy());
        Clean.apply(Vec::new(), &opts).unwrap();

        assert!(dest.is_dir());
        assert!(!dest.join("assets").exists());
    }

    #[test]
    fn test_clean_missing_directory_ok() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("not-yet");
        let opts = StepOptions::new().set("dest", dest.to_string_lossy());

        Clean.apply(Vec::new(), &opts).unwrap();
        assert!(dest.is_dir());
    }

    #[test]
    fn test_clean_refuses_root() {
        let opts = StepOptions::new().set("dest", "/");
        assert!(Clean.apply(Vec::new(), &opts).is_err());
    }
}
