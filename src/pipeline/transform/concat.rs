//! Concatenate the input file set into one artifact.

use anyhow::Result;

use crate::pipeline::{Artifact, StepOptions, Transform};

/// Joins all inputs, in load order, into a single artifact named by the
/// required `dest` option. An empty input set produces no output.
pub struct Concat;

impl Transform for Concat {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn apply(&self, inputs: Vec<Artifact>, opts: &StepOptions) -> Result<Vec<Artifact>> {
        let dest = opts.require("dest")?;

        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let mut bytes = Vec::with_capacity(inputs.iter().map(|a| a.bytes.len() + 1).sum());
        for (i, artifact) in inputs.iter().enumerate() {
            if i > 0 {
                bytes.push(b'\n');
            }
            bytes.extend_from_slice(&artifact.bytes);
        }

        Ok(vec![Artifact::new(dest, bytes)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_concat_joins_in_order() {
        let inputs = vec![
            Artifact::new("a.js", b"var a;".to_vec()),
            Artifact::new("b.js", b"var b;".to_vec()),
        ];
        let opts = StepOptions::new().set("dest", "main.js");
        let out = Concat.apply(inputs, &opts).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, PathBuf::from("main.js"));
        assert_eq!(out[0].bytes, b"var a;\nvar b;");
    }

    #[test]
    fn test_concat_empty_input_produces_nothing() {
        let opts = StepOptions::new().set("dest", "main.js");
        assert!(Concat.apply(Vec::new(), &opts).unwrap().is_empty());
    }

    #[test]
    fn test_concat_requires_dest() {
        assert!(Concat.apply(Vec::new(), &StepOptions::new()).is_err());
    }
}
