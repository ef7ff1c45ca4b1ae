//! Image re-encoding adapter.
//!
//! Re-encodes PNG and JPEG artifacts through the `image` crate, keeping
//! whichever encoding is smaller. Other formats pass through untouched.

use std::io::Cursor;

use anyhow::{Result, anyhow};
use image::ImageFormat;

use crate::pipeline::{Artifact, StepOptions, Transform};

pub struct MediaOpt;

impl Transform for MediaOpt {
    fn name(&self) -> &'static str {
        "media-opt"
    }

    fn apply(&self, inputs: Vec<Artifact>, _opts: &StepOptions) -> Result<Vec<Artifact>> {
        let mut outputs = Vec::with_capacity(inputs.len());
        for artifact in inputs {
            let format = match artifact.ext().as_deref() {
                Some("png") => Some(ImageFormat::Png),
                Some("jpg" | "jpeg") => Some(ImageFormat::Jpeg),
                _ => None,
            };

            let Some(format) = format else {
                outputs.push(artifact);
                continue;
            };

            let reencoded = reencode(&artifact.bytes, format)
                .map_err(|e| anyhow!("`{}`: {}", artifact.path.display(), e))?;

            // Never grow a file
            if reencoded.len() < artifact.bytes.len() {
                outputs.push(Artifact::new(artifact.path, reencoded));
            } else {
                outputs.push(artifact);
            }
        }
        Ok(outputs)
    }
}

fn reencode(bytes: &[u8], format: ImageFormat) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)?;
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), format)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample_png() -> Vec<u8> {
        let img = image::DynamicImage::new_rgb8(4, 4);
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_non_image_passes_through() {
        let inputs = vec![Artifact::new("font.woff2", vec![1, 2, 3])];
        let out = MediaOpt.apply(inputs, &StepOptions::new()).unwrap();
        assert_eq!(out[0].bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_png_reencoded_never_grows() {
        let png = sample_png();
        let original_len = png.len();
        let inputs = vec![Artifact::new("img/logo.png", png)];

        let out = MediaOpt.apply(inputs, &StepOptions::new()).unwrap();
        assert_eq!(out[0].path, PathBuf::from("img/logo.png"));
        assert!(out[0].bytes.len() <= original_len);
    }

    #[test]
    fn test_corrupt_image_fails() {
        let inputs = vec![Artifact::new("broken.png", vec![0xde, 0xad, 0xbe, 0xef])];
        assert!(MediaOpt.apply(inputs, &StepOptions::new()).is_err());
    }
}
