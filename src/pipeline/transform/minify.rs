//! Stylesheet and script minification adapters.
//!
//! Uses oxc for JavaScript and lightningcss for CSS. Minified artifacts are
//! renamed with a suffix (default `.min`) so the unminified variant written
//! by an earlier step survives next to them.
//!
//! Options:
//! - `suffix`: inserted before the extension (default `.min`)
//! - `source_map` (js only): `"true"` emits a `<name>.map` artifact next to
//!   the minified script, declared so byte accounting covers it
//! - `map_source_prefix`: prepended to every `sources` entry of any `.map`
//!   artifact flowing through, emitted or pre-existing (source-map path
//!   rewriting is a step option, not a separate component)

use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use super::with_suffix;
use crate::pipeline::{Artifact, StepOptions, Transform};

const DEFAULT_SUFFIX: &str = ".min";

// ============================================================================
// CSS
// ============================================================================

/// Minify `.css` artifacts; everything else passes through.
pub struct CssMinify;

impl Transform for CssMinify {
    fn name(&self) -> &'static str {
        "css-minify"
    }

    fn apply(&self, inputs: Vec<Artifact>, opts: &StepOptions) -> Result<Vec<Artifact>> {
        let suffix = opts.get("suffix").unwrap_or(DEFAULT_SUFFIX);

        let mut outputs = Vec::with_capacity(inputs.len());
        for artifact in inputs {
            match artifact.ext().as_deref() {
                Some("css") => {
                    let source = std::str::from_utf8(&artifact.bytes)
                        .map_err(|_| anyhow!("`{}` is not valid UTF-8", artifact.path.display()))?;
                    let minified = minify_css(source)
                        .map_err(|e| anyhow!("`{}`: {}", artifact.path.display(), e))?;
                    outputs.push(Artifact::new(
                        with_suffix(&artifact.path, suffix),
                        minified.into_bytes(),
                    ));
                }
                Some("map") => outputs.push(rewrite_map(artifact, opts)?),
                _ => outputs.push(artifact),
            }
        }
        Ok(outputs)
    }
}

/// Minify CSS source code.
fn minify_css(source: &str) -> Result<String> {
    let stylesheet = StyleSheet::parse(source, ParserOptions::default())
        .map_err(|e| anyhow!("stylesheet parse error: {e}"))?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow!("stylesheet print error: {e}"))?;
    Ok(result.code)
}

// ============================================================================
// JavaScript
// ============================================================================

/// Minify `.js`/`.mjs` artifacts; everything else passes through.
pub struct JsMinify;

impl Transform for JsMinify {
    fn name(&self) -> &'static str {
        "js-minify"
    }

    fn apply(&self, inputs: Vec<Artifact>, opts: &StepOptions) -> Result<Vec<Artifact>> {
        let suffix = opts.get("suffix").unwrap_or(DEFAULT_SUFFIX);
        let emit_map = opts.get("source_map") == Some("true");

        let mut outputs = Vec::with_capacity(inputs.len());
        for artifact in inputs {
            match artifact.ext().as_deref() {
                Some("js" | "mjs") => {
                    let source = std::str::from_utf8(&artifact.bytes)
                        .map_err(|_| anyhow!("`{}` is not valid UTF-8", artifact.path.display()))?;
                    let map_source = emit_map.then(|| artifact.path.clone());
                    let (minified, map) = minify_js(source, map_source)
                        .map_err(|e| anyhow!("`{}`: {}", artifact.path.display(), e))?;

                    let out_path = with_suffix(&artifact.path, suffix);
                    if let Some(map_json) = map {
                        let mut map_name = out_path.clone().into_os_string();
                        map_name.push(".map");
                        let map_artifact =
                            Artifact::new(PathBuf::from(map_name), map_json.into_bytes());
                        outputs.push(rewrite_map(map_artifact, opts)?);
                    }
                    outputs.push(Artifact::new(out_path, minified.into_bytes()));
                }
                Some("map") => outputs.push(rewrite_map(artifact, opts)?),
                _ => outputs.push(artifact),
            }
        }
        Ok(outputs)
    }
}

/// Minify JavaScript source code, optionally generating a source map that
/// names `map_source` in its `sources`.
fn minify_js(source: &str, map_source: Option<PathBuf>) -> Result<(String, Option<String>)> {
    let allocator = Allocator::default();
    let source_type = SourceType::mjs();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if let Some(error) = ret.errors.first() {
        bail!("script parse error: {error}");
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let codegen = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            source_map_path: map_source,
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program);
    let map = codegen.map.map(|m| m.to_json_string());
    Ok((codegen.code, map))
}

// ============================================================================
// Source maps
// ============================================================================

/// Rewrite the `sources` entries of a source map artifact when the
/// `map_source_prefix` option is set; pass through unchanged otherwise.
fn rewrite_map(artifact: Artifact, opts: &StepOptions) -> Result<Artifact> {
    let Some(prefix) = opts.get("map_source_prefix") else {
        return Ok(artifact);
    };

    let mut map: serde_json::Value = serde_json::from_slice(&artifact.bytes)
        .map_err(|e| anyhow!("`{}` is not a valid source map: {}", artifact.path.display(), e))?;

    if let Some(sources) = map.get_mut("sources").and_then(|s| s.as_array_mut()) {
        for source in sources.iter_mut() {
            if let Some(orig) = source.as_str() {
                *source = serde_json::Value::String(format!("{prefix}{orig}"));
            }
        }
    }

    let bytes = serde_json::to_vec(&map)?;
    Ok(Artifact::new(artifact.path, bytes))
}

// ============================================================================
// Tests
// ============================================================================
