//! Glob patterns compiled to anchored regexes.
//!
//! Supports the subset used by watch rules and pipeline inputs:
//! - `*`  matches any run of characters within one path segment
//! - `?`  matches one character within a segment
//! - `**` matches any number of segments (including zero when followed by `/`)
//!
//! Paths are matched with `/` separators regardless of platform.

use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    raw: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compile a glob pattern. Fails on invalid trailing escapes only;
    /// regex metacharacters in the pattern are escaped literally.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&translate(pattern))
            .with_context(|| format!("invalid glob pattern `{pattern}`"))?;
        Ok(Self {
            raw: pattern.to_string(),
            regex,
        })
    }

    /// Match a path against the pattern. Backslashes are normalized to `/`.
    pub fn matches(&self, path: &Path) -> bool {
        let text = path.to_string_lossy().replace('\\', "/");
        self.regex.is_match(&text)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Translate a glob pattern into an anchored regex.
fn translate(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');

    let bytes = pattern.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'*' => {
                if bytes.get(i + 1) == Some(&b'*') {
                    // `**/` may match zero segments; bare `**` matches the rest
                    if bytes.get(i + 2) == Some(&b'/') {
                        out.push_str("(?:[^/]*/)*");
                        i += 3;
                    } else {
                        out.push_str(".*");
                        i += 2;
                    }
                } else {
                    out.push_str("[^/]*");
                    i += 1;
                }
            }
            b'?' => {
                out.push_str("[^/]");
                i += 1;
            }
            c => {
                let ch = c as char;
                if "\\.+()[]{}^$|".contains(ch) {
                    out.push('\\');
                }
                out.push(ch);
                i += 1;
            }
        }
    }

    out.push('$');
    out
}
