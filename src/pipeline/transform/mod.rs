//! Built-in transform adapters.
//!
//! Every external processing capability is consumed through the uniform
//! [`Transform`](super::Transform) contract. Discovery is a static registry:
//! a capability name maps to an adapter chosen at build time, not to a
//! dynamically loaded plugin.

mod clean;
mod concat;
mod media;
mod minify;
mod write;

pub use clean::Clean;
pub use concat::Concat;
pub use media::MediaOpt;
pub use minify::{CssMinify, JsMinify};
pub use write::WriteDest;

use std::sync::Arc;

use super::Transform;

/// Static capability registry.
pub fn lookup(capability: &str) -> Option<Arc<dyn Transform>> {
    match capability {
        "concat" => Some(Arc::new(Concat)),
        "css-minify" => Some(Arc::new(CssMinify)),
        "js-minify" => Some(Arc::new(JsMinify)),
        "media-opt" => Some(Arc::new(MediaOpt)),
        "write" => Some(Arc::new(WriteDest)),
        "clean" => Some(Arc::new(Clean)),
        _ => None,
    }
}

/// Insert a suffix before the file extension: `style.css` -> `style.min.css`.
pub(super) fn with_suffix(path: &std::path::Path, suffix: &str) -> std::path::PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}{suffix}.{ext}"),
        None => format!("{stem}{suffix}"),
    };
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => name.into(),
        Some(parent) => parent.join(name),
        None => name.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_lookup_known_capabilities() {
        for name in ["concat", "css-minify", "js-minify", "media-opt", "write", "clean"] {
            let adapter = lookup(name).unwrap();
            assert_eq!(adapter.name(), name);
        }
        assert!(lookup("iconfont").is_none());
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(
            with_suffix(Path::new("style.css"), ".min"),
            Path::new("style.min.css")
        );
        assert_eq!(
            with_suffix(Path::new("js/main.js"), ".min"),
            Path::new("js/main.min.js")
        );
        assert_eq!(with_suffix(Path::new("LICENSE"), ".min"), Path::new("LICENSE.min"));
    }
}
