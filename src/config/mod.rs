//! Static configuration for `gantry.toml`.
//!
//! Loaded once at startup, validated, then passed by reference to every
//! component. There is no global handle and no reload: the configuration is
//! immutable for the lifetime of the process.
//!
//! # Sections
//!
//! | Section         | Purpose                                          |
//! |-----------------|--------------------------------------------------|
//! | `[paths]`       | Source and dist roots (relative to project root) |
//! | `[serve]`       | Live-reload port, proxy host, debounce window    |
//! | `[run]`         | Worker count for parallel task execution         |
//! | `[tasks.<name>]`| Free-form option map merged into the task's steps|

mod error;

pub use error::ConfigError;

use crate::cli::Cli;
use crate::log;
use anyhow::Result;
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

/// Default debounce window for watch-mode triggers (ms).
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Default live-reload WebSocket port.
pub const DEFAULT_RELOAD_PORT: u16 = 35729;

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing gantry.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Source and dist roots
    #[serde(default)]
    pub paths: PathsConfig,

    /// Live-reload and watch settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Task execution settings
    #[serde(default)]
    pub run: RunConfig,

    /// Per-task option maps, merged into every step of the named task
    #[serde(default)]
    pub tasks: BTreeMap<String, BTreeMap<String, String>>,
}

/// `[paths]` section: project layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Source root (asset inputs)
    pub source: PathBuf,
    /// Dist root (produced artifacts)
    pub dist: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("source"),
            dist: PathBuf::from("dist"),
        }
    }
}

/// `[serve]` section: watch mode and live reload.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Backend host the live-reload clients proxy to (informational)
    pub proxy_host: Option<String>,
    /// Base port for the live-reload WebSocket server
    pub port: u16,
    /// Debounce window for collapsing burst file events (ms)
    pub debounce_ms: u64,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            proxy_host: None,
            port: DEFAULT_RELOAD_PORT,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// `[run]` section: scheduler settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RunConfig {
    /// Worker threads for independent tasks (0 = available parallelism)
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            root: PathBuf::new(),
            paths: PathsConfig::default(),
            serve: ServeConfig::default(),
            run: RunConfig::default(),
            tasks: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd to find the config file. The project root is
    /// determined by the config file's parent directory.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = match find_config_file(&cli.config) {
            Some(path) => path,
            None => return Err(ConfigError::NotFound(cli.config.clone()).into()),
        };

        let mut config = Self::from_path(&config_path)?;

        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.config_path = config_path;
        config.root = root.clone();
        config.normalize_paths(&root);
        config.apply_cli_overrides(cli);
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {field}");
        }
    }

    /// Anchor relative source/dist roots to the project root.
    fn normalize_paths(&mut self, root: &Path) {
        if self.paths.source.is_relative() {
            self.paths.source = root.join(&self.paths.source);
        }
        if self.paths.dist.is_relative() {
            self.paths.dist = root.join(&self.paths.dist);
        }
    }

    /// Apply global CLI overrides (flags win over file values).
    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(workers) = cli.workers {
            self.run.workers = workers;
        }
        if let Some(debounce) = cli.debounce {
            self.serve.debounce_ms = debounce;
        }
    }

    /// Validate the finalized configuration.
    fn validate(&self) -> Result<()> {
        if !self.paths.source.is_dir() {
            return Err(ConfigError::Validation(format!(
                "source root `{}` does not exist",
                self.paths.source.display()
            ))
            .into());
        }
        if self.serve.debounce_ms == 0 {
            return Err(
                ConfigError::Validation("serve.debounce_ms must be greater than 0".into()).into(),
            );
        }
        Ok(())
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Source root (absolute after load).
    pub fn source_root(&self) -> &Path {
        &self.paths.source
    }

    /// Dist root (absolute after load).
    pub fn dist_root(&self) -> &Path {
        &self.paths.dist
    }

    /// Option map for a task, if configured.
    pub fn task_options(&self, task: &str) -> Option<&BTreeMap<String, String>> {
        self.tasks.get(task)
    }
}

/// Search upward from cwd for the config file.
fn find_config_file(name: &Path) -> Option<PathBuf> {
    // An explicit path (absolute or with directories) is used as-is
    if name.components().count() > 1 || name.is_absolute() {
        return name.exists().then(|| name.to_path_buf());
    }

    let mut dir = std::env::current_dir().ok()?;
    loop {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.paths.source, PathBuf::from("source"));
        assert_eq!(config.paths.dist, PathBuf::from("dist"));
        assert_eq!(config.serve.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert_eq!(config.serve.port, DEFAULT_RELOAD_PORT);
        assert_eq!(config.run.workers, 0);
        assert!(config.tasks.is_empty());
    }

    #[test]
    fn test_parse_sections() {
        let config = Config::from_str(
            r#"
            [paths]
            source = "web/src"
            dist = "web/out"

            [serve]
            proxy_host = "dev.example.test"
            debounce_ms = 250

            [run]
            workers = 2

            [tasks.js]
            map_source_prefix = "./../../../source/js/"
            "#,
        )
        .unwrap();

        assert_eq!(config.paths.source, PathBuf::from("web/src"));
        assert_eq!(config.serve.proxy_host.as_deref(), Some("dev.example.test"));
        assert_eq!(config.serve.debounce_ms, 250);
        assert_eq!(config.run.workers, 2);
        assert_eq!(
            config.task_options("js").and_then(|o| o
                .get("map_source_prefix")
                .map(String::as_str)),
            Some("./../../../source/js/")
        );
    }

    #[test]
    fn test_unknown_fields_collected() {
        let (_, ignored) = Config::parse_with_ignored(
            r#"
            [paths]
            source = "src"
            typo_field = true
            "#,
        )
        .unwrap();
        assert_eq!(ignored, vec!["paths.typo_field".to_string()]);
    }

    #[test]
    fn test_normalize_paths() {
        let mut config = Config::from_str("").unwrap();
        config.normalize_paths(Path::new("/project"));
        assert_eq!(config.paths.source, PathBuf::from("/project/source"));
        assert_eq!(config.paths.dist, PathBuf::from("/project/dist"));
    }
}
