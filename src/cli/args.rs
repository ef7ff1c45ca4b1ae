//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Gantry asset pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: gantry.toml)
    #[arg(short = 'C', long, default_value = "gantry.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Worker threads for independent tasks (overrides [run].workers)
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Debounce window in milliseconds (overrides [serve].debounce_ms)
    #[arg(long, global = true)]
    pub debounce: Option<u64>,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run a task and its dependencies
    #[command(visible_alias = "r")]
    Run {
        /// Task name
        task: String,
    },

    /// Run the default task set, then enter watch mode
    #[command(visible_alias = "d")]
    Default,

    /// Watch sources, rebuild on change, live-reload browsers
    #[command(visible_alias = "w")]
    Watch {
        /// Run the default task set before watching
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        build: Option<bool>,
    },

    /// List registered tasks and their dependencies
    #[command(visible_alias = "l")]
    List,
}
