//! Gantry - an asset pipeline orchestrator for front-end projects.

mod cli;
mod config;
mod core;
mod logger;
mod notifier;
mod pipeline;
mod reload;
mod task;
mod watch;

use std::sync::Arc;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::Config;
use task::{TaskRegistry, builtin};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = match Config::load(&cli) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            log!("error"; "{:#}", e);
            std::process::exit(1);
        }
    };

    let mut registry = TaskRegistry::new();
    if let Err(e) = builtin::register_all(&mut registry, &config) {
        // A broken task graph never reaches execution
        log!("error"; "{:#}", e);
        std::process::exit(1);
    }
    let registry = Arc::new(registry);

    match &cli.command {
        Commands::Run { task } => run_and_exit(&config, registry, task),
        // `default` builds everything, then stays resident watching
        Commands::Default => cli::watch_mode(config, registry, true),
        Commands::Watch { build } => {
            cli::watch_mode(config, registry, build.unwrap_or(false))
        }
        Commands::List => {
            cli::list_tasks(&registry);
            Ok(())
        }
    }
}

/// One-shot execution: non-zero exit if anything in the chain failed.
fn run_and_exit(config: &Config, registry: Arc<TaskRegistry>, task: &str) -> Result<()> {
    match cli::run_task(config, registry, task) {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            log!("error"; "{:#}", e);
            std::process::exit(1);
        }
    }
}
