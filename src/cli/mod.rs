//! Command-line interface: argument definitions and command entry points.

mod args;
mod run;
mod watch;

pub use args::{Cli, Commands};
pub use run::{list_tasks, run_task};
pub use watch::watch_mode;
