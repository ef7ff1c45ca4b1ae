//! Watch mode: rebuild on change, live-reload browsers.

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::log;
use crate::reload;
use crate::task::{TaskRegistry, builtin};

/// Run watch mode until interrupted.
pub fn watch_mode(
    config: Arc<Config>,
    registry: Arc<TaskRegistry>,
    build_first: bool,
) -> Result<()> {
    let (hub, port) = reload::start_server(config.serve.port)?;
    log!("reload"; "live reload on ws://127.0.0.1:{}", port);

    if build_first && !super::run_task(&config, Arc::clone(&registry), "default")? {
        // Initial build failures are reported above; watching continues so
        // the next save can fix them
        log!("watch"; "initial build failed, watching for changes");
    }

    let rules = builtin::watch_rules(&config)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(crate::watch::run(config, registry, rules, hub))
}
