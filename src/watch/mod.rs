//! File watcher: glob rules to task triggers.
//!
//! Implements the "Watcher-First" pattern: the notify watcher starts
//! buffering events immediately, a bridge thread feeds them into the async
//! loop, and a pure debouncer collapses bursts before any task runs.
//!
//! Architecture:
//! ```text
//! notify → bridge thread → Debouncer (pure timing) → Scheduler.run(task)
//!                                                  → reload broadcast
//! ```
//!
//! The loop never blocks its caller beyond the await; it runs until the
//! shutdown signal, then cancels pending debounced triggers and drains
//! in-flight task executions.

mod debouncer;
mod rules;


pub use rules::WatchRule;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{RecursiveMode, Watcher as _};
use tokio::sync::mpsc;

use debouncer::{Debouncer, Trigger, is_temp_file};

use crate::config::Config;
use crate::notifier::Notifier;
use crate::reload::{Hub, ReloadMessage};
use crate::task::{Scheduler, TaskRegistry};
use crate::{debug, log};

/// Run the watch loop until shutdown.
pub async fn run(
    config: Arc<Config>,
    registry: Arc<TaskRegistry>,
    rules: Vec<WatchRule>,
    hub: Arc<Hub>,
) -> Result<()> {
    let scheduler = Arc::new(Scheduler::new(registry, config.run.workers)?);

    // Create sync channel for notify (it doesn't support async)
    let (notify_tx, notify_rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = notify_tx.send(res);
    })?;

    // Watch every distinct rule base; dist may not exist yet
    let mut watched: Vec<&std::path::Path> = Vec::new();
    for rule in &rules {
        if watched.contains(&rule.base()) {
            continue;
        }
        std::fs::create_dir_all(rule.base())
            .with_context(|| format!("creating watch root `{}`", rule.base().display()))?;
        watcher
            .watch(rule.base(), RecursiveMode::Recursive)
            .with_context(|| format!("watching `{}`", rule.base().display()))?;
        watched.push(rule.base());
        debug!("watch"; "watching {}", rule.base().display());
    }

    // Bridge notify's sync channel into the async loop
    let (event_tx, mut event_rx) = mpsc::channel::<notify::Event>(64);
    std::thread::spawn(move || {
        while let Ok(result) = notify_rx.recv() {
            match result {
                Ok(event) => {
                    if event_tx.blocking_send(event).is_err() {
                        break; // Receiver dropped
                    }
                }
                Err(e) => log!("watch"; "notify error: {}", e),
            }
        }
    });

    // Bridge the Ctrl+C signal the same way
    let shutdown = crate::core::subscribe_shutdown();
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    std::thread::spawn(move || {
        if shutdown.recv().is_ok() {
            let _ = shutdown_tx.blocking_send(());
        }
    });

    if let Some(host) = &config.serve.proxy_host {
        log!("watch"; "proxying {}", host);
    }
    log!("watch"; "{} rules, debounce {}ms", rules.len(), config.serve.debounce_ms);

    let mut debouncer = Debouncer::new(Duration::from_millis(config.serve.debounce_ms));
    let mut in_flight: Vec<tokio::task::JoinHandle<()>> = Vec::new();

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            Some(event) = event_rx.recv() => collect_triggers(&event, &rules, &mut debouncer),
            _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                in_flight.retain(|handle| !handle.is_finished());
                for trigger in debouncer.take_ready() {
                    dispatch(trigger, &scheduler, &hub, &mut in_flight);
                }
            }
        }
    }

    // Shutdown: cancel debounced triggers, wait for in-flight runs
    let cancelled = debouncer.cancel_pending();
    if cancelled > 0 {
        debug!("watch"; "cancelled {} pending trigger(s)", cancelled);
    }
    for handle in in_flight {
        let _ = handle.await;
    }
    drop(watcher);
    log!("watch"; "stopped");
    Ok(())
}

/// Match one notify event against the rules and record triggers.
fn collect_triggers(event: &notify::Event, rules: &[WatchRule], debouncer: &mut Debouncer) {
    if !is_relevant(event) {
        return;
    }

    for path in &event.paths {
        if is_temp_file(path) {
            continue;
        }
        for rule in rules {
            if !rule.matches(path) {
                continue;
            }
            debug!("watch"; "{} matched `{}`", path.display(), rule.pattern());
            if rule.is_reload_only() {
                debouncer.add(Trigger::Reload);
            } else {
                for task in rule.tasks() {
                    debouncer.add(Trigger::Task(task.clone()));
                }
            }
        }
    }
}

/// Content-bearing events only; metadata churn (mtime/chmod) would cause
/// endless rebuild loops.
fn is_relevant(event: &notify::Event) -> bool {
    use notify::EventKind;
    match event.kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(modify) => !matches!(modify, notify::event::ModifyKind::Metadata(_)),
        _ => false,
    }
}

/// Launch one ready trigger without blocking the event loop.
fn dispatch(
    trigger: Trigger,
    scheduler: &Arc<Scheduler>,
    hub: &Arc<Hub>,
    in_flight: &mut Vec<tokio::task::JoinHandle<()>>,
) {
    match trigger {
        Trigger::Reload => {
            debug!("reload"; "static content changed");
            hub.broadcast(&ReloadMessage::reload_with_reason("static content changed"));
        }
        Trigger::Task(name) => {
            let scheduler = Arc::clone(scheduler);
            let hub = Arc::clone(hub);
            let handle = tokio::task::spawn_blocking(move || {
                let notifier = Notifier::new().with_on_last(true);
                match scheduler.run(&name) {
                    Ok(results) => {
                        notifier.report_all(&results);
                        if results.iter().all(crate::task::RunResult::is_success) {
                            hub.broadcast(&ReloadMessage::reload_with_reason(format!(
                                "task `{name}` rebuilt"
                            )));
                        }
                        // A failure leaves the watch loop running; the next
                        // file change retries
                    }
                    Err(e) => log!("error"; "cannot run `{}`: {}", name, e),
                }
            });
            in_flight.push(handle);
        }
    }
}
