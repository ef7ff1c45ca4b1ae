//! Process state for watch mode.
//!
//! A single global flag tracks shutdown requests (Ctrl+C). The watch loop
//! subscribes to a channel so a signal can interrupt its select loop;
//! one-shot commands without a subscriber exit directly from the handler.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Shutdown signal sender for the watch loop
static SHUTDOWN_TX: OnceLock<crossbeam::channel::Sender<()>> = OnceLock::new();

/// Setup the global Ctrl+C handler. Call once at program start.
///
/// The handler behavior depends on whether a watch loop has subscribed:
/// - Before `subscribe_shutdown()`: process exits immediately
/// - After: the flag is set and the subscriber is notified, letting the
///   watch loop cancel pending triggers and drain in-flight task runs
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);

        if let Some(tx) = SHUTDOWN_TX.get() {
            let _ = tx.try_send(());
        } else {
            // One-shot command, nothing to drain
            std::process::exit(130);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Subscribe to the shutdown signal. Called once when entering watch mode.
pub fn subscribe_shutdown() -> crossbeam::channel::Receiver<()> {
    let (tx, rx) = crossbeam::channel::bounded(1);
    let _ = SHUTDOWN_TX.set(tx);
    rx
}

/// Check if shutdown has been requested
///
/// Uses Relaxed ordering for performance - worst case is processing
/// a few more items before stopping, which is acceptable
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
