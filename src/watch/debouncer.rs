//! Pure debouncer: timing and trigger deduplication only.
//!
//! Burst file events (editor atomic saves produce several) collapse into a
//! single trigger per target: a trigger becomes ready once its rule has been
//! quiet for the debounce window. No business logic, no global state.

use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::task::TaskId;

/// What a matched rule asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) enum Trigger {
    /// Run a task (and its dependencies)
    Task(TaskId),
    /// Broadcast a live-reload signal only
    Reload,
}

struct Pending {
    last_event: Instant,
    /// Changed paths observed for this trigger in the current window
    events: usize,
}

pub(super) struct Debouncer {
    window: Duration,
    pending: FxHashMap<Trigger, Pending>,
}

impl Debouncer {
    pub(super) fn new(window: Duration) -> Self {
        Self {
            window,
            pending: FxHashMap::default(),
        }
    }

    /// Record a trigger. Repeated triggers within the window merge into one
    /// and push the ready time back (trailing-edge debounce).
    pub(super) fn add(&mut self, trigger: Trigger) {
        let entry = self.pending.entry(trigger).or_insert(Pending {
            last_event: Instant::now(),
            events: 0,
        });
        entry.last_event = Instant::now();
        entry.events += 1;
    }

    /// Take every trigger whose window has elapsed.
    pub(super) fn take_ready(&mut self) -> Vec<Trigger> {
        let window = self.window;
        let mut ready = Vec::new();
        self.pending.retain(|trigger, pending| {
            if pending.last_event.elapsed() >= window {
                ready.push(trigger.clone());
                false
            } else {
                true
            }
        });
        ready
    }

    /// Drop all pending triggers (shutdown cancels debounced work).
    pub(super) fn cancel_pending(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub(super) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Precise sleep duration until the next trigger can become ready.
    pub(super) fn sleep_duration(&self) -> Duration {
        let Some(earliest) = self.pending.values().map(|p| p.last_event).min() else {
            return Duration::from_secs(86400);
        };

        self.window
            .saturating_sub(earliest.elapsed())
            .max(Duration::from_millis(1))
    }
}

/// Check if path is a temp/backup file (editor artifacts).
pub(super) fn is_temp_file(path: &std::path::Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
