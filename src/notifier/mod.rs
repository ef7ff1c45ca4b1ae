//! Run-result reporting.
//!
//! Prints one status line per task result: produced artifacts and byte
//! totals on success, the failing step and cause on failure. In watch mode
//! `on_last` collapses a dependency chain's successes into a single line for
//! the requested task, while failures always print.

use crate::logger;
use crate::task::{RunOutcome, RunResult};

pub struct Notifier {
    /// Only report the last (requested) task's success, not its dependencies'
    on_last: bool,
}

impl Notifier {
    pub fn new() -> Self {
        Self { on_last: false }
    }

    pub fn with_on_last(mut self, on_last: bool) -> Self {
        self.on_last = on_last;
        self
    }

    /// Report one result.
    pub fn report(&self, result: &RunResult) {
        match &result.outcome {
            RunOutcome::Success {
                artifacts,
                total_bytes,
                elapsed,
            } => {
                logger::status_success(&format!(
                    "{}: {} artifact(s), {} in {}ms",
                    result.task,
                    artifacts.len(),
                    format_bytes(*total_bytes),
                    elapsed.as_millis()
                ));
            }
            RunOutcome::Failed(err) => {
                logger::status_error(&format!("{} failed", result.task), &err.to_string());
            }
            RunOutcome::Skipped { failed_dep } => {
                logger::status_unchanged(&format!(
                    "{}: skipped (dependency `{}` failed)",
                    result.task, failed_dep
                ));
            }
        }
    }

    /// Report a full run. With `on_last`, intermediate successes stay quiet;
    /// failures and skips are always shown.
    pub fn report_all(&self, results: &[RunResult]) {
        let last_success = results.iter().rposition(RunResult::is_success);

        for (i, result) in results.iter().enumerate() {
            if self.on_last && result.is_success() && Some(i) != last_success {
                continue;
            }
            self.report(result);
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Decimal units, matching how asset sizes are usually quoted.
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_000_000 {
        format!("{:.2} MB", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.2} kB", bytes as f64 / 1_000.0)
    } else {
        format!("{bytes} B")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(999), "999 B");
        assert_eq!(format_bytes(1_000), "1.00 kB");
        assert_eq!(format_bytes(153_600), "153.60 kB");
        assert_eq!(format_bytes(2_500_000), "2.50 MB");
    }
}
