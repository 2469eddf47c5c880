//! Backoff schedule for blocking status polling.
//!
//! The delay grows in steps rather than geometrically: providers usually
//! finish within the first minute, so early attempts are frequent and the
//! tail settles at a fixed cap.

use std::time::Duration;

/// Attempt budget before the poller gives up with a timeout.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

/// Longest wait between two attempts.
pub const MAX_POLL_DELAY: Duration = Duration::from_secs(10);

/// Wait after `attempt` (1-based) before the next attempt.
///
/// | Attempts | Wait |
/// |----------|------|
/// | 1–2      | 2s   |
/// | 3–5      | 3s   |
/// | 6–10     | 5s   |
/// | 11–15    | 8s   |
/// | 16+      | 10s  |
pub fn poll_delay(attempt: u32) -> Duration {
    match attempt {
        0..=2 => Duration::from_secs(2),
        3..=5 => Duration::from_secs(3),
        6..=10 => Duration::from_secs(5),
        11..=15 => Duration::from_secs(8),
        _ => MAX_POLL_DELAY,
    }
}

/// Total time spent waiting when every one of `max_attempts` attempts is
/// non-terminal. There is no wait after the final attempt.
pub fn total_wait(max_attempts: u32) -> Duration {
    (1..max_attempts).map(poll_delay).sum()
}
