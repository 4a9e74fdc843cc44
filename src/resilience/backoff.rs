//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// A doubling delay schedule, capped at a ceiling, with up to 10% jitter.
#[derive(Debug, Clone)]
pub struct Backoff {
    next_ms: u64,
    max_ms: u64,
}

impl Backoff {
    /// Start a schedule at `base_ms`, never exceeding `max_ms` (plus jitter).
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            next_ms: base_ms.max(1),
            max_ms: max_ms.max(1),
        }
    }

    /// Delay to wait before the next attempt. Advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay_ms = self.next_ms.min(self.max_ms);
        self.next_ms = delay_ms.saturating_mul(2);

        let jitter_ms = match delay_ms / 10 {
            0 => 0,
            range => rand::thread_rng().gen_range(0..range),
        };
        Duration::from_millis(delay_ms + jitter_ms)
    }
}
