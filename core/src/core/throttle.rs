/// Adaptive request pacing for rate-limited bounty platforms.
///
/// Watches HTTP status codes across all workers and backs off exponentially
/// once a platform starts answering 429 or 403 (throttling or bot
/// detection). Atomics only, so concurrent adapter calls never contend on a
/// lock in the hot path.
///
/// Escalation: 50 → 100 → 200 → ... ms, capped at 2000ms.
/// Recovery: -10ms per successful response, floors at 0.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering::Relaxed};
use tokio::time::{sleep, Duration};

const DELAY_CAP_MS: u64 = 2000;
const FIRST_BACKOFF_MS: u64 = 50;
const DECAY_STEP_MS: u64 = 10;

pub struct ThrottleController {
    current_delay_ms: AtomicU64,
    blocked_streak: AtomicU32,
    total_backoffs: AtomicU64,
}

impl ThrottleController {
    pub fn new() -> Self {
        Self {
            current_delay_ms: AtomicU64::new(0),
            blocked_streak: AtomicU32::new(0),
            total_backoffs: AtomicU64::new(0),
        }
    }

    /// Sleeps for the current backoff delay. No-op while the delay is 0.
    pub async fn pause(&self) {
        let ms = self.current_delay_ms.load(Relaxed);
        if ms > 0 {
            sleep(Duration::from_millis(ms)).await;
        }
    }

    /// Feeds one response status into the controller.
    /// Returns true when this status escalated the backoff.
    pub fn record_status(&self, status: u16) -> bool {
        if status == 429 || status == 403 {
            let streak = self.blocked_streak.fetch_add(1, Relaxed) + 1;
            self.total_backoffs.fetch_add(1, Relaxed);

            let delay = (FIRST_BACKOFF_MS * (1u64 << (streak - 1).min(6))).min(DELAY_CAP_MS);
            self.current_delay_ms.store(delay, Relaxed);
            true
        } else {
            self.blocked_streak.store(0, Relaxed);

            let current = self.current_delay_ms.load(Relaxed);
            if current > 0 {
                self.current_delay_ms.store(current.saturating_sub(DECAY_STEP_MS), Relaxed);
            }
            false
        }
    }

    pub fn current_delay_ms(&self) -> u64 {
        self.current_delay_ms.load(Relaxed)
    }

    pub fn total_backoffs(&self) -> u64 {
        self.total_backoffs.load(Relaxed)
    }
}

impl Default for ThrottleController {
    fn default() -> Self {
        Self::new()
    }
}
