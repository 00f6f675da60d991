//! Minimum spacing between request starts, shared by all workers.

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use crate::session::CancelToken;

const SLEEP_SLICE: Duration = Duration::from_millis(20);

#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Reserve the next start slot and wait for it.
    ///
    /// Returns `false` if `cancel` fires while waiting; the slot is still
    /// consumed.
    pub fn acquire(&self, cancel: &CancelToken) -> bool {
        let slot = {
            let mut next = self
                .next_slot
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let now = Instant::now();
            let slot = next.map_or(now, |n| n.max(now));
            *next = Some(slot + self.min_interval);
            slot
        };

        loop {
            if cancel.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= slot {
                return true;
            }
            thread::sleep((slot - now).min(SLEEP_SLICE));
        }
    }
}
