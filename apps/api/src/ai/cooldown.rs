//! Shared cooldown between outbound provider calls.
//!
//! One "next eligible instant" behind a lock. A caller reserves the next slot while holding the
//! lock and only then waits, so concurrent callers line up one interval apart and a dropped
//! waiter never corrupts the schedule.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(3);

#[derive(Debug)]
pub struct Cooldown {
    interval: Duration,
    next_eligible: Mutex<Option<Instant>>,
}

impl Cooldown {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_eligible: Mutex::new(None),
        }
    }

    /// Waits until this caller's slot comes up.
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_eligible.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(at) if at > now => at,
                _ => now,
            };
            *next = Some(slot + self.interval);
            slot
        };

        let now = Instant::now();
        if slot > now {
            debug!(wait_ms = (slot - now).as_millis() as u64, "Waiting for provider cooldown");
        }
        tokio::time::sleep_until(slot).await;
    }

    /// Takes the slot only if it is free now; otherwise reports how long until it is.
    pub async fn try_acquire(&self) -> Result<(), Duration> {
        let mut next = self.next_eligible.lock().await;
        let now = Instant::now();
        if let Some(at) = *next {
            if at > now {
                return Err(at - now);
            }
        }
        *next = Some(now + self.interval);
        Ok(())
    }
}

impl Default for Cooldown {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}
