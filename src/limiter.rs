use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces out navigation starts by at least `interval`.
///
/// Each caller reserves the next free start slot and sleeps until it. The
/// first reservation is immediate. Shared between workers, this bounds the
/// aggregate request rate no matter how many sessions are open.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the caller may start a navigation
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next = Some(slot + self.interval);
            slot
        };

        if slot > Instant::now() {
            ::log::trace!("Rate limiter waiting {:?}", slot - Instant::now());
            tokio::time::sleep_until(slot).await;
        }
    }
}
