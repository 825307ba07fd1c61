//!
//! src/rate.rs  Oct 16th, 2026
//!
//! Process wide gate spacing outbound musicbrainz requests.
//! One instance is built in main and shared by every lookup.
//!

use std::time::Duration;

use tokio::{sync::Mutex, time::{Instant, sleep}};
use tracing::trace;

#[derive(Debug)]
pub struct RateGate {
    min_interval: Duration,
    last: Mutex<Option<Instant>>
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval, last: Mutex::new(None) }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits out whatever remains of the interval since the last grant.
    /// The lock is held across the sleep so concurrent callers queue up
    /// behind it instead of all reading the same timestamp.
    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                trace!(wait_ms = wait.as_millis() as u64, "rate.wait");
                sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}
