/// Fixed post-request delay for the detail endpoint.
///
/// The platform gets one pause after every detail call, successful or not.
/// There is no backoff: the delay never grows or decays.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use tokio::time::{sleep, Duration};

pub struct RequestThrottle {
    delay: Duration,
    total_waits: AtomicU64,
}

impl RequestThrottle {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            total_waits: AtomicU64::new(0),
        }
    }

    /// Sleeps for the configured delay. No-op when the delay is 0.
    pub async fn wait(&self) {
        self.total_waits.fetch_add(1, Relaxed);
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn total_waits(&self) -> u64 {
        self.total_waits.load(Relaxed)
    }
}
