//! # Call Spacing
//!
//! Keeps outgoing requests under a `calls per period` budget by enforcing a
//! minimum interval between consecutive calls. Concurrent callers queue on the
//! internal lock, so the spacing holds across tasks sharing one limiter.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Allows at most `calls` per `period`. Zero calls disables the limit.
    pub fn new(calls: u32, period: Duration) -> Self {
        let interval = if calls == 0 { Duration::ZERO } else { period / calls };
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until the next call is allowed and records it.
    pub async fn acquire(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(previous) = *last {
            let next = previous + self.interval;
            if next > Instant::now() {
                sleep_until(next).await;
            }
        }
        *last = Some(Instant::now());
    }
}
