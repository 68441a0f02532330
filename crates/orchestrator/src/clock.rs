#![forbid(unsafe_code)]

use async_trait::async_trait;
use std::time::{Duration, Instant, SystemTime};

#[async_trait]
pub trait Clock: Send + Sync {
    /// Monotonic time, used to pace cycles.
    fn now(&self) -> Instant;
    /// Wall-clock time, stamped onto emitted events.
    fn wall(&self) -> SystemTime;
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn wall(&self) -> SystemTime {
        SystemTime::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
