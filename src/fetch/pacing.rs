use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::time::sleep;

/// Interval that keeps the batch under 5 requests/second.
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_millis(300);

/// Fixed delay applied after every request that reached the remote.
///
/// Clones share the pause counter, so a caller can keep a handle and observe
/// how many delays a batch applied.
#[derive(Debug, Clone)]
pub struct RequestPacer {
    interval: Duration,
    pauses: Arc<AtomicUsize>,
}

impl Default for RequestPacer {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_INTERVAL)
    }
}

impl RequestPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pauses: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Pauses applied so far, including zero-length ones.
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub async fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        if !self.interval.is_zero() {
            sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn pause_waits_for_interval() {
        let pacer = RequestPacer::new(Duration::from_millis(25));
        let started = Instant::now();

        pacer.pause().await;

        assert!(started.elapsed() >= Duration::from_millis(25));
        assert_eq!(pacer.pauses(), 1);
    }

    #[tokio::test]
    async fn clones_share_pause_count() {
        let pacer = RequestPacer::disabled();
        let handle = pacer.clone();

        pacer.pause().await;
        pacer.pause().await;

        assert_eq!(handle.pauses(), 2);
    }

    #[test]
    fn default_respects_rate_ceiling() {
        assert!(RequestPacer::default().interval() >= Duration::from_millis(200));
        assert!(RequestPacer::disabled().interval().is_zero());
    }
}
