//! Cancellable periodic ticker
//!
//! A `Ticker` owns a spawned interval task. Dropping or cancelling the
//! ticker aborts the task, so whoever owns the ticker owns the timer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;

#[derive(Debug)]
pub struct Ticker {
    abort: Option<AbortHandle>,
    cancelled: Arc<AtomicBool>,
}

impl Ticker {
    /// Call `on_tick` every `period` (first call one period from now) until
    /// it returns `false` or the ticker is cancelled.
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                if flag.load(Ordering::Acquire) || !on_tick() {
                    break;
                }
            }
        });
        Self {
            abort: Some(task.abort_handle()),
            cancelled,
        }
    }

    /// A ticker with no task behind it; ticks are driven by hand.
    pub fn manual() -> Self {
        Self {
            abort: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(abort) = self.abort.take() {
            abort.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Observer for the cancellation state that outlives the ticker.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn test_ticker_fires_periodically() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let _ticker = Ticker::spawn(Duration::from_millis(50), move || {
            seen.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_millis(175)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let ticker = Ticker::spawn(Duration::from_millis(50), move || {
            seen.fetch_add(1, Ordering::SeqCst);
            true
        });
        let flag = ticker.cancel_flag();

        tokio::time::sleep(Duration::from_millis(60)).await;
        drop(ticker);
        assert!(flag.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_can_stop_itself() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let _ticker = Ticker::spawn(Duration::from_millis(10), move || {
            seen.fetch_add(1, Ordering::SeqCst) < 1
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_manual_ticker_cancel() {
        let mut ticker = Ticker::manual();
        assert!(!ticker.is_cancelled());
        ticker.cancel();
        assert!(ticker.is_cancelled());
    }
}
