//! Cancellable delayed task with reset-on-reschedule semantics.
//!
//! Each `schedule` aborts the pending task and starts the delay over, so a
//! burst of calls collapses into one run `delay` after the last call. The
//! task body runs at fire time, so it sees whatever state exists then rather
//! than a snapshot from when it was scheduled.

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `task` once `delay` has passed without another `schedule` call.
    ///
    /// Outside a tokio runtime there is no timer to wait on, and the task
    /// runs immediately.
    pub fn schedule<F>(&mut self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            trace!("no runtime, running debounced task inline");
            task();
            return;
        };
        let delay = self.delay;
        self.pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        }));
    }

    /// Drop the pending task without running it. Returns whether one was
    /// still waiting.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                let waiting = !handle.is_finished();
                handle.abort();
                waiting
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{Instant, sleep};

    #[tokio::test(start_paused = true)]
    async fn test_burst_fires_once_after_last_call() {
        let start = Instant::now();
        let fired = Arc::new(Mutex::new(Vec::new()));
        let mut debouncer = Debouncer::new(Duration::from_millis(500));

        for (i, gap) in [(0u32, 0u64), (1, 100), (2, 100)] {
            sleep(Duration::from_millis(gap)).await;
            let fired = fired.clone();
            debouncer.schedule(move || fired.lock().push((i, Instant::now())));
        }

        sleep(Duration::from_millis(499)).await;
        assert!(fired.lock().is_empty());
        assert!(debouncer.is_pending());

        sleep(Duration::from_millis(2)).await;
        let fired = fired.lock();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0, 2);
        assert!(fired[0].1 - start >= Duration::from_millis(700));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_run() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        let c = count.clone();
        debouncer.schedule(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(debouncer.cancel());
        sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!debouncer.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_calls_each_fire() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        for _ in 0..3 {
            let c = count.clone();
            debouncer.schedule(move || {
                c.fetch_add(1, Ordering::SeqCst);
            });
            sleep(Duration::from_millis(600)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_inline_without_runtime() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        let c = count.clone();
        debouncer.schedule(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
