//! Store connectivity tracking.
//!
//! Work that depends on the stores (token refresh, the expiry sweep) does
//! not retry on its own. It reports the outage here and waits; a single
//! probe task polls the stores at a fixed interval and flips the state back
//! once they answer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::watch;

/// Default interval between connectivity probes while unavailable.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(2500);

/// Connectivity check. Resolves to `true` when the stores answer.
pub type ProbeFn = Arc<dyn Fn() -> BoxFuture<'static, bool> + Send + Sync>;

/// Wraps an async closure as a [`ProbeFn`].
pub fn probe_fn<F, Fut>(f: F) -> ProbeFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    Arc::new(move || -> BoxFuture<'static, bool> { Box::pin(f()) })
}

/// Shared store connectivity state.
pub struct StoreHealth {
    state: watch::Sender<bool>,
    probe: ProbeFn,
    probing: AtomicBool,
    interval: Duration,
}

impl std::fmt::Debug for StoreHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHealth")
            .field("available", &self.is_available())
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl StoreHealth {
    /// Creates a monitor, initially available, probing with `probe`.
    #[must_use]
    pub fn new(probe: ProbeFn) -> Arc<Self> {
        Self::with_interval(probe, DEFAULT_PROBE_INTERVAL)
    }

    /// Creates a monitor with a custom probe interval.
    #[must_use]
    pub fn with_interval(probe: ProbeFn, interval: Duration) -> Arc<Self> {
        let (state, _) = watch::channel(true);
        Arc::new(Self {
            state,
            probe,
            probing: AtomicBool::new(false),
            interval,
        })
    }

    /// Monitor whose probe always succeeds.
    #[must_use]
    pub fn always_available() -> Arc<Self> {
        Self::new(probe_fn(|| async { true }))
    }

    /// Returns the current state.
    #[must_use]
    pub fn is_available(&self) -> bool {
        *self.state.borrow()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    /// Waits until the stores are reachable. Returns immediately if they
    /// already are.
    pub async fn wait_available(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this only ends on a change.
        let _ = rx.wait_for(|available| *available).await;
    }

    /// Records that a store call succeeded.
    pub fn mark_available(&self) {
        let changed = self.state.send_if_modified(|available| {
            let was = *available;
            *available = true;
            !was
        });
        if changed {
            tracing::info!("stores reachable again");
        }
    }

    /// Records an outage and starts the probe unless one is running.
    pub fn mark_unavailable(self: &Arc<Self>) {
        let changed = self.state.send_if_modified(|available| {
            let was = *available;
            *available = false;
            was
        });
        if changed {
            tracing::warn!("stores unreachable, pausing dependent work");
        }
        if self
            .probing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let this = Arc::clone(self);
            tokio::spawn(async move { this.probe_until_available().await });
        }
    }

    async fn probe_until_available(self: Arc<Self>) {
        loop {
            tokio::time::sleep(self.interval).await;
            if (self.probe)().await {
                break;
            }
            tracing::debug!(retry_in = ?self.interval, "store probe failed");
        }
        self.probing.store(false, Ordering::SeqCst);
        self.mark_available();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn flaky_probe(fail_times: usize) -> (ProbeFn, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let probe = probe_fn(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { n >= fail_times }
        });
        (probe, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_probe_succeeds() {
        let (probe, calls) = flaky_probe(2);
        let health = StoreHealth::new(probe);

        health.mark_unavailable();
        assert!(!health.is_available());

        health.wait_available().await;
        assert!(health.is_available());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_failures_share_one_probe() {
        let (probe, calls) = flaky_probe(0);
        let health = StoreHealth::new(probe);

        health.mark_unavailable();
        health.mark_unavailable();
        health.mark_unavailable();
        health.wait_available().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_available() {
        let health = StoreHealth::always_available();
        health.wait_available().await;
        assert!(health.is_available());
    }
}
