// ── Background refresh scheduling ──
//
// Submit-and-forget execution of refresh jobs on the tokio runtime.
// Failures and panics stay inside the job; the scheduler keeps accepting
// work. At most one job runs at a time: triggers arriving while one is
// outstanding are coalesced, since every refresh is an idempotent
// read-then-write of the same cache.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::task::TaskTracker;
use tracing::{debug, error, trace, warn};

use crate::error::CoreError;

/// Fire-and-forget scheduler with single-flight coalescing.
///
/// Cheap to clone; clones share the same tracker and in-flight flag.
#[derive(Debug, Clone, Default)]
pub struct BackgroundRefresher {
    tracker: TaskTracker,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the job finishes, however it finishes.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl BackgroundRefresher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `job` and return immediately.
    ///
    /// Returns `false` without running `job` when another job is still
    /// outstanding or the refresher has been shut down. Must be called
    /// from within a tokio runtime.
    pub fn fire<F>(&self, label: &'static str, job: F) -> bool
    where
        F: Future<Output = Result<(), CoreError>> + Send + 'static,
    {
        if self.tracker.is_closed() {
            debug!(label, "refresher closed, dropping job");
            return false;
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            trace!(label, "job already in flight, coalescing");
            return false;
        }

        let flight = InFlight(Arc::clone(&self.in_flight));
        self.tracker.spawn(async move {
            let _flight = flight;
            // The job runs in its own task so a panic surfaces here as a
            // JoinError instead of unwinding through the tracker.
            match tokio::spawn(job).await {
                Ok(Ok(())) => trace!(label, "background job finished"),
                Ok(Err(e)) => warn!(label, kind = %e.kind(), error = %e, "background job failed"),
                Err(e) if e.is_panic() => error!(label, "background job panicked"),
                Err(e) => debug!(label, error = %e, "background job cancelled"),
            }
        });
        true
    }

    /// Whether a job is currently outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Wait for every outstanding job, then accept new ones again.
    ///
    /// Jobs fired while draining are dropped.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Stop accepting jobs and wait for the outstanding ones.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        debug!("background refresher shut down");
    }
}
