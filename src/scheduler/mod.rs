//! Bounded job scheduler.
//!
//! Fans one [`ScanJob`] per live host out over a worker pool that never
//! runs more than `limit` jobs at once, then drains completions in the
//! order they finish, folding each into the [`RunSummary`] and notifying
//! the observer exactly once per job.
//!
//! A failing job never cancels siblings and never wedges the pool: its
//! concurrency slot is released before its outcome is folded.

mod job;

pub use job::{HostScanner, JobFailure, JobOutcome, JobState, ScanJob, ScanTool};

use futures::stream::{self, StreamExt};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::report::ProgressObserver;
use crate::summary::RunSummary;

/// Tracks how many jobs are running and the high-water mark.
#[derive(Clone, Default)]
struct RunningGauge {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl RunningGauge {
    fn enter(&self) -> RunningSlot {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        RunningSlot {
            current: Arc::clone(&self.current),
        }
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct RunningSlot {
    current: Arc<AtomicUsize>,
}

impl Drop for RunningSlot {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Run one scan job per host with at most `limit` running concurrently.
///
/// Every host produces exactly one terminal outcome in `summary`, even
/// when the underlying task is observed through an error path: a panicked
/// task folds as `Failed(Unknown)`, a cancelled run folds the remaining
/// jobs as `Cancelled`. Submission is decoupled from completion; the
/// drain loop below is the only place counters and the observer are
/// touched, so both see one serialized mutation per completion.
pub async fn run_jobs(
    hosts: Vec<IpAddr>,
    limit: usize,
    scanner: Arc<dyn HostScanner>,
    observer: &dyn ProgressObserver,
    cancel: &CancelToken,
    summary: &mut RunSummary,
) {
    let total = hosts.len();
    summary.total = total;
    observer.run_started(total);

    let semaphore = Arc::new(Semaphore::new(limit));
    let gauge = RunningGauge::default();

    let tasks: Vec<_> = hosts
        .into_iter()
        .map(|host| {
            let semaphore = Arc::clone(&semaphore);
            let scanner = Arc::clone(&scanner);
            let cancel = cancel.clone();
            let gauge = gauge.clone();

            let handle = tokio::spawn(async move {
                let mut job = ScanJob::new(host);

                // Wait for a slot, unless the run is cancelled first;
                // pending jobs are never submitted after the signal.
                let permit = tokio::select! {
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => {
                            job.finish(JobOutcome::Cancelled);
                            return job;
                        }
                    },
                    _ = cancel.cancelled() => {
                        job.finish(JobOutcome::Cancelled);
                        return job;
                    }
                };

                if cancel.is_cancelled() {
                    job.finish(JobOutcome::Cancelled);
                    return job;
                }

                job.start();
                let slot = gauge.enter();
                let outcome = scanner.scan(host, &cancel).await;
                // Free the slot before the outcome is folded.
                drop(slot);
                drop(permit);

                job.finish(outcome);
                job
            });

            async move { (host, handle.await) }
        })
        .collect();

    // Drain in completion order; every task yields exactly one job.
    let mut completions = stream::iter(tasks).buffer_unordered(total.max(1));
    while let Some((host, joined)) = completions.next().await {
        let job = match joined {
            Ok(job) => job,
            Err(e) => {
                let mut job = ScanJob::new(host);
                job.finish(JobOutcome::Failed(JobFailure::Unknown(e.to_string())));
                job
            }
        };

        let outcome = job.into_outcome();
        debug!(%host, %outcome, "job finished");
        summary.record(&outcome);
        observer.job_completed(host, &outcome, summary.completed(), total);
    }

    summary.peak_running = gauge.peak();
}
