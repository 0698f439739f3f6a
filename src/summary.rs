//! Aggregate outcome of one orchestrated run.
//!
//! All run-scoped counters live in a single [`RunSummary`] value owned by
//! the engine and mutated only through [`RunSummary::record`], one fold
//! per terminal job, so sequential runs cannot leak state into one
//! another.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::scheduler::{JobFailure, JobOutcome};
use crate::types::RunId;

/// Worst-case classification of a finished run, best to worst:
/// `Success < NothingToDo < HostFailures < Cancelled`.
///
/// Fatal validation errors outrank them all, but those surface as
/// [`RunError`](crate::error::RunError) before a summary exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every submitted job succeeded.
    Success,
    /// Probing found no live hosts; nothing was scheduled.
    NothingToDo,
    /// At least one probe or job failed; siblings were unaffected.
    HostFailures,
    /// The run was cancelled before every job could finish.
    Cancelled,
}

impl RunStatus {
    /// Process exit code for this status.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::HostFailures | Self::Cancelled => 2,
            Self::NothingToDo => 3,
        }
    }
}

/// Counts of jobs by terminal state, timing, and the worst failure seen.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    /// Jobs submitted (== live hosts discovered).
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub cancelled: usize,
    /// Probe invocations that degraded to an empty set.
    pub probe_failures: usize,
    /// Most jobs observed running simultaneously.
    pub peak_running: usize,
    /// First job failure encountered, kept for the final report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_failure: Option<JobFailure>,
}

impl RunSummary {
    /// Start a fresh summary, stamped now.
    pub fn new() -> Self {
        Self {
            run_id: RunId::new(),
            started_at: Utc::now(),
            finished_at: None,
            duration_ms: 0,
            total: 0,
            succeeded: 0,
            failed: 0,
            timed_out: 0,
            cancelled: 0,
            probe_failures: 0,
            peak_running: 0,
            worst_failure: None,
        }
    }

    /// Fold one terminal outcome into the counters.
    pub fn record(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Succeeded => self.succeeded += 1,
            JobOutcome::Failed(failure) => {
                self.failed += 1;
                if self.worst_failure.is_none() {
                    self.worst_failure = Some(failure.clone());
                }
            }
            JobOutcome::TimedOut => self.timed_out += 1,
            JobOutcome::Cancelled => self.cancelled += 1,
        }
    }

    /// Jobs that have reached a terminal state.
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed + self.timed_out + self.cancelled
    }

    /// Stamp completion time and elapsed duration.
    pub fn finish(&mut self, elapsed: std::time::Duration) {
        self.finished_at = Some(Utc::now());
        self.duration_ms = elapsed.as_millis() as u64;
    }

    pub fn status(&self) -> RunStatus {
        if self.total == 0 {
            if self.probe_failures > 0 {
                RunStatus::HostFailures
            } else {
                RunStatus::NothingToDo
            }
        } else if self.cancelled > 0 {
            RunStatus::Cancelled
        } else if self.failed > 0 || self.timed_out > 0 || self.probe_failures > 0 {
            RunStatus::HostFailures
        } else {
            RunStatus::Success
        }
    }

    /// One-line human summary.
    pub fn summary_line(&self) -> String {
        format!(
            "{}/{} succeeded, {} failed, {} cancelled [{:.2}s]",
            self.succeeded,
            self.total,
            self.failed + self.timed_out,
            self.cancelled,
            self.duration_ms as f64 / 1000.0
        )
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}
