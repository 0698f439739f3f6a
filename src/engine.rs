//! Run orchestration.
//!
//! One call drives a whole run: resolve the descriptor, probe for live
//! hosts, fan the per-host scan jobs out under the concurrency ceiling,
//! and fold the outcomes into a [`RunSummary`]. Every front end (flag
//! CLI, interactive prompt, GUI) goes through [`Engine::run_scan`]; the
//! engine itself never parses arguments and never renders results.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::error::{RunError, RunResult};
use crate::probe::Prober;
use crate::report::{observer_for, ReportMode};
use crate::scheduler::{run_jobs, HostScanner};
use crate::summary::RunSummary;
use crate::target::{ResolvedTarget, TargetDescriptor, TargetResolver};
use crate::workspace::Workspace;

/// Per-run knobs supplied by the front end.
#[derive(Clone)]
pub struct RunOptions {
    /// Maximum scan jobs running simultaneously. Must be at least 1.
    pub concurrency: usize,
    /// Progress presentation mode.
    pub mode: ReportMode,
    /// Run-scoped cancellation signal.
    pub cancel: CancelToken,
}

/// The discovery-and-bounded-execution engine.
pub struct Engine {
    resolver: TargetResolver,
    prober: Prober,
    scanner: Arc<dyn HostScanner>,
}

impl Engine {
    /// Build an engine over a workspace and the two external tool seams.
    pub fn new(workspace: &Workspace, prober: Prober, scanner: Arc<dyn HostScanner>) -> Self {
        Self {
            resolver: TargetResolver::new(&workspace.input_dir),
            prober,
            scanner,
        }
    }

    /// Execute one full run.
    ///
    /// Validation errors (malformed descriptor, bad concurrency) are
    /// fatal and returned before any probing. Per-host probe and scan
    /// failures are folded into the summary and never abort the run.
    /// Zero live hosts is not an error: the summary comes back with
    /// [`RunStatus::NothingToDo`](crate::summary::RunStatus::NothingToDo).
    pub async fn run_scan(
        &self,
        descriptor: &TargetDescriptor,
        options: &RunOptions,
    ) -> RunResult<RunSummary> {
        if options.concurrency == 0 {
            return Err(RunError::InvalidConcurrency(options.concurrency));
        }

        let started = Instant::now();
        let mut summary = RunSummary::new();
        let observer = observer_for(options.mode);

        info!(run_id = %summary.run_id, scan = %descriptor, "starting scan run");

        let targets = self.resolver.resolve(descriptor)?;
        let hosts = self.discover(descriptor, &targets, &mut summary).await;

        if hosts.is_empty() {
            if summary.probe_failures == 0 {
                info!(scan = %descriptor, "no live hosts found");
            } else {
                warn!(scan = %descriptor, failures = summary.probe_failures,
                      "no live hosts found; probing was degraded");
            }
            summary.finish(started.elapsed());
            observer.run_finished(&summary);
            return Ok(summary);
        }

        info!(count = hosts.len(), "live hosts found");
        run_jobs(
            hosts,
            options.concurrency,
            Arc::clone(&self.scanner),
            observer.as_ref(),
            &options.cancel,
            &mut summary,
        )
        .await;

        summary.finish(started.elapsed());
        observer.run_finished(&summary);
        Ok(summary)
    }

    /// Probe the resolved targets into one deduplicated live-host list.
    ///
    /// The strategy mirrors the descriptor: single addresses and subnets
    /// get one single-mode sweep; a list of plain addresses is probed as
    /// an independent fan-out; a list containing any subnet is handed to
    /// the tool as one batch sweep of the canonicalized file, where
    /// liveness needs an explicit confirmation per host.
    async fn discover(
        &self,
        descriptor: &TargetDescriptor,
        targets: &[ResolvedTarget],
        summary: &mut RunSummary,
    ) -> Vec<IpAddr> {
        let live = match descriptor {
            TargetDescriptor::Single(_) | TargetDescriptor::Subnet(_) => {
                match targets.first() {
                    Some(target) => match self.prober.probe(target).await {
                        Ok(hosts) => hosts,
                        Err(e) => {
                            warn!(probe = %target, error = %e, "liveness probe failed");
                            summary.probe_failures += 1;
                            Default::default()
                        }
                    },
                    None => Default::default(),
                }
            }
            TargetDescriptor::ListFile(path) => {
                let only_addresses = targets
                    .iter()
                    .all(|t| matches!(t, ResolvedTarget::Address(_)));
                if only_addresses {
                    let (hosts, failures) = self.prober.probe_all(targets).await;
                    summary.probe_failures += failures;
                    hosts
                } else {
                    match self.prober.probe_file(path).await {
                        Ok(hosts) => hosts,
                        Err(e) => {
                            warn!(list = %path.display(), error = %e, "batch liveness probe failed");
                            summary.probe_failures += 1;
                            Default::default()
                        }
                    }
                }
            }
        };

        // The host set is semantically unordered; sort for stable logs.
        let mut hosts: Vec<IpAddr> = live.into_iter().collect();
        hosts.sort();
        hosts
    }
}
