//! Liveness probing via an external host-discovery tool.
//!
//! The prober shells out to a ping-sweep tool (nmap by default) and turns
//! its textual report into a set of live host addresses. The invocation
//! is hidden behind the [`DiscoveryTool`] trait so tests can substitute
//! canned reports, and the report format itself is confined to
//! [`parser`].
//!
//! Probe failures degrade: a failing target contributes an empty set and
//! a diagnostic, never a partial or corrupt one.

pub mod parser;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::target::ResolvedTarget;
use parser::{parse_report, ParseMode};

/// Errors from one discovery tool invocation.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("discovery tool '{0}' was not found; make sure it is installed and in PATH")]
    ToolNotFound(String),

    #[error("discovery tool exited with code {code}")]
    ExecutionFailed { code: i32 },

    #[error("cannot decode discovery tool output: {0}")]
    OutputDecode(String),

    #[error("failed to run discovery tool: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// The external ping-sweep invocation, abstracted for testing.
///
/// Implementations return the tool's raw standard output; interpreting it
/// is the parser's job.
#[async_trait]
pub trait DiscoveryTool: Send + Sync {
    /// Sweep a single address or subnet.
    async fn sweep(&self, target: &str) -> ProbeResult<String>;

    /// Sweep every target listed in a file (one per line).
    async fn sweep_file(&self, list: &Path) -> ProbeResult<String>;
}

/// nmap-based discovery (`nmap -sn`).
pub struct Nmap {
    program: PathBuf,
}

impl Nmap {
    pub fn new() -> Self {
        Self::with_program("nmap")
    }

    /// Use an alternative program (or an absolute path to nmap).
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn execute(&self, mut command: Command) -> ProbeResult<String> {
        let output = command
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    ProbeError::ToolNotFound(self.program.display().to_string())
                }
                _ => ProbeError::Io(e),
            })?;

        if !output.status.success() {
            return Err(ProbeError::ExecutionFailed {
                code: output.status.code().unwrap_or(-1),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| ProbeError::OutputDecode(e.to_string()))
    }
}

impl Default for Nmap {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DiscoveryTool for Nmap {
    async fn sweep(&self, target: &str) -> ProbeResult<String> {
        debug!(program = %self.program.display(), target, "ping sweep");
        let mut command = Command::new(&self.program);
        command.arg("-sn").arg(target);
        self.execute(command).await
    }

    async fn sweep_file(&self, list: &Path) -> ProbeResult<String> {
        debug!(program = %self.program.display(), list = %list.display(), "batch ping sweep");
        let mut command = Command::new(&self.program);
        command.arg("-sn").arg("-iL").arg(list);
        self.execute(command).await
    }
}

/// Drives the discovery tool and collects live hosts.
#[derive(Clone)]
pub struct Prober {
    tool: Arc<dyn DiscoveryTool>,
}

impl Prober {
    pub fn new(tool: Arc<dyn DiscoveryTool>) -> Self {
        Self { tool }
    }

    /// A prober backed by the system nmap.
    pub fn nmap() -> Self {
        Self::new(Arc::new(Nmap::new()))
    }

    /// Probe one address or subnet. Any announced address is live.
    pub async fn probe(&self, target: &ResolvedTarget) -> ProbeResult<HashSet<IpAddr>> {
        let report = self.tool.sweep(&target.to_string()).await?;
        Ok(parse_report(&report, ParseMode::Single))
    }

    /// Probe every target in a list file with one batch invocation.
    /// Liveness requires an explicit confirmation line per host.
    pub async fn probe_file(&self, list: &Path) -> ProbeResult<HashSet<IpAddr>> {
        let report = self.tool.sweep_file(list).await?;
        Ok(parse_report(&report, ParseMode::Batch))
    }

    /// Probe many targets as independent sweeps, bounded by the
    /// platform's available parallelism, merged into one deduplicated
    /// set. A failing target degrades to the empty set; the failure
    /// count is returned alongside for the run summary.
    pub async fn probe_all(&self, targets: &[ResolvedTarget]) -> (HashSet<IpAddr>, usize) {
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        let outcomes: Vec<Option<HashSet<IpAddr>>> = stream::iter(targets.iter().copied())
            .map(|target| async move {
                match self.probe(&target).await {
                    Ok(hosts) => Some(hosts),
                    Err(e) => {
                        warn!(probe = %target, error = %e, "liveness probe failed");
                        None
                    }
                }
            })
            .buffer_unordered(parallelism)
            .collect()
            .await;

        let mut live = HashSet::new();
        let mut failures = 0;
        for outcome in outcomes {
            match outcome {
                Some(hosts) => live.extend(hosts),
                None => failures += 1,
            }
        }
        (live, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Canned discovery tool: a fixed report, or a fixed error kind.
    struct CannedSweep {
        report: Result<String, fn() -> ProbeError>,
    }

    impl CannedSweep {
        fn report(s: &str) -> Arc<Self> {
            Arc::new(Self {
                report: Ok(s.to_string()),
            })
        }

        fn failing(make: fn() -> ProbeError) -> Arc<Self> {
            Arc::new(Self { report: Err(make) })
        }
    }

    #[async_trait]
    impl DiscoveryTool for CannedSweep {
        async fn sweep(&self, _target: &str) -> ProbeResult<String> {
            match &self.report {
                Ok(s) => Ok(s.clone()),
                Err(make) => Err(make()),
            }
        }

        async fn sweep_file(&self, _list: &Path) -> ProbeResult<String> {
            self.sweep("").await
        }
    }

    fn target(s: &str) -> ResolvedTarget {
        if let Ok(ip) = s.parse() {
            ResolvedTarget::Address(ip)
        } else {
            ResolvedTarget::Network(s.parse().unwrap())
        }
    }

    #[tokio::test]
    async fn test_probe_parses_single_report() {
        let prober = Prober::new(CannedSweep::report(
            "Nmap scan report for 10.0.0.5\nHost is up.\n",
        ));
        let hosts = prober.probe(&target("10.0.0.5")).await.unwrap();
        assert_eq!(hosts, HashSet::from(["10.0.0.5".parse().unwrap()]));
    }

    #[tokio::test]
    async fn test_probe_error_yields_no_partial_set() {
        let prober = Prober::new(CannedSweep::failing(|| ProbeError::ExecutionFailed {
            code: 1,
        }));
        let err = prober.probe(&target("10.0.0.0/24")).await.unwrap_err();
        assert!(matches!(err, ProbeError::ExecutionFailed { code: 1 }));
    }

    #[tokio::test]
    async fn test_probe_all_merges_and_dedups() {
        // Both sweeps announce 10.0.0.7; the merged set holds it once.
        let prober = Prober::new(CannedSweep::report(
            "Nmap scan report for 10.0.0.7\nNmap scan report for 10.0.0.8\n",
        ));
        let targets = [target("10.0.0.0/30"), target("10.0.0.4/30")];
        let (hosts, failures) = prober.probe_all(&targets).await;
        assert_eq!(hosts.len(), 2);
        assert_eq!(failures, 0);
    }

    #[tokio::test]
    async fn test_probe_all_degrades_failures_to_empty() {
        let prober = Prober::new(CannedSweep::failing(|| ProbeError::ToolNotFound(
            "nmap".into(),
        )));
        let targets = [target("10.0.0.1"), target("10.0.0.2")];
        let (hosts, failures) = prober.probe_all(&targets).await;
        assert!(hosts.is_empty());
        assert_eq!(failures, 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nmap_missing_binary_classified() {
        let tool = Nmap::with_program("/nonexistent/definitely-not-nmap");
        let err = tool.sweep("127.0.0.1").await.unwrap_err();
        assert!(matches!(err, ProbeError::ToolNotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nmap_nonzero_exit_classified() {
        let tool = Nmap::with_program("false");
        let err = tool.sweep("127.0.0.1").await.unwrap_err();
        assert!(matches!(err, ProbeError::ExecutionFailed { .. }));
    }
}
