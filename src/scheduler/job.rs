//! Scan jobs and the external per-host scan tool.
//!
//! One [`ScanJob`] exists per live host and per run. Its life is short:
//! `Pending` while queued, `Running` while the external process is alive,
//! then exactly one terminal [`JobOutcome`] that the scheduler folds into
//! the run summary.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::debug;

use crate::cancel::CancelToken;

/// Transient scheduling states of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Finished,
}

/// Why a job did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum JobFailure {
    #[error("scan tool not found; make sure it is installed and in PATH")]
    ToolNotFound,

    #[error("insufficient permissions to run the scan tool or write its output")]
    PermissionDenied,

    #[error("scan tool exited with code {0}")]
    ExternalTool(i32),

    #[error("system error launching the scan tool: {0}")]
    System(String),

    #[error("unexpected failure: {0}")]
    Unknown(String),
}

/// Terminal state of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded,
    Failed(JobFailure),
    /// Reserved: no per-job timeout exists in the current contract.
    TimedOut,
    Cancelled,
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed(failure) => write!(f, "failed: {}", failure),
            Self::TimedOut => write!(f, "timed out"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One per-host scan execution.
#[derive(Debug)]
pub struct ScanJob {
    pub host: IpAddr,
    state: JobState,
    outcome: Option<JobOutcome>,
}

impl ScanJob {
    pub fn new(host: IpAddr) -> Self {
        Self {
            host,
            state: JobState::Pending,
            outcome: None,
        }
    }

    /// Mark the job running. Only valid once, from `Pending`.
    pub fn start(&mut self) {
        debug_assert_eq!(self.state, JobState::Pending);
        self.state = JobState::Running;
    }

    /// Record the terminal outcome. Only valid once.
    pub fn finish(&mut self, outcome: JobOutcome) {
        debug_assert!(self.outcome.is_none(), "job finished twice");
        self.state = JobState::Finished;
        self.outcome = Some(outcome);
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// The terminal outcome, if the job has finished.
    pub fn outcome(&self) -> Option<&JobOutcome> {
        self.outcome.as_ref()
    }

    /// Consume the job, yielding its terminal outcome.
    pub fn into_outcome(self) -> JobOutcome {
        self.outcome
            .unwrap_or_else(|| JobOutcome::Failed(JobFailure::Unknown("job never finished".into())))
    }
}

/// Executes the heavy per-host scan, abstracted for testing.
#[async_trait]
pub trait HostScanner: Send + Sync {
    /// Run one scan to completion (or cancellation) and classify it.
    ///
    /// Never returns an error: every way a scan can go wrong is a
    /// [`JobOutcome`] so sibling jobs are unaffected.
    async fn scan(&self, host: IpAddr, cancel: &CancelToken) -> JobOutcome;
}

/// External scan tool invocation.
///
/// Spawns the configured program once per host with the fixed output
/// naming convention `<host>_results.json` inside the results directory.
/// The child gets its own process group, so cancellation can take down
/// the tool together with any container-style children it spawned.
pub struct ScanTool {
    program: PathBuf,
    base_args: Vec<String>,
    results_dir: PathBuf,
}

impl ScanTool {
    pub fn new(
        program: impl Into<PathBuf>,
        base_args: Vec<String>,
        results_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            base_args,
            results_dir: results_dir.into(),
        }
    }

    /// The Tsunami CLI invocation this orchestrator was built around.
    pub fn tsunami(results_dir: impl Into<PathBuf>) -> Self {
        Self::new(
            "/opt/java/openjdk/bin/java",
            vec![
                "-cp".into(),
                "/usr/tsunami/tsunami.jar:/usr/tsunami/plugins/*".into(),
                "-Dtsunami.config.location=/usr/tsunami/tsunami.yaml".into(),
                "com.google.tsunami.main.cli.TsunamiCli".into(),
            ],
            results_dir,
        )
    }

    /// Result file for one host: `<results_dir>/<host>_results.json`.
    pub fn output_path(&self, host: IpAddr) -> PathBuf {
        self.results_dir.join(format!("{}_results.json", host))
    }

    fn command_for(&self, host: IpAddr) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.base_args)
            .arg(format!("--ip-v4-target={}", host))
            .arg("--scan-results-local-output-format=JSON")
            .arg(format!(
                "--scan-results-local-output-filename={}",
                self.output_path(host).display()
            ))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        command.process_group(0);
        command
    }
}

#[async_trait]
impl HostScanner for ScanTool {
    async fn scan(&self, host: IpAddr, cancel: &CancelToken) -> JobOutcome {
        debug!(%host, program = %self.program.display(), "launching scan tool");

        let mut child = match self.command_for(host).spawn() {
            Ok(child) => child,
            Err(e) => return JobOutcome::Failed(classify_spawn_error(e)),
        };

        tokio::select! {
            status = child.wait() => match status {
                Ok(status) if status.success() => JobOutcome::Succeeded,
                Ok(status) => match status.code() {
                    Some(code) => JobOutcome::Failed(JobFailure::ExternalTool(code)),
                    None => JobOutcome::Failed(JobFailure::Unknown(
                        "scan tool terminated by signal".into(),
                    )),
                },
                Err(e) => JobOutcome::Failed(JobFailure::System(e.to_string())),
            },
            _ = cancel.cancelled() => {
                terminate_group(&mut child);
                let _ = child.wait().await;
                JobOutcome::Cancelled
            }
        }
    }
}

fn classify_spawn_error(e: std::io::Error) -> JobFailure {
    match e.kind() {
        std::io::ErrorKind::NotFound => JobFailure::ToolNotFound,
        std::io::ErrorKind::PermissionDenied => JobFailure::PermissionDenied,
        _ => JobFailure::System(e.to_string()),
    }
}

/// Terminate the child's whole process group.
#[cfg(unix)]
fn terminate_group(child: &mut Child) {
    if let Some(pid) = child.id() {
        unsafe {
            libc::killpg(pid as libc::pid_t, libc::SIGTERM);
        }
    }
}

#[cfg(not(unix))]
fn terminate_group(child: &mut Child) {
    let _ = child.start_kill();
}
