//! Command-line front end.
//!
//! One flag-driven command: pick exactly one target form, optionally
//! bound the scan-job concurrency, and run. The CLI is a thin driver
//! over [`Engine::run_scan`]; any other front end can call the same
//! contract.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use crate::cancel::CancelToken;
use crate::config::{AppSettings, Paths};
use crate::engine::{Engine, RunOptions};
use crate::error::{RunError, RunResult};
use crate::probe::{Nmap, Prober};
use crate::report::ReportMode;
use crate::scheduler::ScanTool;
use crate::summary::RunStatus;
use crate::target::TargetDescriptor;
use crate::workspace::Workspace;

/// Riptide - a network scan orchestrator.
///
/// Discovers live hosts from an address, a CIDR subnet, or a list file,
/// then runs one external scan job per live host with a bounded number
/// of jobs in flight.
#[derive(Parser, Debug)]
#[command(name = "riptide")]
#[command(author = "HueCodes <huecodes@proton.me>")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Host discovery and bounded per-host scan execution", long_about = None)]
#[command(group(
    clap::ArgGroup::new("target")
        .required(true)
        .args(["address", "subnet", "target_list"])
))]
pub struct Cli {
    /// Scan a single IP address
    #[arg(short = 'a', long, value_name = "IP")]
    pub address: Option<String>,

    /// Scan a subnet in CIDR format (e.g., 192.168.1.0/24)
    #[arg(short = 's', long, value_name = "CIDR")]
    pub subnet: Option<String>,

    /// Scan the addresses/subnets listed in a file inside the input directory
    #[arg(short = 'l', long, value_name = "FILE")]
    pub target_list: Option<PathBuf>,

    /// Maximum number of scan jobs to run simultaneously
    #[arg(short = 'c', long, value_name = "N",
          value_parser = clap::value_parser!(u32).range(1..))]
    pub concurrency: Option<u32>,

    /// Simplified progress output (one counter line per completion)
    #[arg(long)]
    pub plain: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to custom configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory for target list files
    #[arg(long, value_name = "DIR")]
    pub input_dir: Option<PathBuf>,

    /// Directory for per-host result files
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

impl Cli {
    /// Run the orchestrator and return the process exit code.
    pub async fn execute(&self) -> RunResult<u8> {
        let settings = match &self.config {
            Some(path) => AppSettings::load_from(path)?,
            None => AppSettings::load()?,
        };

        let workspace = self.workspace(&settings);
        workspace.prepare()?;

        let descriptor = self.descriptor(&workspace)?;

        let prober = Prober::new(Arc::new(Nmap::with_program(&settings.discovery_program)));
        let scanner = if settings.scanner_program.is_empty() {
            Arc::new(ScanTool::tsunami(&workspace.results_dir))
        } else {
            Arc::new(ScanTool::new(
                &settings.scanner_program,
                settings.scanner_args.clone(),
                &workspace.results_dir,
            ))
        };

        let cancel = CancelToken::new();
        let signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("cancellation requested; terminating running scans");
                signal.cancel();
            }
        });

        let options = RunOptions {
            concurrency: self
                .concurrency
                .map(|c| c as usize)
                .unwrap_or(settings.default_concurrency),
            mode: if self.plain || settings.plain_progress {
                ReportMode::Plain
            } else {
                ReportMode::Decorated
            },
            cancel,
        };

        let engine = Engine::new(&workspace, prober, scanner);
        let summary = engine.run_scan(&descriptor, &options).await?;

        // A successful run must leave something for the report builder.
        if summary.status() == RunStatus::Success && !workspace.has_results() {
            return Err(RunError::NoResults(workspace.results_dir.clone()));
        }

        Ok(summary.status().exit_code())
    }

    /// Directory layout: flags override settings, settings override the
    /// XDG defaults.
    fn workspace(&self, settings: &AppSettings) -> Workspace {
        let input_dir = self
            .input_dir
            .clone()
            .or_else(|| settings.input_dir.clone())
            .unwrap_or_else(|| Paths::get().input_dir());
        let results_dir = self
            .output_dir
            .clone()
            .or_else(|| settings.results_dir.clone())
            .unwrap_or_else(|| Paths::get().results_dir());
        Workspace::new(input_dir, results_dir)
    }

    fn descriptor(&self, workspace: &Workspace) -> RunResult<TargetDescriptor> {
        let descriptor = if let Some(address) = &self.address {
            TargetDescriptor::address(address)?
        } else if let Some(subnet) = &self.subnet {
            TargetDescriptor::subnet(subnet)?
        } else if let Some(list) = &self.target_list {
            TargetDescriptor::list_file(list, &workspace.input_dir)?
        } else {
            // clap's target group guarantees one of the three is present.
            unreachable!("clap enforces a target argument")
        };
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_a_target_argument() {
        assert!(Cli::try_parse_from(["riptide"]).is_err());
    }

    #[test]
    fn test_target_arguments_are_exclusive() {
        let result = Cli::try_parse_from(["riptide", "-a", "10.0.0.1", "-s", "10.0.0.0/24"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_concurrency_floor_enforced() {
        assert!(Cli::try_parse_from(["riptide", "-a", "10.0.0.1", "-c", "0"]).is_err());
        let cli = Cli::try_parse_from(["riptide", "-a", "10.0.0.1", "-c", "5"]).unwrap();
        assert_eq!(cli.concurrency, Some(5));
    }

    #[test]
    fn test_plain_flag_parses() {
        let cli = Cli::try_parse_from(["riptide", "-s", "10.0.0.0/24", "--plain"]).unwrap();
        assert!(cli.plain);
    }

    #[test]
    fn test_descriptor_from_address_flag() {
        let cli = Cli::try_parse_from(["riptide", "-a", "10.0.0.5"]).unwrap();
        let ws = Workspace::new("/tmp/in", "/tmp/out");
        let descriptor = cli.descriptor(&ws).unwrap();
        assert!(matches!(descriptor, TargetDescriptor::Single(_)));
    }

    #[test]
    fn test_malformed_address_flag_is_fatal() {
        let cli = Cli::try_parse_from(["riptide", "-a", "not-an-ip"]).unwrap();
        let ws = Workspace::new("/tmp/in", "/tmp/out");
        assert!(matches!(
            cli.descriptor(&ws),
            Err(RunError::Target(_))
        ));
    }
}
