//! # Riptide - A Network Scan Orchestrator
//!
//! Riptide discovers live hosts on a network and fans out one external
//! per-host scan job for each of them, never running more than a
//! configured number of jobs at once.
//!
//! ## Features
//!
//! - **Flexible Targeting**: Single IPs, CIDR subnets, and target list files
//! - **Host Discovery**: nmap ping sweeps with a dedicated report parser
//! - **Bounded Execution**: Semaphore-backed worker pool with a hard concurrency ceiling
//! - **Progress Reporting**: Plain counter lines or a live progress bar
//! - **Cancellation**: One signal terminates every spawned process group
//! - **Run Accounting**: Per-job outcomes folded into a serializable summary
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use riptide::cancel::CancelToken;
//! use riptide::engine::{Engine, RunOptions};
//! use riptide::probe::Prober;
//! use riptide::report::ReportMode;
//! use riptide::scheduler::ScanTool;
//! use riptide::target::TargetDescriptor;
//! use riptide::workspace::Workspace;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let workspace = Workspace::new("input_files", "results");
//!     workspace.prepare().unwrap();
//!
//!     let engine = Engine::new(
//!         &workspace,
//!         Prober::nmap(),
//!         Arc::new(ScanTool::tsunami(&workspace.results_dir)),
//!     );
//!
//!     let descriptor = TargetDescriptor::subnet("192.168.1.0/24").unwrap();
//!     let options = RunOptions {
//!         concurrency: 3,
//!         mode: ReportMode::Decorated,
//!         cancel: CancelToken::new(),
//!     };
//!
//!     let summary = engine.run_scan(&descriptor, &options).await.unwrap();
//!     println!("{}", summary.summary_line());
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`target`] - Target descriptors, validation, and list-file resolution
//! - [`probe`] - Liveness probing and the discovery report parser
//! - [`scheduler`] - The bounded worker pool and per-host scan jobs
//! - [`report`] - Progress observers (plain and decorated)
//! - [`summary`] - Run-scoped outcome accounting
//! - [`engine`] - The `run_scan` contract tying it all together
//! - [`workspace`] - Input/results directory lifecycle
//! - [`config`] - Settings and XDG paths
//! - [`error`] - Comprehensive error types

pub mod cancel;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod probe;
pub mod report;
pub mod scheduler;
pub mod summary;
pub mod target;
pub mod types;
pub mod workspace;

// Re-export commonly used types
pub use cancel::CancelToken;
pub use engine::{Engine, RunOptions};
pub use error::{RunError, RunResult};
pub use report::ReportMode;
pub use scheduler::{JobFailure, JobOutcome};
pub use summary::{RunStatus, RunSummary};
pub use target::{ResolvedTarget, TargetDescriptor};
pub use types::RunId;
