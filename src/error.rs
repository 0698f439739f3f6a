//! Error types for Riptide.
//!
//! Uses `thiserror` for ergonomic error definitions. Target, probe, and
//! job-level failures live next to their modules; this module carries the
//! workspace, configuration, and top-level run errors.

use std::path::PathBuf;
use thiserror::Error;

use crate::target::TargetError;

/// Errors preparing or inspecting the run workspace.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("insufficient permissions for '{path}': {reason}")]
    PermissionDenied { path: PathBuf, reason: String },

    #[error("'{0}' exists but is not a directory")]
    NotADirectory(PathBuf),

    #[error("IO error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for workspace operations.
pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read '{path}': {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("failed to write '{path}': {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("invalid settings format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidFormat(e.to_string())
    }
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Fatal, run-aborting errors surfaced by the engine.
///
/// Per-host probe and scan failures are not `RunError`s; they are folded
/// into the [`RunSummary`](crate::summary::RunSummary) and never abort
/// sibling work.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("concurrency limit must be a positive integer, got {0}")]
    InvalidConcurrency(usize),

    #[error("run finished but no result files were produced in '{0}'")]
    NoResults(PathBuf),
}

/// Result type alias for engine operations.
pub type RunResult<T> = Result<T, RunError>;
