//! Run workspace: the input and results directories.
//!
//! Before a run the results directory is wiped (keeping `README.md`) so
//! the downstream report builder only ever sees files from the run that
//! just finished; the input directory, which confines target list files,
//! is created if missing.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{WorkspaceError, WorkspaceResult};

/// Directory layout for one orchestrator installation.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Where target list files must live.
    pub input_dir: PathBuf,
    /// Where per-host `<host>_results.json` files are written.
    pub results_dir: PathBuf,
}

impl Workspace {
    pub fn new(input_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            results_dir: results_dir.into(),
        }
    }

    /// Prepare both directories for a run.
    ///
    /// Creates the input directory if missing; clears every file in the
    /// results directory except `README.md`, creating it if missing.
    /// Failures are fatal to the run and classified so the caller can
    /// tell a permission problem from any other I/O failure.
    pub fn prepare(&self) -> WorkspaceResult<()> {
        ensure_dir(&self.input_dir)?;
        if self.results_dir.exists() {
            clear_dir(&self.results_dir)?;
        } else {
            ensure_dir(&self.results_dir)?;
        }
        debug!(input = %self.input_dir.display(), results = %self.results_dir.display(), "workspace ready");
        Ok(())
    }

    /// Whether the results directory holds at least one result file.
    pub fn has_results(&self) -> bool {
        fs::read_dir(&self.results_dir)
            .map(|mut entries| {
                entries.any(|e| {
                    e.map(|e| e.file_name() != "README.md" && e.path().is_file())
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false)
    }
}

fn ensure_dir(dir: &Path) -> WorkspaceResult<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(WorkspaceError::NotADirectory(dir.to_path_buf()));
    }
    fs::create_dir_all(dir).map_err(|e| classify(dir, e))
}

/// Delete every file in `dir` except `README.md`.
fn clear_dir(dir: &Path) -> WorkspaceResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| classify(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| classify(dir, e))?;
        let path = entry.path();
        if !path.is_file() || entry.file_name() == "README.md" {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => {}
            // Already gone is fine; someone else cleaning up is not an error.
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(file = %path.display(), "file vanished during cleanup");
            }
            Err(e) => return Err(classify(&path, e)),
        }
    }
    Ok(())
}

fn classify(path: &Path, e: std::io::Error) -> WorkspaceError {
    match e.kind() {
        ErrorKind::PermissionDenied => WorkspaceError::PermissionDenied {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
        _ => WorkspaceError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path().join("input"), dir.path().join("results"));
        ws.prepare().unwrap();
        assert!(ws.input_dir.is_dir());
        assert!(ws.results_dir.is_dir());
    }

    #[test]
    fn test_prepare_clears_results_but_keeps_readme() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results");
        fs::create_dir_all(&results).unwrap();
        fs::write(results.join("10.0.0.1_results.json"), "{}").unwrap();
        fs::write(results.join("README.md"), "# results").unwrap();

        let ws = Workspace::new(dir.path().join("input"), &results);
        ws.prepare().unwrap();

        assert!(!results.join("10.0.0.1_results.json").exists());
        assert!(results.join("README.md").exists());
    }

    #[test]
    fn test_has_results_ignores_readme() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path().join("input"), dir.path().join("results"));
        ws.prepare().unwrap();
        fs::write(ws.results_dir.join("README.md"), "# results").unwrap();
        assert!(!ws.has_results());

        fs::write(ws.results_dir.join("10.0.0.1_results.json"), "{}").unwrap();
        assert!(ws.has_results());
    }

    #[test]
    fn test_prepare_rejects_file_in_place_of_directory() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input");
        fs::write(&input, "not a directory").unwrap();

        let ws = Workspace::new(&input, dir.path().join("results"));
        let err = ws.prepare().unwrap_err();
        assert!(matches!(err, WorkspaceError::NotADirectory(_)));
    }
}
