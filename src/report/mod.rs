//! Progress reporting for a run.
//!
//! The scheduler only knows the [`ProgressObserver`] trait and calls it
//! exactly once per terminal job, in completion order. Two built-in
//! observers cover the two presentation modes: a plain counter line for
//! machine consumption (or any front end that renders progress itself)
//! and an indicatif bar for humans. Observers never influence
//! scheduling.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::net::IpAddr;
use std::sync::Mutex;

use crate::scheduler::JobOutcome;
use crate::summary::RunSummary;

/// Presentation mode for progress output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportMode {
    /// Simple `(completed/total)` counter lines.
    Plain,
    /// Live progress bar with elapsed time and completion fraction.
    #[default]
    Decorated,
}

/// Observer of terminal job transitions.
pub trait ProgressObserver: Send + Sync {
    /// Called once before the first job is submitted.
    fn run_started(&self, total: usize);

    /// Called exactly once per terminal job, in completion order.
    fn job_completed(&self, host: IpAddr, outcome: &JobOutcome, completed: usize, total: usize);

    /// Called once after the last job has been folded.
    fn run_finished(&self, summary: &RunSummary);
}

/// Build the observer for a presentation mode.
pub fn observer_for(mode: ReportMode) -> Box<dyn ProgressObserver> {
    match mode {
        ReportMode::Plain => Box::new(PlainReporter),
        ReportMode::Decorated => Box::new(BarReporter::new()),
    }
}

/// Counter-line reporter, one line per completion.
pub struct PlainReporter;

impl ProgressObserver for PlainReporter {
    fn run_started(&self, total: usize) {
        println!("Running scans on {} hosts...", total);
    }

    fn job_completed(&self, host: IpAddr, outcome: &JobOutcome, completed: usize, total: usize) {
        if !matches!(outcome, JobOutcome::Succeeded) {
            println!("Scan of host {} {}", host, outcome);
        }
        println!("{}", progress_line(completed, total));
    }

    fn run_finished(&self, summary: &RunSummary) {
        println!("Scan run {}: {}", summary.run_id.short(), summary.summary_line());
    }
}

/// Decorated reporter with a live indicatif bar.
pub struct BarReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl BarReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }
}

impl Default for BarReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for BarReporter {
    fn run_started(&self, total: usize) {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );
        *self.bar.lock().unwrap() = Some(bar);
    }

    fn job_completed(&self, host: IpAddr, outcome: &JobOutcome, _completed: usize, _total: usize) {
        let guard = self.bar.lock().unwrap();
        if let Some(bar) = guard.as_ref() {
            match outcome {
                JobOutcome::Succeeded => {
                    bar.set_message(format!("scanned {}", host));
                }
                other => {
                    bar.println(format!(
                        "{} host {} {}",
                        style("Error:").red().bold(),
                        host,
                        other
                    ));
                }
            }
            bar.inc(1);
        }
    }

    fn run_finished(&self, summary: &RunSummary) {
        let guard = self.bar.lock().unwrap();
        if let Some(bar) = guard.as_ref() {
            bar.finish_with_message("Scan run complete");
        }
        println!(
            "{} {}",
            style("✓").green().bold(),
            summary.summary_line()
        );
    }
}

/// No-op observer for embedders that render progress themselves.
pub struct NullObserver;

impl ProgressObserver for NullObserver {
    fn run_started(&self, _total: usize) {}
    fn job_completed(&self, _host: IpAddr, _outcome: &JobOutcome, _completed: usize, _total: usize) {
    }
    fn run_finished(&self, _summary: &RunSummary) {}
}

fn progress_line(completed: usize, total: usize) -> String {
    format!("Running scans...({}/{}) completed", completed, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_line_format() {
        assert_eq!(progress_line(3, 10), "Running scans...(3/10) completed");
    }

    #[test]
    fn test_bar_reporter_handles_completion_before_start() {
        // A completion arriving before run_started must not panic.
        let reporter = BarReporter::new();
        reporter.job_completed(
            "10.0.0.1".parse().unwrap(),
            &JobOutcome::Succeeded,
            1,
            1,
        );
    }

    #[test]
    fn test_default_mode_is_decorated() {
        assert_eq!(ReportMode::default(), ReportMode::Decorated);
    }
}
