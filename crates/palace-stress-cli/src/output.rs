//! Output formatting and progress reporting

use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use palace_stress::{ProgressObserver, RunOutcome, StressTestStats};
use std::time::Duration;

/// Status line printer for run-level messages on stderr
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            use_color,
            quiet,
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let _ = self.term.write_line(&self.success_line(message));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let _ = self.term.write_line(&self.failure_line(message));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let _ = self.term.write_line(&self.warning_line(message));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    fn success_line(&self, message: &str) -> String {
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };
        format!("{prefix} {message}")
    }

    fn failure_line(&self, message: &str) -> String {
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        format!("{prefix} {message}")
    }

    fn warning_line(&self, message: &str) -> String {
        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };
        format!("{prefix} {message}")
    }

    /// Report how a run ended
    pub fn outcome(&self, outcome: &RunOutcome) {
        match outcome {
            RunOutcome::Completed => self.success("Stress test completed"),
            RunOutcome::Interrupted => self.warning("Stress test interrupted"),
            RunOutcome::Aborted { url, attempts } => self.failure(&format!(
                "Max retries exceeded for {url} ({attempts} consecutive failures), stopping stress test"
            )),
        }
    }
}

/// Live spinner showing request, harvest and failure counts
#[derive(Debug)]
pub struct StressProgress {
    bar: Option<ProgressBar>,
    use_color: bool,
}

impl StressProgress {
    /// Create a spinner; hidden in quiet mode
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        let bar = (!quiet).then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb.set_message("starting...");
            pb
        });
        Self { bar, use_color }
    }

    /// Spinner message for the current counters
    #[must_use]
    pub fn status_message(&self, stats: &StressTestStats) -> String {
        let failed = stats.failed_requests();
        let failed = if self.use_color && failed > 0 {
            style(failed).red().bold().to_string()
        } else {
            failed.to_string()
        };
        let elapsed = stats.elapsed_secs();
        let rate = if elapsed > 0.0 {
            stats.total_requests() as f64 / elapsed
        } else {
            0.0
        };
        format!(
            "{} requests | {} harvests | {rate:.1} req/s | {failed} failed",
            stats.total_requests(),
            stats.full_harvests,
        )
    }
}

impl ProgressObserver for StressProgress {
    fn on_result(&self, stats: &StressTestStats) {
        if let Some(ref bar) = self.bar {
            bar.set_message(self.status_message(stats));
        }
    }

    fn on_finish(&self, _stats: &StressTestStats, _outcome: &RunOutcome) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
