//! CLI command definitions using clap

use clap::{Parser, ValueEnum};

/// Stress test an OPDS2 feed by fetching it multiple times in parallel.
///
/// Each of the `--concurrency` streams walks the feed's `next` links until the
/// last page. Failed requests are retried in place; a URL failing more than
/// `--max-retries` times in a row stops the whole run.
#[derive(Parser, Debug)]
#[command(name = "stress-test-opds2")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The OPDS2 feed URL to stress test
    pub url: String,

    /// Number of concurrent streams
    #[arg(short, long, default_value = "10", value_parser = parse_positive)]
    pub concurrency: usize,

    /// Username for authentication
    #[arg(short, long, env = "STRESS_TEST_USERNAME")]
    pub username: Option<String>,

    /// Password for authentication
    #[arg(short, long, env = "STRESS_TEST_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Maximum number of retries for failed requests
    #[arg(short = 'r', long, default_value = "3")]
    pub max_retries: u32,

    /// Maximum number of recent failures kept for the error report
    #[arg(short = 'f', long, default_value = "50")]
    pub max_failures: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "60", value_parser = parse_positive_secs)]
    pub timeout: u64,

    /// Restart each stream from the root URL after it reaches the last page
    #[arg(long)]
    pub continuous: bool,

    /// Report format
    #[arg(long, value_enum, default_value = "text")]
    pub format: ReportFormat,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (no progress display)
    #[arg(short, long)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorArg,
}

fn parse_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_positive_secs(s: &str) -> Result<u64, String> {
    match s.parse::<u64>() {
        Ok(0) => Err("must be at least 1 second".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Report format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// JSON summary
    Json,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
