//! `stress-test-opds2`: hammer an OPDS 2 feed with concurrent pagination walks
//!
//! Exit codes: `0` when every stream finished, `2` when the retry ceiling
//! stopped the run, `130` on Ctrl-C, `1` for any other error.

use clap::Parser;
use palace_stress_cli::{handlers, Cli, CliConfig, CliError, CliResult};
use palace_stress::RunOutcome;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const EXIT_ABORTED: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    match run() {
        Ok(outcome) => exit_code(&outcome),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn exit_code(outcome: &RunOutcome) -> ExitCode {
    match outcome {
        RunOutcome::Completed => ExitCode::SUCCESS,
        RunOutcome::Interrupted => ExitCode::from(EXIT_INTERRUPTED),
        RunOutcome::Aborted { .. } => ExitCode::from(EXIT_ABORTED),
    }
}

fn init_logging(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.log_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(config.color.should_color())
        .with_target(config.verbosity.is_debug())
        .try_init();
}

fn run() -> CliResult<RunOutcome> {
    let cli = Cli::parse();
    let config = CliConfig::from_cli(&cli);
    init_logging(&config);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime(format!("Failed to create async runtime: {e}")))?;
    rt.block_on(handlers::execute_stress_test(&cli, &config))
}
