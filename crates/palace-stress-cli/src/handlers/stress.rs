//! Handler for the `stress-test-opds2` command.

use crate::commands::{Cli, ReportFormat};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{ProgressReporter, StressProgress};
use palace_stress::{
    run_stress_test, write_stress_json, write_stress_report, BasicCredentials, ReqwestTransport,
    RunOutcome, StressTestConfig, StressTestStats,
};
use std::io::{self, Write};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Idle connections kept per concurrent stream
const POOL_CONNECTIONS_PER_STREAM: usize = 2;

/// Build the engine configuration from parsed arguments.
pub fn build_stress_config(cli: &Cli) -> CliResult<StressTestConfig> {
    let credentials =
        BasicCredentials::from_parts(cli.username.as_deref(), cli.password.as_deref());
    if credentials.is_none() && (cli.username.is_some() || cli.password.is_some()) {
        warn!("username and password must both be set, sending requests without credentials");
    }

    let config = StressTestConfig::new(&cli.url)
        .with_concurrency(cli.concurrency)
        .with_max_retries(cli.max_retries)
        .with_credentials(credentials)
        .with_continuous(cli.continuous);
    config
        .validate()
        .map_err(|e| CliError::invalid_argument(e.to_string()))?;
    Ok(config)
}

/// Write the final report in the requested format.
pub fn write_report<W: Write>(
    out: &mut W,
    format: ReportFormat,
    stats: &StressTestStats,
    concurrency: usize,
    outcome: &RunOutcome,
) -> CliResult<()> {
    match format {
        ReportFormat::Text => {
            write_stress_report(out, stats, concurrency)?;
            writeln!(out)?;
            out.flush()?;
        }
        ReportFormat::Json => write_stress_json(out, stats, concurrency, outcome)?,
    }
    Ok(())
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping stress test");
            token.cancel();
        }
    })
}

/// Execute a stress test run and print its report to stdout.
pub async fn execute_stress_test(cli: &Cli, config: &CliConfig) -> CliResult<RunOutcome> {
    let stress_config = build_stress_config(cli)?;
    let transport = ReqwestTransport::new(
        Duration::from_secs(cli.timeout),
        cli.concurrency.saturating_mul(POOL_CONNECTIONS_PER_STREAM),
    )?;

    let use_color = config.color.should_color();
    let quiet = config.verbosity.is_quiet();
    let reporter = ProgressReporter::new(use_color, quiet);
    let progress = StressProgress::new(use_color, quiet);

    reporter.info(&format!(
        "Stress testing {} with {} concurrent streams",
        stress_config.url, stress_config.concurrency
    ));

    let cancel = CancellationToken::new();
    let signal_task = cancel_on_ctrl_c(cancel.clone());

    let mut stats = StressTestStats::new(cli.max_failures);
    let result = run_stress_test(&transport, &stress_config, &mut stats, &progress, &cancel).await;
    signal_task.abort();
    let outcome = result?;

    reporter.outcome(&outcome);
    write_report(
        &mut io::stdout().lock(),
        cli.format,
        &stats,
        stress_config.concurrency,
        &outcome,
    )?;

    Ok(outcome)
}
