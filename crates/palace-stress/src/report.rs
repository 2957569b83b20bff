//! Rendering of finished stress runs.
//!
//! Text goes to any `io::Write`; nothing here touches stdout directly.

use crate::engine::RunOutcome;
use crate::request::NO_STATUS;
use crate::result::StressResult;
use crate::stats::StressTestStats;
use crate::timing::ResponseTimeStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Percentiles shown in the timing ladder.
pub const PERCENTILES: [f64; 4] = [50.0, 90.0, 95.0, 99.0];

/// Buckets in the latency histogram.
pub const HISTOGRAM_BUCKETS: usize = 10;

const BAR_WIDTH: usize = 40;

/// Timing summary for one population, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSummary {
    /// Samples
    pub count: u64,
    /// Mean
    pub avg_ms: f64,
    /// Fastest
    pub min_ms: Option<f64>,
    /// Slowest
    pub max_ms: Option<f64>,
    /// Median
    pub p50_ms: Option<f64>,
    /// 90th percentile
    pub p90_ms: Option<f64>,
    /// 95th percentile
    pub p95_ms: Option<f64>,
    /// 99th percentile
    pub p99_ms: Option<f64>,
}

impl TimingSummary {
    /// Summarize response times.
    pub fn from_times(times: &ResponseTimeStats) -> Self {
        let ms = |v: Option<f64>| v.map(|s| s * 1000.0);
        Self {
            count: times.count(),
            avg_ms: times.avg() * 1000.0,
            min_ms: ms(times.min_val()),
            max_ms: ms(times.max_val()),
            p50_ms: ms(times.percentile(50.0)),
            p90_ms: ms(times.percentile(90.0)),
            p95_ms: ms(times.percentile(95.0)),
            p99_ms: ms(times.percentile(99.0)),
        }
    }
}

/// Machine-readable run summary.
#[derive(Debug, Clone, Serialize)]
pub struct StressSummary {
    /// How the run ended
    pub outcome: RunOutcome,
    /// Configured streams
    pub concurrency: usize,
    /// Completed pagination walks
    pub full_harvests: u64,
    /// Run length in seconds
    pub duration_secs: f64,
    /// Throughput over the run
    pub requests_per_second: f64,
    /// All completed requests
    pub total_requests: u64,
    /// Requests answered with 200
    pub successful_requests: u64,
    /// Everything else
    pub failed_requests: u64,
    /// All requests
    pub all: TimingSummary,
    /// Successful requests
    pub successful: TimingSummary,
    /// Failed requests
    pub failed: TimingSummary,
    /// Failure counts by status (0 = no response)
    pub failures_by_status: BTreeMap<u16, u64>,
}

impl StressSummary {
    /// Build from finished stats.
    pub fn new(stats: &StressTestStats, concurrency: usize, outcome: &RunOutcome) -> Self {
        Self {
            outcome: outcome.clone(),
            concurrency,
            full_harvests: stats.full_harvests,
            duration_secs: stats.total_duration(),
            requests_per_second: stats.requests_per_second(),
            total_requests: stats.total_requests(),
            successful_requests: stats.successful_requests(),
            failed_requests: stats.failed_requests(),
            all: TimingSummary::from_times(&stats.all_response_times()),
            successful: TimingSummary::from_times(stats.success_response_times()),
            failed: TimingSummary::from_times(stats.error_response_times()),
            failures_by_status: stats.failures_by_status(),
        }
    }
}

/// Render the run summary as pretty JSON.
pub fn render_stress_json(
    stats: &StressTestStats,
    concurrency: usize,
    outcome: &RunOutcome,
) -> StressResult<String> {
    Ok(serde_json::to_string_pretty(&StressSummary::new(
        stats,
        concurrency,
        outcome,
    ))?)
}

/// Write the run summary as pretty JSON followed by a newline.
pub fn write_stress_json<W: Write>(
    out: &mut W,
    stats: &StressTestStats,
    concurrency: usize,
    outcome: &RunOutcome,
) -> StressResult<()> {
    serde_json::to_writer_pretty(&mut *out, &StressSummary::new(stats, concurrency, outcome))?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Render the text report into a `String`.
pub fn render_stress_report(stats: &StressTestStats, concurrency: usize) -> StressResult<String> {
    let mut buf = Vec::new();
    write_stress_report(&mut buf, stats, concurrency)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn status_label(status: u16) -> String {
    if status == NO_STATUS {
        "no response".to_string()
    } else {
        status.to_string()
    }
}

fn write_timing<W: Write>(out: &mut W, label: &str, times: &ResponseTimeStats) -> io::Result<()> {
    if times.count() == 0 {
        return Ok(());
    }
    writeln!(out, "  {label}:")?;
    writeln!(out, "    Avg: {:.0}ms", times.avg() * 1000.0)?;
    if let (Some(min), Some(max)) = (times.min_val(), times.max_val()) {
        writeln!(out, "    Min: {:.0}ms", min * 1000.0)?;
        writeln!(out, "    Max: {:.0}ms", max * 1000.0)?;
    }
    for q in PERCENTILES {
        if let Some(v) = times.percentile(q) {
            writeln!(out, "    P{q:.0}: {:.0}ms", v * 1000.0)?;
        }
    }
    Ok(())
}

fn write_histogram<W: Write>(out: &mut W, times: &ResponseTimeStats) -> io::Result<()> {
    let buckets = times.histogram(HISTOGRAM_BUCKETS);
    let Some(peak) = buckets.iter().map(|b| b.count).max().filter(|&p| p > 0) else {
        return Ok(());
    };
    writeln!(out, "\nLatency Distribution:")?;
    for bucket in &buckets {
        let bar = ((bucket.count as f64 / peak as f64) * BAR_WIDTH as f64).round() as usize;
        writeln!(
            out,
            "  {:>7.0}ms - {:>7.0}ms | {:<width$} {}",
            bucket.start * 1000.0,
            bucket.end * 1000.0,
            "#".repeat(bar),
            bucket.count,
            width = BAR_WIDTH
        )?;
    }
    Ok(())
}

/// Write the human-readable report for a finished run.
///
/// Safe for empty and zero-length runs.
pub fn write_stress_report<W: Write>(
    out: &mut W,
    stats: &StressTestStats,
    concurrency: usize,
) -> io::Result<()> {
    let failed_results = stats.failed_results();
    if !failed_results.is_empty() {
        writeln!(out, "\nError Details")?;
        writeln!(out, "=============")?;
        if stats.failed_requests() > failed_results.len() as u64 {
            writeln!(
                out,
                "(showing the {} most recent of {} failures)",
                failed_results.len(),
                stats.failed_requests()
            )?;
        }
        for (i, result) in failed_results.iter().enumerate() {
            writeln!(out, "\n[Error {}]", i + 1)?;
            writeln!(out, "  URL: {}", result.url)?;
            writeln!(out, "  Status: {}", status_label(result.status_code))?;
            writeln!(out, "  Response time: {:.0}ms", result.response_time * 1000.0)?;
            if let Some(headers) = result.response_headers.as_ref().filter(|h| !h.is_empty()) {
                writeln!(out, "  Headers:")?;
                for (key, value) in headers {
                    writeln!(out, "    {key}: {value}")?;
                }
            }
            if let Some(body) = result.response_body.as_deref().filter(|b| !b.is_empty()) {
                writeln!(out, "  Body: {body}")?;
            }
        }
    }

    let duration = stats.total_duration();
    let total = stats.total_requests();
    let successful = stats.successful_requests();
    let failed = stats.failed_requests();

    writeln!(out, "\nStress Test Results")?;
    writeln!(out, "===================")?;
    writeln!(out, "Concurrency: {concurrency}")?;
    writeln!(out, "Full harvests: {}", stats.full_harvests)?;

    writeln!(out, "\nTiming:")?;
    writeln!(out, "  Total duration: {:.2}s", duration.max(0.0))?;
    if duration > 0.0 {
        writeln!(out, "  Requests/second: {:.1}", stats.requests_per_second())?;
    }

    let all = stats.all_response_times();
    write_timing(out, "All requests", &all)?;
    write_timing(out, "Successful requests", stats.success_response_times())?;
    write_timing(out, "Failed requests", stats.error_response_times())?;
    write_histogram(out, &all)?;

    writeln!(out, "\nResults:")?;
    writeln!(out, "  Total requests: {total}")?;
    if total > 0 {
        let pct = |n: u64| n as f64 / total as f64 * 100.0;
        writeln!(out, "  Successful: {successful} ({:.1}%)", pct(successful))?;
        writeln!(out, "  Failed: {failed} ({:.1}%)", pct(failed))?;
        for (status, count) in stats.failures_by_status() {
            writeln!(out, "    - {}: {count}", status_label(status))?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::request::RequestResult;
    use crate::result::StressError;

    fn finished_stats() -> StressTestStats {
        let mut stats = StressTestStats::new(2);
        stats.start_time = 100.0;
        stats.end_time = 102.0;
        stats.full_harvests = 1;
        stats.add_result(RequestResult::new("http://example.com/1", 200, 0.1));
        stats.add_result(RequestResult::new("http://example.com/2", 200, 0.3));
        stats.add_result(
            RequestResult::new("http://example.com/3", 503, 0.2).with_diagnostics(
                BTreeMap::from([("retry-after".to_string(), "5".to_string())]),
                "try later",
            ),
        );
        stats.add_result(RequestResult::transport_error(
            "http://example.com/4",
            1.5,
            "connection refused",
        ));
        stats
    }

    #[test]
    fn test_report_sections() {
        let report = render_stress_report(&finished_stats(), 4).unwrap();
        assert!(report.contains("Error Details"));
        assert!(report.contains("[Error 1]"));
        assert!(report.contains("URL: http://example.com/3"));
        assert!(report.contains("retry-after: 5"));
        assert!(report.contains("Body: try later"));
        assert!(report.contains("Status: no response"));
        assert!(report.contains("Concurrency: 4"));
        assert!(report.contains("Full harvests: 1"));
        assert!(report.contains("Total duration: 2.00s"));
        assert!(report.contains("Requests/second: 2.0"));
        assert!(report.contains("All requests:"));
        assert!(report.contains("Successful requests:"));
        assert!(report.contains("Failed requests:"));
        assert!(report.contains("P99:"));
        assert!(report.contains("Latency Distribution:"));
        assert!(report.contains("Total requests: 4"));
        assert!(report.contains("Successful: 2 (50.0%)"));
        assert!(report.contains("- 503: 1"));
        assert!(report.contains("- no response: 1"));
    }

    #[test]
    fn test_report_notes_evicted_failures() {
        let mut stats = finished_stats();
        stats.add_result(RequestResult::new("http://example.com/5", 500, 0.1));
        let report = render_stress_report(&stats, 1).unwrap();
        assert!(report.contains("showing the 2 most recent of 3 failures"));
        assert!(!report.contains("URL: http://example.com/3"));
    }

    #[test]
    fn test_report_empty_run() {
        let stats = StressTestStats::default();
        let report = render_stress_report(&stats, 10).unwrap();
        assert!(!report.contains("Error Details"));
        assert!(!report.contains("Requests/second"));
        assert!(!report.contains("Avg:"));
        assert!(!report.contains("Latency Distribution"));
        assert!(report.contains("Total requests: 0"));
        assert!(!report.contains("Successful:"));
    }

    #[test]
    fn test_write_report_to_writer() {
        let mut buf: Vec<u8> = Vec::new();
        write_stress_report(&mut buf, &finished_stats(), 2).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Stress Test Results"));
    }

    #[test]
    fn test_json_summary() {
        let json = render_stress_json(&finished_stats(), 4, &RunOutcome::Completed).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["outcome"]["status"], "completed");
        assert_eq!(value["concurrency"], 4);
        assert_eq!(value["total_requests"], 4);
        assert_eq!(value["failed_requests"], 2);
        assert_eq!(value["failures_by_status"]["503"], 1);
        assert_eq!(value["successful"]["count"], 2);
        assert!((value["duration_secs"].as_f64().unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_json_summary_aborted() {
        let outcome = RunOutcome::Aborted {
            url: "http://example.com/feed".to_string(),
            attempts: 4,
        };
        let json = render_stress_json(&StressTestStats::default(), 1, &outcome).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["outcome"]["status"], "aborted");
        assert_eq!(value["outcome"]["attempts"], 4);
        assert!(value["all"]["p50_ms"].is_null());
    }

    #[test]
    fn test_timing_summary_in_ms() {
        let mut times = ResponseTimeStats::new();
        times.add(0.5);
        let summary = TimingSummary::from_times(&times);
        assert_eq!(summary.count, 1);
        assert_eq!(summary.avg_ms, 500.0);
        assert_eq!(summary.min_ms, Some(500.0));
        assert_eq!(summary.p50_ms, Some(500.0));
    }

    /// Writer whose every write fails, like stdout piped into a closed reader.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"))
        }
    }

    #[test]
    fn test_text_report_write_error_is_returned() {
        let err = write_stress_report(&mut ClosedPipe, &finished_stats(), 1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_json_report_write_error_is_returned() {
        let err = write_stress_json(&mut ClosedPipe, &finished_stats(), 1, &RunOutcome::Completed)
            .unwrap_err();
        assert!(matches!(err, StressError::Json(_) | StressError::Io(_)));
    }

    #[test]
    fn test_write_json_matches_render() {
        let stats = finished_stats();
        let mut buf: Vec<u8> = Vec::new();
        write_stress_json(&mut buf, &stats, 2, &RunOutcome::Interrupted).unwrap();
        let written = String::from_utf8(buf).unwrap();
        let rendered = render_stress_json(&stats, 2, &RunOutcome::Interrupted).unwrap();
        assert_eq!(written.trim_end(), rendered);
    }
}
