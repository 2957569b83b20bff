//! Per-run aggregation of request outcomes.

use crate::request::RequestResult;
use crate::timing::ResponseTimeStats;
use std::collections::{BTreeMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

/// Default number of failed results kept for diagnostics.
pub const DEFAULT_MAX_RECENT_FAILURES: usize = 50;

/// Seconds since the Unix epoch.
pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}

/// Aggregated statistics for one stress run.
///
/// Mutated only by the coordinating loop, so no interior locking.
#[derive(Debug, Clone)]
pub struct StressTestStats {
    success_times: ResponseTimeStats,
    error_times: ResponseTimeStats,
    failures_by_status: BTreeMap<u16, u64>,
    recent_failures: VecDeque<RequestResult>,
    max_recent_failures: usize,
    /// Run start (Unix seconds)
    pub start_time: f64,
    /// Run end (Unix seconds)
    pub end_time: f64,
    /// Streams that followed `next` links to the last page
    pub full_harvests: u64,
}

impl Default for StressTestStats {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECENT_FAILURES)
    }
}

impl StressTestStats {
    /// Create stats that retain at most `max_recent_failures` failed results.
    pub fn new(max_recent_failures: usize) -> Self {
        Self {
            success_times: ResponseTimeStats::new(),
            error_times: ResponseTimeStats::new(),
            failures_by_status: BTreeMap::new(),
            recent_failures: VecDeque::with_capacity(max_recent_failures.min(1024)),
            max_recent_failures,
            start_time: 0.0,
            end_time: 0.0,
            full_harvests: 0,
        }
    }

    /// Record one completed request.
    pub fn add_result(&mut self, result: RequestResult) {
        if result.success {
            self.success_times.add(result.response_time);
            return;
        }

        self.error_times.add(result.response_time);
        *self.failures_by_status.entry(result.status_code).or_insert(0) += 1;

        if self.max_recent_failures == 0 {
            return;
        }
        if self.recent_failures.len() == self.max_recent_failures {
            self.recent_failures.pop_front();
        }
        self.recent_failures.push_back(result);
    }

    /// All completed requests.
    pub fn total_requests(&self) -> u64 {
        self.successful_requests() + self.failed_requests()
    }

    /// Requests that returned 200.
    pub fn successful_requests(&self) -> u64 {
        self.success_times.count()
    }

    /// Requests that did not return 200.
    pub fn failed_requests(&self) -> u64 {
        self.error_times.count()
    }

    /// Response times of successful requests.
    pub fn success_response_times(&self) -> &ResponseTimeStats {
        &self.success_times
    }

    /// Response times of failed requests.
    pub fn error_response_times(&self) -> &ResponseTimeStats {
        &self.error_times
    }

    /// Response times of every request.
    pub fn all_response_times(&self) -> ResponseTimeStats {
        self.success_times.merged(&self.error_times)
    }

    /// All-time failure counts keyed by status.
    pub fn failures_by_status(&self) -> BTreeMap<u16, u64> {
        self.failures_by_status.clone()
    }

    /// Most recent failures, oldest first.
    pub fn failed_results(&self) -> Vec<&RequestResult> {
        self.recent_failures.iter().collect()
    }

    /// Capacity of the recent-failure ring.
    pub fn max_recent_failures(&self) -> usize {
        self.max_recent_failures
    }

    /// `end_time - start_time`. Meaningless until both are set.
    pub fn total_duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Seconds since `start_time`, frozen once the run has finished.
    pub fn elapsed_secs(&self) -> f64 {
        if self.start_time <= 0.0 {
            return 0.0;
        }
        if self.end_time >= self.start_time {
            self.total_duration()
        } else {
            (now_secs() - self.start_time).max(0.0)
        }
    }

    /// Throughput over the whole run, `0.0` for empty or zero-length runs.
    pub fn requests_per_second(&self) -> f64 {
        let duration = self.total_duration();
        if duration > 0.0 {
            self.total_requests() as f64 / duration
        } else {
            0.0
        }
    }

    /// Stamp the start of a run.
    pub fn mark_started(&mut self) {
        self.start_time = now_secs();
        self.end_time = 0.0;
    }

    /// Stamp the end of a run.
    pub fn mark_finished(&mut self) {
        self.end_time = now_secs();
    }
}
