//! Self-pacing load generator for paginated OPDS 2 feeds.
//!
//! The root URL is queued once per stream. A single coordinating loop keeps
//! up to `concurrency` requests in flight, handles whichever finishes first,
//! and queues at most one follow-up per completion: the `next` page on
//! success, the same URL on failure. Stats are only touched from that loop.
//!
//! A URL failing more than `max_retries` times in a row stops the whole run.
//! Cancellation drops every in-flight request. Whatever way the run ends,
//! `end_time` is stamped exactly once when the run guard drops.

use crate::pagination::next_page_url;
use crate::request::RequestResult;
use crate::result::{StressError, StressResult};
use crate::stats::StressTestStats;
use crate::transport::{default_headers, BasicCredentials, FeedTransport, RequestHeaders};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::ops::{Deref, DerefMut};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default number of parallel streams.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default consecutive failures tolerated per URL.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Stress run configuration.
#[derive(Debug, Clone)]
pub struct StressTestConfig {
    /// Root feed URL every stream starts from
    pub url: String,
    /// Number of independent pagination walks
    pub concurrency: usize,
    /// Consecutive failures allowed per URL before the run aborts
    pub max_retries: u32,
    /// Basic auth, if any
    pub credentials: Option<BasicCredentials>,
    /// Restart a stream from the root URL after a full harvest
    pub continuous: bool,
}

impl StressTestConfig {
    /// Create a config with default concurrency and retry ceiling.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            concurrency: DEFAULT_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            credentials: None,
            continuous: false,
        }
    }

    /// Set the number of streams
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the retry ceiling
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set basic auth credentials
    #[must_use]
    pub fn with_credentials(mut self, credentials: Option<BasicCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Enable or disable stream restarts
    #[must_use]
    pub fn with_continuous(mut self, continuous: bool) -> Self {
        self.continuous = continuous;
        self
    }

    /// Reject configurations the engine cannot run.
    pub fn validate(&self) -> StressResult<()> {
        if self.url.trim().is_empty() {
            return Err(StressError::invalid_config("url must not be empty"));
        }
        if self.concurrency == 0 {
            return Err(StressError::invalid_config(
                "concurrency must be at least 1",
            ));
        }
        Ok(())
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every stream reached its last page
    Completed,
    /// Stopped by the cancellation token
    Interrupted,
    /// A URL failed more than `max_retries` times in a row
    Aborted {
        /// URL that kept failing
        url: String,
        /// Consecutive failures observed
        attempts: u32,
    },
}

impl RunOutcome {
    /// Whether the run hit the retry ceiling.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::Aborted { url, attempts } => {
                write!(f, "aborted after {attempts} consecutive failures for {url}")
            }
        }
    }
}

/// Live progress hook, called from the coordinating loop.
pub trait ProgressObserver: Send + Sync {
    /// A request completed and was recorded.
    fn on_result(&self, _stats: &StressTestStats) {}

    /// The run ended; `end_time` is already set.
    fn on_finish(&self, _stats: &StressTestStats, _outcome: &RunOutcome) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

/// Stamps `end_time` when dropped, including when the run future is dropped.
struct RunGuard<'a> {
    stats: &'a mut StressTestStats,
}

impl<'a> RunGuard<'a> {
    fn start(stats: &'a mut StressTestStats) -> Self {
        stats.mark_started();
        Self { stats }
    }
}

impl Deref for RunGuard<'_> {
    type Target = StressTestStats;

    fn deref(&self) -> &Self::Target {
        self.stats
    }
}

impl DerefMut for RunGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.stats
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.stats.mark_finished();
    }
}

/// One finished request, ready for the coordinator.
struct Completion {
    requested_url: String,
    result: RequestResult,
    next_url: Option<String>,
}

async fn fetch<T: FeedTransport + ?Sized>(
    transport: &T,
    url: String,
    headers: &RequestHeaders,
) -> Completion {
    let start = Instant::now();
    match transport.get(&url, headers).await {
        Ok(response) => {
            let next_url = if response.status == 200 {
                next_page_url(&response.url, &response.body)
            } else {
                None
            };
            Completion {
                requested_url: url,
                result: RequestResult::from_response(response),
                next_url,
            }
        }
        Err(e) => {
            let result =
                RequestResult::transport_error(&url, start.elapsed().as_secs_f64(), &e.to_string());
            Completion {
                requested_url: url,
                result,
                next_url: None,
            }
        }
    }
}

/// Run a stress test until every stream finishes, the retry ceiling is hit,
/// or `cancel` fires.
///
/// Only an invalid `config` returns `Err`; request failures are recorded in
/// `stats`. `start_time` and `end_time` are always set once the run starts.
pub async fn run_stress_test<T: FeedTransport + ?Sized>(
    transport: &T,
    config: &StressTestConfig,
    stats: &mut StressTestStats,
    progress: &dyn ProgressObserver,
    cancel: &CancellationToken,
) -> StressResult<RunOutcome> {
    config.validate()?;
    info!(
        url = %config.url,
        concurrency = config.concurrency,
        max_retries = config.max_retries,
        continuous = config.continuous,
        "starting stress test"
    );

    let outcome = {
        let mut run = RunGuard::start(stats);
        drive(transport, config, &mut run, progress, cancel).await
    };

    info!(
        outcome = %outcome,
        requests = stats.total_requests(),
        failed = stats.failed_requests(),
        harvests = stats.full_harvests,
        duration_secs = stats.total_duration(),
        "stress test finished"
    );
    progress.on_finish(stats, &outcome);
    Ok(outcome)
}

async fn drive<T: FeedTransport + ?Sized>(
    transport: &T,
    config: &StressTestConfig,
    stats: &mut StressTestStats,
    progress: &dyn ProgressObserver,
    cancel: &CancellationToken,
) -> RunOutcome {
    let headers = default_headers(config.credentials.as_ref());
    let mut queue: VecDeque<String> = std::iter::repeat(config.url.clone())
        .take(config.concurrency)
        .collect();
    let mut in_flight = FuturesUnordered::new();
    let mut retries: HashMap<String, u32> = HashMap::new();

    loop {
        while in_flight.len() < config.concurrency {
            let Some(url) = queue.pop_front() else {
                break;
            };
            in_flight.push(fetch(transport, url, &headers));
        }

        if in_flight.is_empty() {
            return RunOutcome::Completed;
        }

        let completion = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!(in_flight = in_flight.len(), "cancellation requested, dropping in-flight requests");
                return RunOutcome::Interrupted;
            }
            Some(completion) = in_flight.next() => completion,
            else => return RunOutcome::Completed,
        };

        let Completion {
            requested_url,
            result,
            next_url,
        } = completion;
        let success = result.success;
        debug!(
            url = %result.url,
            status = result.status_code,
            elapsed_ms = result.response_time * 1000.0,
            "request completed"
        );
        if !success {
            warn!(url = %result.url, status = result.status_code, "request failed");
        }
        stats.add_result(result);
        progress.on_result(stats);

        if success {
            retries.remove(&requested_url);
            match next_url {
                Some(next) => queue.push_back(next),
                None => {
                    stats.full_harvests += 1;
                    info!(harvests = stats.full_harvests, "stream reached the last page");
                    if config.continuous {
                        queue.push_back(config.url.clone());
                    }
                }
            }
        } else {
            let attempts = retries.entry(requested_url.clone()).or_insert(0);
            *attempts += 1;
            let attempts = *attempts;
            if attempts > config.max_retries {
                error!(
                    url = %requested_url,
                    attempts,
                    "max retries exceeded, stopping stress test"
                );
                return RunOutcome::Aborted {
                    url: requested_url,
                    attempts,
                };
            }
            debug!(url = %requested_url, attempts, "retrying");
            queue.push_back(requested_url);
        }
    }
}
