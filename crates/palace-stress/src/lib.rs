//! palace-stress: concurrent stress testing for paginated OPDS 2 feeds.
//!
//! Drives `concurrency` independent pagination walks against one feed,
//! following `next` links, retrying failures in place, and aggregating
//! latencies into bounded-memory streaming statistics.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   GET    ┌───────────────┐  RequestResult  ┌─────────────────┐
//! │ run_stress_  │────────► │ FeedTransport │───────────────► │ StressTestStats │
//! │ test (loop)  │ ◄────────│ (reqwest/fake)│                 │  ResponseTime-  │
//! └──────────────┘ next URL └───────────────┘                 │  Stats (HDR)    │
//!                                                              └────────┬────────┘
//!                                                                       ▼
//!                                                               report (text/JSON)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use palace_stress::{
//!     run_stress_test, render_stress_report, NoProgress, ReqwestTransport, StressTestConfig,
//!     StressTestStats, DEFAULT_REQUEST_TIMEOUT,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> palace_stress::StressResult<()> {
//! let config = StressTestConfig::new("https://example.org/opds2").with_concurrency(4);
//! let transport = ReqwestTransport::new(DEFAULT_REQUEST_TIMEOUT, 8)?;
//! let mut stats = StressTestStats::default();
//! let outcome = run_stress_test(
//!     &transport,
//!     &config,
//!     &mut stats,
//!     &NoProgress,
//!     &CancellationToken::new(),
//! )
//! .await?;
//! println!("{outcome}\n{}", render_stress_report(&stats, config.concurrency)?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

pub mod engine;
pub mod pagination;
pub mod report;
pub mod request;
mod result;
pub mod stats;
pub mod timing;
pub mod transport;

pub use engine::{
    run_stress_test, NoProgress, ProgressObserver, RunOutcome, StressTestConfig,
    DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES,
};
pub use pagination::{get_next_url, next_page_url};
pub use report::{
    render_stress_json, render_stress_report, write_stress_json, write_stress_report, StressSummary,
    TimingSummary,
};
pub use request::{RequestResult, MAX_BODY_CHARS, NO_STATUS};
pub use result::{StressError, StressResult};
pub use stats::{StressTestStats, DEFAULT_MAX_RECENT_FAILURES};
pub use timing::{HistogramBucket, ResponseTimeStats, SIGNIFICANT_FIGURES};
pub use transport::{
    default_headers, BasicCredentials, FeedResponse, FeedTransport, ReqwestTransport,
    RequestHeaders, DEFAULT_REQUEST_TIMEOUT,
};
