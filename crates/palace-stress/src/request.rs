//! Outcome record for a single completed request.

use crate::transport::FeedResponse;
use serde::Serialize;
use std::collections::BTreeMap;

/// Longest diagnostic body kept on a failed result, in characters.
pub const MAX_BODY_CHARS: usize = 500;

/// Appended to a body cut at [`MAX_BODY_CHARS`].
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Status recorded when a request produced no HTTP response at all.
pub const NO_STATUS: u16 = 0;

/// Immutable outcome of one request.
///
/// Headers and body are only kept for failures, so a long successful run
/// holds no per-request payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestResult {
    /// Resolved request URL
    pub url: String,
    /// HTTP status ([`NO_STATUS`] for transport errors)
    pub status_code: u16,
    /// Wall-clock seconds until the response was complete
    pub response_time: f64,
    /// `status_code == 200`
    pub success: bool,
    /// Response headers, failures only
    pub response_headers: Option<BTreeMap<String, String>>,
    /// Truncated response body, failures only
    pub response_body: Option<String>,
}

impl RequestResult {
    /// Result without diagnostics.
    pub fn new(url: impl Into<String>, status_code: u16, response_time: f64) -> Self {
        Self {
            url: url.into(),
            status_code,
            response_time: response_time.max(0.0),
            success: status_code == 200,
            response_headers: None,
            response_body: None,
        }
    }

    /// Attach headers and body. Ignored on success.
    #[must_use]
    pub fn with_diagnostics(
        mut self,
        headers: BTreeMap<String, String>,
        body: impl AsRef<str>,
    ) -> Self {
        if !self.success {
            self.response_headers = Some(headers);
            self.response_body = Some(truncate_body(body.as_ref()));
        }
        self
    }

    /// Build from a received response.
    pub fn from_response(response: FeedResponse) -> Self {
        let FeedResponse {
            url,
            status,
            headers,
            body,
            elapsed,
        } = response;
        Self::new(url, status, elapsed.as_secs_f64()).with_diagnostics(headers, body)
    }

    /// Failure record for a request that never got a response.
    pub fn transport_error(url: impl Into<String>, response_time: f64, message: &str) -> Self {
        Self::new(url, NO_STATUS, response_time).with_diagnostics(BTreeMap::new(), message)
    }
}

/// Cut `body` to [`MAX_BODY_CHARS`] characters, marking the cut.
pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_CHARS) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &body[..cut]),
        None => body.to_string(),
    }
}
