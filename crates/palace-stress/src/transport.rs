//! HTTP transport seam.
//!
//! The engine only needs "GET this URL with these headers and tell me what
//! came back". [`ReqwestTransport`] does that over the network; tests plug
//! in an in-memory implementation.

use crate::result::{StressError, StressResult};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// User agent sent with every request.
pub const USER_AGENT: &str = "Palace";

/// Accept header preferring OPDS 2.
pub const ACCEPT: &str = "application/opds+json, application/json;q=0.9, */*;q=0.1";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Ordered request headers.
pub type RequestHeaders = Vec<(String, String)>;

/// HTTP Basic credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// Username
    pub username: String,
    /// Password
    pub password: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl BasicCredentials {
    /// Create credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Credentials only when both parts are present and non-empty.
    pub fn from_parts(username: Option<&str>, password: Option<&str>) -> Option<Self> {
        match (username, password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some(Self::new(u, p)),
            _ => None,
        }
    }

    /// `Authorization` header value.
    pub fn header_value(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

/// Headers sent with every stress-test request.
pub fn default_headers(credentials: Option<&BasicCredentials>) -> RequestHeaders {
    let mut headers = vec![
        ("User-Agent".to_string(), USER_AGENT.to_string()),
        ("Accept".to_string(), ACCEPT.to_string()),
    ];
    if let Some(credentials) = credentials {
        headers.push(("Authorization".to_string(), credentials.header_value()));
    }
    headers
}

/// A fully received HTTP response.
#[derive(Debug, Clone)]
pub struct FeedResponse {
    /// Final URL after redirects
    pub url: String,
    /// HTTP status
    pub status: u16,
    /// Response headers (lower-cased names, repeated values comma-joined)
    pub headers: BTreeMap<String, String>,
    /// Response body as text
    pub body: String,
    /// Time from send to last body byte
    pub elapsed: Duration,
}

/// Minimal HTTP capability the engine depends on.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Issue a GET and read the whole body.
    ///
    /// Any HTTP status is `Ok`; `Err` means no response was received.
    async fn get(&self, url: &str, headers: &RequestHeaders) -> StressResult<FeedResponse>;
}

/// [`FeedTransport`] over a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client with the given request timeout, keeping up to
    /// `pool_size` idle connections per host for reuse.
    ///
    /// reqwest has no cap on open connections; concurrency is bounded by the
    /// engine's in-flight limit instead. Only the request itself has a
    /// timeout, never pool checkout.
    pub fn new(timeout: Duration, pool_size: usize) -> StressResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(pool_size.max(1))
            .build()
            .map_err(|e| StressError::HttpClient {
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedTransport for ReqwestTransport {
    async fn get(&self, url: &str, headers: &RequestHeaders) -> StressResult<FeedResponse> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let start = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| StressError::transport(url, e.to_string()))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let mut response_headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            response_headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }

        let body = response
            .text()
            .await
            .map_err(|e| StressError::transport(url, e.to_string()))?;

        Ok(FeedResponse {
            url: final_url,
            status,
            headers: response_headers,
            body,
            elapsed: start.elapsed(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_header() {
        let creds = BasicCredentials::new("user", "pass");
        assert_eq!(creds.header_value(), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_credentials_require_both_parts() {
        assert!(BasicCredentials::from_parts(Some("u"), Some("p")).is_some());
        assert!(BasicCredentials::from_parts(Some("u"), None).is_none());
        assert!(BasicCredentials::from_parts(None, Some("p")).is_none());
        assert!(BasicCredentials::from_parts(Some(""), Some("p")).is_none());
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = BasicCredentials::new("user", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("user"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_default_headers() {
        let headers = default_headers(None);
        assert_eq!(headers.len(), 2);
        assert!(headers.contains(&("User-Agent".to_string(), "Palace".to_string())));
        assert!(headers.iter().any(|(k, v)| k == "Accept" && v.starts_with("application/opds+json")));

        let creds = BasicCredentials::new("user", "pass");
        let headers = default_headers(Some(&creds));
        assert!(headers.contains(&("Authorization".to_string(), "Basic dXNlcjpwYXNz".to_string())));
    }

    #[test]
    fn test_transport_builds() {
        assert!(ReqwestTransport::new(DEFAULT_REQUEST_TIMEOUT, 20).is_ok());
    }
}
