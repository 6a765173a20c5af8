//! Outbound HTTP plumbing shared by the providers and the image fetcher.
//!
//! Every call goes through one `reqwest::Client` built with a request
//! timeout, and through [`send_with_retry`], which retries a transient
//! failure (connect error, timeout, 429, 5xx) a bounded number of times.

use crate::{Error, Result};
use reqwest::StatusCode;
use std::time::Duration;

/// Cap on how much of an error body is kept in logs and errors.
const ERROR_BODY_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: crate::config::DEFAULT_MAX_RETRIES,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }
}

/// Build the shared client with a per-request timeout.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("leafguard/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(Error::Transport)
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || matches!(status.as_u16(), 500 | 502 | 503 | 504)
}

fn is_transient_error(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect()
}

/// Truncate a response body on a char boundary for logging.
pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}

/// Send a request, retrying transient failures per `policy`.
///
/// `build` is called once per attempt because a `RequestBuilder` is
/// consumed by `send`. Returns the successful response; a final
/// non-success status becomes [`Error::Api`] carrying the (truncated) body.
pub async fn send_with_retry<F>(tag: &str, policy: &RetryPolicy, build: F) -> Result<reqwest::Response>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt: u32 = 0;
    loop {
        let retries_left = attempt < policy.max_retries;
        match build().send().await {
            Ok(resp) if resp.status().is_success() => return Ok(resp),
            Ok(resp) => {
                let status = resp.status();
                if retries_left && is_transient_status(status) {
                    log::warn!("[{}] {}, retrying (attempt {})", tag, status, attempt + 2);
                } else {
                    let body = resp.text().await.unwrap_or_default();
                    let body = truncate_body(&body);
                    log::error!("[{}] Service returned {}: {}", tag, status, body);
                    return Err(Error::Api { status, body });
                }
            }
            Err(e) => {
                if retries_left && is_transient_error(&e) {
                    log::warn!("[{}] {}, retrying (attempt {})", tag, e, attempt + 2);
                } else {
                    log::error!("[{}] HTTP request failed: {}", tag, e);
                    return Err(e.into());
                }
            }
        }
        attempt += 1;
        if !policy.backoff.is_zero() {
            tokio::time::sleep(policy.backoff).await;
        }
    }
}

/// Read a successful response as JSON. A body that is not JSON is the
/// service misbehaving, not the transport, so it maps to `MalformedOutput`.
pub async fn read_json(tag: &str, resp: reqwest::Response) -> Result<serde_json::Value> {
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        log::error!("[{}] Response is not JSON: {}", tag, e);
        Error::MalformedOutput(format!(
            "response is not JSON ({}): {}",
            e,
            truncate_body(&body)
        ))
    })
}
