//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the sync, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - Retrying transport failures with exponential backoff
//! - Classifying outcomes into success, HTTP error and network error

use crate::config::CrawlerConfig;
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::{debug, warn};

/// Longest response-body excerpt kept for error logs
const ERROR_BODY_EXCERPT: usize = 200;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// The server answered with a success status
    Success {
        /// HTTP status code
        status_code: u16,
        /// Response headers
        headers: HeaderMap,
        /// Response body
        body: String,
    },

    /// The server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
        /// Truncated response body
        body: String,
    },

    /// Every attempt failed at the transport level (connect, timeout, body read)
    NetworkError {
        /// Description of the last failure
        error: String,
    },
}

/// Exponential backoff for transport failures
///
/// The delay before retry `n` (0-indexed) is `initial_delay * multiplier^n`,
/// capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts including the first
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
            multiplier: 2.0,
        }
    }

    /// Calculate delay for a given retry (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(base.min(self.max_delay.as_secs_f64()))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    let timeout = config.timeout();

    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Sends a request, retrying transport failures according to `policy`
///
/// `build` is called once per attempt because a `RequestBuilder` is consumed
/// by sending it. Non-success statuses are returned immediately without retry.
///
/// # Arguments
///
/// * `policy` - Attempt count and backoff
/// * `url` - The URL being fetched, for logging
/// * `build` - Produces a fresh request for each attempt
pub async fn fetch_with_retry<F>(policy: &RetryPolicy, url: &str, build: F) -> FetchResult
where
    F: Fn() -> RequestBuilder,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 0..max_attempts {
        if attempt > 0 {
            let delay = policy.delay_for_attempt(attempt - 1);
            warn!(
                "Retrying {} in {:?} (attempt {}/{}): {}",
                url,
                delay,
                attempt + 1,
                max_attempts,
                last_error
            );
            tokio::time::sleep(delay).await;
        }

        let response = match build().send().await {
            Ok(response) => response,
            Err(e) => {
                last_error = classify_error(&e);
                continue;
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        debug!("GET {} -> {}", url, status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return FetchResult::HttpError {
                status_code: status.as_u16(),
                body: truncate(&body, ERROR_BODY_EXCERPT),
            };
        }

        match response.text().await {
            Ok(body) => {
                return FetchResult::Success {
                    status_code: status.as_u16(),
                    headers,
                    body,
                }
            }
            Err(e) => last_error = classify_error(&e),
        }
    }

    FetchResult::NetworkError { error: last_error }
}

/// Plain GET with retry, used for sitemaps and storefront pages
pub async fn fetch_url(client: &Client, policy: &RetryPolicy, url: &str) -> FetchResult {
    fetch_with_retry(policy, url, || client.get(url)).await
}

fn classify_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("Request timeout: {}", e)
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else if e.is_body() || e.is_decode() {
        format!("Body read failed: {}", e)
    } else {
        e.to_string()
    }
}

/// Cuts `text` to at most `max` characters
pub(crate) fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
