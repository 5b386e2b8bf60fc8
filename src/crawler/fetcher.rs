//! HTTP fetcher implementation
//!
//! This module handles all outbound requests, including:
//! - Building the HTTP client with the crawler's user agent
//! - Per-request timeouts and extra headers
//! - Mapping transport failures and non-success statuses to `HarvestError::Network`
//!
//! A fetch is exactly one attempt. Retry policy belongs to the caller, so the
//! listing loop and the asset downloader can each apply their own.

use crate::config::{HttpConfig, UserAgentConfig};
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::Duration;

/// Per-request options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Upper bound on the whole request
    pub timeout: Duration,

    /// Headers sent in addition to the client's `User-Agent`
    pub headers: Vec<(String, String)>,
}

impl FetchOptions {
    /// Options for listing pages, detail pages and their scripts
    pub fn page(http: &HttpConfig) -> Self {
        Self {
            timeout: http.page_timeout(),
            headers: Vec::new(),
        }
    }

    /// Options for audio assets: longer timeout and browser-like headers
    pub fn asset(http: &HttpConfig, referer: &str) -> Self {
        Self {
            timeout: http.asset_timeout(),
            headers: vec![
                (
                    "Accept".to_string(),
                    "audio/mpeg,audio/*;q=0.9,*/*;q=0.5".to_string(),
                ),
                ("Referer".to_string(), referer.to_string()),
                ("Accept-Encoding".to_string(), "identity".to_string()),
                ("Connection".to_string(), "keep-alive".to_string()),
            ],
        }
    }
}

/// Capability to retrieve a URL
///
/// Injected into the coordinator, detail parser and downloader so each can be
/// exercised against a scripted implementation.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the raw body of `url`
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<Vec<u8>, HarvestError>;

    /// Fetches `url` and decodes the body as UTF-8 (lossy)
    async fn fetch_text(&self, url: &str, options: &FetchOptions) -> Result<String, HarvestError> {
        let body = self.fetch(url, options).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use sb_harvest::config::UserAgentConfig;
/// use sb_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed [`Fetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig) -> Result<Self, HarvestError> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<Vec<u8>, HarvestError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .timeout(options.timeout)
            .headers(header_map(&options.headers))
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Network {
                url: url.to_string(),
                status: Some(status.as_u16()),
                message: format!("HTTP {}", status),
            });
        }

        let body = response.bytes().await.map_err(|e| classify_error(url, e))?;
        tracing::debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }
}

/// Converts `(name, value)` pairs into a header map, skipping invalid entries
fn header_map(headers: &[(String, String)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => tracing::warn!("Skipping invalid header {}: {}", name, value),
        }
    }
    map
}

/// Maps a reqwest error to a network error with a readable message
fn classify_error(url: &str, error: reqwest::Error) -> HarvestError {
    let message = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else {
        error.to_string()
    };

    HarvestError::Network {
        url: url.to_string(),
        status: error.status().map(|s| s.as_u16()),
        message,
    }
}
