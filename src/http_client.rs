//! HTTP fetch collaborator.
//!
//! The resolver only needs [`Fetcher`]: one logical response per call,
//! bounded by a timeout. [`HttpFetcher`] is the `reqwest` implementation;
//! tests plug in an in-memory one.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use tracing::{debug, instrument};

use crate::config::EngineConfig;
use crate::error::FetchError;

/// Status and text body of one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Anything that can fetch a URL as text.
///
/// Redirects and retries are the implementor's business; the caller sees at
/// most one response per call.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError>;
}

/// `reqwest`-backed fetcher with browser-like default headers.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &EngineConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/vnd.apple.mpegurl,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            // Playlists for one page usually live on one CDN host
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.fetch_timeout())
            .redirect(reqwest::redirect::Policy::limited(10))
            .cookie_store(true)
            .build()?;

        Ok(Self { client })
    }

    /// Fetch a page's markup. Non-2xx is an error here, unlike playlist
    /// fetches, because there is nothing to degrade to.
    pub async fn fetch_page(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let response = self.fetch(url, timeout).await?;
        if !response.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }
        Ok(response.body)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError> {
        let network = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    timeout,
                }
            } else {
                FetchError::Network {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        };

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(network)?;
        let status = response.status().as_u16();
        debug!(status, version = ?response.version(), "Response received");

        let body = response.text().await.map_err(network)?;
        Ok(FetchResponse { status, body })
    }
}
