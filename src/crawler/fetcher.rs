//! Page fetcher implementation
//!
//! This module turns URLs into rendered HTML for the rest of the crawler:
//! - The `Renderer` seam, so the backend can be plain HTTP or a headless browser
//! - An HTTP renderer holding one lazily created session
//! - Bounded retries with exponential backoff and a per-attempt timeout

use crate::config::FetcherConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

/// Default user agent when the configuration does not set one
pub const DEFAULT_USER_AGENT: &str = concat!("letter-harvester/", env!("CARGO_PKG_VERSION"));

/// Errors from a single fetch attempt
///
/// Every variant is treated as transient by `PageFetcher`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Render error for {url}: {message}")]
    Render { url: String, message: String },

    #[error("Failed to start rendering session: {0}")]
    Session(String),
}

/// Turns a URL into rendered page markup
///
/// Implementations own their session: it is created lazily on the first
/// `render` call and released by `shutdown`. A renderer is shared by all
/// concurrent fetches of a run, so `render` must be safe to call in parallel.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;

    /// Releases the underlying session
    async fn shutdown(&self) {}
}

/// Builds an HTTP client with proper configuration
pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Renderer backed by plain HTTP GET requests
///
/// The reqwest client is the session: it keeps the connection pool and is
/// built on first use. Each `render` is one transient request over it.
pub struct HttpRenderer {
    user_agent: String,
    session: Mutex<Option<Client>>,
}

impl HttpRenderer {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            session: Mutex::new(None),
        }
    }

    /// Returns the live session, creating it if needed
    async fn session(&self) -> Result<Client, FetchError> {
        let mut session = self.session.lock().await;

        if let Some(client) = session.as_ref() {
            return Ok(client.clone());
        }

        tracing::info!("Initializing HTTP session");
        let client = build_http_client(&self.user_agent)
            .map_err(|e| FetchError::Session(e.to_string()))?;
        *session = Some(client.clone());
        Ok(client)
    }

    /// Whether a session is currently open
    pub async fn is_open(&self) -> bool {
        self.session.lock().await.is_some()
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let client = self.session().await?;

        tracing::debug!("Navigating to URL: {}", url);
        let response = client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(url, e))
    }

    async fn shutdown(&self) {
        if self.session.lock().await.take().is_some() {
            tracing::info!("HTTP session closed");
        }
    }
}

fn classify_reqwest_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

/// How many times to try a URL and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Wait after the given failed attempt (1-based)
    ///
    /// Doubles from `initial_backoff` and is clamped to `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
            .max(self.initial_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(10),
        }
    }
}

/// Fetches rendered HTML with retries
///
/// One fetcher (and therefore one renderer session) is shared by the
/// listing and detail stages of a run.
pub struct PageFetcher {
    renderer: Arc<dyn Renderer>,
    policy: RetryPolicy,
    navigation_timeout: Duration,
}

impl PageFetcher {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        policy: RetryPolicy,
        navigation_timeout: Duration,
    ) -> Self {
        Self {
            renderer,
            policy,
            navigation_timeout,
        }
    }

    /// Builds a fetcher from the `[fetcher]` config section
    pub fn from_config(renderer: Arc<dyn Renderer>, config: &FetcherConfig) -> Self {
        let policy = RetryPolicy {
            max_attempts: config.max_attempts,
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
        };
        Self::new(renderer, policy, config.navigation_timeout())
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches a URL, retrying any failure
    ///
    /// Each attempt is bounded by the navigation timeout. After the last
    /// attempt fails its error is returned; callers treat that as "item
    /// currently unavailable".
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 1;

        loop {
            let result = match tokio::time::timeout(
                self.navigation_timeout,
                self.renderer.render(url, self.navigation_timeout),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout {
                    url: url.to_string(),
                }),
            };

            match result {
                Ok(html) => {
                    tracing::debug!("Successfully fetched HTML content from {}", url);
                    return Ok(html);
                }
                Err(e) if attempt < self.policy.max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(
                        "Attempt {}/{} failed: {}; retrying in {:?}",
                        attempt,
                        self.policy.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        "Giving up on {} after {} attempts: {}",
                        url,
                        attempt,
                        e
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Releases the renderer's session
    pub async fn shutdown(&self) {
        self.renderer.shutdown().await;
    }
}
