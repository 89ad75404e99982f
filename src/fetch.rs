//! HTTP fetching behind a small trait, with politeness pacing.
//!
//! The module uses a trait-based design so every stage shares one pacing
//! implementation and tests can substitute a scripted fetcher:
//! - [`Fetch`]: core trait, one request in, one [`FetchResponse`] out
//! - [`HttpFetcher`]: `reqwest` implementation
//! - [`Paced`]: decorator that spaces requests at least `delay` apart
//!
//! # Status handling
//!
//! A non-2xx response is returned as a normal [`FetchResponse`]; callers
//! decide whether it is an error artifact. Only transport failures (timeout,
//! DNS, connection reset) surface as [`FetchError`].

use crate::error::FetchError;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, instrument, warn};
use url::Url;

/// HTTP method of a request. Roundup listings only answer POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A completed HTTP exchange, successful or not.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    /// Final URL after redirects.
    pub url: String,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for fetching one page.
pub trait Fetch {
    /// Perform a single request.
    ///
    /// # Returns
    ///
    /// The response whatever its status, or a [`FetchError`] if no response
    /// was received.
    async fn fetch(&self, method: Method, url: &str) -> Result<FetchResponse, FetchError>;
}

/// [`Fetch`] implementation over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build the client once; `user_agent` is sent with every request.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, method: Method, url: &str) -> Result<FetchResponse, FetchError> {
        let parsed = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let request = match method {
            Method::Get => self.client.get(parsed),
            Method::Post => self.client.post(parsed),
        };

        let t0 = std::time::Instant::now();
        let response = request.send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        // Headers arrived, so a failure here is the body being cut off.
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(format!("reading body from {final_url}: {e}")))?;
        debug!(
            status,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        if !(200..300).contains(&status) {
            warn!(status, url = %final_url, "Non-success response");
        }

        Ok(FetchResponse {
            status,
            url: final_url,
            body,
        })
    }
}

/// Decorator that keeps at least `delay` between the end of one request and
/// the start of the next.
///
/// Skipped items never reach the fetcher, so they cost no delay. The wait is
/// taken before a request rather than after it, which makes the pacing
/// identical across stages without each one sleeping on its own.
pub struct Paced<T> {
    inner: T,
    delay: Duration,
    last_done: Mutex<Option<Instant>>,
}

impl<T> Paced<T> {
    pub fn new(inner: T, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            last_done: Mutex::new(None),
        }
    }

    fn next_slot(&self) -> Option<Instant> {
        let last = self.last_done.lock().unwrap_or_else(|e| e.into_inner());
        last.map(|t| t + self.delay)
    }

    fn mark_done(&self) {
        let mut last = self.last_done.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some(Instant::now());
    }
}

impl<T> fmt::Debug for Paced<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paced").field("delay", &self.delay).finish()
    }
}

impl<T: Fetch> Fetch for Paced<T> {
    async fn fetch(&self, method: Method, url: &str) -> Result<FetchResponse, FetchError> {
        if let Some(slot) = self.next_slot() {
            if slot > Instant::now() {
                debug!(delay = ?self.delay, "Pacing before next request");
                sleep_until(slot).await;
            }
        }
        let result = self.inner.fetch(method, url).await;
        self.mark_done();
        result
    }
}
