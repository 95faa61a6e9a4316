//! HTTP GET with exponential backoff retry logic.
//!
//! Collectors fetch feeds and APIs through this module so that transient
//! failures (timeouts, 5xx, connection resets) do not lose a source for the
//! day.
//!
//! # Architecture
//!
//! - [`FetchAsync`]: core trait for "fetch this URL"
//! - [`HttpGet`]: plain `reqwest` GET implementing [`FetchAsync`]
//! - [`RetryFetch`]: decorator that adds retries to any [`FetchAsync`]
//!
//! # Retry Strategy
//!
//! - 3 attempts in total
//! - Exponential backoff starting at 1 second, capped at 30 seconds
//! - Random jitter (0-250ms) added to each delay

use rand::{Rng, rng};
use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Trait for an async fetch of a single URL.
pub trait FetchAsync {
    /// The type of the fetched body.
    type Response;

    /// Fetch `url`.
    async fn fetch(&self, url: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Adds exponential backoff retries to any [`FetchAsync`] implementation.
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=max_jitter)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    /// Total attempts, including the first one.
    attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
    max_jitter: Duration,
}

impl<T> RetryFetch<T>
where
    T: FetchAsync,
{
    pub fn new(inner: T, attempts: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            base_delay,
            max_delay: Duration::from_secs(30),
            max_jitter: Duration::from_millis(250),
        }
    }

    fn delay_for(&self, failed_attempts: usize) -> Duration {
        let shift = failed_attempts.saturating_sub(1).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=self.max_jitter.as_millis() as u64);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("attempts", &self.attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> FetchAsync for RetryFetch<T>
where
    T: FetchAsync,
{
    type Response = T::Response;

    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.attempts {
                        error!(
                            attempt,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            error = %e,
                            "fetch exhausted retries"
                        );
                        return Err(e);
                    }
                    let delay = self.delay_for(attempt);
                    warn!(attempt, ?delay, error = %e, "fetch failed; backing off");
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Plain GET returning the body bytes; non-2xx statuses are errors.
#[derive(Debug, Clone, Copy)]
pub struct HttpGet<'a> {
    pub client: &'a reqwest::Client,
}

impl FetchAsync for HttpGet<'_> {
    type Response = Vec<u8>;

    async fn fetch(&self, url: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let resp = self.client.get(url).send().await?.error_for_status()?;
        let body = resp.bytes().await?;
        debug!(
            %url,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "GET succeeded"
        );
        Ok(body.to_vec())
    }
}

/// GET `url` with up to 3 attempts and exponential backoff.
pub async fn get_with_backoff(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, Box<dyn Error>> {
    RetryFetch::new(HttpGet { client }, 3, Duration::from_secs(1))
        .fetch(url)
        .await
}
