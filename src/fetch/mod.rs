//! Upstream text fetching with retry and an overall deadline.
//!
//! Everything above this module treats fetching as opaque: hand over a URL,
//! get the body back or a typed [`FetchError`]. Retrying transient failures
//! is this module's job, not the caches'.

mod errors;

pub use errors::FetchError;

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

use crate::utils::fmt_duration;

/// Capability to fetch a URL as text.
#[async_trait]
pub trait FetchText: Send + Sync + 'static {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// `reqwest`-backed fetcher.
///
/// Transient failures are retried every `retry_delay` until `timeout` elapses
/// for the call as a whole; a call that runs past `timeout` is a
/// [`FetchError::Timeout`], never a hang.
pub struct HttpFetcher {
    http: reqwest::Client,
    timeout: Duration,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, retry_delay: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("wowdex/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout)
            .build()?;
        Ok(Self::with_client(http, timeout, retry_delay))
    }

    pub(crate) fn with_client(
        http: reqwest::Client,
        timeout: Duration,
        retry_delay: Duration,
    ) -> Self {
        Self {
            http,
            timeout,
            retry_delay,
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(url, &e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        resp.text().await.map_err(|e| network_error(url, &e))
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt: u32 = 1;
        loop {
            match self.fetch_once(url).await {
                Ok(body) => {
                    trace!(url, attempt, bytes = body.len(), "fetched");
                    return Ok(body);
                }
                Err(e) if e.is_transient() => {
                    debug!(url, attempt, error = %e, "transient fetch failure, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl FetchText for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let start = Instant::now();
        match tokio::time::timeout(self.timeout, self.fetch_with_retry(url)).await {
            Ok(result) => {
                if let Err(ref e) = result {
                    warn!(url, error = %e, "fetch failed");
                } else {
                    debug!(url, duration = fmt_duration(start.elapsed()), "fetch completed");
                }
                result
            }
            Err(_) => {
                warn!(url, timeout = fmt_duration(self.timeout), "fetch timed out");
                Err(FetchError::Timeout {
                    url: url.to_owned(),
                    after: self.timeout,
                })
            }
        }
    }
}

fn network_error(url: &str, err: &reqwest::Error) -> FetchError {
    FetchError::Network {
        url: url.to_owned(),
        message: err.to_string(),
    }
}
