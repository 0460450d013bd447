//! Blocking HTTP transport used by every provider client.
//!
//! Components talk to `HttpTransport` rather than `reqwest` directly so tests can
//! script responses and count outbound calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use reqwest::blocking::Client;

use crate::domain::RetryPolicy;
use crate::error::FetchError;

/// Request-scoped cancellation flag. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), FetchError> {
        if self.is_cancelled() {
            Err(FetchError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep for `delay`, waking early with `Err(Cancelled)` once the token trips.
    pub fn sleep(&self, delay: Duration) -> Result<(), FetchError> {
        let deadline = Instant::now() + delay;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep((deadline - now).min(CANCEL_POLL));
        }
    }
}

const CANCEL_POLL: Duration = Duration::from_millis(10);

/// Status + body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait HttpTransport: Send + Sync {
    /// Issue a GET. `Err` means no response was obtained; any status is `Ok`.
    fn get(
        &self,
        url: &str,
        query: &[(&'static str, String)],
        cancel: &CancelToken,
    ) -> Result<HttpResponse, FetchError>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    fn get(
        &self,
        url: &str,
        query: &[(&'static str, String)],
        cancel: &CancelToken,
    ) -> Result<HttpResponse, FetchError> {
        (**self).get(url, query, cancel)
    }
}

/// `reqwest` blocking client with a fixed per-request timeout.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(
        &self,
        url: &str,
        query: &[(&'static str, String)],
        cancel: &CancelToken,
    ) -> Result<HttpResponse, FetchError> {
        cancel.check()?;
        tracing::debug!(url, params = query.len(), "request issued");

        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| FetchError::Transport(format!("request to {url} failed: {e}")))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .map_err(|e| {
                FetchError::Transport(format!("reading body from {url} failed: {e}"))
            })?;
        tracing::debug!(url, status, bytes = body.len(), "response received");

        Ok(HttpResponse { status, body })
    }
}

/// Retries transient failures of the inner transport with exponential backoff.
///
/// Transport errors and 502/503/504 are retried. Every other status is returned
/// as-is so callers can apply their own status handling.
pub struct Retrying<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: HttpTransport> Retrying<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<T: HttpTransport> HttpTransport for Retrying<T> {
    fn get(
        &self,
        url: &str,
        query: &[(&'static str, String)],
        cancel: &CancelToken,
    ) -> Result<HttpResponse, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            cancel.check()?;
            let outcome = self.inner.get(url, query, cancel);
            let transient = match &outcome {
                Ok(resp) => FetchError::Status(resp.status).is_transient(),
                Err(err) => err.is_transient(),
            };
            if !transient || attempt >= max_attempts {
                return outcome;
            }

            let delay = self.policy.delay_after(attempt);
            tracing::warn!(
                url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "transient failure, retrying"
            );
            cancel.sleep(delay)?;
            attempt += 1;
        }
    }
}
