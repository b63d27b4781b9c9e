//! The fetch capability consumed by HTTP-backed sources.
//!
//! A [`Transport`] receives a [`FetchRequest`] and a completion callback and
//! returns a [`FetchHandle`] immediately. The callback may run later (from
//! the host's event loop) or before `fetch` returns (blocking transports);
//! callers must cope with both.
//!
//! # Failure Modes
//!
//! - Non-2xx statuses, network failures and timeouts are delivered as
//!   [`FetchOutcome::Failure`]; `fetch` itself never fails.
//! - A transport may keep running a request after [`FetchHandle::abort`];
//!   its late completion is discarded by the caller.

use std::fmt;
use std::time::Duration;

/// One GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub timeout: Option<Duration>,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: None,
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A successful response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

impl FetchResponse {
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            headers: Vec::new(),
        }
    }
}

/// A failed request. `status` is `0` when no response was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub status: u16,
    pub status_text: String,
}

impl FetchFailure {
    #[must_use]
    pub fn new(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
        }
    }
}

/// Result of a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(FetchResponse),
    Failure(FetchFailure),
}

/// Completion callback handed to [`Transport::fetch`].
pub type FetchCallback = Box<dyn FnOnce(FetchOutcome)>;

/// Opaque cancellation handle for an issued request.
#[must_use]
pub struct FetchHandle {
    abort: Option<Box<dyn FnOnce()>>,
}

impl FetchHandle {
    /// Handle whose `abort` runs `abort`.
    pub fn new(abort: impl FnOnce() + 'static) -> Self {
        Self {
            abort: Some(Box::new(abort)),
        }
    }

    /// Handle for a request that cannot be aborted (or already finished).
    pub fn detached() -> Self {
        Self { abort: None }
    }

    /// Ask the transport to stop the request.
    pub fn abort(mut self) {
        if let Some(abort) = self.abort.take() {
            abort();
        }
    }
}

impl fmt::Debug for FetchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchHandle")
            .field("abortable", &self.abort.is_some())
            .finish()
    }
}

/// The HTTP client seam.
pub trait Transport {
    fn fetch(&self, request: FetchRequest, on_complete: FetchCallback) -> FetchHandle;
}

#[cfg(feature = "http-client")]
mod blocking {
    use super::{FetchCallback, FetchFailure, FetchHandle, FetchOutcome, FetchRequest, FetchResponse, Transport};

    /// [`Transport`] backed by `reqwest::blocking`.
    ///
    /// Each request completes before `fetch` returns, on the calling thread.
    #[derive(Debug, Clone, Default)]
    pub struct BlockingTransport {
        client: reqwest::blocking::Client,
    }

    impl BlockingTransport {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub fn with_client(client: reqwest::blocking::Client) -> Self {
            Self { client }
        }

        fn execute(&self, request: &FetchRequest) -> FetchOutcome {
            let mut builder = self.client.get(&request.url);
            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            let response = match builder.send() {
                Ok(response) => response,
                Err(err) => {
                    let status = err.status().map_or(0, |s| s.as_u16());
                    return FetchOutcome::Failure(FetchFailure::new(status, err.to_string()));
                }
            };
            let status = response.status();
            if !status.is_success() {
                return FetchOutcome::Failure(FetchFailure::new(
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("request failed"),
                ));
            }
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_owned(), v.to_owned()))
                })
                .collect();
            match response.text() {
                Ok(body) => FetchOutcome::Success(FetchResponse {
                    status: status.as_u16(),
                    body,
                    headers,
                }),
                Err(err) => FetchOutcome::Failure(FetchFailure::new(status.as_u16(), err.to_string())),
            }
        }
    }

    impl Transport for BlockingTransport {
        fn fetch(&self, request: FetchRequest, on_complete: FetchCallback) -> FetchHandle {
            tracing::debug!(url = %request.url, "blocking fetch");
            let outcome = self.execute(&request);
            on_complete(outcome);
            FetchHandle::detached()
        }
    }
}

#[cfg(feature = "http-client")]
pub use blocking::BlockingTransport;
