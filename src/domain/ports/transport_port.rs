//! Port definition for the artwork transport capability.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::errors::ArtworkResult;

/// Per-request transport options. Bodies are always delivered as raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Per-request timeout, overriding the transport default.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// Options for fetching image bytes with the transport's default timeout.
    #[must_use]
    pub const fn binary() -> Self {
        Self { timeout: None }
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Raw response returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// Response body.
    pub data: Bytes,
    /// HTTP status code.
    pub status: u16,
}

impl TransportResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(data: impl Into<Bytes>, status: u16) -> Self {
        Self {
            data: data.into(),
            status,
        }
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Port for performing a single artwork GET.
///
/// Implementations own retry and authentication policy; callers never retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtworkTransport: Send + Sync {
    /// Fetches `url`, returning the body and status or a transport error.
    async fn get(&self, url: &str, options: &RequestOptions) -> ArtworkResult<TransportResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_statuses() {
        assert!(TransportResponse::new(Bytes::new(), 200).is_success());
        assert!(TransportResponse::new(Bytes::new(), 204).is_success());
        assert!(!TransportResponse::new(Bytes::new(), 304).is_success());
        assert!(!TransportResponse::new(Bytes::new(), 404).is_success());
    }

    #[test]
    fn test_binary_options() {
        let options = RequestOptions::binary().with_timeout(Duration::from_secs(5));
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use tokio::time::Instant;

    /// In-memory transport that records calls and their overlap.
    pub struct FakeTransport {
        body: Bytes,
        delay: Duration,
        delays: Mutex<HashMap<String, Duration>>,
        responses: Mutex<HashMap<String, ArtworkResult<TransportResponse>>>,
        starts: Mutex<Vec<(String, Instant)>>,
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeTransport {
        /// Creates a transport answering every URL with `body` and status 200.
        pub fn new(body: impl Into<Bytes>) -> Self {
            Self {
                body: body.into(),
                delay: Duration::ZERO,
                delays: Mutex::new(HashMap::new()),
                responses: Mutex::new(HashMap::new()),
                starts: Mutex::new(Vec::new()),
                current: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }

        /// Sets the latency of every call.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Overrides the latency for one URL.
        pub fn delay_for(&self, url: &str, delay: Duration) {
            self.delays.lock().insert(url.to_string(), delay);
        }

        /// Overrides the result for one URL.
        pub fn respond(&self, url: &str, result: ArtworkResult<TransportResponse>) {
            self.responses.lock().insert(url.to_string(), result);
        }

        /// URLs requested so far, in call order.
        pub fn calls(&self) -> Vec<String> {
            self.starts.lock().iter().map(|(url, _)| url.clone()).collect()
        }

        /// Number of calls made for `url`.
        pub fn calls_for(&self, url: &str) -> usize {
            self.starts.lock().iter().filter(|(u, _)| u == url).count()
        }

        /// Call start times.
        pub fn starts(&self) -> Vec<(String, Instant)> {
            self.starts.lock().clone()
        }

        /// Highest number of overlapping calls observed.
        pub fn peak_concurrency(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ArtworkTransport for FakeTransport {
        async fn get(
            &self,
            url: &str,
            _options: &RequestOptions,
        ) -> ArtworkResult<TransportResponse> {
            self.starts.lock().push((url.to_string(), Instant::now()));
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = self.delays.lock().get(url).copied().unwrap_or(self.delay);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            self.current.fetch_sub(1, Ordering::SeqCst);
            self.responses
                .lock()
                .get(url)
                .cloned()
                .unwrap_or_else(|| Ok(TransportResponse::new(self.body.clone(), 200)))
        }
    }
}
