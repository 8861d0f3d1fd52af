//! HTTP transport for artwork downloads.

use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use crate::domain::errors::{ArtworkError, ArtworkResult};
use crate::domain::ports::{ArtworkTransport, RequestOptions, TransportResponse};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("punytunes-artwork/", env!("CARGO_PKG_VERSION"));

/// [`ArtworkTransport`] backed by a shared `reqwest` client.
///
/// Non-2xx responses are returned with their status; the cache decides what
/// counts as failure.
#[derive(Debug, Clone)]
pub struct HttpArtworkTransport {
    client: reqwest::Client,
}

impl HttpArtworkTransport {
    /// Creates a transport with the given default timeout.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(timeout: Duration) -> ArtworkResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ArtworkError::transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

}

#[async_trait]
impl ArtworkTransport for HttpArtworkTransport {
    async fn get(&self, url: &str, options: &RequestOptions) -> ArtworkResult<TransportResponse> {
        let mut request = self.client.get(url);
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }
        request = request.header(reqwest::header::ACCEPT, "image/*");

        let response = request
            .send()
            .await
            .map_err(|e| ArtworkError::transport(format!("Request failed: {e}")))?;

        let status = response.status().as_u16();
        let data = response
            .bytes()
            .await
            .map_err(|e| ArtworkError::transport(format!("Failed to read body: {e}")))?;

        trace!(url = %url, status, len = data.len(), "Artwork response received");

        Ok(TransportResponse { data, status })
    }
}
