//! Artwork resolution use case.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::debug;

use crate::domain::entities::{ArtworkImage, StreamerPayload, collect_art_urls};
use crate::domain::ports::ArtworkProvider;

/// Outcome for a single artwork URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtwork {
    /// The requested URL.
    pub url: String,
    /// The artwork, or `None` when a placeholder should be shown.
    pub artwork: Option<ArtworkImage>,
}

impl ResolvedArtwork {
    /// Returns true if artwork is available.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.artwork.is_some()
    }
}

/// Resolves artwork for rendering, turning failures into placeholders.
pub struct ResolveArtworkUseCase {
    provider: Arc<dyn ArtworkProvider>,
}

impl ResolveArtworkUseCase {
    /// Creates new use case.
    #[must_use]
    pub const fn new(provider: Arc<dyn ArtworkProvider>) -> Self {
        Self { provider }
    }

    /// Resolves every URL concurrently, preserving input order.
    ///
    /// A failed URL yields `artwork: None` and never affects the others.
    pub async fn execute(&self, urls: &[String]) -> Vec<ResolvedArtwork> {
        let lookups = urls.iter().map(|url| async move {
            let artwork = match self.provider.fetch(url).await {
                Ok(image) => Some(image),
                Err(e) => {
                    debug!(url = %url, error = %e, "No artwork available");
                    None
                }
            };
            ResolvedArtwork {
                url: url.clone(),
                artwork,
            }
        });

        join_all(lookups).await
    }

    /// Resolves every artwork URL referenced by `payloads`.
    pub async fn execute_for_payloads(&self, payloads: &[StreamerPayload]) -> Vec<ResolvedArtwork> {
        let urls = collect_art_urls(payloads);
        debug!(count = urls.len(), "Resolving artwork referenced by payloads");
        self.execute(&urls).await
    }
}
