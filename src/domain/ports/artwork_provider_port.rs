//! Port definition for artwork consumers.

use async_trait::async_trait;

use crate::domain::entities::ArtworkImage;
use crate::domain::errors::ArtworkResult;

/// Read side of the artwork cache as seen by rendering code.
/// Implementations must be thread-safe.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtworkProvider: Send + Sync {
    /// Returns true if complete artwork for `url` is resident.
    fn has(&self, url: &str) -> bool;

    /// Returns resident artwork without triggering a fetch.
    fn get(&self, url: &str) -> Option<ArtworkImage>;

    /// Returns artwork for `url`, fetching and scaling it on a miss.
    async fn fetch(&self, url: &str) -> ArtworkResult<ArtworkImage>;

    /// Returns the aggregate size in bytes of resident artwork.
    fn calculated_size(&self) -> usize;
}
