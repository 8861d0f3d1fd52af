//! Domain types for artwork images and cache entries.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;

/// MIME type of every encoded [`ArtworkImage`].
pub const ARTWORK_MIME_TYPE: &str = "image/png";

/// A downscaled, re-encoded artwork image ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkImage {
    bytes: Bytes,
    width: u32,
    height: u32,
}

impl ArtworkImage {
    /// Creates an image from already-encoded PNG bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>, width: u32, height: u32) -> Self {
        Self {
            bytes: bytes.into(),
            width,
            height,
        }
    }

    /// Returns the encoded bytes.
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Returns the width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Returns the encoded length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Renders the image as a `data:` URI for embedding in UI markup.
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{ARTWORK_MIME_TYPE};base64,{}",
            STANDARD.encode(&self.bytes)
        )
    }
}

/// Lifecycle state of an artwork URL as seen by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// A population for the URL is in flight; no value is visible yet.
    Populating,
    /// A complete value is resident and servable.
    Fresh,
    /// A value is resident but older than the configured maximum age.
    Stale,
}

impl std::fmt::Display for EntryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Populating => write!(f, "populating"),
            Self::Fresh => write!(f, "fresh"),
            Self::Stale => write!(f, "stale"),
        }
    }
}

/// Returns the number of bytes an entry accounts for in the cache.
#[must_use]
pub fn entry_size(url: &str, image: &ArtworkImage) -> usize {
    url.len() + image.len()
}
