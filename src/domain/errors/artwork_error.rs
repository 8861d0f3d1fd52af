//! Artwork retrieval error types.

use thiserror::Error;

/// Result type for artwork operations.
pub type ArtworkResult<T> = std::result::Result<T, ArtworkError>;

/// Errors raised while fetching, scaling or caching artwork.
///
/// The type is `Clone` because a single population outcome is delivered to
/// every caller waiting on the same URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum ArtworkError {
    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("failed to decode artwork: {message}")]
    Decode { message: String },

    #[error("failed to encode artwork: {message}")]
    Encode { message: String },

    #[error("invalid artwork request: {message}")]
    InvalidInput { message: String },

    #[error("artwork request cancelled")]
    Cancelled,

    #[error("internal artwork error: {message}")]
    Internal { message: String },
}

impl ArtworkError {
    /// Creates transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates encode error.
    #[must_use]
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    /// Creates invalid input error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns whether the failure came from the transport or the pool.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

}
