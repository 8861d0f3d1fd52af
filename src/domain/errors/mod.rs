//! Domain error types.

mod artwork_error;

pub use artwork_error::{ArtworkError, ArtworkResult};
