//! Use case implementations.

mod resolve_artwork_use_case;

pub use resolve_artwork_use_case::{ResolveArtworkUseCase, ResolvedArtwork};
