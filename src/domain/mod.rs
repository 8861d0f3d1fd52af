//! Domain layer with core entities, errors and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{ArtworkImage, EntryState, StreamerPayload};
pub use errors::{ArtworkError, ArtworkResult};
pub use ports::{ArtworkProvider, ArtworkTransport};
