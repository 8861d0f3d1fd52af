mod artwork_provider_port;
mod transport_port;

pub use artwork_provider_port::ArtworkProvider;
pub use transport_port::{ArtworkTransport, RequestOptions, TransportResponse};

#[cfg(test)]
pub use artwork_provider_port::MockArtworkProvider;
#[cfg(test)]
pub use transport_port::MockArtworkTransport;

/// Hand-written test doubles.
#[cfg(test)]
pub mod mock {
    pub use super::transport_port::mock::FakeTransport;
}
