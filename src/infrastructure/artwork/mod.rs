//! Artwork retrieval infrastructure.
//!
//! This module provides:
//! - A FIFO-fair request pool bounding concurrent downloads
//! - A size-bounded LRU cache with deduplicated population
//! - Image downscaling to a fixed PNG encoding
//! - An HTTP transport adapter

pub mod cache;
pub mod http_transport;
pub mod request_pool;
pub mod scaler;

pub use cache::{ArtworkCache, CacheConfig, CacheStats, StalenessPolicy};
pub use http_transport::HttpArtworkTransport;
pub use request_pool::{PendingRequest, PoolConfig, RequestPool};
pub use scaler::{scale_artwork, scale_artwork_blocking};
