//! Infrastructure layer with external service adapters.

/// Artwork retrieval (pool, cache, scaling, HTTP).
pub mod artwork;
/// Application configuration.
pub mod config;

pub use artwork::{
    ArtworkCache, CacheConfig, CacheStats, HttpArtworkTransport, PoolConfig, RequestPool,
    StalenessPolicy, scale_artwork,
};
pub use config::{AppConfig, ArtworkConfig, CliArgs, ConfigError, LogLevel, StorageManager};
