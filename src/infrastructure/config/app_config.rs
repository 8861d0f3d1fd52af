//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::infrastructure::artwork::cache::{
    CacheConfig, DEFAULT_MAX_AGGREGATE_BYTES, DEFAULT_MAX_ENTRIES, StalenessPolicy,
};
use crate::infrastructure::artwork::http_transport::DEFAULT_TIMEOUT_SECS;
use crate::infrastructure::artwork::request_pool::{DEFAULT_MAX_CONCURRENT_REQUESTS, PoolConfig};
use crate::infrastructure::artwork::scaler::DEFAULT_MAX_DIMENSION;

pub(crate) const APP_NAME: &str = "punytunes";
pub(crate) const APP_QUALIFIER: &str = "com";
pub(crate) const APP_ORGANIZATION: &str = "punytunes";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Artwork pipeline configuration.
    #[serde(default)]
    pub artwork: ArtworkConfig,
}

/// Artwork pipeline configuration. Fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtworkConfig {
    /// Maximum concurrent artwork downloads.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Maximum number of cached images.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Maximum aggregate size of cached images in bytes.
    #[serde(default = "default_max_aggregate_bytes")]
    pub max_aggregate_bytes: usize,

    /// Bound on the larger side of cached images in pixels.
    #[serde(default = "default_max_image_dimension")]
    pub max_image_dimension: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Upper bound of the random delay before each download, in milliseconds.
    /// Zero disables it.
    #[serde(default)]
    pub max_jitter_ms: u64,

    /// Age in seconds after which cached images are refetched.
    /// Unset keeps images until evicted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_secs: Option<u64>,
}

impl ArtworkConfig {
    /// Returns the request pool configuration.
    #[must_use]
    pub const fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            capacity: self.max_concurrent_requests,
            max_jitter: Duration::from_millis(self.max_jitter_ms),
        }
    }

    /// Returns the cache configuration.
    #[must_use]
    pub fn cache_config(&self) -> CacheConfig {
        let staleness = self
            .max_age_secs
            .map_or(StalenessPolicy::AllowStale, |secs| StalenessPolicy::Expire {
                max_age: Duration::from_secs(secs),
            });

        CacheConfig {
            max_entries: self.max_entries,
            max_aggregate_bytes: self.max_aggregate_bytes,
            max_image_dimension: self.max_image_dimension,
            staleness,
            request_timeout: Some(self.request_timeout()),
        }
    }

    /// Returns the default request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent_requests(),
            max_entries: default_max_entries(),
            max_aggregate_bytes: default_max_aggregate_bytes(),
            max_image_dimension: default_max_image_dimension(),
            request_timeout_secs: default_request_timeout_secs(),
            max_jitter_ms: 0,
            max_age_secs: None,
        }
    }
}

fn default_max_concurrent_requests() -> usize {
    DEFAULT_MAX_CONCURRENT_REQUESTS
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

fn default_max_aggregate_bytes() -> usize {
    DEFAULT_MAX_AGGREGATE_BYTES
}

fn default_max_image_dimension() -> u32 {
    DEFAULT_MAX_DIMENSION
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

use super::args::CliArgs;

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(max_concurrent_requests) = args.max_concurrent_requests {
            self.artwork.max_concurrent_requests = max_concurrent_requests;
        }
        if let Some(max_image_dimension) = args.max_image_dimension {
            self.artwork.max_image_dimension = max_image_dimension;
        }
        if let Some(timeout) = args.request_timeout_secs {
            self.artwork.request_timeout_secs = timeout;
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("punytunes-artwork.log"))
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            log_level: LogLevel::Info,
            artwork: ArtworkConfig::default(),
        }
    }
}
