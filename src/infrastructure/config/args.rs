//! Command-line arguments.

use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments; set values override the configuration file.
#[derive(Debug, Parser)]
#[command(
    name = "punytunes-artwork",
    version,
    about = "Fetch, downscale and cache streamer artwork",
    long_about = None
)]
pub struct CliArgs {
    /// Artwork URLs to resolve.
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    /// JSON streamer payload (now playing, play state, queue or presets)
    /// whose artwork should be resolved. May be repeated.
    #[arg(short, long, value_name = "PATH")]
    pub payload: Vec<PathBuf>,

    /// Directory to write resolved artwork into as PNG files.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Maximum concurrent artwork downloads.
    #[arg(long)]
    pub max_concurrent_requests: Option<usize>,

    /// Bound on the larger side of cached images in pixels.
    #[arg(long)]
    pub max_image_dimension: Option<u32>,

    /// Request timeout in seconds.
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Print each resolved image as a `data:` URI instead of its dimensions.
    #[arg(long)]
    pub data_uri: bool,
}
