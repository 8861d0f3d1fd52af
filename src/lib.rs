//! PunyTunes artwork - bounded, deduplicating artwork retrieval.
//!
//! This crate fetches album and station artwork referenced by streamer
//! payloads, downscales it, and keeps it in a size-bounded LRU cache. Fetches
//! go through a FIFO-fair request pool and concurrent misses for the same URL
//! share one download.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing use cases.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "punytunes-artwork";
