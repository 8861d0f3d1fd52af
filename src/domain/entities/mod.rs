//! Domain entity definitions.

mod artwork;
mod payloads;

pub use artwork::{ARTWORK_MIME_TYPE, ArtworkImage, EntryState, entry_size};
pub use payloads::{
    MessageParams, NowPlaying, NowPlayingDisplay, PayloadDocument, PlayState, PlayStateMetadata,
    PresetItem, Presets, QueueItem, QueueItemMetadata, QueueList, StreamerMessage, StreamerPayload,
    collect_art_urls,
};
