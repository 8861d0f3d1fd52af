//! Streamer state payloads that reference artwork.
//!
//! Only the fields needed to locate artwork are modelled and unknown fields
//! are ignored. A [`StreamerPayload`] is the `data` object of a device
//! message; [`PayloadDocument`] also accepts the whole message with its
//! `path`/`type`/`params` envelope.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Now-playing display block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NowPlayingDisplay {
    /// First display line (usually the title).
    pub line1: Option<String>,
    /// Second display line (usually the artist).
    pub line2: Option<String>,
    /// Artwork URL for the current item.
    pub art_url: Option<String>,
}

/// Now-playing state of a zone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NowPlaying {
    /// Transport state, e.g. `play`.
    pub state: Option<String>,
    /// Display block.
    pub display: NowPlayingDisplay,
}

/// Metadata of the track currently in the play state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayStateMetadata {
    /// Track title.
    pub title: Option<String>,
    /// Track artist.
    pub artist: Option<String>,
    /// Album name.
    pub album: Option<String>,
    /// Radio station name.
    pub station: Option<String>,
    /// Artwork URL.
    pub art_url: Option<String>,
}

/// Play state of a zone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayState {
    /// Transport state.
    pub state: Option<String>,
    /// Current track metadata.
    pub metadata: PlayStateMetadata,
}

/// Metadata of a queue entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueItemMetadata {
    /// Track title.
    pub title: Option<String>,
    /// Track artist.
    pub artist: Option<String>,
    /// Album name.
    pub album: Option<String>,
    /// Artwork URL.
    pub art_url: Option<String>,
}

/// A single queue entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueItem {
    /// Queue item id.
    pub id: Option<i32>,
    /// Position in the queue.
    pub position: Option<i32>,
    /// Item metadata.
    pub metadata: Option<QueueItemMetadata>,
}

/// A page of the play queue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueList {
    /// Index of the first item in this page.
    pub start: Option<i32>,
    /// Total items in the queue.
    pub total: Option<i32>,
    /// Items in this page.
    pub items: Vec<QueueItem>,
}

/// A stored preset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresetItem {
    /// Preset slot.
    pub id: Option<i32>,
    /// Preset name.
    pub name: Option<String>,
    /// Artwork URL (station logo).
    pub art_url: Option<String>,
}

/// The preset list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Presets {
    /// Maximum number of presets supported by the device.
    pub max_presets: Option<i32>,
    /// Preset entries.
    pub presets: Vec<PresetItem>,
}

/// Any streamer payload that may carry artwork URLs.
///
/// Variants are told apart by their one required field (`items`, `presets`,
/// `metadata`, `display`), tried in that order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamerPayload {
    /// Queue page.
    Queue(QueueList),
    /// Preset list.
    Presets(Presets),
    /// Play state.
    PlayState(PlayState),
    /// Now-playing state.
    NowPlaying(NowPlaying),
}

impl StreamerPayload {
    /// Returns every artwork URL referenced by the payload, in document order.
    #[must_use]
    pub fn art_urls(&self) -> Vec<&str> {
        match self {
            Self::Queue(queue) => queue
                .items
                .iter()
                .filter_map(|item| item.metadata.as_ref()?.art_url.as_deref())
                .collect(),
            Self::Presets(presets) => presets
                .presets
                .iter()
                .filter_map(|preset| preset.art_url.as_deref())
                .collect(),
            Self::PlayState(play_state) => play_state
                .metadata
                .art_url
                .as_deref()
                .into_iter()
                .collect(),
            Self::NowPlaying(now_playing) => now_playing
                .display
                .art_url
                .as_deref()
                .into_iter()
                .collect(),
        }
    }
}

/// `params` of a device message. `zone` is absent for system-wide paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageParams {
    /// Zone the update belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    /// The payload itself.
    pub data: StreamerPayload,
}

/// A full device update message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamerMessage {
    /// Path the update was published on, e.g. `/zone/play_state`.
    pub path: String,
    /// Message type, e.g. `update` or `response`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Device result code.
    #[serde(default)]
    pub result: Option<i32>,
    /// Device status message.
    #[serde(default)]
    pub message: Option<String>,
    /// Zone and payload.
    pub params: MessageParams,
}

/// Either a complete device message or a bare payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadDocument {
    /// Enveloped message.
    Message(StreamerMessage),
    /// Bare `data` object.
    Payload(StreamerPayload),
}

impl PayloadDocument {
    /// Returns the payload, unwrapping the envelope if present.
    #[must_use]
    pub fn into_payload(self) -> StreamerPayload {
        match self {
            Self::Message(message) => message.params.data,
            Self::Payload(payload) => payload,
        }
    }
}

/// Collects unique, non-empty artwork URLs across payloads in first-seen order.
#[must_use]
pub fn collect_art_urls<'a>(payloads: impl IntoIterator<Item = &'a StreamerPayload>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for payload in payloads {
        for url in payload.art_urls() {
            let url = url.trim();
            if !url.is_empty() && seen.insert(url.to_string()) {
                urls.push(url.to_string());
            }
        }
    }

    urls
}
