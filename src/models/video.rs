// src/models/video.rs

//! Recorded video data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::youtube::{self, ThumbnailQuality};

/// Maximum stored description length, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 10_000;

/// A video recorded from a channel feed.
///
/// Rows are never re-derived from later fetches; only `notified_at` is
/// written after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Video {
    /// Internal identifier
    pub id: u64,

    /// Provider video id, unique across all channels
    pub external_video_id: String,

    /// Owning channel
    pub channel_id: u64,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Publish instant reported by the feed
    pub published_at: DateTime<Utc>,

    /// Set once a notification was delivered by at least one sink
    #[serde(default)]
    pub notified_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl Video {
    /// Canonical watch URL.
    pub fn watch_url(&self) -> String {
        youtube::watch_url(&self.external_video_id)
    }

    /// Thumbnail URL at the given quality.
    pub fn thumbnail_url(&self, quality: ThumbnailQuality) -> String {
        youtube::thumbnail_url(&self.external_video_id, quality)
    }
}

/// A candidate video built from a feed entry, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVideo {
    pub external_video_id: String,
    pub title: String,
    pub description: Option<String>,
    pub published_at: DateTime<Utc>,
}

impl NewVideo {
    /// Build a candidate, truncating the description to its stored length.
    pub fn new(
        external_video_id: impl Into<String>,
        title: impl Into<String>,
        description: Option<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            external_video_id: external_video_id.into(),
            title: title.into(),
            description: description.map(|d| truncate_chars(&d, DESCRIPTION_MAX_CHARS)),
            published_at,
        }
    }

    /// Materialize the row as stored.
    pub fn into_video(self, id: u64, channel_id: u64, created_at: DateTime<Utc>) -> Video {
        Video {
            id,
            external_video_id: self.external_video_id,
            channel_id,
            title: self.title,
            description: self.description,
            published_at: self.published_at,
            notified_at: None,
            created_at,
        }
    }
}

/// Keep the leading `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
