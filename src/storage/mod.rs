//! Storage abstractions for channels, videos and excluded words.
//!
//! The store is the only shared mutable resource. Its uniqueness rules are
//! what keep overlapping runs from recording or announcing a video twice:
//!
//! - `external_feed_id` is unique across channels
//! - `external_video_id` is unique across **all** videos, not per channel
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! └── store.json    # channels, videos and excluded words
//! ```

pub mod local;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Channel, ExcludedWord, NewChannel, NewVideo, Video};

// Re-export for convenience
pub use local::LocalStore;

/// Result of a single video insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The row was created
    Inserted(Video),
    /// A video with the same external id already exists
    Duplicate,
}

/// Trait for store backends.
#[async_trait]
pub trait Store: Send + Sync {
    /// All channels in store order.
    async fn list_channels(&self) -> Result<Vec<Channel>>;

    async fn get_channel(&self, id: u64) -> Result<Option<Channel>>;

    /// Register a channel. Fails if the feed id is already registered.
    async fn add_channel(&self, channel: NewChannel) -> Result<Channel>;

    /// Remove a channel and its videos. Returns false if it did not exist.
    async fn remove_channel(&self, id: u64) -> Result<bool>;

    /// Mute or unmute a channel.
    async fn set_muted(&self, id: u64, muted: bool, at: DateTime<Utc>) -> Result<()>;

    /// Record a completed non-empty ingestion cycle.
    async fn touch_last_checked(&self, id: u64, at: DateTime<Utc>) -> Result<()>;

    /// External ids of the videos recorded for a channel.
    async fn existing_video_ids(&self, channel_id: u64) -> Result<HashSet<String>>;

    /// Insert many videos at once, skipping any whose external id is taken.
    async fn insert_videos(
        &self,
        channel_id: u64,
        videos: Vec<NewVideo>,
        created_at: DateTime<Utc>,
    ) -> Result<Vec<Video>>;

    /// Insert one video.
    async fn insert_video(
        &self,
        channel_id: u64,
        video: NewVideo,
        created_at: DateTime<Utc>,
    ) -> Result<InsertOutcome>;

    /// Record that a notification went out for a video.
    async fn mark_notified(&self, video_id: u64, at: DateTime<Utc>) -> Result<()>;

    async fn excluded_words(&self) -> Result<Vec<ExcludedWord>>;

    /// Add a word. Returns false if it already exists, ignoring case.
    async fn add_excluded_word(&self, word: &str) -> Result<bool>;

    /// Remove a word, ignoring case. Returns false if it was not present.
    async fn remove_excluded_word(&self, word: &str) -> Result<bool>;

    /// Notified videos created in `[start, end)`, oldest first, each with its
    /// owning channel.
    async fn notified_videos_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<(Video, Channel)>>;

    async fn video_count(&self) -> Result<usize>;
}
