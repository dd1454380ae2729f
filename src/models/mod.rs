// src/models/mod.rs

//! Domain models for the watcher.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod channel;
mod config;
mod digest;
mod feed;
mod video;

// Re-export all public types
pub use channel::{Channel, NewChannel};
pub use config::{
    ChatConfig, Config, DigestConfig, EmailConfig, FeedConfig, HttpConfig, LoggingConfig,
    NotificationConfig, SchedulerConfig, SmtpConfig, StorageConfig, WebhookConfig,
    clean_recipients,
};
pub(crate) use config::default_app_name;
pub use digest::{DigestBucket, DigestItem};
pub use feed::{FeedEntry, normalize_video_id};
pub use video::{DESCRIPTION_MAX_CHARS, NewVideo, Video, truncate_chars};

/// A word whose case-insensitive presence in a title excludes the video.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExcludedWord {
    pub word: String,
}
