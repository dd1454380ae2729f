// src/models/channel.rs

//! Watched channel data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::youtube;

/// A watched channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    /// Internal identifier
    pub id: u64,

    /// Opaque provider feed id, unique across all channels
    pub external_feed_id: String,

    /// Human-readable channel name
    pub display_name: String,

    /// Last successful non-empty ingestion; `None` until the first one
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,

    /// Set while the channel is muted
    #[serde(default)]
    pub muted_at: Option<DateTime<Utc>>,

    /// Free text kept for operators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Channel {
    /// Whether notifications for this channel are suppressed.
    pub fn is_muted(&self) -> bool {
        self.muted_at.is_some()
    }

    /// Whether the next non-empty ingestion seeds the catalog silently.
    pub fn is_first_encounter(&self) -> bool {
        self.last_checked_at.is_none()
    }

    /// Canonical public URL of the channel.
    pub fn url(&self) -> String {
        youtube::channel_url(&self.external_feed_id)
    }
}

/// Fields needed to register a new channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChannel {
    pub external_feed_id: String,
    pub display_name: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewChannel {
    pub fn new(external_feed_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            external_feed_id: external_feed_id.into(),
            display_name: display_name.into(),
            note: None,
        }
    }
}
