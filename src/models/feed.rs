// src/models/feed.rs

//! Feed entry as returned by a feed source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of a channel feed.
///
/// Fields are optional because feeds are untrusted; incomplete entries are
/// dropped during ingestion rather than failing the fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedEntry {
    /// Provider-prefixed id, e.g. `yt:video:dQw4w9WgXcQ`
    pub id: Option<String>,
    pub title: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

impl FeedEntry {
    /// Video id with any provider prefix stripped.
    pub fn video_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .map(normalize_video_id)
            .filter(|id| !id.is_empty())
    }

    /// Trimmed, non-empty title.
    pub fn title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Strip a provider prefix such as `yt:video:` from an entry id.
pub fn normalize_video_id(raw: &str) -> &str {
    raw.trim().rsplit(':').next().unwrap_or_default().trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_video_id() {
        assert_eq!(normalize_video_id("yt:video:dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(normalize_video_id("dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(normalize_video_id(" yt:video:abc "), "abc");
        assert_eq!(normalize_video_id("yt:video:"), "");
    }

    #[test]
    fn test_missing_fields() {
        let entry = FeedEntry {
            id: Some("yt:video:".into()),
            title: Some("   ".into()),
            ..Default::default()
        };
        assert!(entry.video_id().is_none());
        assert!(entry.title().is_none());
    }
}
