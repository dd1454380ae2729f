// src/utils/youtube.rs

//! URLs derived from provider ids.

use std::fmt;

use url::Url;

use crate::error::Result;

const WATCH_BASE: &str = "https://www.youtube.com/watch?v=";
const CHANNEL_BASE: &str = "https://www.youtube.com/channel/";
const THUMBNAIL_BASE: &str = "https://i.ytimg.com/vi/";

/// Thumbnail variants served for every video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThumbnailQuality {
    Default,
    Medium,
    #[default]
    High,
    Standard,
    MaxRes,
}

impl ThumbnailQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThumbnailQuality::Default => "default",
            ThumbnailQuality::Medium => "mqdefault",
            ThumbnailQuality::High => "hqdefault",
            ThumbnailQuality::Standard => "sddefault",
            ThumbnailQuality::MaxRes => "maxresdefault",
        }
    }
}

impl fmt::Display for ThumbnailQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Watch page for a video.
pub fn watch_url(video_id: &str) -> String {
    format!("{WATCH_BASE}{video_id}")
}

/// Public page for a channel.
pub fn channel_url(feed_id: &str) -> String {
    format!("{CHANNEL_BASE}{feed_id}")
}

/// Thumbnail image for a video.
///
/// # Examples
/// ```
/// use tubewatch::utils::youtube::{thumbnail_url, ThumbnailQuality};
///
/// assert_eq!(
///     thumbnail_url("abc", ThumbnailQuality::default()),
///     "https://i.ytimg.com/vi/abc/hqdefault.jpg"
/// );
/// ```
pub fn thumbnail_url(video_id: &str, quality: ThumbnailQuality) -> String {
    format!("{THUMBNAIL_BASE}{video_id}/{quality}.jpg")
}

/// Feed document URL for a channel.
pub fn feed_url(base_url: &str, feed_id: &str) -> Result<String> {
    let mut url = Url::parse(base_url)?;
    url.query_pairs_mut().append_pair("channel_id", feed_id);
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_variants() {
        assert_eq!(
            thumbnail_url("dQw4w9WgXcQ", ThumbnailQuality::High),
            "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
        );
        assert_eq!(
            thumbnail_url("dQw4w9WgXcQ", ThumbnailQuality::MaxRes),
            "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg"
        );
    }

    #[test]
    fn test_feed_url() {
        assert_eq!(
            feed_url("https://www.youtube.com/feeds/videos.xml", "UC123").unwrap(),
            "https://www.youtube.com/feeds/videos.xml?channel_id=UC123"
        );
        assert!(feed_url("not a url", "UC123").is_err());
    }

    #[test]
    fn test_page_urls() {
        assert_eq!(watch_url("abc"), "https://www.youtube.com/watch?v=abc");
        assert_eq!(channel_url("UC1"), "https://www.youtube.com/channel/UC1");
    }
}
