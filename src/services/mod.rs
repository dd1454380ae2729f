//! Service layer for the watcher.
//!
//! - Feed fetching and parsing (`FeedSource`, `YoutubeFeedClient`)
//! - Title exclusion (`ExclusionFilter`)

mod exclusion;
mod feed;

pub use exclusion::ExclusionFilter;
pub use feed::{FeedSource, YoutubeFeedClient, parse_feed};
