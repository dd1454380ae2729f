//! Plain-text mail bodies.

use std::fmt::Write;

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::models::{Channel, DigestBucket, Video};
use crate::utils::time::{HUMAN_FORMAT, format_in};
use crate::utils::youtube::ThumbnailQuality;

const DAY_FORMAT: &str = "%A, %d %b %Y";
const SHORT_DAY_FORMAT: &str = "%d %b %Y";

pub fn video_subject(video: &Video, channel: &Channel) -> String {
    format!("New video from {}: {}", channel.display_name, video.title)
}

pub fn video_body(video: &Video, channel: &Channel, tz: &Tz, app_name: &str) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "{} just uploaded a new video.", channel.display_name);
    let _ = writeln!(body);
    let _ = writeln!(body, "{}", video.title);
    let _ = writeln!(body, "Watch: {}", video.watch_url());
    let _ = writeln!(
        body,
        "Published: {}",
        format_in(&video.published_at, tz, HUMAN_FORMAT)
    );
    let _ = writeln!(body);
    let _ = writeln!(body, "-- {}", app_name);
    body
}

pub fn digest_subject(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "Weekly digest: {} - {}",
        start.format(SHORT_DAY_FORMAT),
        end.format(SHORT_DAY_FORMAT)
    )
}

/// One section per non-empty day, in the order given.
pub fn digest_body(buckets: &[DigestBucket], tz: &Tz, app_name: &str) -> String {
    let total: usize = buckets.iter().map(|b| b.items.len()).sum();
    let mut body = String::new();
    let _ = writeln!(body, "{} new videos were announced last week.", total);

    for bucket in buckets {
        let _ = writeln!(body);
        let _ = writeln!(body, "== {} ==", bucket.date.format(DAY_FORMAT));
        for item in &bucket.items {
            let video = &item.video;
            let _ = writeln!(body);
            let _ = writeln!(body, "* {}", video.title);
            let _ = writeln!(
                body,
                "  Channel: {} ({})",
                item.channel.display_name,
                item.channel.url()
            );
            let _ = writeln!(body, "  Watch: {}", video.watch_url());
            let _ = writeln!(
                body,
                "  Thumbnail: {}",
                video.thumbnail_url(ThumbnailQuality::High)
            );
            let _ = writeln!(
                body,
                "  Published: {}",
                format_in(&video.published_at, tz, HUMAN_FORMAT)
            );
        }
    }

    let _ = writeln!(body);
    let _ = writeln!(body, "-- {}", app_name);
    body
}
