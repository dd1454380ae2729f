//! Generic webhook sink (flat JSON).

use async_trait::async_trait;
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::Result;
use crate::models::{Channel, NotificationConfig, Video};
use crate::notify::{Sink, post_json};
use crate::utils::time::{HUMAN_FORMAT, SQL_FORMAT, format_in};
use crate::utils::youtube::ThumbnailQuality;

/// Request body for the generic webhook.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WebhookPayload {
    pub title: String,
    pub video_url: String,
    pub thumbnail: String,
    pub published_at: String,
    pub published_at_formatted: String,
    pub channel: WebhookChannel,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WebhookChannel {
    pub label: String,
    pub url: String,
}

/// Posts a flat JSON document per video to an arbitrary URL.
pub struct GenericWebhookSink {
    client: reqwest::Client,
    url: Option<String>,
    tz: Tz,
}

impl GenericWebhookSink {
    pub fn new(client: reqwest::Client, config: &NotificationConfig, tz: Tz) -> Self {
        Self {
            client,
            url: config.webhook.url().map(String::from),
            tz,
        }
    }

    pub fn payload(&self, video: &Video, channel: &Channel) -> WebhookPayload {
        WebhookPayload {
            title: video.title.clone(),
            video_url: video.watch_url(),
            thumbnail: video.thumbnail_url(ThumbnailQuality::High),
            published_at: format_in(&video.published_at, &self.tz, SQL_FORMAT),
            published_at_formatted: format_in(&video.published_at, &self.tz, HUMAN_FORMAT),
            channel: WebhookChannel {
                label: channel.display_name.clone(),
                url: channel.url(),
            },
        }
    }
}

#[async_trait]
impl Sink for GenericWebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    async fn send(&self, video: &Video, channel: &Channel) -> Result<()> {
        let Some(url) = self.url.as_deref() else {
            return Ok(());
        };
        let payload = self.payload(video, channel);
        post_json(&self.client, self.name(), url, &payload).await
    }
}
