//! Chat webhook sink (rich embed).

use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::Serialize;

use crate::error::Result;
use crate::models::{Channel, NotificationConfig, Video, truncate_chars};
use crate::notify::{Sink, post_json};
use crate::utils::youtube::ThumbnailQuality;

/// Fixed brand color of every embed.
pub const EMBED_COLOR: u32 = 16711880;

/// Embed descriptions longer than this are rejected by chat providers.
const EMBED_DESCRIPTION_MAX_CHARS: usize = 4096;

/// Request body for the chat webhook.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatPayload {
    pub content: String,
    pub embeds: Vec<Embed>,
    pub avatar_url: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub url: String,
    pub color: u32,
    pub timestamp: String,
    pub thumbnail: EmbedImage,
    pub footer: EmbedFooter,
    pub author: EmbedAuthor,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EmbedAuthor {
    pub name: String,
    pub url: String,
}

/// Posts an embed per video to a chat webhook.
pub struct ChatWebhookSink {
    client: reqwest::Client,
    webhook_url: Option<String>,
    app_name: String,
    avatar_url: String,
    username: String,
}

impl ChatWebhookSink {
    pub fn new(client: reqwest::Client, config: &NotificationConfig) -> Self {
        let username = config
            .chat
            .username
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| config.app_name.clone());

        Self {
            client,
            webhook_url: config.chat.url().map(String::from),
            app_name: config.app_name.clone(),
            avatar_url: config.chat.avatar_url.clone(),
            username,
        }
    }

    /// Build the request body for one video.
    pub fn payload(&self, video: &Video, channel: &Channel) -> ChatPayload {
        let description = video
            .description
            .as_deref()
            .map(|d| truncate_chars(d, EMBED_DESCRIPTION_MAX_CHARS))
            .unwrap_or_default();

        ChatPayload {
            content: format!("**{}** just uploaded a new video!", channel.display_name),
            embeds: vec![Embed {
                title: video.title.clone(),
                description,
                url: video.watch_url(),
                color: EMBED_COLOR,
                timestamp: video
                    .published_at
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
                thumbnail: EmbedImage {
                    url: video.thumbnail_url(ThumbnailQuality::MaxRes),
                },
                footer: EmbedFooter {
                    text: self.app_name.clone(),
                },
                author: EmbedAuthor {
                    name: channel.display_name.clone(),
                    url: channel.url(),
                },
            }],
            avatar_url: self.avatar_url.clone(),
            username: self.username.clone(),
        }
    }
}

#[async_trait]
impl Sink for ChatWebhookSink {
    fn name(&self) -> &'static str {
        "chat-webhook"
    }

    fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    async fn send(&self, video: &Video, channel: &Channel) -> Result<()> {
        let Some(url) = self.webhook_url.as_deref() else {
            return Ok(());
        };
        let payload = self.payload(video, channel);
        post_json(&self.client, self.name(), url, &payload).await
    }
}
