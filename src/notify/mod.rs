//! Notification fan-out.
//!
//! The [`Dispatcher`] owns the list of sinks assembled once at startup and
//! tries every configured sink for each announced video. A sink that errors,
//! answers non-2xx, or panics never keeps the remaining sinks from running.

mod chat;
mod email;
pub mod render;
mod webhook;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{Channel, Config, Video};
use crate::utils::http::describe_status;

pub use chat::{ChatPayload, ChatWebhookSink, EMBED_COLOR};
pub use email::{EmailSink, MailMessage, Mailer, SmtpMailer};
pub use webhook::{GenericWebhookSink, WebhookPayload};

/// A notification destination for newly announced videos.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Whether the sink has the settings it needs. Unconfigured sinks are
    /// skipped silently.
    fn is_configured(&self) -> bool;

    /// Deliver one notification.
    async fn send(&self, video: &Video, channel: &Channel) -> Result<()>;
}

/// Per-video summary of a fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: Vec<&'static str>,
    pub failed: Vec<&'static str>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }

    pub fn any_delivered(&self) -> bool {
        !self.delivered.is_empty()
    }
}

/// Fans one video out to every configured sink.
pub struct Dispatcher {
    sinks: Vec<Box<dyn Sink>>,
}

impl Dispatcher {
    pub fn new(sinks: Vec<Box<dyn Sink>>) -> Self {
        Self { sinks }
    }

    /// Assemble the standard sinks from configuration.
    pub fn from_config(
        config: &Config,
        client: reqwest::Client,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Result<Self> {
        let tz = config.notifications.tz()?;
        let sinks: Vec<Box<dyn Sink>> = vec![
            Box::new(EmailSink::new(&config.notifications, mailer, tz)),
            Box::new(ChatWebhookSink::new(client.clone(), &config.notifications)),
            Box::new(GenericWebhookSink::new(client, &config.notifications, tz)),
        ];
        Ok(Self::new(sinks))
    }

    /// Names of the sinks that will be attempted.
    pub fn configured_sinks(&self) -> Vec<&'static str> {
        self.sinks
            .iter()
            .filter(|s| s.is_configured())
            .map(|s| s.name())
            .collect()
    }

    /// Attempt every configured sink for `video`. Never fails.
    pub async fn dispatch(&self, video: &Video, channel: &Channel) -> DispatchReport {
        let mut report = DispatchReport::default();

        for sink in &self.sinks {
            if !sink.is_configured() {
                log::debug!("Sink {} not configured, skipping", sink.name());
                continue;
            }

            let result = AssertUnwindSafe(sink.send(video, channel))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(AppError::sink(sink.name(), "panicked")));

            match result {
                Ok(()) => {
                    log::debug!(
                        "Sink {} delivered {}",
                        sink.name(),
                        video.external_video_id
                    );
                    report.delivered.push(sink.name());
                }
                Err(e) => {
                    log::error!(
                        "Sink {} failed for video {}: {}",
                        sink.name(),
                        video.external_video_id,
                        e
                    );
                    report.failed.push(sink.name());
                }
            }
        }

        report
    }
}

/// POST a JSON body and treat any non-2xx answer as a sink failure.
pub(crate) async fn post_json<T: Serialize + ?Sized>(
    client: &reqwest::Client,
    sink: &'static str,
    url: &str,
    payload: &T,
) -> Result<()> {
    let response = client
        .post(url)
        .json(payload)
        .send()
        .await
        .map_err(|e| AppError::sink(sink, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::sink(sink, describe_status(status)));
    }
    Ok(())
}
