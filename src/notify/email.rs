//! Mail delivery and the per-video email sink.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono_tz::Tz;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::error::{AppError, Result};
use crate::models::{Channel, NotificationConfig, SmtpConfig, Video, clean_recipients};
use crate::notify::{Sink, render};

/// A plain-text message to a set of recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Outgoing mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<()>;
}

/// SMTP mailer.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a mailer; port 465 uses implicit TLS, anything else STARTTLS.
    pub fn new(config: &SmtpConfig, timeout: Duration) -> Result<Self> {
        let builder = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        };

        let mut builder = builder.port(config.port).timeout(Some(timeout));
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.from.parse()?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: MailMessage) -> Result<()> {
        if message.to.is_empty() {
            return Err(AppError::mail("message has no recipients"));
        }

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(message.subject);
        for recipient in &message.to {
            builder = builder.to(recipient.parse::<Mailbox>()?);
        }
        let email = builder
            .header(ContentType::TEXT_PLAIN)
            .body(message.body)?;

        self.transport.send(email).await?;
        Ok(())
    }
}

/// Sends one mail per video to every configured recipient.
pub struct EmailSink {
    recipients: Vec<String>,
    mailer: Option<Arc<dyn Mailer>>,
    tz: Tz,
    app_name: String,
}

impl EmailSink {
    pub fn new(config: &NotificationConfig, mailer: Option<Arc<dyn Mailer>>, tz: Tz) -> Self {
        Self {
            recipients: clean_recipients(&config.email.recipients),
            mailer,
            tz,
            app_name: config.app_name.clone(),
        }
    }

    pub fn message(&self, video: &Video, channel: &Channel) -> MailMessage {
        MailMessage {
            to: self.recipients.clone(),
            subject: render::video_subject(video, channel),
            body: render::video_body(video, channel, &self.tz, &self.app_name),
        }
    }
}

#[async_trait]
impl Sink for EmailSink {
    fn name(&self) -> &'static str {
        "email"
    }

    fn is_configured(&self) -> bool {
        !self.recipients.is_empty() && self.mailer.is_some()
    }

    async fn send(&self, video: &Video, channel: &Channel) -> Result<()> {
        let Some(mailer) = &self.mailer else {
            return Ok(());
        };
        mailer.send(self.message(video, channel)).await
    }
}
