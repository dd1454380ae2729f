//! Application configuration structures.

use std::fs;
use std::path::Path;

use chrono::Weekday;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings shared by the feed fetch and webhooks
    #[serde(default)]
    pub http: HttpConfig,

    /// Feed source settings
    #[serde(default)]
    pub feed: FeedConfig,

    /// Store location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Tick intervals
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Per-video notification sinks
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Outgoing mail server; mail sinks stay idle without it
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,

    /// Weekly digest
    #[serde(default)]
    pub digest: DigestConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Overlay secrets from the environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(password) = lookup("TUBEWATCH_SMTP_PASSWORD") {
            if let Some(smtp) = self.smtp.as_mut() {
                smtp.password = Some(password);
            }
        }
        if let Some(url) = lookup("TUBEWATCH_CHAT_WEBHOOK_URL") {
            self.notifications.chat.webhook_url = Some(url);
        }
        if let Some(url) = lookup("TUBEWATCH_WEBHOOK_URL") {
            self.notifications.webhook.url = Some(url);
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        url::Url::parse(&self.feed.base_url)?;
        if self.scheduler.ingest_interval_secs == 0 {
            return Err(AppError::validation(
                "scheduler.ingest_interval_secs must be > 0",
            ));
        }
        self.scheduler.weekday()?;
        if self.scheduler.digest_hour > 23 {
            return Err(AppError::validation("scheduler.digest_hour must be 0..=23"));
        }
        self.notifications.tz()?;
        if let Some(url) = self.notifications.chat.url() {
            url::Url::parse(url)?;
        }
        if let Some(url) = self.notifications.webhook.url() {
            url::Url::parse(url)?;
        }
        if let Some(smtp) = &self.smtp {
            if smtp.host.trim().is_empty() {
                return Err(AppError::validation("smtp.host is empty"));
            }
            if smtp.from.trim().is_empty() {
                return Err(AppError::validation("smtp.from is empty"));
            }
        }
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Feed source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Feed endpoint; the channel id is passed as `channel_id`
    #[serde(default = "defaults::feed_base_url")]
    pub base_url: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::feed_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "defaults::storage_dir")]
    pub dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: defaults::storage_dir(),
        }
    }
}

/// Scheduler cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between ingestion ticks
    #[serde(default = "defaults::ingest_interval")]
    pub ingest_interval_secs: u64,

    /// Weekday the digest goes out, e.g. "Mon"
    #[serde(default = "defaults::digest_weekday")]
    pub digest_weekday: String,

    /// Local hour the digest goes out
    #[serde(default = "defaults::digest_hour")]
    pub digest_hour: u32,
}

impl SchedulerConfig {
    /// Parsed digest weekday.
    pub fn weekday(&self) -> Result<Weekday> {
        self.digest_weekday.parse().map_err(|_| {
            AppError::validation(format!(
                "scheduler.digest_weekday '{}' is not a weekday",
                self.digest_weekday
            ))
        })
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            ingest_interval_secs: defaults::ingest_interval(),
            digest_weekday: defaults::digest_weekday(),
            digest_hour: defaults::digest_hour(),
        }
    }
}

/// Notification sink settings.
///
/// Each sink is enabled purely by the presence of its own settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Shown as footer and sender name
    #[serde(default = "defaults::app_name")]
    pub app_name: String,

    /// IANA timezone used for human-readable dates
    #[serde(default = "defaults::timezone")]
    pub timezone: String,

    #[serde(default)]
    pub email: EmailConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub webhook: WebhookConfig,
}

impl NotificationConfig {
    /// Parsed display timezone.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone.parse().map_err(|_| {
            AppError::validation(format!(
                "notifications.timezone '{}' is not a known timezone",
                self.timezone
            ))
        })
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            app_name: defaults::app_name(),
            timezone: defaults::timezone(),
            email: EmailConfig::default(),
            chat: ChatConfig::default(),
            webhook: WebhookConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub recipients: Vec<String>,
}

/// Chat webhook (embed) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default = "defaults::avatar_url")]
    pub avatar_url: String,

    /// Overrides the poster name; falls back to the app name
    #[serde(default)]
    pub username: Option<String>,
}

impl ChatConfig {
    /// Configured webhook URL, ignoring blanks.
    pub fn url(&self) -> Option<&str> {
        non_blank(self.webhook_url.as_deref())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            avatar_url: defaults::avatar_url(),
            username: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub url: Option<String>,
}

impl WebhookConfig {
    /// Configured URL, ignoring blanks.
    pub fn url(&self) -> Option<&str> {
        non_blank(self.url.as_deref())
    }
}

/// Outgoing mail server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,

    #[serde(default = "defaults::smtp_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Sender mailbox, e.g. `TubeWatch <bot@example.com>`
    pub from: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DigestConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// Application name used when none is configured.
pub(crate) fn default_app_name() -> String {
    defaults::app_name()
}

/// Trim recipient entries and drop blanks.
pub fn clean_recipients(recipients: &[String]) -> Vec<String> {
    recipients
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .map(String::from)
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

mod defaults {
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; TubeWatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn feed_base_url() -> String {
        "https://www.youtube.com/feeds/videos.xml".into()
    }
    pub fn storage_dir() -> String {
        "storage".into()
    }
    pub fn ingest_interval() -> u64 {
        300
    }
    pub fn digest_weekday() -> String {
        "Mon".into()
    }
    pub fn digest_hour() -> u32 {
        8
    }
    pub fn app_name() -> String {
        "TubeWatch".into()
    }
    pub fn timezone() -> String {
        "UTC".into()
    }
    pub fn avatar_url() -> String {
        "https://www.youtube.com/s/desktop/favicon_144x144.png".into()
    }
    pub fn smtp_port() -> u16 {
        587
    }
    pub fn log_level() -> String {
        "info".into()
    }
}
