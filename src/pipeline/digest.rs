// src/pipeline/digest.rs

//! Weekly digest of announced videos.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Days, Utc};
use chrono_tz::Tz;

use crate::error::Result;
use crate::models::{
    Channel, Config, DigestBucket, DigestItem, Video, clean_recipients, default_app_name,
};
use crate::notify::{MailMessage, Mailer, render};
use crate::storage::Store;
use crate::utils::time::{local_date, previous_week};

/// What a digest run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestOutcome {
    Disabled,
    /// No recipients, or no mailer to reach them
    NoRecipients,
    /// Nothing was announced last week; no mail sent
    NoContent,
    /// One mail was sent with these day sections
    Sent(Vec<DigestBucket>),
}

/// Builds and mails the weekly digest.
pub struct DigestAggregator {
    store: Arc<dyn Store>,
    mailer: Option<Arc<dyn Mailer>>,
    enabled: bool,
    recipients: Vec<String>,
    tz: Tz,
    app_name: String,
}

impl DigestAggregator {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Option<Arc<dyn Mailer>>,
        recipients: Vec<String>,
        tz: Tz,
    ) -> Self {
        Self {
            store,
            mailer,
            enabled: true,
            recipients: clean_recipients(&recipients),
            tz,
            app_name: default_app_name(),
        }
    }

    pub fn from_config(
        config: &Config,
        store: Arc<dyn Store>,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Result<Self> {
        let mut aggregator = Self::new(
            store,
            mailer,
            config.digest.recipients.clone(),
            config.notifications.tz()?,
        );
        aggregator.enabled = config.digest.enabled;
        aggregator.app_name = config.notifications.app_name.clone();
        Ok(aggregator)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Summarize the calendar week before `now` and mail it.
    ///
    /// A mail failure is returned as an error; nothing is recorded either way,
    /// so a rerun for the same week resends.
    pub async fn build_digest(&self, now: DateTime<Utc>) -> Result<DigestOutcome> {
        if !self.enabled {
            return Ok(DigestOutcome::Disabled);
        }
        let Some(mailer) = self.mailer.as_ref().filter(|_| !self.recipients.is_empty()) else {
            return Ok(DigestOutcome::NoRecipients);
        };

        let (start, end) = previous_week(now, &self.tz);
        let rows = self.store.notified_videos_between(start, end).await?;
        if rows.is_empty() {
            log::info!("No announced videos between {} and {}", start, end);
            return Ok(DigestOutcome::NoContent);
        }

        let buckets = group_by_day(rows, &self.tz);
        let first_day = local_date(&start, &self.tz);
        let last_day = local_date(&end, &self.tz) - Days::new(1);

        mailer
            .send(MailMessage {
                to: self.recipients.clone(),
                subject: render::digest_subject(first_day, last_day),
                body: render::digest_body(&buckets, &self.tz, &self.app_name),
            })
            .await?;

        log::info!(
            "Weekly digest sent to {} recipients ({} days, {} videos)",
            self.recipients.len(),
            buckets.len(),
            buckets.iter().map(|b| b.items.len()).sum::<usize>()
        );
        Ok(DigestOutcome::Sent(buckets))
    }
}

/// Group rows by the local calendar day they were recorded on.
///
/// Days come out in chronological order, so a Monday-to-Sunday window yields
/// Monday first. Days without rows are omitted.
pub fn group_by_day(rows: Vec<(Video, Channel)>, tz: &Tz) -> Vec<DigestBucket> {
    let mut days: BTreeMap<_, Vec<DigestItem>> = BTreeMap::new();
    for (video, channel) in rows {
        days.entry(local_date(&video.created_at, tz))
            .or_default()
            .push(DigestItem { video, channel });
    }

    days.into_iter()
        .map(|(date, mut items)| {
            items.sort_by_key(|item| item.video.created_at);
            DigestBucket { date, items }
        })
        .collect()
}
