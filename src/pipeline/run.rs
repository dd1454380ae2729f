// src/pipeline/run.rs

//! One-shot runs over all channels, shared by the scheduler and the CLI.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::storage::Store;

use super::digest::{DigestAggregator, DigestOutcome};
use super::ingest::{ChangeDetector, IngestMode, IngestOutcome};

/// Totals for one pass over every channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub channels: usize,
    pub fetch_failures: usize,
    pub empty_feeds: usize,
    /// Channels with nothing new
    pub idle: usize,
    /// Channels seeded on first encounter
    pub seeded: usize,
    pub persisted: usize,
    pub notified: usize,
    /// Channels whose cycle hit a store error
    pub errors: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &IngestOutcome) {
        match outcome {
            IngestOutcome::FetchFailed => self.fetch_failures += 1,
            IngestOutcome::EmptyFeed => self.empty_feeds += 1,
            IngestOutcome::NoCandidates => self.idle += 1,
            IngestOutcome::Completed(report) => {
                if report.mode == IngestMode::FirstEncounter {
                    self.seeded += 1;
                }
                self.persisted += report.persisted;
                self.notified += report.notified;
            }
        }
    }
}

/// Run one ingestion cycle for every channel, one channel at a time.
///
/// A failing channel is logged and counted; it never stops the others.
pub async fn run_ingestion(store: &dyn Store, detector: &ChangeDetector) -> Result<RunSummary> {
    let channels = store.list_channels().await?;
    let mut summary = RunSummary {
        channels: channels.len(),
        ..RunSummary::default()
    };

    if channels.is_empty() {
        log::debug!("No channels registered");
        return Ok(summary);
    }

    for channel in &channels {
        match detector.ingest(channel).await {
            Ok(outcome) => summary.record(&outcome),
            Err(e) => {
                log::error!(
                    "Ingestion failed for {} ({}): {}",
                    channel.display_name,
                    channel.external_feed_id,
                    e
                );
                summary.errors += 1;
            }
        }
    }

    log::info!(
        "Checked {} channels: {} new videos, {} notified, {} fetch failures",
        summary.channels,
        summary.persisted,
        summary.notified,
        summary.fetch_failures
    );
    Ok(summary)
}

/// Build and send the digest for the week before `now`.
pub async fn run_digest(aggregator: &DigestAggregator, now: DateTime<Utc>) -> Result<DigestOutcome> {
    let outcome = aggregator.build_digest(now).await?;
    match &outcome {
        DigestOutcome::Disabled => log::debug!("Weekly digest disabled"),
        DigestOutcome::NoRecipients => log::warn!("Weekly digest has no recipients or mailer"),
        DigestOutcome::NoContent => log::info!("Weekly digest skipped: nothing announced"),
        DigestOutcome::Sent(_) => {}
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use chrono::TimeDelta;
    use tempfile::TempDir;

    use crate::models::NewChannel;
    use crate::notify::Dispatcher;
    use crate::storage::LocalStore;
    use crate::testing::{FakeFeed, RecordingSink, entry};

    #[tokio::test]
    async fn test_zero_channels_is_ok() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(LocalStore::open(tmp.path()).await.unwrap());
        let feed = Arc::new(FakeFeed::default());
        let detector = ChangeDetector::new(store.clone(), feed.clone(), Arc::new(Dispatcher::new(Vec::new())));

        let summary = run_ingestion(store.as_ref(), &detector).await.unwrap();
        assert_eq!(summary, RunSummary::default());
        assert_eq!(feed.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_channel_does_not_stop_others() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(LocalStore::open(tmp.path()).await.unwrap());
        let feed = Arc::new(FakeFeed::default());
        let sink = RecordingSink::new("recorder");
        let calls = sink.calls();
        let detector = ChangeDetector::new(
            store.clone(),
            feed.clone(),
            Arc::new(Dispatcher::new(vec![Box::new(sink)])),
        );

        store.add_channel(NewChannel::new("UC_DOWN", "Down")).await.unwrap();
        let fresh = store.add_channel(NewChannel::new("UC_NEW", "New")).await.unwrap();
        let known = store.add_channel(NewChannel::new("UC_OLD", "Old")).await.unwrap();
        store
            .touch_last_checked(known.id, Utc::now() - TimeDelta::hours(1))
            .await
            .unwrap();

        feed.set_unavailable("UC_DOWN");
        feed.set_entries("UC_NEW", vec![entry("n1", "One"), entry("n2", "Two")]);
        feed.set_entries("UC_OLD", vec![entry("o1", "Fresh upload")]);

        let summary = run_ingestion(store.as_ref(), &detector).await.unwrap();

        assert_eq!(summary.channels, 3);
        assert_eq!(summary.fetch_failures, 1);
        assert_eq!(summary.seeded, 1);
        assert_eq!(summary.persisted, 3);
        assert_eq!(summary.notified, 1);
        assert_eq!(*calls.lock().unwrap(), vec!["o1".to_string()]);
        assert_eq!(feed.fetch_count(), 3);

        let fresh = store.get_channel(fresh.id).await.unwrap().unwrap();
        assert!(!fresh.is_first_encounter());
    }
}
