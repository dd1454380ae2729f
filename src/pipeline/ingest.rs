// src/pipeline/ingest.rs

//! Feed change detection for a single channel.
//!
//! One cycle runs fetch → diff → filter → persist → notify → timestamp,
//! to completion, before the caller moves on to the next channel.
//!
//! - A channel that has never completed a non-empty cycle is seeded: every
//!   candidate is recorded in one bulk insert and nobody is notified.
//! - Afterwards each candidate is recorded on its own and, unless the
//!   channel is muted, fanned out right after it is stored.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::error::{FeedError, Result};
use crate::models::{Channel, FeedEntry, NewVideo};
use crate::notify::Dispatcher;
use crate::services::{ExclusionFilter, FeedSource};
use crate::storage::{InsertOutcome, Store};

/// How a cycle treats its candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    /// Seed the catalog without notifying
    FirstEncounter,
    /// Record and announce each new video
    Incremental,
}

impl IngestMode {
    pub fn for_channel(channel: &Channel) -> Self {
        if channel.is_first_encounter() {
            IngestMode::FirstEncounter
        } else {
            IngestMode::Incremental
        }
    }
}

/// Counts for a completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub mode: IngestMode,
    pub persisted: usize,
    /// Candidates another run or channel had already recorded
    pub duplicates: usize,
    /// Persisted videos at least one sink delivered
    pub notified: usize,
}

/// Result of one ingestion cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The feed could not be fetched; channel left untouched
    FetchFailed,
    /// The feed parsed but had no entry container; channel left untouched
    EmptyFeed,
    /// Nothing new after diffing and filtering; channel left untouched
    NoCandidates,
    /// Candidates were processed and `last_checked_at` advanced
    Completed(IngestReport),
}

/// Candidates selected from one feed, with what was dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    pub candidates: Vec<NewVideo>,
    pub already_seen: usize,
    pub excluded: usize,
    pub invalid: usize,
}

/// Diff feed entries against recorded ids and apply the exclusion filter,
/// preserving feed order.
pub fn select_candidates(
    entries: &[FeedEntry],
    existing: &HashSet<String>,
    filter: &ExclusionFilter,
) -> CandidateSet {
    let mut set = CandidateSet::default();
    let mut taken: HashSet<&str> = HashSet::new();

    for entry in entries {
        let (Some(id), Some(title), Some(published)) =
            (entry.video_id(), entry.title(), entry.published)
        else {
            set.invalid += 1;
            log::debug!("Dropping incomplete feed entry {:?}", entry.id);
            continue;
        };

        if existing.contains(id) || !taken.insert(id) {
            set.already_seen += 1;
            continue;
        }

        if let Some(word) = filter.matched_word(title) {
            log::debug!("Excluding {} ('{}' matches '{}')", id, title, word);
            set.excluded += 1;
            continue;
        }

        set.candidates.push(NewVideo::new(
            id,
            title,
            entry.description.clone(),
            published,
        ));
    }

    set
}

/// Runs ingestion cycles for channels.
pub struct ChangeDetector {
    store: Arc<dyn Store>,
    feed: Arc<dyn FeedSource>,
    dispatcher: Arc<Dispatcher>,
}

impl ChangeDetector {
    pub fn new(store: Arc<dyn Store>, feed: Arc<dyn FeedSource>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            store,
            feed,
            dispatcher,
        }
    }

    /// Run one cycle for `channel`.
    ///
    /// Feed failures are reported as outcomes; only store failures are
    /// returned as errors, in which case `last_checked_at` is not advanced.
    pub async fn ingest(&self, channel: &Channel) -> Result<IngestOutcome> {
        let entries = match self.feed.fetch(&channel.external_feed_id).await {
            Ok(entries) => entries,
            Err(FeedError::NoEntryContainer) => {
                log::warn!(
                    "Feed for {} ({}) has no entries container",
                    channel.display_name,
                    channel.external_feed_id
                );
                return Ok(IngestOutcome::EmptyFeed);
            }
            Err(e) => {
                log::warn!(
                    "Failed to fetch feed for {} ({}): {}",
                    channel.display_name,
                    channel.external_feed_id,
                    e
                );
                return Ok(IngestOutcome::FetchFailed);
            }
        };

        let existing = self.store.existing_video_ids(channel.id).await?;
        let filter = ExclusionFilter::from_words(&self.store.excluded_words().await?);
        let selection = select_candidates(&entries, &existing, &filter);

        if selection.candidates.is_empty() {
            log::debug!(
                "No new videos for {} ({} entries, {} seen, {} excluded, {} invalid)",
                channel.display_name,
                entries.len(),
                selection.already_seen,
                selection.excluded,
                selection.invalid
            );
            return Ok(IngestOutcome::NoCandidates);
        }

        let mode = IngestMode::for_channel(channel);
        let report = match mode {
            IngestMode::FirstEncounter => self.seed(channel, selection.candidates).await?,
            IngestMode::Incremental => self.record_and_notify(channel, selection.candidates).await?,
        };

        self.store.touch_last_checked(channel.id, Utc::now()).await?;
        log::info!(
            "{}: {} new videos recorded ({:?}, {} duplicates, {} notified)",
            channel.display_name,
            report.persisted,
            report.mode,
            report.duplicates,
            report.notified
        );

        Ok(IngestOutcome::Completed(report))
    }

    async fn seed(&self, channel: &Channel, candidates: Vec<NewVideo>) -> Result<IngestReport> {
        let total = candidates.len();
        let inserted = self
            .store
            .insert_videos(channel.id, candidates, Utc::now())
            .await?;

        Ok(IngestReport {
            mode: IngestMode::FirstEncounter,
            persisted: inserted.len(),
            duplicates: total - inserted.len(),
            notified: 0,
        })
    }

    async fn record_and_notify(
        &self,
        channel: &Channel,
        candidates: Vec<NewVideo>,
    ) -> Result<IngestReport> {
        let mut report = IngestReport {
            mode: IngestMode::Incremental,
            persisted: 0,
            duplicates: 0,
            notified: 0,
        };

        for candidate in candidates {
            let video = match self
                .store
                .insert_video(channel.id, candidate, Utc::now())
                .await?
            {
                InsertOutcome::Inserted(video) => video,
                InsertOutcome::Duplicate => {
                    report.duplicates += 1;
                    continue;
                }
            };
            report.persisted += 1;

            if channel.is_muted() {
                log::debug!(
                    "{} is muted, not announcing {}",
                    channel.display_name,
                    video.external_video_id
                );
                continue;
            }

            let dispatch = self.dispatcher.dispatch(&video, channel).await;
            if !dispatch.any_delivered() {
                continue;
            }
            report.notified += 1;
            if let Err(e) = self.store.mark_notified(video.id, Utc::now()).await {
                log::warn!(
                    "Could not record notification for {}: {}",
                    video.external_video_id,
                    e
                );
            }
        }

        Ok(report)
    }
}
