//! Local filesystem store implementation.
//!
//! Keeps the whole store as one JSON document. Every operation re-reads the
//! document, so several processes (the scheduler and a one-shot CLI command)
//! can share one directory:
//!
//! - reads load `store.json` as last renamed into place
//! - mutations hold an exclusive lock on `store.lock` for the whole
//!   read-modify-write, which is where the uniqueness rules are enforced
//! - a mutation is written to a temp file and renamed; if that fails the
//!   document on disk is unchanged and nothing else remembers the change
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── store.json            # channels, videos, excluded words
//! └── store.lock            # advisory lock for writers
//! ```

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{Channel, ExcludedWord, NewChannel, NewVideo, Video};
use crate::storage::{InsertOutcome, Store};

const STORE_FILE: &str = "store.json";
const LOCK_FILE: &str = "store.lock";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    next_channel_id: u64,
    #[serde(default)]
    next_video_id: u64,
    #[serde(default)]
    channels: Vec<Channel>,
    #[serde(default)]
    videos: Vec<Video>,
    #[serde(default)]
    excluded_words: Vec<ExcludedWord>,

    /// Index over `videos[*].external_video_id`
    #[serde(skip)]
    video_ids: HashSet<String>,
}

impl StoreData {
    fn reindex(&mut self) {
        self.video_ids = self
            .videos
            .iter()
            .map(|v| v.external_video_id.clone())
            .collect();
        let max_channel = self.channels.iter().map(|c| c.id).max().unwrap_or(0);
        let max_video = self.videos.iter().map(|v| v.id).max().unwrap_or(0);
        self.next_channel_id = self.next_channel_id.max(max_channel);
        self.next_video_id = self.next_video_id.max(max_video);
    }

    fn channel(&self, id: u64) -> Result<&Channel> {
        self.channels
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::store(format!("channel {id} not found")))
    }

    fn channel_mut(&mut self, id: u64) -> Result<&mut Channel> {
        self.channels
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::store(format!("channel {id} not found")))
    }

    fn insert(&mut self, channel_id: u64, video: NewVideo, created_at: DateTime<Utc>) -> InsertOutcome {
        if !self.video_ids.insert(video.external_video_id.clone()) {
            return InsertOutcome::Duplicate;
        }
        self.next_video_id += 1;
        let video = video.into_video(self.next_video_id, channel_id, created_at);
        self.videos.push(video.clone());
        InsertOutcome::Inserted(video)
    }
}

/// Result of a mutation closure: the value to return and whether the
/// document changed and must be written.
type Mutation<T> = Result<(T, bool)>;

/// Local filesystem store backend.
pub struct LocalStore {
    root_dir: PathBuf,
    /// Serializes writers within this process before they queue on the file lock
    writer: Mutex<()>,
}

impl LocalStore {
    /// Open the store rooted at the given directory, creating it on first write.
    ///
    /// Fails if an existing document cannot be read or parsed.
    pub async fn open(root_dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            root_dir: root_dir.into(),
            writer: Mutex::new(()),
        };
        if tokio::fs::try_exists(store.root_dir.join(STORE_FILE)).await? {
            store.load().await?;
        } else {
            log::info!("No store found in {}, starting empty", store.root_dir.display());
        }
        Ok(store)
    }

    /// Read the current document from disk.
    async fn load(&self) -> Result<StoreData> {
        let mut data = match tokio::fs::read(self.root_dir.join(STORE_FILE)).await {
            Ok(bytes) => serde_json::from_slice::<StoreData>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreData::default(),
            Err(e) => return Err(AppError::Io(e)),
        };
        data.reindex();
        Ok(data)
    }

    /// Take the cross-process writer lock. Released when the file is dropped.
    async fn lock_file(&self) -> Result<File> {
        tokio::fs::create_dir_all(&self.root_dir).await?;
        let path = self.root_dir.join(LOCK_FILE);

        tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|e| AppError::store(format!("store lock task failed: {e}")))?
        .map_err(AppError::Io)
    }

    /// Read-modify-write under the writer locks.
    ///
    /// `mutate` works on a freshly loaded document; it is only written when
    /// the closure succeeds and reports a change.
    async fn update<T, F>(&self, mutate: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&mut StoreData) -> Mutation<T> + Send,
    {
        let _writer = self.writer.lock().await;
        let _lock = self.lock_file().await?;

        let mut data = self.load().await?;
        let (value, changed) = mutate(&mut data)?;
        if changed {
            self.persist(&data).await?;
        }
        Ok(value)
    }

    /// Write the document atomically (write to temp, then rename).
    async fn persist(&self, data: &StoreData) -> Result<()> {
        let path = self.root_dir.join(STORE_FILE);

        let bytes = serde_json::to_vec_pretty(data)?;
        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for LocalStore {
    async fn list_channels(&self) -> Result<Vec<Channel>> {
        Ok(self.load().await?.channels)
    }

    async fn get_channel(&self, id: u64) -> Result<Option<Channel>> {
        let data = self.load().await?;
        Ok(data.channels.into_iter().find(|c| c.id == id))
    }

    async fn add_channel(&self, channel: NewChannel) -> Result<Channel> {
        let feed_id = channel.external_feed_id.trim().to_string();
        if feed_id.is_empty() {
            return Err(AppError::validation("external feed id is empty"));
        }

        self.update(move |data| {
            if data.channels.iter().any(|c| c.external_feed_id == feed_id) {
                return Err(AppError::store(format!(
                    "channel with feed id {feed_id} already exists"
                )));
            }

            data.next_channel_id += 1;
            let created = Channel {
                id: data.next_channel_id,
                external_feed_id: feed_id,
                display_name: channel.display_name,
                last_checked_at: None,
                muted_at: None,
                note: channel.note,
            };
            data.channels.push(created.clone());
            Ok((created, true))
        })
        .await
    }

    async fn remove_channel(&self, id: u64) -> Result<bool> {
        let removed = self
            .update(|data| {
                let before = data.channels.len();
                data.channels.retain(|c| c.id != id);
                if data.channels.len() == before {
                    return Ok((None, false));
                }

                let removed = data.videos.iter().filter(|v| v.channel_id == id).count();
                data.videos.retain(|v| v.channel_id != id);
                Ok((Some(removed), true))
            })
            .await?;

        match removed {
            Some(videos) => {
                log::info!("Removed channel {} and {} videos", id, videos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_muted(&self, id: u64, muted: bool, at: DateTime<Utc>) -> Result<()> {
        self.update(|data| {
            let channel = data.channel_mut(id)?;
            channel.muted_at = match (muted, channel.muted_at) {
                (true, Some(since)) => Some(since),
                (true, None) => Some(at),
                (false, _) => None,
            };
            Ok(((), true))
        })
        .await
    }

    async fn touch_last_checked(&self, id: u64, at: DateTime<Utc>) -> Result<()> {
        self.update(|data| {
            data.channel_mut(id)?.last_checked_at = Some(at);
            Ok(((), true))
        })
        .await
    }

    async fn existing_video_ids(&self, channel_id: u64) -> Result<HashSet<String>> {
        let data = self.load().await?;
        Ok(data
            .videos
            .into_iter()
            .filter(|v| v.channel_id == channel_id)
            .map(|v| v.external_video_id)
            .collect())
    }

    async fn insert_videos(
        &self,
        channel_id: u64,
        videos: Vec<NewVideo>,
        created_at: DateTime<Utc>,
    ) -> Result<Vec<Video>> {
        self.update(|data| {
            data.channel(channel_id)?;

            let mut inserted = Vec::with_capacity(videos.len());
            for video in videos {
                if let InsertOutcome::Inserted(v) = data.insert(channel_id, video, created_at) {
                    inserted.push(v);
                }
            }
            let changed = !inserted.is_empty();
            Ok((inserted, changed))
        })
        .await
    }

    async fn insert_video(
        &self,
        channel_id: u64,
        video: NewVideo,
        created_at: DateTime<Utc>,
    ) -> Result<InsertOutcome> {
        self.update(|data| {
            data.channel(channel_id)?;
            let outcome = data.insert(channel_id, video, created_at);
            let changed = matches!(outcome, InsertOutcome::Inserted(_));
            Ok((outcome, changed))
        })
        .await
    }

    async fn mark_notified(&self, video_id: u64, at: DateTime<Utc>) -> Result<()> {
        self.update(|data| {
            let video = data
                .videos
                .iter_mut()
                .find(|v| v.id == video_id)
                .ok_or_else(|| AppError::store(format!("video {video_id} not found")))?;
            video.notified_at = Some(at);
            Ok(((), true))
        })
        .await
    }

    async fn excluded_words(&self) -> Result<Vec<ExcludedWord>> {
        Ok(self.load().await?.excluded_words)
    }

    async fn add_excluded_word(&self, word: &str) -> Result<bool> {
        let word = word.trim();
        if word.is_empty() {
            return Err(AppError::validation("excluded word is empty"));
        }

        let needle = word.to_lowercase();
        self.update(|data| {
            if data
                .excluded_words
                .iter()
                .any(|w| w.word.to_lowercase() == needle)
            {
                return Ok((false, false));
            }
            data.excluded_words.push(ExcludedWord {
                word: word.to_string(),
            });
            Ok((true, true))
        })
        .await
    }

    async fn remove_excluded_word(&self, word: &str) -> Result<bool> {
        let needle = word.trim().to_lowercase();
        self.update(|data| {
            let before = data.excluded_words.len();
            data.excluded_words.retain(|w| w.word.to_lowercase() != needle);
            let removed = data.excluded_words.len() != before;
            Ok((removed, removed))
        })
        .await
    }

    async fn notified_videos_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<(Video, Channel)>> {
        let data = self.load().await?;
        let mut rows: Vec<(Video, Channel)> = data
            .videos
            .iter()
            .filter(|v| v.notified_at.is_some())
            .filter(|v| v.created_at >= start && v.created_at < end)
            .filter_map(|v| {
                data.channels
                    .iter()
                    .find(|c| c.id == v.channel_id)
                    .map(|c| (v.clone(), c.clone()))
            })
            .collect();
        rows.sort_by(|a, b| a.0.created_at.cmp(&b.0.created_at).then(a.0.id.cmp(&b.0.id)));
        Ok(rows)
    }

    async fn video_count(&self) -> Result<usize> {
        Ok(self.load().await?.videos.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use tempfile::TempDir;

    fn candidate(id: &str) -> NewVideo {
        NewVideo::new(id, format!("Video {id}"), None, Utc::now())
    }

    async fn store_with_channel(tmp: &TempDir) -> (LocalStore, Channel) {
        let store = LocalStore::open(tmp.path()).await.unwrap();
        let channel = store
            .add_channel(NewChannel::new("UC_A", "Channel A"))
            .await
            .unwrap();
        (store, channel)
    }

    #[tokio::test]
    async fn test_open_empty() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::open(tmp.path()).await.unwrap();
        assert!(store.list_channels().await.unwrap().is_empty());
        assert_eq!(store.video_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_feed_id_unique() {
        let tmp = TempDir::new().unwrap();
        let (store, _) = store_with_channel(&tmp).await;

        let result = store.add_channel(NewChannel::new("UC_A", "Again")).await;
        assert!(matches!(result, Err(AppError::Store(_))));
    }

    #[tokio::test]
    async fn test_video_id_globally_unique() {
        let tmp = TempDir::new().unwrap();
        let (store, a) = store_with_channel(&tmp).await;
        let b = store
            .add_channel(NewChannel::new("UC_B", "Channel B"))
            .await
            .unwrap();

        let first = store.insert_video(a.id, candidate("v1"), Utc::now()).await.unwrap();
        let second = store.insert_video(b.id, candidate("v1"), Utc::now()).await.unwrap();

        assert!(matches!(first, InsertOutcome::Inserted(_)));
        assert_eq!(second, InsertOutcome::Duplicate);
        assert_eq!(store.video_count().await.unwrap(), 1);
        assert!(store.existing_video_ids(b.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_insert_skips_duplicates() {
        let tmp = TempDir::new().unwrap();
        let (store, channel) = store_with_channel(&tmp).await;
        store.insert_video(channel.id, candidate("v1"), Utc::now()).await.unwrap();

        let inserted = store
            .insert_videos(
                channel.id,
                vec![candidate("v1"), candidate("v2"), candidate("v2"), candidate("v3")],
                Utc::now(),
            )
            .await
            .unwrap();

        let ids: Vec<_> = inserted.iter().map(|v| v.external_video_id.as_str()).collect();
        assert_eq!(ids, vec!["v2", "v3"]);
        assert!(inserted.iter().all(|v| v.notified_at.is_none()));
        assert_eq!(store.video_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let tmp = TempDir::new().unwrap();
        let (store, channel) = store_with_channel(&tmp).await;
        store.insert_video(channel.id, candidate("v1"), Utc::now()).await.unwrap();
        store.add_excluded_word("Trailer").await.unwrap();
        drop(store);

        let reopened = LocalStore::open(tmp.path()).await.unwrap();
        assert_eq!(reopened.list_channels().await.unwrap().len(), 1);
        assert!(reopened.existing_video_ids(channel.id).await.unwrap().contains("v1"));
        assert_eq!(reopened.excluded_words().await.unwrap().len(), 1);

        // Uniqueness and id allocation survive the reload.
        let again = reopened.insert_video(channel.id, candidate("v1"), Utc::now()).await.unwrap();
        assert_eq!(again, InsertOutcome::Duplicate);
        let next = reopened
            .add_channel(NewChannel::new("UC_B", "Channel B"))
            .await
            .unwrap();
        assert_eq!(next.id, channel.id + 1);
    }

    #[tokio::test]
    async fn test_remove_channel_cascades() {
        let tmp = TempDir::new().unwrap();
        let (store, channel) = store_with_channel(&tmp).await;
        store
            .insert_videos(channel.id, vec![candidate("v1"), candidate("v2")], Utc::now())
            .await
            .unwrap();

        assert!(store.remove_channel(channel.id).await.unwrap());
        assert_eq!(store.video_count().await.unwrap(), 0);
        assert!(!store.remove_channel(channel.id).await.unwrap());

        // Freed ids can be recorded again under another channel.
        let other = store
            .add_channel(NewChannel::new("UC_B", "Channel B"))
            .await
            .unwrap();
        let outcome = store.insert_video(other.id, candidate("v1"), Utc::now()).await.unwrap();
        assert!(matches!(outcome, InsertOutcome::Inserted(_)));
    }

    #[tokio::test]
    async fn test_mute_keeps_original_instant() {
        let tmp = TempDir::new().unwrap();
        let (store, channel) = store_with_channel(&tmp).await;
        let t0 = Utc::now() - TimeDelta::days(1);

        store.set_muted(channel.id, true, t0).await.unwrap();
        store.set_muted(channel.id, true, Utc::now()).await.unwrap();
        let muted = store.get_channel(channel.id).await.unwrap().unwrap();
        assert_eq!(muted.muted_at, Some(t0));

        store.set_muted(channel.id, false, Utc::now()).await.unwrap();
        let unmuted = store.get_channel(channel.id).await.unwrap().unwrap();
        assert!(!unmuted.is_muted());
    }

    #[tokio::test]
    async fn test_excluded_words_case_insensitive_unique() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::open(tmp.path()).await.unwrap();

        assert!(store.add_excluded_word("LIVE").await.unwrap());
        assert!(!store.add_excluded_word("live").await.unwrap());
        assert!(store.add_excluded_word("   ").await.is_err());
        assert!(store.remove_excluded_word("Live").await.unwrap());
        assert!(store.excluded_words().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notified_videos_between() {
        let tmp = TempDir::new().unwrap();
        let (store, channel) = store_with_channel(&tmp).await;
        let base = Utc::now() - TimeDelta::days(3);

        let mut ids = Vec::new();
        for (i, offset) in [2, 0, 1, 5].into_iter().enumerate() {
            let created = base + TimeDelta::hours(offset);
            let outcome = store
                .insert_video(channel.id, candidate(&format!("v{i}")), created)
                .await
                .unwrap();
            if let InsertOutcome::Inserted(v) = outcome {
                ids.push(v.id);
            }
        }
        // v0, v1, v2 notified; v3 outside the window anyway
        for id in &ids[..3] {
            store.mark_notified(*id, Utc::now()).await.unwrap();
        }
        let unnotified = store
            .insert_video(channel.id, candidate("quiet"), base + TimeDelta::hours(1))
            .await
            .unwrap();
        assert!(matches!(unnotified, InsertOutcome::Inserted(_)));

        let rows = store
            .notified_videos_between(base, base + TimeDelta::hours(4))
            .await
            .unwrap();
        let got: Vec<_> = rows.iter().map(|(v, _)| v.external_video_id.as_str()).collect();
        assert_eq!(got, vec!["v1", "v2", "v0"]);
        assert!(rows.iter().all(|(_, c)| c.id == channel.id));
    }

    #[tokio::test]
    async fn test_two_handles_share_one_document() {
        let tmp = TempDir::new().unwrap();
        let (scheduler, channel) = store_with_channel(&tmp).await;
        let admin = LocalStore::open(tmp.path()).await.unwrap();

        let first = scheduler.insert_video(channel.id, candidate("B"), Utc::now()).await.unwrap();
        let second = admin.insert_video(channel.id, candidate("B"), Utc::now()).await.unwrap();
        assert!(matches!(first, InsertOutcome::Inserted(_)));
        assert_eq!(second, InsertOutcome::Duplicate);

        assert!(admin.add_excluded_word("trailer").await.unwrap());
        admin.set_muted(channel.id, true, Utc::now()).await.unwrap();
        assert_eq!(scheduler.excluded_words().await.unwrap().len(), 1);

        // A later write from the other handle keeps the admin's changes.
        scheduler.touch_last_checked(channel.id, Utc::now()).await.unwrap();
        let reopened = LocalStore::open(tmp.path()).await.unwrap();
        assert_eq!(reopened.excluded_words().await.unwrap().len(), 1);
        let stored = reopened.get_channel(channel.id).await.unwrap().unwrap();
        assert!(stored.is_muted());
        assert!(stored.last_checked_at.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_handles_insert_once() {
        let tmp = TempDir::new().unwrap();
        let (_, channel) = store_with_channel(&tmp).await;
        let channel_id = channel.id;

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let store = LocalStore::open(tmp.path()).await.unwrap();
            tasks.push(tokio::spawn(async move {
                store.insert_video(channel_id, candidate("race"), Utc::now()).await.unwrap()
            }));
        }

        let mut inserted = 0;
        for task in tasks {
            if matches!(task.await.unwrap(), InsertOutcome::Inserted(_)) {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);

        let store = LocalStore::open(tmp.path()).await.unwrap();
        assert_eq!(store.video_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_trace() {
        let tmp = TempDir::new().unwrap();
        let (store, channel) = store_with_channel(&tmp).await;

        // A directory where the temp file goes makes every write fail.
        let blocker = tmp.path().join("store.tmp");
        std::fs::create_dir(&blocker).unwrap();

        assert!(store.insert_video(channel.id, candidate("V"), Utc::now()).await.is_err());
        assert!(store.add_excluded_word("live").await.is_err());
        assert!(store.existing_video_ids(channel.id).await.unwrap().is_empty());
        assert!(store.excluded_words().await.unwrap().is_empty());

        std::fs::remove_dir(&blocker).unwrap();
        let retry = store.insert_video(channel.id, candidate("V"), Utc::now()).await.unwrap();
        assert!(matches!(retry, InsertOutcome::Inserted(_)));
    }
}
