// src/pipeline/scheduler.rs

//! Long-running timers for ingestion and the weekly digest.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Utc, Weekday};
use chrono_tz::Tz;

use crate::error::Result;
use crate::models::Config;
use crate::storage::Store;
use crate::utils::time::next_weekly_run;

use super::digest::DigestAggregator;
use super::ingest::ChangeDetector;
use super::run::{run_digest, run_ingestion};

/// Runs ingestion on a fixed interval and the digest once a week.
///
/// Each timer awaits its run before the next tick, so a slow cycle delays
/// the following one instead of overlapping it. Missed ticks are skipped.
pub struct Scheduler {
    store: Arc<dyn Store>,
    detector: Arc<ChangeDetector>,
    digest: Arc<DigestAggregator>,
    interval: Duration,
    weekday: Weekday,
    hour: u32,
    tz: Tz,
}

impl Scheduler {
    pub fn new(
        config: &Config,
        store: Arc<dyn Store>,
        detector: Arc<ChangeDetector>,
        digest: Arc<DigestAggregator>,
    ) -> Result<Self> {
        Ok(Self {
            store,
            detector,
            digest,
            interval: Duration::from_secs(config.scheduler.ingest_interval_secs),
            weekday: config.scheduler.weekday()?,
            hour: config.scheduler.digest_hour,
            tz: config.notifications.tz()?,
        })
    }

    /// Start both timers and block until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let ingest = tokio::spawn(Self::ingest_loop(
            Arc::clone(&self.store),
            Arc::clone(&self.detector),
            self.interval,
        ));
        let digest = self.digest.is_enabled().then(|| {
            tokio::spawn(Self::digest_loop(
                Arc::clone(&self.digest),
                self.weekday,
                self.hour,
                self.tz,
            ))
        });

        log::info!(
            "Scheduler started: ingest every {}s, digest {}",
            self.interval.as_secs(),
            if digest.is_some() {
                format!("{:?} {:02}:00 {}", self.weekday, self.hour, self.tz)
            } else {
                "disabled".to_string()
            }
        );

        tokio::signal::ctrl_c().await?;
        log::info!("Shutting down scheduler");

        ingest.abort();
        if let Some(digest) = digest {
            digest.abort();
        }
        Ok(())
    }

    async fn ingest_loop(store: Arc<dyn Store>, detector: Arc<ChangeDetector>, interval: Duration) {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            timer.tick().await;

            if let Err(e) = run_ingestion(store.as_ref(), &detector).await {
                log::error!("Ingestion run failed: {}", e);
            }
        }
    }

    async fn digest_loop(digest: Arc<DigestAggregator>, weekday: Weekday, hour: u32, tz: Tz) {
        loop {
            let now = Utc::now();
            let next = next_weekly_run(now, &tz, weekday, hour);
            let wait = (next - now).to_std().unwrap_or_default();
            log::debug!("Next weekly digest at {}", next);
            tokio::time::sleep(wait).await;

            if let Err(e) = run_digest(&digest, Utc::now()).await {
                log::error!("Weekly digest failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::notify::Dispatcher;
    use crate::storage::LocalStore;
    use crate::testing::FakeFeed;

    #[tokio::test]
    async fn test_rejects_bad_schedule() {
        let tmp = TempDir::new().unwrap();
        let store: Arc<dyn Store> = Arc::new(LocalStore::open(tmp.path()).await.unwrap());
        let detector = Arc::new(ChangeDetector::new(
            store.clone(),
            Arc::new(FakeFeed::default()),
            Arc::new(Dispatcher::new(Vec::new())),
        ));
        let digest = Arc::new(DigestAggregator::new(store.clone(), None, Vec::new(), Tz::UTC));

        let mut config = Config::default();
        assert!(Scheduler::new(&config, store.clone(), detector.clone(), digest.clone()).is_ok());

        config.scheduler.digest_weekday = "Someday".into();
        assert!(Scheduler::new(&config, store, detector, digest).is_err());
    }
}
