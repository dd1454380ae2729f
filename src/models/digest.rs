// src/models/digest.rs

//! Weekly digest structures.

use chrono::{NaiveDate, Weekday};

use crate::models::{Channel, Video};

/// One announced video with its channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestItem {
    pub video: Video,
    pub channel: Channel,
}

/// All digest items created on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestBucket {
    pub date: NaiveDate,
    pub items: Vec<DigestItem>,
}

impl DigestBucket {
    pub fn weekday(&self) -> Weekday {
        chrono::Datelike::weekday(&self.date)
    }
}
