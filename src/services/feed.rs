// src/services/feed.rs

//! Channel feed source.
//!
//! Fetches a channel's Atom feed and turns each `<entry>` into a
//! [`FeedEntry`], preserving feed order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::Client;

use crate::error::{FeedError, Result};
use crate::models::{FeedConfig, FeedEntry};
use crate::utils::youtube;

/// Source of feed entries for a channel.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch entries for `feed_id`, in feed order.
    async fn fetch(&self, feed_id: &str) -> std::result::Result<Vec<FeedEntry>, FeedError>;
}

/// Feed source backed by the public video feed endpoint.
pub struct YoutubeFeedClient {
    client: Client,
    base_url: String,
}

impl YoutubeFeedClient {
    /// Create a feed client sharing `client`.
    pub fn new(client: Client, config: &FeedConfig) -> Result<Self> {
        url::Url::parse(&config.base_url)?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl FeedSource for YoutubeFeedClient {
    async fn fetch(&self, feed_id: &str) -> std::result::Result<Vec<FeedEntry>, FeedError> {
        let url = youtube::feed_url(&self.base_url, feed_id)
            .map_err(|e| FeedError::Parse(e.to_string()))?;
        log::debug!("Fetching feed from {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let bytes = response.bytes().await?;
        let entries = parse_feed(&bytes)?;
        log::debug!("Parsed {} entries from {}", entries.len(), url);
        Ok(entries)
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Id,
    Title,
    Published,
    Description,
}

impl Field {
    fn from_tag(name: &[u8]) -> Option<Self> {
        match name {
            b"id" => Some(Field::Id),
            b"title" => Some(Field::Title),
            b"published" => Some(Field::Published),
            b"media:description" => Some(Field::Description),
            _ => None,
        }
    }
}

#[derive(Default)]
struct EntryBuilder {
    id: String,
    title: String,
    published: String,
    description: String,
}

impl EntryBuilder {
    fn push(&mut self, field: Field, text: &str) {
        let target = match field {
            Field::Id => &mut self.id,
            Field::Title => &mut self.title,
            Field::Published => &mut self.published,
            Field::Description => &mut self.description,
        };
        target.push_str(text);
    }

    fn build(self) -> FeedEntry {
        FeedEntry {
            id: non_empty(self.id),
            title: non_empty(self.title),
            published: DateTime::parse_from_rfc3339(self.published.trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            description: non_empty(self.description),
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

/// Parse an Atom feed document.
///
/// Returns [`FeedError::NoEntryContainer`] when the document is well-formed
/// but has no `<feed>` element.
pub fn parse_feed(xml: &[u8]) -> std::result::Result<Vec<FeedEntry>, FeedError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut buf = Vec::new();
    let mut saw_feed = false;
    let mut current: Option<EntryBuilder> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"feed" => saw_feed = true,
                b"entry" => current = Some(EntryBuilder::default()),
                name if current.is_some() => field = Field::from_tag(name),
                _ => {}
            },
            Event::End(e) => {
                if e.name().as_ref() == b"entry" {
                    if let Some(builder) = current.take() {
                        entries.push(builder.build());
                    }
                }
                field = None;
            }
            Event::Text(e) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    let text = e.unescape().map_err(|e| FeedError::Parse(e.to_string()))?;
                    entry.push(f, &text);
                }
            }
            Event::CData(e) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    entry.push(f, &String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_feed {
        return Err(FeedError::NoEntryContainer);
    }
    Ok(entries)
}
