//! In-crate fakes shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::error::{AppError, FeedError, Result};
use crate::models::{Channel, FeedEntry, Video};
use crate::notify::{MailMessage, Mailer, Sink};
use crate::services::FeedSource;

pub fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

pub fn sample_channel(id: u64) -> Channel {
    Channel {
        id,
        external_feed_id: format!("UC_{id}"),
        display_name: format!("Channel {id}"),
        last_checked_at: None,
        muted_at: None,
        note: None,
    }
}

pub fn sample_video(external_id: &str, title: &str) -> Video {
    Video {
        id: 1,
        external_video_id: external_id.to_string(),
        channel_id: 1,
        title: title.to_string(),
        description: Some("A description".to_string()),
        published_at: utc("2026-10-06T09:30:00Z"),
        notified_at: None,
        created_at: utc("2026-10-06T09:35:00Z"),
    }
}

pub fn entry(id: &str, title: &str) -> FeedEntry {
    FeedEntry {
        id: Some(format!("yt:video:{id}")),
        title: Some(title.to_string()),
        published: Some(utc("2026-10-06T09:30:00Z")),
        description: Some(format!("About {title}")),
    }
}

enum FakeResponse {
    Entries(Vec<FeedEntry>),
    Unavailable,
    NoContainer,
}

/// Feed source answering from canned responses.
#[derive(Default)]
pub struct FakeFeed {
    responses: Mutex<HashMap<String, FakeResponse>>,
    fetches: Mutex<usize>,
}

impl FakeFeed {
    pub fn set_entries(&self, feed_id: &str, entries: Vec<FeedEntry>) {
        self.responses
            .lock()
            .unwrap()
            .insert(feed_id.to_string(), FakeResponse::Entries(entries));
    }

    pub fn set_unavailable(&self, feed_id: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(feed_id.to_string(), FakeResponse::Unavailable);
    }

    pub fn set_no_container(&self, feed_id: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(feed_id.to_string(), FakeResponse::NoContainer);
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl FeedSource for FakeFeed {
    async fn fetch(&self, feed_id: &str) -> std::result::Result<Vec<FeedEntry>, FeedError> {
        *self.fetches.lock().unwrap() += 1;
        match self.responses.lock().unwrap().get(feed_id) {
            Some(FakeResponse::Entries(entries)) => Ok(entries.clone()),
            Some(FakeResponse::NoContainer) => Err(FeedError::NoEntryContainer),
            Some(FakeResponse::Unavailable) | None => Err(FeedError::Status {
                status: 503,
                url: format!("fake://{feed_id}"),
            }),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Behavior {
    Succeed,
    Fail,
    Panic,
    Unconfigured,
}

/// Sink recording the external ids it was asked to deliver.
pub struct RecordingSink {
    name: &'static str,
    behavior: Behavior,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    fn with(name: &'static str, behavior: Behavior) -> Self {
        Self {
            name,
            behavior,
            calls: Arc::default(),
        }
    }

    pub fn new(name: &'static str) -> Self {
        Self::with(name, Behavior::Succeed)
    }

    pub fn failing(name: &'static str) -> Self {
        Self::with(name, Behavior::Fail)
    }

    pub fn panicking(name: &'static str) -> Self {
        Self::with(name, Behavior::Panic)
    }

    pub fn unconfigured(name: &'static str) -> Self {
        Self::with(name, Behavior::Unconfigured)
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Sink for RecordingSink {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_configured(&self) -> bool {
        self.behavior != Behavior::Unconfigured
    }

    async fn send(&self, video: &Video, _channel: &Channel) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(video.external_video_id.clone());
        match self.behavior {
            Behavior::Succeed | Behavior::Unconfigured => Ok(()),
            Behavior::Fail => Err(AppError::sink(self.name, "HTTP 500 Internal Server Error")),
            Behavior::Panic => panic!("sink {} exploded", self.name),
        }
    }
}

/// Mailer keeping every message in memory.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: MailMessage) -> Result<()> {
        if self.fail {
            return Err(AppError::mail("connection refused"));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Local HTTP endpoint answering every request with one fixed status.
pub struct StatusServer {
    url: String,
    hits: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl StatusServer {
    /// Start serving, e.g. `StatusServer::start("500 Internal Server Error")`.
    pub async fn start(status: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        let task = tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                read_request(&mut stream).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let response =
                    format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self {
            url: format!("http://{addr}/hook"),
            hits,
            task,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Requests answered so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for StatusServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Consume one request: headers, then `Content-Length` bytes of body.
async fn read_request(stream: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
        let body_len = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= end + 4 + body_len {
            return;
        }
    }
}
