// src/error.rs

//! Unified error handling for the watcher.

use std::fmt;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Feed could not be fetched or understood
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Store integrity or lookup error
    #[error("Store error: {0}")]
    Store(String),

    /// Mail could not be built or delivered
    #[error("Mail error: {0}")]
    Mail(String),

    /// A notification sink failed
    #[error("Sink {sink} failed: {message}")]
    Sink { sink: String, message: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Create a mail error.
    pub fn mail(message: impl fmt::Display) -> Self {
        Self::Mail(message.to_string())
    }

    /// Create a sink error with the sink name as context.
    pub fn sink(sink: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Sink {
            sink: sink.into(),
            message: message.to_string(),
        }
    }
}

impl From<lettre::error::Error> for AppError {
    fn from(e: lettre::error::Error) -> Self {
        Self::mail(e)
    }
}

impl From<lettre::address::AddressError> for AppError {
    fn from(e: lettre::address::AddressError) -> Self {
        Self::mail(e)
    }
}

impl From<lettre::transport::smtp::Error> for AppError {
    fn from(e: lettre::transport::smtp::Error) -> Self {
        Self::mail(e)
    }
}

/// Failure modes of a feed fetch.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Network or protocol failure before a response body was read
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response
    #[error("HTTP {status} when fetching {url}")]
    Status { status: u16, url: String },

    /// Body was not well-formed XML
    #[error("failed to parse feed: {0}")]
    Parse(String),

    /// Body parsed but holds no feed element to read entries from
    #[error("feed has no entry container")]
    NoEntryContainer,
}

impl From<quick_xml::Error> for FeedError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_error_display() {
        let err = AppError::sink("chat-webhook", "HTTP 500");
        assert_eq!(err.to_string(), "Sink chat-webhook failed: HTTP 500");
    }

    #[test]
    fn test_feed_error_converts() {
        let err: AppError = FeedError::NoEntryContainer.into();
        assert!(matches!(err, AppError::Feed(FeedError::NoEntryContainer)));
    }
}
