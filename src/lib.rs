// src/lib.rs

//! TubeWatch Library
//!
//! Polls channel feeds, records newly published videos exactly once,
//! announces them through the configured sinks, and mails a weekly digest.

pub mod error;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod testing;
