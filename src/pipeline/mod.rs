//! Pipeline entry points.
//!
//! - `run_ingestion`: Check every channel's feed once, announcing new videos
//! - `run_digest`: Mail last week's announced videos
//! - `Scheduler`: Run both on their timers until interrupted

pub mod digest;
pub mod ingest;
pub mod run;
pub mod scheduler;

pub use digest::{DigestAggregator, DigestOutcome};
pub use ingest::{ChangeDetector, IngestMode, IngestOutcome, IngestReport};
pub use run::{RunSummary, run_digest, run_ingestion};
pub use scheduler::Scheduler;
