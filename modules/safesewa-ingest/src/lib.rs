//! Hazard-signal ingestion: source adapters for the external feeds, the
//! deduplicating ingestor, the per-source poll scheduler, and the push
//! notification gateway.

pub mod ingestor;
pub mod notify;
pub mod poller;
pub mod sources;

pub use ingestor::{IngestOutcome, Ingestor, RunStats};
pub use poller::PollScheduler;
pub use sources::SourceAdapter;
