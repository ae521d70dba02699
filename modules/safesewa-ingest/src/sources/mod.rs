use async_trait::async_trait;

use safesewa_common::{CandidateAlert, SourceError};

pub mod gdacs;
pub mod hydrology;
pub mod seismic;

pub use gdacs::GdacsSource;
pub use hydrology::{HydrologySource, Station};
pub use seismic::SeismicSource;

/// One external feed. A fetch produces a finite batch of candidates with the
/// source's severity filter already applied. Individual malformed rows are
/// skipped inside the adapter; only whole-fetch failures surface, and those
/// are recoverable (the scheduler retries on the next tick).
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Adapter name for logging and alert provenance.
    fn name(&self) -> &'static str;

    async fn fetch(&self) -> Result<Vec<CandidateAlert>, SourceError>;
}

/// Map a reqwest failure onto the source taxonomy.
pub(crate) fn fetch_error(url: &str, e: reqwest::Error) -> SourceError {
    if e.is_timeout() {
        SourceError::Timeout(url.to_string())
    } else {
        SourceError::Unavailable(e.to_string())
    }
}

/// Shared HTTP client with the bounded fetch timeout all sources carry.
pub(crate) fn http_client(timeout: std::time::Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent("Mozilla/5.0 (compatible; SafeSewa/0.1)")
        .build()
        .expect("reqwest client")
}
