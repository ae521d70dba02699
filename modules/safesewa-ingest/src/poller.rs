use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::ingestor::Ingestor;
use crate::sources::SourceAdapter;

/// Runs each registered source on its own independent timer. A source's
/// failures never reach another source's schedule: everything is caught at
/// the task boundary and retried on the next tick, so a permanently broken
/// feed degrades to a logged no-op.
pub struct PollScheduler {
    ingestor: Arc<Ingestor>,
    /// Minimum allowed interval, protecting third-party rate limits.
    floor: Duration,
    handles: Vec<JoinHandle<()>>,
}

impl PollScheduler {
    pub fn new(ingestor: Arc<Ingestor>, floor: Duration) -> Self {
        Self {
            ingestor,
            floor,
            handles: Vec::new(),
        }
    }

    /// Start polling `adapter` every `every`, clamped to the floor. Ticks
    /// run until the scheduler is shut down; no ordering exists between
    /// different adapters' ticks.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>, every: Duration) {
        let every = if every < self.floor {
            warn!(
                source = adapter.name(),
                requested_secs = every.as_secs(),
                floor_secs = self.floor.as_secs(),
                "Poll interval below floor, clamping"
            );
            self.floor
        } else {
            every
        };

        let ingestor = Arc::clone(&self.ingestor);
        self.handles.push(tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                match ingestor.run_source(adapter.as_ref()).await {
                    Ok(stats) => info!(
                        source = adapter.name(),
                        fetched = stats.fetched,
                        created = stats.created,
                        skipped = stats.skipped,
                        failed = stats.failed,
                        "Poll tick complete"
                    ),
                    Err(e) => warn!(
                        source = adapter.name(),
                        error = %e,
                        "Fetch failed, retrying on next tick"
                    ),
                }
            }
        }));
    }

    pub fn source_count(&self) -> usize {
        self.handles.len()
    }

    /// Stop all polling tasks.
    pub fn shutdown(mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use safesewa_common::{AlertCategory, CandidateAlert, GeoPoint, SourceError};
    use safesewa_hub::BroadcastHub;
    use safesewa_store::{MemoryStore, RecordStore};

    use crate::notify::NoopNotify;

    struct BrokenSource;

    #[async_trait]
    impl SourceAdapter for BrokenSource {
        fn name(&self) -> &'static str {
            "broken"
        }
        async fn fetch(&self) -> Result<Vec<CandidateAlert>, SourceError> {
            Err(SourceError::Unavailable("connection refused".into()))
        }
    }

    /// Emits a fresh, unique candidate every fetch.
    struct TickerSource {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl SourceAdapter for TickerSource {
        fn name(&self) -> &'static str {
            "ticker"
        }
        async fn fetch(&self) -> Result<Vec<CandidateAlert>, SourceError> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(vec![CandidateAlert {
                category: AlertCategory::Fire,
                location: GeoPoint::new(27.7, 85.3).unwrap(),
                description: format!("Fire report #{n}"),
                detected_at: Utc::now(),
                source: "ticker".to_string(),
                dedup_key: None,
            }])
        }
    }

    fn ingestor(store: Arc<MemoryStore>) -> Arc<Ingestor> {
        let hub = Arc::new(BroadcastHub::new(
            Duration::from_secs(30),
            Duration::from_secs(90),
        ));
        Arc::new(Ingestor::new(store, hub, Arc::new(NoopNotify)))
    }

    #[tokio::test]
    async fn broken_source_never_stops_a_healthy_one() {
        let store = Arc::new(MemoryStore::new());
        let mut scheduler = PollScheduler::new(ingestor(Arc::clone(&store)), Duration::ZERO);

        scheduler.register(Arc::new(BrokenSource), Duration::from_millis(5));
        scheduler.register(
            Arc::new(TickerSource {
                fetches: AtomicUsize::new(0),
            }),
            Duration::from_millis(5),
        );
        assert_eq!(scheduler.source_count(), 2);

        tokio::time::sleep(Duration::from_millis(60)).await;
        scheduler.shutdown();

        let alerts = store.list_alerts(None).await.unwrap();
        assert!(
            alerts.len() >= 3,
            "healthy source should keep ticking, got {}",
            alerts.len()
        );
    }

    #[tokio::test]
    async fn interval_is_clamped_to_floor() {
        let store = Arc::new(MemoryStore::new());
        let mut scheduler =
            PollScheduler::new(ingestor(Arc::clone(&store)), Duration::from_secs(300));

        scheduler.register(
            Arc::new(TickerSource {
                fetches: AtomicUsize::new(0),
            }),
            Duration::from_millis(1),
        );

        // First tick fires immediately; the clamped 300 s cadence means no
        // second tick lands inside this window.
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.shutdown();

        let alerts = store.list_alerts(None).await.unwrap();
        assert_eq!(alerts.len(), 1);
    }
}
