use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use safesewa_common::{
    AlertCategory, CandidateAlert, HazardAlert, LiveEvent, SourceError, StoreError,
};
use safesewa_hub::BroadcastHub;
use safesewa_store::RecordStore;

use crate::notify::NotifyBackend;
use crate::sources::SourceAdapter;

/// Result of ingesting one candidate. A duplicate is a normal outcome, not
/// an error.
#[derive(Debug)]
pub enum IngestOutcome {
    Created(HazardAlert),
    Skipped,
}

/// Per-tick counters for one source run.
#[derive(Debug, Default)]
pub struct RunStats {
    pub fetched: usize,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Decides novelty and persists. Check-then-act against the shared store:
/// concurrent pollers racing on one fingerprint may both pass the check, so
/// the store's uniqueness constraint is the backstop and a losing insert is
/// downgraded to `Skipped`.
pub struct Ingestor {
    store: Arc<dyn RecordStore>,
    hub: Arc<BroadcastHub>,
    notify: Arc<dyn NotifyBackend>,
    notify_categories: HashSet<AlertCategory>,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn RecordStore>,
        hub: Arc<BroadcastHub>,
        notify: Arc<dyn NotifyBackend>,
    ) -> Self {
        Self {
            store,
            hub,
            notify,
            // Flood and earthquake alerts page responders; fire/curfew only
            // reach the live channel.
            notify_categories: [AlertCategory::Flood, AlertCategory::Earthquake].into(),
        }
    }

    pub fn with_notify_categories(
        mut self,
        categories: impl IntoIterator<Item = AlertCategory>,
    ) -> Self {
        self.notify_categories = categories.into_iter().collect();
        self
    }

    /// Persist a candidate if its fingerprint is novel. On creation the new
    /// alert is published to the hub and, for notifiable categories, handed
    /// to the push gateway. Both are fire-and-forget; neither can roll back
    /// the persisted record.
    pub async fn ingest(&self, candidate: CandidateAlert) -> Result<IngestOutcome, StoreError> {
        let fingerprint = candidate.fingerprint();
        if self.store.find_by_fingerprint(&fingerprint).await?.is_some() {
            return Ok(IngestOutcome::Skipped);
        }

        let alert = match self
            .store
            .insert_alert(HazardAlert::from_candidate(&candidate))
            .await
        {
            Ok(alert) => alert,
            Err(StoreError::Conflict) => {
                // Another poller won the race between our check and insert.
                warn!(source = %candidate.source, "Lost dedup race, treating as duplicate");
                return Ok(IngestOutcome::Skipped);
            }
            Err(e) => return Err(e),
        };

        info!(
            alert = %alert.id,
            category = %alert.category,
            source = %alert.source,
            "Persisted new hazard alert"
        );

        self.hub.publish(&LiveEvent::NewAlert(alert.clone()));

        if self.notify_categories.contains(&alert.category) {
            let notify = Arc::clone(&self.notify);
            let title = format!("{} alert", capitalized(alert.category.as_str()));
            let body = alert.description.clone();
            let topic = format!("{}-alerts", alert.category);
            tokio::spawn(async move {
                if let Err(e) = notify.notify(&title, &body, &topic).await {
                    warn!(error = %e, topic, "Push notification failed");
                }
            });
        }

        Ok(IngestOutcome::Created(alert))
    }

    /// One full fetch → ingest pass over a source. Store failures on
    /// individual candidates are counted and logged, never fatal to the
    /// rest of the batch.
    pub async fn run_source(&self, adapter: &dyn SourceAdapter) -> Result<RunStats, SourceError> {
        let candidates = adapter.fetch().await?;
        let mut stats = RunStats {
            fetched: candidates.len(),
            ..RunStats::default()
        };

        for candidate in candidates {
            match self.ingest(candidate).await {
                Ok(IngestOutcome::Created(_)) => stats.created += 1,
                Ok(IngestOutcome::Skipped) => stats.skipped += 1,
                Err(e) => {
                    stats.failed += 1;
                    warn!(source = adapter.name(), error = %e, "Failed to persist candidate");
                }
            }
        }
        Ok(stats)
    }
}

fn capitalized(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::Utc;
    use safesewa_common::{GeoPoint, Topic};
    use safesewa_hub::HubMessage;
    use safesewa_store::MemoryStore;

    use crate::notify::NoopNotify;

    fn ingestor() -> (Ingestor, Arc<BroadcastHub>) {
        let hub = Arc::new(BroadcastHub::new(
            Duration::from_secs(30),
            Duration::from_secs(90),
        ));
        let ingestor = Ingestor::new(
            Arc::new(MemoryStore::new()),
            Arc::clone(&hub),
            Arc::new(NoopNotify),
        );
        (ingestor, hub)
    }

    fn quake(description: &str, epicenter: &str) -> CandidateAlert {
        CandidateAlert {
            category: AlertCategory::Earthquake,
            location: GeoPoint::new(28.2, 84.1).unwrap(),
            description: description.to_string(),
            detected_at: Utc::now(),
            source: "seismic".to_string(),
            dedup_key: Some(epicenter.to_string()),
        }
    }

    #[tokio::test]
    async fn same_fingerprint_twice_persists_once() {
        let (ingestor, _hub) = ingestor();

        let first = ingestor.ingest(quake("Mag 5.1 at X", "X")).await.unwrap();
        assert!(matches!(first, IngestOutcome::Created(_)));

        let second = ingestor.ingest(quake("Mag 5.1 at X", "X")).await.unwrap();
        assert!(matches!(second, IngestOutcome::Skipped));

        let stored = ingestor.store.list_alerts(None).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn novel_alert_is_broadcast() {
        let (ingestor, hub) = ingestor();
        let mut sub = hub.subscribe([Topic::HazardAlerts]);

        ingestor.ingest(quake("Mag 5.1 at X", "X")).await.unwrap();
        match sub.rx.try_recv().unwrap() {
            HubMessage::Event(LiveEvent::NewAlert(a)) => {
                assert_eq!(a.description, "Mag 5.1 at X")
            }
            other => panic!("unexpected message: {other:?}"),
        }

        // Duplicate is not re-broadcast.
        ingestor.ingest(quake("Mag 5.1 at X", "X")).await.unwrap();
        assert!(sub.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn distinct_fingerprints_both_persist() {
        let (ingestor, _hub) = ingestor();
        ingestor.ingest(quake("Mag 5.1 at X", "X")).await.unwrap();
        ingestor.ingest(quake("Mag 4.4 at Y", "Y")).await.unwrap();
        let stored = ingestor.store.list_alerts(None).await.unwrap();
        assert_eq!(stored.len(), 2);
    }
}
