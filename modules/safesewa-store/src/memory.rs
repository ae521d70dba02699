use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use safesewa_common::{
    AlertCategory, Fingerprint, GeoPoint, HazardAlert, SessionPatch, SosSession, SosStatus,
    StoreError,
};

use crate::store::{Directory, RecordStore};

/// In-memory record store. Conditional updates are atomic under the session
/// lock, matching the serialization guarantee of the production store.
#[derive(Default)]
pub struct MemoryStore {
    alerts: Mutex<Vec<HazardAlert>>,
    sessions: Mutex<HashMap<Uuid, SosSession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Uniqueness backstop: exact (category, rounded location, description)
/// triple, case-insensitive on the description.
fn same_triple(a: &HazardAlert, b: &HazardAlert) -> bool {
    a.category == b.category
        && a.location.rounded() == b.location.rounded()
        && a.description.eq_ignore_ascii_case(&b.description)
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<HazardAlert>, StoreError> {
        let alerts = self.alerts.lock().expect("alerts lock");
        Ok(alerts.iter().find(|a| fingerprint.matches(a)).cloned())
    }

    async fn insert_alert(&self, alert: HazardAlert) -> Result<HazardAlert, StoreError> {
        let mut alerts = self.alerts.lock().expect("alerts lock");
        if alerts.iter().any(|a| same_triple(a, &alert)) {
            return Err(StoreError::Conflict);
        }
        alerts.push(alert.clone());
        Ok(alert)
    }

    async fn list_alerts(
        &self,
        category: Option<AlertCategory>,
    ) -> Result<Vec<HazardAlert>, StoreError> {
        let alerts = self.alerts.lock().expect("alerts lock");
        Ok(alerts
            .iter()
            .filter(|a| category.map_or(true, |c| a.category == c))
            .cloned()
            .collect())
    }

    async fn create_session(
        &self,
        requester_id: &str,
        location: GeoPoint,
    ) -> Result<SosSession, StoreError> {
        let now = Utc::now();
        let session = SosSession {
            id: Uuid::new_v4(),
            requester_id: requester_id.to_string(),
            requester_location: location,
            status: SosStatus::Open,
            volunteer_id: None,
            volunteer_location: None,
            created_at: now,
            updated_at: now,
        };
        let mut sessions = self.sessions.lock().expect("sessions lock");
        sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<SosSession>, StoreError> {
        let sessions = self.sessions.lock().expect("sessions lock");
        Ok(sessions.get(&id).cloned())
    }

    async fn list_sessions(&self) -> Result<Vec<SosSession>, StoreError> {
        let sessions = self.sessions.lock().expect("sessions lock");
        Ok(sessions.values().cloned().collect())
    }

    async fn conditional_update(
        &self,
        id: Uuid,
        expected: &[SosStatus],
        patch: SessionPatch,
    ) -> Result<SosSession, StoreError> {
        let mut sessions = self.sessions.lock().expect("sessions lock");
        let session = sessions.get_mut(&id).ok_or(StoreError::NotFound)?;
        if !expected.contains(&session.status) {
            return Err(StoreError::Conflict);
        }
        if let Some(status) = patch.status {
            session.status = status;
        }
        if let Some(loc) = patch.requester_location {
            session.requester_location = loc;
        }
        if let Some(vid) = patch.volunteer_id {
            session.volunteer_id = Some(vid);
        }
        if let Some(loc) = patch.volunteer_location {
            session.volunteer_location = Some(loc);
        }
        session.updated_at = Utc::now();
        Ok(session.clone())
    }
}

/// In-memory user directory for tests and local development.
#[derive(Default)]
pub struct MemoryDirectory {
    known: Mutex<HashSet<String>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, user_id: impl Into<String>) {
        self.known.lock().expect("directory lock").insert(user_id.into());
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn is_known(&self, user_id: &str) -> Result<bool, StoreError> {
        Ok(self.known.lock().expect("directory lock").contains(user_id))
    }
}
