use async_trait::async_trait;
use uuid::Uuid;

use safesewa_common::{
    AlertCategory, Fingerprint, GeoPoint, HazardAlert, SessionPatch, SosSession, SosStatus,
    StoreError,
};

/// Narrow interface to the external record store.
///
/// Alerts are immutable once inserted; the fingerprint uniqueness constraint
/// lives here as the backstop behind the ingestor's best-effort dedup.
/// Session writes go through `conditional_update`, the atomic
/// update-and-return primitive that linearizes mutations per session id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<HazardAlert>, StoreError>;

    /// Insert a new alert. Returns `StoreError::Conflict` if an alert with
    /// the same (category, location, description) triple already exists.
    async fn insert_alert(&self, alert: HazardAlert) -> Result<HazardAlert, StoreError>;

    async fn list_alerts(
        &self,
        category: Option<AlertCategory>,
    ) -> Result<Vec<HazardAlert>, StoreError>;

    async fn create_session(
        &self,
        requester_id: &str,
        location: GeoPoint,
    ) -> Result<SosSession, StoreError>;

    async fn get_session(&self, id: Uuid) -> Result<Option<SosSession>, StoreError>;

    async fn list_sessions(&self) -> Result<Vec<SosSession>, StoreError>;

    /// Apply `patch` iff the session's current status is in `expected`,
    /// stamping `updated_at`. Returns the new value, `Conflict` when the
    /// precondition fails, `NotFound` when the session does not exist.
    async fn conditional_update(
        &self,
        id: Uuid,
        expected: &[SosStatus],
        patch: SessionPatch,
    ) -> Result<SosSession, StoreError>;
}

/// Resolves requester/volunteer ids against the user directory. Advisory:
/// the core trusts ids it is handed and only logs unknown ones.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn is_known(&self, user_id: &str) -> Result<bool, StoreError>;
}
