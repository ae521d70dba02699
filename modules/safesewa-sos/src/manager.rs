use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use safesewa_common::{
    ActorRole, GeoPoint, LiveEvent, SessionPatch, SosSession, SosStatus, StoreError,
};
use safesewa_hub::BroadcastHub;
use safesewa_store::{Directory, RecordStore};

use crate::error::SosError;

/// Owns the SOS state machine. Every successful mutation is broadcast to the
/// hub; broadcasting is off the critical path and cannot fail the operation.
#[derive(Clone)]
pub struct SosManager {
    store: Arc<dyn RecordStore>,
    directory: Arc<dyn Directory>,
    hub: Arc<BroadcastHub>,
}

impl SosManager {
    pub fn new(
        store: Arc<dyn RecordStore>,
        directory: Arc<dyn Directory>,
        hub: Arc<BroadcastHub>,
    ) -> Self {
        Self {
            store,
            directory,
            hub,
        }
    }

    /// Open a new session. Succeeds for any well-formed input; unknown ids
    /// are logged but trusted (the directory is advisory).
    pub async fn create(
        &self,
        requester_id: &str,
        location: GeoPoint,
    ) -> Result<SosSession, SosError> {
        self.check_id(requester_id, "requester").await?;

        let session = self.store.create_session(requester_id, location).await?;
        info!(session = %session.id, requester = requester_id, "SOS created");
        self.hub.publish(&LiveEvent::SosCreated(session.clone()));
        Ok(session)
    }

    /// Claim an open session for a volunteer. First writer wins: the losing
    /// racer gets `Conflict`, a terminal session gets `InvalidTransition`.
    pub async fn accept(
        &self,
        session_id: Uuid,
        volunteer_id: &str,
        volunteer_location: GeoPoint,
    ) -> Result<SosSession, SosError> {
        self.check_id(volunteer_id, "volunteer").await?;

        let patch = SessionPatch::status(SosStatus::Accepted)
            .with_volunteer(volunteer_id, volunteer_location);
        match self
            .store
            .conditional_update(session_id, &[SosStatus::Open], patch)
            .await
        {
            Ok(session) => {
                info!(session = %session_id, volunteer = volunteer_id, "SOS accepted");
                self.hub.publish(&LiveEvent::SosAccepted(session.clone()));
                Ok(session)
            }
            Err(StoreError::Conflict) => Err(self.losing_outcome(session_id, "accept").await?),
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrite the role-appropriate location. Last write wins by arrival
    /// order; no causal ordering of client timestamps is attempted.
    pub async fn update_location(
        &self,
        session_id: Uuid,
        role: ActorRole,
        location: GeoPoint,
    ) -> Result<SosSession, SosError> {
        // A volunteer location only exists once a volunteer is attached.
        let (expected, patch): (&[SosStatus], SessionPatch) = match role {
            ActorRole::Requester => (
                &[SosStatus::Open, SosStatus::Accepted],
                SessionPatch {
                    requester_location: Some(location),
                    ..SessionPatch::default()
                },
            ),
            ActorRole::Volunteer => (
                &[SosStatus::Accepted],
                SessionPatch {
                    volunteer_location: Some(location),
                    ..SessionPatch::default()
                },
            ),
        };

        match self.store.conditional_update(session_id, expected, patch).await {
            Ok(session) => {
                self.hub.publish(&LiveEvent::LocationUpdate(session.clone()));
                Ok(session)
            }
            Err(StoreError::Conflict) => {
                Err(self.losing_outcome(session_id, "update location on").await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Terminal resolution by the requester or an operator.
    pub async fn resolve(&self, session_id: Uuid) -> Result<SosSession, SosError> {
        self.close(session_id, SosStatus::Resolved, "resolve").await
    }

    /// Terminal expiry, driven by an external timeout policy.
    pub async fn expire(&self, session_id: Uuid) -> Result<SosSession, SosError> {
        self.close(session_id, SosStatus::Expired, "expire").await
    }

    async fn close(
        &self,
        session_id: Uuid,
        terminal: SosStatus,
        op: &'static str,
    ) -> Result<SosSession, SosError> {
        debug_assert!(terminal.is_terminal());
        match self
            .store
            .conditional_update(
                session_id,
                &[SosStatus::Open, SosStatus::Accepted],
                SessionPatch::status(terminal),
            )
            .await
        {
            Ok(session) => {
                info!(session = %session_id, status = %session.status, "SOS closed");
                self.hub.publish(&LiveEvent::SosClosed(session.clone()));
                Ok(session)
            }
            Err(StoreError::Conflict) => Err(self.losing_outcome(session_id, op).await?),
            Err(e) => Err(e.into()),
        }
    }

    /// Turn a failed conditional update into the caller-facing error by
    /// re-reading the session: an already-accepted session is a `Conflict`
    /// for `accept`, everything else is an `InvalidTransition`.
    async fn losing_outcome(
        &self,
        session_id: Uuid,
        op: &'static str,
    ) -> Result<SosError, SosError> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or(SosError::NotFound)?;
        if op == "accept" && session.status == SosStatus::Accepted {
            return Ok(SosError::Conflict);
        }
        Ok(SosError::InvalidTransition {
            from: session.status,
            op,
        })
    }

    async fn check_id(&self, user_id: &str, role: &str) -> Result<(), SosError> {
        if user_id.trim().is_empty() {
            return Err(SosError::InvalidInput(format!("{role} id must not be empty")));
        }
        match self.directory.is_known(user_id).await {
            Ok(true) => {}
            Ok(false) => warn!(user = user_id, role, "Id not present in directory"),
            Err(e) => warn!(user = user_id, role, error = %e, "Directory lookup failed"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use safesewa_common::Topic;
    use safesewa_hub::HubMessage;
    use safesewa_store::{MemoryDirectory, MemoryStore};

    fn manager() -> (SosManager, Arc<BroadcastHub>) {
        let hub = Arc::new(BroadcastHub::new(
            Duration::from_secs(30),
            Duration::from_secs(90),
        ));
        let directory = MemoryDirectory::new();
        directory.register("user-1");
        directory.register("vol-1");
        let manager = SosManager::new(
            Arc::new(MemoryStore::new()),
            Arc::new(directory),
            Arc::clone(&hub),
        );
        (manager, hub)
    }

    fn loc(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).unwrap()
    }

    #[tokio::test]
    async fn create_opens_session_and_broadcasts() {
        let (manager, hub) = manager();
        let mut sub = hub.subscribe([Topic::SosEvents]);

        let session = manager.create("user-1", loc(27.7, 85.3)).await.unwrap();
        assert_eq!(session.status, SosStatus::Open);
        assert!(session.volunteer_id.is_none());

        match sub.rx.try_recv().unwrap() {
            HubMessage::Event(LiveEvent::SosCreated(s)) => assert_eq!(s.id, session.id),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_rejects_blank_requester() {
        let (manager, _hub) = manager();
        let err = manager.create("  ", loc(27.7, 85.3)).await.unwrap_err();
        assert!(matches!(err, SosError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn second_accept_loses_with_conflict() {
        let (manager, _hub) = manager();
        let session = manager.create("user-1", loc(27.7, 85.3)).await.unwrap();

        let accepted = manager
            .accept(session.id, "vol-1", loc(27.71, 85.31))
            .await
            .unwrap();
        assert_eq!(accepted.status, SosStatus::Accepted);
        assert_eq!(accepted.volunteer_id.as_deref(), Some("vol-1"));

        let err = manager
            .accept(session.id, "vol-2", loc(27.72, 85.32))
            .await
            .unwrap_err();
        assert!(matches!(err, SosError::Conflict));

        // First writer's claim is untouched.
        let current = manager
            .store
            .get_session(session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.volunteer_id.as_deref(), Some("vol-1"));
    }

    #[tokio::test]
    async fn concurrent_accepts_yield_one_winner() {
        let (manager, _hub) = manager();
        let session = manager.create("user-1", loc(27.7, 85.3)).await.unwrap();

        let a = manager.accept(session.id, "vol-1", loc(27.71, 85.31));
        let b = manager.accept(session.id, "vol-2", loc(27.72, 85.32));
        let (ra, rb) = tokio::join!(a, b);

        let winners = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        let conflict = [ra, rb]
            .into_iter()
            .filter(|r| matches!(r, Err(SosError::Conflict)))
            .count();
        assert_eq!(conflict, 1);
    }

    #[tokio::test]
    async fn accept_on_terminal_session_is_invalid_transition() {
        let (manager, _hub) = manager();
        let session = manager.create("user-1", loc(27.7, 85.3)).await.unwrap();
        manager.resolve(session.id).await.unwrap();

        let err = manager
            .accept(session.id, "vol-1", loc(27.71, 85.31))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SosError::InvalidTransition {
                from: SosStatus::Resolved,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn location_updates_are_last_write_wins() {
        let (manager, _hub) = manager();
        let session = manager.create("user-1", loc(27.7, 85.3)).await.unwrap();

        manager
            .update_location(session.id, ActorRole::Requester, loc(27.8, 85.4))
            .await
            .unwrap();
        let after_b = manager
            .update_location(session.id, ActorRole::Requester, loc(27.9, 85.5))
            .await
            .unwrap();

        assert_eq!(after_b.requester_location, loc(27.9, 85.5));
    }

    #[tokio::test]
    async fn volunteer_cannot_update_location_before_accepting() {
        let (manager, _hub) = manager();
        let session = manager.create("user-1", loc(27.7, 85.3)).await.unwrap();

        let err = manager
            .update_location(session.id, ActorRole::Volunteer, loc(27.8, 85.4))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SosError::InvalidTransition {
                from: SosStatus::Open,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn status_never_moves_backward() {
        let (manager, _hub) = manager();
        let session = manager.create("user-1", loc(27.7, 85.3)).await.unwrap();
        manager
            .accept(session.id, "vol-1", loc(27.71, 85.31))
            .await
            .unwrap();
        manager.resolve(session.id).await.unwrap();

        // Every further mutation is rejected and leaves the status alone.
        assert!(manager.resolve(session.id).await.is_err());
        assert!(manager.expire(session.id).await.is_err());
        assert!(manager
            .update_location(session.id, ActorRole::Requester, loc(27.8, 85.4))
            .await
            .is_err());

        let current = manager
            .store
            .get_session(session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.status, SosStatus::Resolved);
    }

    #[tokio::test]
    async fn operations_on_missing_session_are_not_found() {
        let (manager, _hub) = manager();
        let err = manager
            .accept(Uuid::new_v4(), "vol-1", loc(27.7, 85.3))
            .await
            .unwrap_err();
        assert!(matches!(err, SosError::NotFound));
    }
}
