//! End-to-end tests over the HTTP surface with the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use safesewa_api::{app, state::AppState};
use safesewa_common::{AlertCategory, CandidateAlert, GeoPoint, HazardAlert};
use safesewa_hub::BroadcastHub;
use safesewa_sos::SosManager;
use safesewa_store::{MemoryDirectory, MemoryStore, RecordStore};

fn test_state() -> Arc<AppState> {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let hub = Arc::new(BroadcastHub::new(
        Duration::from_secs(30),
        Duration::from_secs(90),
    ));
    let directory = MemoryDirectory::new();
    directory.register("user-1");
    let sos = SosManager::new(
        Arc::clone(&store) as Arc<dyn RecordStore>,
        Arc::new(directory),
        Arc::clone(&hub),
    );
    Arc::new(AppState {
        store,
        hub,
        sos,
    })
}

async fn request(state: &Arc<AppState>, req: Request<Body>) -> (StatusCode, Value) {
    let response = app(Arc::clone(state)).oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn created_sos_shows_up_in_snapshot_as_open() {
    let state = test_state();

    let (status, session) = request(
        &state,
        post("/sos", json!({"userId": "user-1", "latitude": 27.7, "longitude": 85.3})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["status"], "open");
    assert_eq!(session["requesterId"], "user-1");

    let (status, list) = request(&state, get("/sos-alerts")).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], session["id"]);
    assert_eq!(list[0]["status"], "open");
}

#[tokio::test]
async fn acceptance_race_losing_volunteer_gets_conflict() {
    let state = test_state();

    let (_, session) = request(
        &state,
        post("/sos", json!({"userId": "user-1", "latitude": 27.7, "longitude": 85.3})),
    )
    .await;
    let id = session["id"].as_str().unwrap().to_string();

    let (status, accepted) = request(
        &state,
        post(
            "/sos/accept",
            json!({"sessionId": id, "volunteerId": "V1", "latitude": 27.71, "longitude": 85.31}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "accepted");
    assert_eq!(accepted["volunteerId"], "V1");

    let (status, err) = request(
        &state,
        post(
            "/sos/accept",
            json!({"sessionId": id, "volunteerId": "V2", "latitude": 27.72, "longitude": 85.32}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "conflict");

    // First writer's claim survives.
    let (_, list) = request(&state, get("/sos-alerts")).await;
    assert_eq!(list.as_array().unwrap()[0]["volunteerId"], "V1");
}

#[tokio::test]
async fn location_update_is_last_write_wins() {
    let state = test_state();

    let (_, session) = request(
        &state,
        post("/sos", json!({"userId": "user-1", "latitude": 27.7, "longitude": 85.3})),
    )
    .await;
    let id = session["id"].as_str().unwrap().to_string();

    for (lat, lng) in [(27.8, 85.4), (27.9, 85.5)] {
        let (status, _) = request(
            &state,
            post(
                "/sos/update-location",
                json!({"sessionId": id, "role": "requester", "latitude": lat, "longitude": lng}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, list) = request(&state, get("/sos-alerts")).await;
    let session = &list.as_array().unwrap()[0];
    assert_eq!(session["requesterLocation"]["lat"], 27.9);
    assert_eq!(session["requesterLocation"]["lng"], 85.5);
}

#[tokio::test]
async fn mutating_a_resolved_session_is_rejected() {
    let state = test_state();

    let (_, session) = request(
        &state,
        post("/sos", json!({"userId": "user-1", "latitude": 27.7, "longitude": 85.3})),
    )
    .await;
    let id = session["id"].as_str().unwrap().to_string();

    let (status, _) = request(&state, post("/sos/resolve", json!({"sessionId": id}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, err) = request(
        &state,
        post(
            "/sos/accept",
            json!({"sessionId": id, "volunteerId": "V1", "latitude": 27.7, "longitude": 85.3}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "invalid_transition");
}

#[tokio::test]
async fn out_of_range_coordinates_are_a_bad_request() {
    let state = test_state();
    let (status, err) = request(
        &state,
        post("/sos", json!({"userId": "user-1", "latitude": 123.0, "longitude": 85.3})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "bad_request");
}

#[tokio::test]
async fn disasters_endpoint_filters_by_category() {
    let state = test_state();

    for (category, desc) in [
        (AlertCategory::Earthquake, "Mag 5.1 at Gorkha"),
        (AlertCategory::Flood, "Koshi basin flood"),
    ] {
        state
            .store
            .insert_alert(HazardAlert::from_candidate(&CandidateAlert {
                category,
                location: GeoPoint::new(27.7, 85.3).unwrap(),
                description: desc.to_string(),
                detected_at: chrono::Utc::now(),
                source: "test".to_string(),
                dedup_key: None,
            }))
            .await
            .unwrap();
    }

    let (status, all) = request(&state, get("/alerts")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, floods) = request(&state, get("/disasters?category=flood")).await;
    assert_eq!(status, StatusCode::OK);
    let floods = floods.as_array().unwrap();
    assert_eq!(floods.len(), 1);
    assert_eq!(floods[0]["category"], "flood");

    let (status, _) = request(&state, get("/disasters?category=asteroid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_session_yields_not_found() {
    let state = test_state();
    let (status, err) = request(
        &state,
        post(
            "/sos/accept",
            json!({
                "sessionId": uuid::Uuid::new_v4(),
                "volunteerId": "V1",
                "latitude": 27.7,
                "longitude": 85.3
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "not_found");
}
