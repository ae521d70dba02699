use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use safesewa_common::{ActorRole, GeoPoint, SosSession};

use crate::error::ApiError;
use crate::state::AppState;

fn geo(latitude: f64, longitude: f64) -> Result<GeoPoint, ApiError> {
    GeoPoint::new(latitude, longitude).map_err(|e| ApiError::BadRequest(e.to_string()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSosRequest {
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
}

pub async fn create_sos(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSosRequest>,
) -> Result<(StatusCode, Json<SosSession>), ApiError> {
    let location = geo(req.latitude, req.longitude)?;
    let session = state.sos.create(&req.user_id, location).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptSosRequest {
    pub session_id: Uuid,
    pub volunteer_id: String,
    pub latitude: f64,
    pub longitude: f64,
}

pub async fn accept_sos(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AcceptSosRequest>,
) -> Result<Json<SosSession>, ApiError> {
    let location = geo(req.latitude, req.longitude)?;
    let session = state
        .sos
        .accept(req.session_id, &req.volunteer_id, location)
        .await?;
    Ok(Json(session))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLocationRequest {
    pub session_id: Uuid,
    pub role: ActorRole,
    pub latitude: f64,
    pub longitude: f64,
}

pub async fn update_location(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateLocationRequest>,
) -> Result<Json<SosSession>, ApiError> {
    let location = geo(req.latitude, req.longitude)?;
    let session = state
        .sos
        .update_location(req.session_id, req.role, location)
        .await?;
    Ok(Json(session))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseSosRequest {
    pub session_id: Uuid,
}

pub async fn resolve_sos(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CloseSosRequest>,
) -> Result<Json<SosSession>, ApiError> {
    Ok(Json(state.sos.resolve(req.session_id).await?))
}

pub async fn expire_sos(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CloseSosRequest>,
) -> Result<Json<SosSession>, ApiError> {
    Ok(Json(state.sos.expire(req.session_id).await?))
}

/// Snapshot of all sessions, straight from the record store rather than the
/// hub; late subscribers read history here.
pub async fn list_sos(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SosSession>>, ApiError> {
    Ok(Json(state.store.list_sessions().await?))
}
