use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use safesewa_common::{AlertCategory, HazardAlert};

use crate::error::ApiError;
use crate::state::AppState;

/// Snapshot of every persisted hazard alert.
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<HazardAlert>>, ApiError> {
    Ok(Json(state.store.list_alerts(None).await?))
}

#[derive(Deserialize)]
pub struct DisasterQuery {
    pub category: Option<String>,
}

/// Same snapshot with an optional category filter.
pub async fn list_disasters(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DisasterQuery>,
) -> Result<Json<Vec<HazardAlert>>, ApiError> {
    let category = query
        .category
        .map(|c| c.parse::<AlertCategory>())
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(state.store.list_alerts(category).await?))
}
