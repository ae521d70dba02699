use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use safesewa_common::StoreError;
use safesewa_sos::SosError;

/// Caller-facing error. Rejected SOS transitions surface explicitly; a store
/// outage surfaces as a failed operation on whatever was attempted.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Sos(SosError),
    Store(StoreError),
}

impl From<SosError> for ApiError {
    fn from(e: SosError) -> Self {
        Self::Sos(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            Self::Sos(e) => match e {
                SosError::InvalidInput(msg) => {
                    (StatusCode::BAD_REQUEST, "bad_request", msg.clone())
                }
                SosError::NotFound => {
                    (StatusCode::NOT_FOUND, "not_found", e.to_string())
                }
                SosError::Conflict => (StatusCode::CONFLICT, "conflict", e.to_string()),
                SosError::InvalidTransition { .. } => {
                    (StatusCode::CONFLICT, "invalid_transition", e.to_string())
                }
                SosError::Store(_) => {
                    (StatusCode::BAD_GATEWAY, "store_unavailable", e.to_string())
                }
            },
            Self::Store(e) => match e {
                StoreError::NotFound => (StatusCode::NOT_FOUND, "not_found", e.to_string()),
                _ => (StatusCode::BAD_GATEWAY, "store_unavailable", e.to_string()),
            },
        };

        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}
