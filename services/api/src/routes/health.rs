//! Liveness and readiness probes

use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;
use serde_json::json;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Liveness: the process is serving requests
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "portfolio-api",
        "timestamp": Utc::now(),
    }))
}

/// Readiness: the database answers a round trip
pub async fn ready(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    if !common::database::health_check(&state.db_pool).await? {
        return Err(ApiError::Unavailable("Database unavailable".to_string()));
    }

    Ok(Json(json!({
        "status": "ready",
        "database": "ok",
    })))
}
