//! Checkout, redirect and webhook endpoints under `/api/stripe`

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::JsonRejection},
    http::HeaderMap,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::{
    error::{ApiError, ApiResult},
    models::booking::{BookingResponse, CheckoutRequest},
    state::AppState,
};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: Option<String>,
}

/// Create a pending booking and return the hosted checkout url
pub async fn create_checkout(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let response = state.checkout.initiate(request).await?;
    Ok(Json(response))
}

/// Redirect target after a completed payment
pub async fn checkout_success(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<impl IntoResponse> {
    let session_id = query
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Validation("session_id is required".to_string()))?;

    let booking = state
        .checkout
        .booking_for_session(&session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))?;

    Ok(Json(json!({
        "message": "Payment successful",
        "booking": BookingResponse::from(&booking),
    })))
}

/// Redirect target after an abandoned payment
pub async fn checkout_cancel(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<impl IntoResponse> {
    let booking = match query.session_id.filter(|id| !id.is_empty()) {
        Some(session_id) => state.checkout.booking_for_session(&session_id).await?,
        None => None,
    };

    Ok(Json(json!({
        "message": "Payment cancelled",
        "booking": booking.as_ref().map(BookingResponse::from),
    })))
}

/// Processor callback. The raw body is needed for signature verification.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if signature.is_empty() {
        warn!("Webhook delivery without signature header");
    }

    state.webhooks.handle(&body, signature).await?;
    Ok(Json(json!({ "received": true })))
}
