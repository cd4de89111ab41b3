//! Admin booking management and dashboard

use auth::AuthUser;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::{Map, Value, json};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{
        PageInfo,
        booking::{BookingListResponse, BookingQuery, BookingResponse},
        paginate,
    },
    repositories::{BookingFilter, CancelOutcome},
    state::AppState,
};

/// `GET /api/admin/bookings`
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<BookingQuery>,
) -> ApiResult<impl IntoResponse> {
    let (page, page_size) = paginate(query.page, query.page_size, 20, 100);

    let (bookings, total) = state
        .bookings
        .list(&BookingFilter {
            status: query.status,
            service_type: query.service_type,
            limit: page_size,
            offset: (page - 1) * page_size,
        })
        .await?;

    Ok(Json(BookingListResponse {
        bookings: bookings.iter().map(BookingResponse::from).collect(),
        page: PageInfo::new(total, page, page_size),
    }))
}

/// `GET /api/admin/bookings/:id`
pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let booking = state
        .bookings
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))?;

    Ok(Json(BookingResponse::from(&booking)))
}

/// `POST /api/admin/bookings/:id/cancel`
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    match state.bookings.cancel(id).await? {
        CancelOutcome::Cancelled(booking) => {
            info!(booking_id = %id, cancelled_by = %admin.id, "Booking cancelled");
            Ok(Json(BookingResponse::from(&booking)))
        }
        CancelOutcome::NotCancellable(booking) => Err(ApiError::Conflict(format!(
            "Booking cannot be cancelled from status {}",
            booking.status
        ))),
        CancelOutcome::NotFound => Err(ApiError::NotFound("Booking not found".to_string())),
    }
}

/// `GET /api/admin/dashboard`
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let counts = state.bookings.status_counts().await?;
    let total: i64 = counts.iter().map(|(_, count)| count).sum();
    let by_status: Map<String, Value> = counts
        .into_iter()
        .map(|(status, count)| (status.as_str().to_string(), json!(count)))
        .collect();

    let unread_messages = state.contacts.unread_count().await?;
    let media_count = state.media.count().await?;

    Ok(Json(json!({
        "bookings": {
            "total": total,
            "by_status": by_status,
        },
        "unread_messages": unread_messages,
        "media_count": media_count,
    })))
}
