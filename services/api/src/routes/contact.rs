//! Contact form submission and the admin inbox

use std::net::SocketAddr;

use auth::{
    middleware::client_ip,
    validation::{validate_email, validate_max_len, validate_required},
};
use axum::{
    Json,
    extract::{ConnectInfo, Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_extra::{TypedHeader, headers::UserAgent};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{
        PageInfo,
        contact::{ContactMessage, ContactRequest, MessageListResponse, MessageQuery, NewContactMessage},
        paginate,
    },
    repositories::contact::MessageFilter,
    state::AppState,
};

fn validate(request: ContactRequest) -> Result<NewContactMessage, String> {
    let name = request.name.trim().to_string();
    let email = request.email.trim().to_lowercase();
    let subject = request.subject.trim().to_string();
    let message = request.message.trim().to_string();
    let phone = request
        .phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());

    if name.is_empty() || email.is_empty() || subject.is_empty() || message.is_empty() {
        return Err("Name, email, subject and message are required".to_string());
    }
    validate_required("Name", &name, 255)?;
    validate_email(&email)?;
    validate_required("Subject", &subject, 255)?;
    validate_required("Message", &message, 2000)?;
    if let Some(phone) = &phone {
        validate_max_len("Phone", phone, 50)?;
    }

    Ok(NewContactMessage {
        name,
        email,
        phone,
        subject,
        message,
        ip_address: None,
        user_agent: None,
    })
}

/// `POST /api/contact`, limited per client address
pub async fn submit(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    user_agent: Option<TypedHeader<UserAgent>>,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let ip = client_ip(&headers, peer.as_ref(), &state.trusted_proxies);
    if state.contact_limiter.is_blocked(&ip).await {
        warn!(client_ip = %ip, "Contact form rate limit exceeded");
        return Err(ApiError::RateLimited);
    }

    let Json(request) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let mut new_message = validate(request).map_err(ApiError::Validation)?;
    new_message.ip_address = Some(ip.clone()).filter(|ip| ip != "unknown");
    new_message.user_agent = user_agent.map(|TypedHeader(agent)| {
        agent.as_str().chars().take(500).collect()
    });

    state.contact_limiter.record(&ip).await;
    let stored = state.contacts.insert(&new_message).await?;
    info!(message_id = %stored.id, "Contact message received");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": stored.id,
            "message": "Thank you for your message. We will get back to you soon.",
        })),
    ))
}

/// `GET /api/admin/messages`
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> ApiResult<impl IntoResponse> {
    let (page, page_size) = paginate(query.page, query.page_size, 20, 100);
    let page_info = PageInfo::new(0, page, page_size);

    let (messages, total) = state
        .contacts
        .list(&MessageFilter {
            is_read: query.is_read,
            search: query.search.filter(|s| !s.trim().is_empty()),
            limit: page_size,
            offset: page_info.offset(),
        })
        .await?;
    let unread_count = state.contacts.unread_count().await?;

    Ok(Json(MessageListResponse {
        messages,
        unread_count,
        page: PageInfo::new(total, page, page_size),
    }))
}

async fn set_read(state: &AppState, id: Uuid, is_read: bool) -> ApiResult<Json<ContactMessage>> {
    let message = state
        .contacts
        .set_read(id, is_read)
        .await?
        .ok_or_else(|| ApiError::NotFound("Message not found".to_string()))?;
    Ok(Json(message))
}

/// `PUT /api/admin/messages/:id/read`
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    set_read(&state, id, true).await
}

/// `PUT /api/admin/messages/:id/unread`
pub async fn mark_unread(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    set_read(&state, id, false).await
}

/// `DELETE /api/admin/messages/:id`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if !state.contacts.delete(id).await? {
        return Err(ApiError::NotFound("Message not found".to_string()));
    }
    info!(message_id = %id, "Contact message deleted");
    Ok(Json(json!({ "message": "Message deleted successfully" })))
}
