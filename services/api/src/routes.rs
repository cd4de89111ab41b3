//! HTTP surface of the API service
//!
//! Everything lives under `/api`, uploads are served from `/uploads` and
//! unknown paths get a JSON 404.

use auth::{
    middleware::{optional_auth, require_admin},
    routes::AuthState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderValue, Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::warn;

use crate::{error::ApiError, state::AppState};

pub mod admin;
pub mod contact;
pub mod health;
pub mod media;
pub mod stripe;

/// Multipart framing allowance on top of the file size limit
const FORM_OVERHEAD: usize = 1024 * 1024;

pub fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
        .allow_credentials(true);

    match HeaderValue::from_str(origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            warn!(origin, "Invalid CORS origin; cross-origin requests are disabled");
            layer
        }
    }
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

/// Create the router for the API service
pub fn create_router(state: AppState, auth_state: AuthState, cors_origin: &str) -> Router {
    let tokens = state.tokens.clone();
    let upload_limit = state.storage.max_file_size().saturating_add(FORM_OVERHEAD);

    let stripe_routes = Router::new()
        .route("/checkout", post(stripe::create_checkout))
        .route("/success", get(stripe::checkout_success))
        .route("/cancel", get(stripe::checkout_cancel))
        .route("/webhook", post(stripe::webhook));

    let media_routes = Router::new()
        .route("/:category", get(media::list_category))
        .route("/item/:id", get(media::get_item))
        .route_layer(middleware::from_fn_with_state(tokens.clone(), optional_auth));

    let admin_routes = Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/bookings", get(admin::list_bookings))
        .route("/bookings/:id", get(admin::get_booking))
        .route("/bookings/:id/cancel", post(admin::cancel_booking))
        .route(
            "/media",
            post(media::upload)
                .layer(DefaultBodyLimit::max(upload_limit))
                .get(media::admin_list),
        )
        .route("/media/bulk-delete", post(media::bulk_delete))
        .route("/media/:id", put(media::update).delete(media::delete))
        .route("/messages", get(contact::list))
        .route("/messages/:id", delete(contact::delete))
        .route("/messages/:id/read", put(contact::mark_read))
        .route("/messages/:id/unread", put(contact::mark_unread))
        .route_layer(middleware::from_fn_with_state(tokens, require_admin))
        .with_state(state.clone())
        .merge(auth::routes::admin_router(auth_state.clone()));

    let api = Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .route("/contact", post(contact::submit))
        .nest("/stripe", stripe_routes)
        .nest("/media", media_routes)
        .with_state(state.clone())
        .nest("/admin", admin_routes)
        .nest("/auth", auth::routes::create_router(auth_state));

    Router::new()
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(state.storage.root()))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origin))
}
