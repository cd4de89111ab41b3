//! Authentication service routes

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Extension, Json, Router,
    extract::{ConnectInfo, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use common::error::DatabaseError;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    error::{AuthError, AuthResult},
    jwt::TokenService,
    middleware::{
        AuthUser, TrustedProxies, client_ip, extract_bearer, require_admin, require_auth,
    },
    models::{LoginCredentials, NewUser, UserResponse},
    password::verify_password,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::UserStore,
    validation::{validate_email, validate_max_len, validate_password},
};

/// State shared by the authentication handlers
#[derive(Clone)]
pub struct AuthState {
    pub users: Arc<dyn UserStore>,
    pub tokens: TokenService,
    pub login_limiter: RateLimiter,
    pub trusted_proxies: TrustedProxies,
}

impl AuthState {
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenService) -> Self {
        Self {
            users,
            tokens,
            login_limiter: RateLimiter::new(RateLimiterConfig::login()),
            trusted_proxies: TrustedProxies::default(),
        }
    }

    /// Believe forwarding headers from these proxies when keying the limiter
    pub fn with_trusted_proxies(mut self, trusted_proxies: TrustedProxies) -> Self {
        self.trusted_proxies = trusted_proxies;
        self
    }
}

/// Response for token issuance
#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

/// Response for user login
#[derive(Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub token: TokenResponse,
    pub user: UserResponse,
}

/// Routes mounted under `/api/auth`
pub fn create_router(state: AuthState) -> Router {
    let protected = Router::new()
        .route("/me", get(me))
        .route_layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            require_auth,
        ));

    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh", post(refresh_token))
        .merge(protected)
        .with_state(state)
}

/// Admin-only user management, mounted under `/api/admin`
pub fn admin_router(state: AuthState) -> Router {
    Router::new()
        .route("/users", post(create_user))
        .route_layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            require_admin,
        ))
        .with_state(state)
}

fn token_response(tokens: &TokenService, token: String) -> TokenResponse {
    TokenResponse {
        token,
        token_type: "Bearer",
        expires_in: tokens.expires_in(),
    }
}

/// User login endpoint
pub async fn login(
    State(state): State<AuthState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<LoginCredentials>, JsonRejection>,
) -> AuthResult<impl IntoResponse> {
    let ip = client_ip(&headers, peer.as_ref(), &state.trusted_proxies);
    if state.login_limiter.is_blocked(&ip).await {
        warn!(client_ip = %ip, "Login rate limit exceeded");
        return Err(AuthError::RateLimited);
    }

    let Json(credentials) = payload.map_err(|e| AuthError::Validation(e.body_text()))?;
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(AuthError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    info!(email = %credentials.email, "Login attempt");

    let user = state.users.find_by_email(credentials.email.trim()).await?;
    let user = match user {
        Some(user) if user.is_active && verify_password(&credentials.password, &user.password_hash) => {
            user
        }
        _ => {
            state.login_limiter.record(&ip).await;
            warn!(email = %credentials.email, client_ip = %ip, "Failed login");
            return Err(AuthError::InvalidCredentials);
        }
    };

    state.login_limiter.reset(&ip).await;

    if let Err(e) = state.users.touch_last_login(user.id, Utc::now()).await {
        warn!(user_id = %user.id, error = %e, "Failed to update last login");
    }

    let token = state
        .tokens
        .issue(user.id, &user.email, user.role)
        .map_err(|e| AuthError::Internal(e.to_string()))?;

    info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        token: token_response(&state.tokens, token),
        user: UserResponse::from(&user),
    }))
}

/// Logout endpoint. Tokens are stateless; the client discards its copy.
pub async fn logout() -> impl IntoResponse {
    Json(json!({"message": "Logged out successfully"}))
}

/// Current user profile
pub async fn me(
    State(state): State<AuthState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AuthResult<impl IntoResponse> {
    let user = state
        .users
        .find_by_id(auth_user.id)
        .await?
        .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(&user)))
}

/// Exchange a still-valid bearer token for a fresh one
pub async fn refresh_token(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> AuthResult<impl IntoResponse> {
    let token = extract_bearer(&headers)?;
    let refreshed = state
        .tokens
        .refresh(token)
        .map_err(|_| AuthError::InvalidToken)?;

    Ok(Json(token_response(&state.tokens, refreshed)))
}

/// Create a user (admin only)
pub async fn create_user(
    State(state): State<AuthState>,
    Extension(admin): Extension<AuthUser>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> AuthResult<impl IntoResponse> {
    let Json(mut new_user) = payload.map_err(|e| AuthError::Validation(e.body_text()))?;
    new_user.email = new_user.email.trim().to_string();

    validate_email(&new_user.email).map_err(AuthError::Validation)?;
    validate_password(&new_user.password).map_err(AuthError::Validation)?;
    validate_max_len("First name", &new_user.first_name, 100).map_err(AuthError::Validation)?;
    validate_max_len("Last name", &new_user.last_name, 100).map_err(AuthError::Validation)?;

    let user = state.users.create(&new_user).await.map_err(|e| match e {
        AuthError::Database(DatabaseError::Duplicate(_)) => {
            AuthError::Conflict("User with this email already exists".to_string())
        }
        other => other,
    })?;

    info!(user_id = %user.id, created_by = %admin.id, role = %user.role, "User created");

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}
