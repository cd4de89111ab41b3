//! Auth gate: bearer token extraction, validation and role checks
//!
//! Every gated request is validated on its own; nothing is cached between
//! requests. On success the caller's identity is inserted into the request
//! extensions as an [`AuthUser`].

use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use ipnet::IpNet;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    error::AuthError,
    jwt::{Claims, TokenService},
    models::Role,
};

/// Authenticated caller, available to handlers through `Extension<AuthUser>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// State for [`require_role`]
#[derive(Clone)]
pub struct RoleGate {
    pub tokens: TokenService,
    pub role: Role,
}

impl RoleGate {
    pub fn new(tokens: TokenService, role: Role) -> Self {
        Self { tokens, role }
    }

    pub fn admin(tokens: TokenService) -> Self {
        Self::new(tokens, Role::Admin)
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(AuthError::MissingToken)?;

    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

/// Extract and validate the bearer token into an [`AuthUser`]
pub fn authenticate(tokens: &TokenService, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
    let token = extract_bearer(headers)?;
    let claims = tokens.validate(token).map_err(|e| {
        debug!(error = %e, "Rejected bearer token");
        AuthError::InvalidToken
    })?;
    Ok(claims.into())
}

/// Reject requests without a valid token (401)
pub async fn require_auth(
    State(tokens): State<TokenService>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let user = authenticate(&tokens, req.headers())?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Reject requests without a valid token (401) or with the wrong role (403)
pub async fn require_role(
    State(gate): State<RoleGate>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let user = authenticate(&gate.tokens, req.headers())?;
    if user.role != gate.role {
        warn!(
            user_id = %user.id,
            role = %user.role,
            required = %gate.role,
            "Role check failed"
        );
        return Err(AuthError::Forbidden);
    }

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Admin-only gate
pub async fn require_admin(
    State(tokens): State<TokenService>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    require_role(State(RoleGate::admin(tokens)), req, next).await
}

/// Attach the caller's identity when a valid token is present, otherwise
/// continue anonymously.
pub async fn optional_auth(
    State(tokens): State<TokenService>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Ok(user) = authenticate(&tokens, req.headers()) {
        req.extensions_mut().insert(user);
    }
    next.run(req).await
}

/// Proxy addresses whose forwarding headers are believed
///
/// Entries are single addresses (`10.0.0.5`) or CIDR networks
/// (`10.0.0.0/8`). An empty list trusts nobody, so every client is keyed on
/// its socket peer.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies {
    networks: Arc<Vec<IpNet>>,
}

impl TrustedProxies {
    /// Parse configured entries, skipping the ones that are not addresses
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Self {
        let networks = entries
            .iter()
            .filter_map(|entry| {
                let entry = entry.as_ref().trim();
                let parsed = entry
                    .parse::<IpNet>()
                    .ok()
                    .or_else(|| {
                        let ip = entry.parse::<IpAddr>().ok()?;
                        let prefix = if ip.is_ipv4() { 32 } else { 128 };
                        IpNet::new(ip, prefix).ok()
                    });
                if parsed.is_none() {
                    warn!(entry = %entry, "Ignoring invalid trusted proxy entry");
                }
                parsed
            })
            .collect();

        Self {
            networks: Arc::new(networks),
        }
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        self.networks.iter().any(|network| network.contains(&ip))
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

/// Client address used as the rate-limit key
///
/// The socket peer is authoritative. `X-Forwarded-For` and then `X-Real-IP`
/// are only read when the peer is a trusted proxy; in `X-Forwarded-For` the
/// right-most hop that is not itself a trusted proxy wins. Without a peer
/// the result is `"unknown"`.
pub fn client_ip(
    headers: &HeaderMap,
    peer: Option<&ConnectInfo<SocketAddr>>,
    trusted: &TrustedProxies,
) -> String {
    let Some(peer_ip) = peer.map(|ConnectInfo(addr)| addr.ip()) else {
        return "unknown".to_string();
    };

    if !trusted.contains(peer_ip) {
        return peer_ip.to_string();
    }

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let hops: Vec<IpAddr> = value
                .split(',')
                .filter_map(|hop| hop.trim().parse::<IpAddr>().ok())
                .collect();
            hops.iter()
                .rev()
                .find(|hop| !trusted.contains(**hop))
                .or_else(|| hops.first())
                .copied()
        });

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<IpAddr>().ok())
    };

    forwarded.or_else(real_ip).unwrap_or(peer_ip).to_string()
}
