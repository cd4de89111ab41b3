//! JWT service for token generation and validation
//!
//! Session tokens are self-contained HS256 credentials. Nothing is stored
//! server side: a token is valid when its signature checks out against the
//! shared secret, its issuer matches and the current time lies inside its
//! `[nbf, exp)` window.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::Role;

/// JWT configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Shared HMAC secret. Must not be empty.
    #[serde(default)]
    pub secret: String,
    /// Token lifetime in seconds (default: 24 hours)
    #[serde(default = "default_expires_in")]
    pub expires_in_secs: u64,
    /// Value of the `iss` claim
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

fn default_expires_in() -> u64 {
    86_400
}

fn default_issuer() -> String {
    "photography-portfolio".to_string()
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            expires_in_secs: default_expires_in(),
            issuer: default_issuer(),
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Not before (unix seconds)
    pub nbf: i64,
    /// Expiration time (unix seconds)
    pub exp: i64,
    pub iss: String,
}

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("JWT secret must not be empty")]
    EmptySecret,

    #[error("Failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("Invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("Token has expired")]
    Expired,

    #[error("Token is not valid yet")]
    NotYetValid,
}

/// Issues and validates session tokens
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl TokenService {
    /// Build the service, failing when no secret is configured.
    pub fn new(config: JwtConfig) -> Result<Self, TokenError> {
        if config.secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }

        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        // Only HS256 is accepted. Time checks run in `validate_at` so the
        // boundary is exact and does not depend on library leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "iss", "sub"]);
        validation.set_issuer(&[config.issuer.as_str()]);

        Ok(Self {
            encoding_key,
            decoding_key,
            validation,
            config,
        })
    }

    /// Issue a token with the configured lifetime
    pub fn issue(&self, user_id: Uuid, email: &str, role: Role) -> Result<String, TokenError> {
        self.issue_with_ttl(
            user_id,
            email,
            role,
            Duration::from_secs(self.config.expires_in_secs),
        )
    }

    pub fn issue_with_ttl(
        &self,
        user_id: Uuid,
        email: &str,
        role: Role,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        self.issue_at(user_id, email, role, ttl, Utc::now().timestamp())
    }

    fn issue_at(
        &self,
        user_id: Uuid,
        email: &str,
        role: Role,
        ttl: Duration,
        now: i64,
    ) -> Result<String, TokenError> {
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            iat: now,
            nbf: now,
            exp: now.saturating_add(ttl),
            iss: self.config.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    /// Validate a token against the current time
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_at(token, Utc::now().timestamp())
    }

    /// Validate a token as if the current time were `now` (unix seconds).
    pub fn validate_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            debug!(error = %e, "Token rejected");
            TokenError::Invalid(e)
        })?;
        let claims = data.claims;

        if now >= claims.exp {
            return Err(TokenError::Expired);
        }
        if now < claims.nbf {
            return Err(TokenError::NotYetValid);
        }

        Ok(claims)
    }

    /// Reissue a still-valid token with the configured lifetime.
    pub fn refresh(&self, token: &str) -> Result<String, TokenError> {
        self.refresh_with_ttl(token, Duration::from_secs(self.config.expires_in_secs))
    }

    /// Reissue a still-valid token with a new lifetime. Expired or otherwise
    /// invalid tokens cannot be refreshed.
    pub fn refresh_with_ttl(&self, token: &str, ttl: Duration) -> Result<String, TokenError> {
        let claims = self.validate(token)?;
        self.issue_with_ttl(claims.sub, &claims.email, claims.role, ttl)
    }

    /// Get the token lifetime in seconds
    pub fn expires_in(&self) -> u64 {
        self.config.expires_in_secs
    }
}
