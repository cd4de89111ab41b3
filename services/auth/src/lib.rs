//! Authentication for the portfolio backend
//!
//! This crate owns user credentials, HS256 session tokens and the auth
//! gate middleware that protects the admin endpoints of the API service.

pub mod bootstrap;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod rate_limiter;
pub mod repositories;
pub mod routes;
pub mod validation;

pub use error::{AuthError, AuthResult};
pub use jwt::{Claims, JwtConfig, TokenError, TokenService};
pub use middleware::AuthUser;
pub use models::Role;
