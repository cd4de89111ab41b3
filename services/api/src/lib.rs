//! Photography portfolio API
//!
//! Bookings paid through hosted checkout, a media gallery, a contact inbox
//! and the admin endpoints that manage them. Authentication comes from the
//! `auth` crate; persistence from `common`.

pub mod checkout;
pub mod config;
pub mod error;
pub mod models;
pub mod payment;
pub mod pricing;
pub mod repositories;
pub mod routes;
pub mod state;
pub mod storage;
pub mod webhook;

pub use error::{ApiError, ApiResult};
pub use state::AppState;
