//! Credential store

pub mod memory;
pub mod user;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use uuid::Uuid;

use crate::{
    error::AuthResult,
    models::{NewUser, User},
};

pub use memory::InMemoryUserStore;
pub use user::UserRepository;

/// Persistence seam for user records
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. The password is hashed exactly once on the way in;
    /// a hashing failure is [`AuthError::Password`](crate::AuthError::Password).
    async fn create(&self, new_user: &NewUser) -> AuthResult<User>;

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>>;

    async fn count(&self) -> DatabaseResult<i64>;

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> DatabaseResult<()>;
}
