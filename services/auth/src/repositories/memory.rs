//! In-process user store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::UserStore;
use crate::{
    error::AuthResult,
    models::{NewUser, User},
    password::ensure_hashed,
};

/// [`UserStore`] kept in memory, with the same uniqueness and hashing rules
/// as the PostgreSQL repository
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a stored user as-is
    pub async fn put(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, new_user: &NewUser) -> AuthResult<User> {
        let email = new_user.email.to_lowercase();
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email) {
            return Err(DatabaseError::Duplicate("users_email_key".to_string()).into());
        }

        let password_hash = ensure_hashed(&new_user.password)?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash,
            first_name: new_user.first_name.clone(),
            last_name: new_user.last_name.clone(),
            role: new_user.role,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn count(&self) -> DatabaseResult<i64> {
        Ok(self.users.read().await.len() as i64)
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> DatabaseResult<()> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.last_login = Some(at);
            user.updated_at = at;
        }
        Ok(())
    }
}
