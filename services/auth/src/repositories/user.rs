//! User repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::UserStore;
use crate::{
    error::AuthResult,
    models::{NewUser, Role, User},
    password::ensure_hashed,
};

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, role, is_active, \
                            last_login, created_at, updated_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_user(row: &PgRow) -> DatabaseResult<User> {
    let role: String = row.get("role");
    let role = role.parse::<Role>().map_err(DatabaseError::Decode)?;

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        role,
        is_active: row.get("is_active"),
        last_login: row.get("last_login"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl UserStore for UserRepository {
    async fn create(&self, new_user: &NewUser) -> AuthResult<User> {
        info!(email = %new_user.email, role = %new_user.role, "Creating user");

        let password_hash = ensure_hashed(&new_user.password)?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new_user.email.to_lowercase())
        .bind(&password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(new_user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        Ok(map_user(&row)?)
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_user).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_user).transpose()
    }

    async fn count(&self) -> DatabaseResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> DatabaseResult<()> {
        sqlx::query("UPDATE users SET last_login = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
