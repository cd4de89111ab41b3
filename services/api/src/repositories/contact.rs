//! Contact message repository for database operations

use common::error::DatabaseResult;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::models::contact::{ContactMessage, NewContactMessage};

const MESSAGE_COLUMNS: &str = "id, name, email, phone, subject, message, is_read, read_at, \
     ip_address, user_agent, created_at, updated_at";

/// Listing filter for contact messages
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub is_read: Option<bool>,
    /// Case-insensitive match on name, email, subject or message
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Clone)]
pub struct ContactRepository {
    pool: PgPool,
}

fn map_message(row: &PgRow) -> ContactMessage {
    ContactMessage {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        subject: row.get("subject"),
        message: row.get("message"),
        is_read: row.get("is_read"),
        read_at: row.get("read_at"),
        ip_address: row.get("ip_address"),
        user_agent: row.get("user_agent"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl ContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, message: &NewContactMessage) -> DatabaseResult<ContactMessage> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO contact_messages (id, name, email, phone, subject, message,
                                          ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&message.name)
        .bind(&message.email)
        .bind(&message.phone)
        .bind(&message.subject)
        .bind(&message.message)
        .bind(&message.ip_address)
        .bind(&message.user_agent)
        .fetch_one(&self.pool)
        .await?;

        Ok(map_message(&row))
    }

    /// Newest first, with the total count matching the filter
    pub async fn list(&self, filter: &MessageFilter) -> DatabaseResult<(Vec<ContactMessage>, i64)> {
        let pattern = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));
        let conditions = r#"
            ($1::boolean IS NULL OR is_read = $1)
            AND ($2::text IS NULL OR name ILIKE $2 OR email ILIKE $2
                 OR subject ILIKE $2 OR message ILIKE $2)
        "#;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM contact_messages
            WHERE {conditions}
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.is_read)
        .bind(&pattern)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM contact_messages WHERE {conditions}"
        ))
        .bind(filter.is_read)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows.iter().map(map_message).collect(), total))
    }

    pub async fn unread_count(&self) -> DatabaseResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM contact_messages WHERE NOT is_read")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Set the read flag. Returns `None` for an unknown id.
    pub async fn set_read(&self, id: Uuid, is_read: bool) -> DatabaseResult<Option<ContactMessage>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE contact_messages
            SET is_read = $2,
                read_at = CASE WHEN $2 THEN COALESCE(read_at, NOW()) ELSE NULL END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(is_read)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_message))
    }

    pub async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM contact_messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
