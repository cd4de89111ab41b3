//! Idempotent schema setup, run once at startup.

use sqlx::PgPool;
use tracing::info;

use crate::error::{DatabaseError, DatabaseResult};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id             UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        email          VARCHAR(255) NOT NULL UNIQUE,
        password_hash  TEXT NOT NULL,
        first_name     VARCHAR(100) NOT NULL DEFAULT '',
        last_name      VARCHAR(100) NOT NULL DEFAULT '',
        role           VARCHAR(50) NOT NULL DEFAULT 'user' CHECK (role IN ('admin', 'user')),
        is_active      BOOLEAN NOT NULL DEFAULT TRUE,
        last_login     TIMESTAMPTZ,
        created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "ALTER TABLE users ALTER COLUMN role SET DEFAULT 'user'",
    r#"
    CREATE TABLE IF NOT EXISTS bookings (
        id                   UUID PRIMARY KEY,
        client_name          VARCHAR(255) NOT NULL,
        client_email         VARCHAR(255) NOT NULL,
        client_phone         VARCHAR(50),
        service_type         VARCHAR(50) NOT NULL,
        description          TEXT,
        location             VARCHAR(500),
        scheduled_date       TIMESTAMPTZ NOT NULL,
        duration_hours       INTEGER NOT NULL CHECK (duration_hours BETWEEN 1 AND 24),
        price_cents          BIGINT NOT NULL CHECK (price_cents >= 0),
        status               VARCHAR(20) NOT NULL DEFAULT 'pending',
        payment_status       VARCHAR(20) NOT NULL DEFAULT 'pending',
        checkout_session_id  VARCHAR(255),
        notes                TEXT,
        paid_at              TIMESTAMPTZ,
        created_at           TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at           TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CONSTRAINT bookings_paid_at_matches_payment
            CHECK ((payment_status = 'paid') = (paid_at IS NOT NULL))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_bookings_checkout_session ON bookings (checkout_session_id)",
    "CREATE INDEX IF NOT EXISTS idx_bookings_status ON bookings (status, created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS media_items (
        id             UUID PRIMARY KEY,
        title          VARCHAR(255) NOT NULL,
        description    TEXT,
        category       VARCHAR(50) NOT NULL,
        media_type     VARCHAR(20) NOT NULL,
        url            VARCHAR(500) NOT NULL,
        thumbnail_url  VARCHAR(500) NOT NULL,
        file_name      VARCHAR(255) NOT NULL,
        file_size      BIGINT NOT NULL,
        mime_type      VARCHAR(100) NOT NULL,
        width          INTEGER,
        height         INTEGER,
        alt            VARCHAR(255),
        tags           JSONB NOT NULL DEFAULT '[]'::jsonb,
        is_public      BOOLEAN NOT NULL DEFAULT TRUE,
        is_featured    BOOLEAN NOT NULL DEFAULT FALSE,
        sort_order     INTEGER NOT NULL DEFAULT 0,
        view_count     BIGINT NOT NULL DEFAULT 0,
        uploaded_by    UUID NOT NULL REFERENCES users(id),
        created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_media_items_category ON media_items (category, created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS contact_messages (
        id          UUID PRIMARY KEY,
        name        VARCHAR(255) NOT NULL,
        email       VARCHAR(255) NOT NULL,
        phone       VARCHAR(50),
        subject     VARCHAR(255) NOT NULL,
        message     TEXT NOT NULL,
        is_read     BOOLEAN NOT NULL DEFAULT FALSE,
        read_at     TIMESTAMPTZ,
        ip_address  VARCHAR(45),
        user_agent  VARCHAR(500),
        created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_contact_messages_unread ON contact_messages (is_read, created_at)",
];

/// Create every table and index the services rely on.
pub async fn run(pool: &PgPool) -> DatabaseResult<()> {
    info!("Running database migrations");

    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_users_role_defaults_to_least_privilege() {
        let users = SCHEMA
            .iter()
            .find(|s| s.contains("CREATE TABLE IF NOT EXISTS users"))
            .unwrap();
        let role = users.lines().find(|l| l.trim_start().starts_with("role")).unwrap();
        assert!(role.contains("DEFAULT 'user'"), "{role}");
        assert!(!SCHEMA.iter().any(|s| s.contains("DEFAULT 'admin'")));
    }
}
