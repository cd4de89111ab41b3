//! Integration tests for the infrastructure components
//!
//! These tests verify that the PostgreSQL database is reachable and that the
//! schema migrations can be applied repeatedly. They need a running server
//! reachable through `DATABASE_URL`.

use common::{
    database::{DatabaseConfig, health_check, init_pool},
    migrations,
};
use sqlx::Row;

fn config_from_env() -> DatabaseConfig {
    let mut config = DatabaseConfig::default();
    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.url = url;
    }
    config
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_infrastructure_integration() -> Result<(), Box<dyn std::error::Error>> {
    let pool = init_pool(&config_from_env()).await?;

    assert!(health_check(&pool).await?, "Database health check failed");

    let row = sqlx::query("SELECT 1 as result").fetch_one(&pool).await?;
    let result: i32 = row.get("result");
    assert_eq!(result, 1, "PostgreSQL simple query test failed");

    // Migrations must be safe to re-run on every startup
    migrations::run(&pool).await?;
    migrations::run(&pool).await?;

    let tables: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM information_schema.tables
         WHERE table_name IN ('users', 'bookings', 'media_items', 'contact_messages')",
    )
    .fetch_one(&pool)
    .await?;
    assert_eq!(tables, 4);

    // An insert that omits the role must not produce an administrator
    let email = format!("role-default-{}@example.com", std::process::id());
    let role: String = sqlx::query_scalar(
        "INSERT INTO users (email, password_hash) VALUES ($1, 'x') RETURNING role",
    )
    .bind(&email)
    .fetch_one(&pool)
    .await?;
    sqlx::query("DELETE FROM users WHERE email = $1")
        .bind(&email)
        .execute(&pool)
        .await?;
    assert_eq!(role, "user");

    Ok(())
}
