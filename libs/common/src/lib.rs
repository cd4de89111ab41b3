//! Common library for the photography portfolio backend
//!
//! This crate provides shared functionality used across the workspace:
//! PostgreSQL connection pooling, schema migrations and database error types.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, health_check, init_pool};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::default();
//!     let pool = init_pool(&config).await?;
//!     common::migrations::run(&pool).await?;
//!     println!("Database health check: {}", health_check(&pool).await?);
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
pub mod migrations;
