//! Persistence Layer
//!
//! SQLite-backed storage for users and portfolios, async via sqlx.
//! Assets are embedded as a JSON document column on the portfolio row, so
//! every portfolio mutation is a single-row UPDATE: the store's per-document
//! atomicity is the only concurrency control the engine relies on
//! (last-writer-wins between concurrent writers to the same portfolio).
//!
//! # Database Schema
//!
//! ## Users Table
//! - id: UUID
//! - name, email (unique, lowercase)
//! - password_hash: Argon2id PHC string
//! - reset_token_hash / reset_token_expires: pending password-reset state
//!
//! ## Portfolios Table
//! - id: UUID
//! - user_id: owning user
//! - assets: JSON document (embedded asset array)
//! - target_amount, currency
//! - total_invested_value / total_current_value: denormalized totals
//! - last_updated: Timestamp

pub mod models;
pub mod repository;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Database connection pool
pub type DbPool = SqlitePool;

/// Database initialization and query error
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

/// Initialize the database connection pool and run migrations.
///
/// # Arguments
/// - `database_url`: Path to SQLite database file (e.g., "sqlite://data/cryptofolio.db")
pub async fn init_database(database_url: &str) -> Result<DbPool, DatabaseError> {
    info!("Initializing database: {}", database_url);

    // Ensure data directory exists
    if let Some(db_path) = database_url.strip_prefix("sqlite://") {
        if let Some(parent) = Path::new(db_path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::ConnectionError(sqlx::Error::Configuration(Box::new(e)))
            })?;
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .log_statements(tracing::log::LevelFilter::Debug);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    info!("✓ Database initialized successfully");

    Ok(pool)
}

/// Run database migrations. Public so integration tests can bring their own
/// (in-memory) pool.
pub async fn run_migrations(pool: &DbPool) -> Result<(), DatabaseError> {
    info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            reset_token_hash TEXT,
            reset_token_expires DATETIME,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::MigrationError(format!("Failed to create users table: {}", e)))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS portfolios (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            assets TEXT NOT NULL DEFAULT '[]',
            target_amount REAL NOT NULL DEFAULT 0.0,
            currency TEXT NOT NULL DEFAULT 'USD',
            total_invested_value REAL NOT NULL DEFAULT 0.0,
            total_current_value REAL NOT NULL DEFAULT 0.0,
            last_updated DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        DatabaseError::MigrationError(format!("Failed to create portfolios table: {}", e))
    })?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_portfolios_user_id ON portfolios(user_id)")
        .execute(pool)
        .await
        .map_err(|e| {
            DatabaseError::MigrationError(format!("Failed to create portfolio index: {}", e))
        })?;

    Ok(())
}
