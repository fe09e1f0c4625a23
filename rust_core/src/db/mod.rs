//! Database connection pooling and configuration.
//!
//! This module provides standardized connection pool creation with:
//! - An explicit configuration object instead of process-wide path globals
//! - Consistent timeout and connection settings across services
//! - Idempotent schema bootstrap for fresh database files

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub mod queries;
pub mod schema;
pub mod store;
pub mod writer;

pub use queries::QueryScope;
pub use writer::apply_pre_game_flags;

/// Database pool configuration
#[derive(Debug, Clone)]
pub struct DbPoolConfig {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Timeout for acquiring a connection
    pub acquire_timeout: Duration,
    /// Create the database file if it does not exist
    pub create_if_missing: bool,
}

impl Default for DbPoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
            create_if_missing: false,
        }
    }
}

impl DbPoolConfig {
    /// Create config from environment variables with fallback to provided defaults
    pub fn from_env_with_defaults(defaults: Self) -> Self {
        Self {
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_connections),
            acquire_timeout: env::var("DB_ACQUIRE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.acquire_timeout),
            create_if_missing: env::var("DB_CREATE_IF_MISSING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.create_if_missing),
        }
    }
}

/// Create a database connection pool with the given configuration.
///
/// # Arguments
/// * `database_url` - SQLite connection URL (e.g. `sqlite://data/games.db`)
/// * `config` - Pool configuration settings
pub async fn create_pool(database_url: &str, config: &DbPoolConfig) -> Result<SqlitePool> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)
        .context("Failed to parse database URL")?
        .create_if_missing(config.create_if_missing);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_opts)
        .await
        .context("Failed to create database connection pool")?;

    tracing::info!(
        "Database pool created: max={}, acquire_timeout={}s",
        config.max_connections,
        config.acquire_timeout.as_secs()
    );

    Ok(pool)
}
