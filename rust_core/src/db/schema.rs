//! Schema bootstrap for fresh database files.
//!
//! Creation only, no migration: every statement is `CREATE ... IF NOT EXISTS`
//! and safe to run on every startup.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::debug;

/// Create all tables used by the update pipeline if they are missing.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS Games (
            game_id TEXT PRIMARY KEY,
            season TEXT NOT NULL,
            season_type TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            date_time_est TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Not Started',
            game_data_finalized INTEGER NOT NULL DEFAULT 0,
            pre_game_data_finalized INTEGER NOT NULL DEFAULT 0
        )
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_games_season ON Games (season)
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS PbpLogs (
            game_id TEXT PRIMARY KEY,
            log_data TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS GameStates (
            game_id TEXT PRIMARY KEY,
            state_data TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS FeatureSets (
            game_id TEXT PRIMARY KEY,
            feature_data TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS Predictions (
            game_id TEXT NOT NULL,
            predictor TEXT NOT NULL,
            prediction_data TEXT NOT NULL,
            prediction_datetime TEXT NOT NULL,
            PRIMARY KEY (game_id, predictor)
        )
        "#,
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("Failed to initialize schema")?;
    }

    debug!("Schema initialized");
    Ok(())
}
