//! Persistence helpers for pipeline artifacts: raw play-by-play logs, game
//! states, feature sets and predictions.
//!
//! All writes are keyed upserts so re-running a stage overwrites stale rows
//! instead of duplicating them. Every helper is a no-op on empty input,
//! which is what lets the pipeline short-circuit cheaply on empty work sets.

use crate::models::{FeatureSet, GameId, GameState, Prediction, RawPbpLog};
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;

/// Persist raw play-by-play logs.
pub async fn save_play_by_play(
    pool: &SqlitePool,
    logs: &HashMap<GameId, RawPbpLog>,
) -> Result<()> {
    if logs.is_empty() {
        return Ok(());
    }

    for (game_id, log) in logs {
        let payload = serde_json::to_string(log)
            .with_context(|| format!("Failed to serialize play-by-play for {game_id}"))?;
        sqlx::query(
            "INSERT INTO PbpLogs (game_id, log_data) VALUES (?, ?) \
             ON CONFLICT (game_id) DO UPDATE SET log_data = excluded.log_data",
        )
        .bind(game_id)
        .bind(payload)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to save play-by-play for {game_id}"))?;
    }

    debug!("Saved {} play-by-play log(s)", logs.len());
    Ok(())
}

/// Persist computed game states.
pub async fn save_game_states(
    pool: &SqlitePool,
    states: &HashMap<GameId, GameState>,
) -> Result<()> {
    if states.is_empty() {
        return Ok(());
    }

    for (game_id, state) in states {
        let payload = serde_json::to_string(state)
            .with_context(|| format!("Failed to serialize game state for {game_id}"))?;
        sqlx::query(
            "INSERT INTO GameStates (game_id, state_data) VALUES (?, ?) \
             ON CONFLICT (game_id) DO UPDATE SET state_data = excluded.state_data",
        )
        .bind(game_id)
        .bind(payload)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to save game state for {game_id}"))?;
    }

    debug!("Saved {} game state(s)", states.len());
    Ok(())
}

/// Load stored game states for a set of games. Games without a stored state
/// are simply absent from the result.
pub async fn load_game_states(
    pool: &SqlitePool,
    ids: &[GameId],
) -> Result<HashMap<GameId, GameState>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql =
        format!("SELECT game_id, state_data FROM GameStates WHERE game_id IN ({placeholders})");

    let mut query = sqlx::query_as::<_, (String, String)>(&sql);
    for id in ids {
        query = query.bind(id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to load game states")?;

    let mut states = HashMap::with_capacity(rows.len());
    for (game_id, payload) in rows {
        let state: GameState = serde_json::from_str(&payload)
            .with_context(|| format!("Corrupt game state payload for {game_id}"))?;
        states.insert(game_id, state);
    }
    Ok(states)
}

/// Persist feature sets.
pub async fn save_feature_sets(
    pool: &SqlitePool,
    feature_sets: &HashMap<GameId, FeatureSet>,
) -> Result<()> {
    if feature_sets.is_empty() {
        return Ok(());
    }

    for (game_id, features) in feature_sets {
        let payload = serde_json::to_string(features)
            .with_context(|| format!("Failed to serialize feature set for {game_id}"))?;
        sqlx::query(
            "INSERT INTO FeatureSets (game_id, feature_data) VALUES (?, ?) \
             ON CONFLICT (game_id) DO UPDATE SET feature_data = excluded.feature_data",
        )
        .bind(game_id)
        .bind(payload)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to save feature set for {game_id}"))?;
    }

    debug!("Saved {} feature set(s)", feature_sets.len());
    Ok(())
}

/// Load stored feature sets for a set of games.
pub async fn load_feature_sets(
    pool: &SqlitePool,
    ids: &[GameId],
) -> Result<HashMap<GameId, FeatureSet>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql =
        format!("SELECT game_id, feature_data FROM FeatureSets WHERE game_id IN ({placeholders})");

    let mut query = sqlx::query_as::<_, (String, String)>(&sql);
    for id in ids {
        query = query.bind(id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to load feature sets")?;

    let mut feature_sets = HashMap::with_capacity(rows.len());
    for (game_id, payload) in rows {
        let features: FeatureSet = serde_json::from_str(&payload)
            .with_context(|| format!("Corrupt feature set payload for {game_id}"))?;
        feature_sets.insert(game_id, features);
    }
    Ok(feature_sets)
}

/// Persist predictions for one predictor.
pub async fn save_predictions(
    pool: &SqlitePool,
    predictions: &HashMap<GameId, Prediction>,
    predictor: &str,
) -> Result<()> {
    if predictions.is_empty() {
        return Ok(());
    }

    let now = Utc::now();
    for (game_id, prediction) in predictions {
        let payload = serde_json::to_string(prediction)
            .with_context(|| format!("Failed to serialize prediction for {game_id}"))?;
        sqlx::query(
            "INSERT INTO Predictions (game_id, predictor, prediction_data, prediction_datetime) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT (game_id, predictor) DO UPDATE SET \
                 prediction_data = excluded.prediction_data, \
                 prediction_datetime = excluded.prediction_datetime",
        )
        .bind(game_id)
        .bind(predictor)
        .bind(payload)
        .bind(now)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to save prediction for {game_id}"))?;
    }

    debug!(
        "Saved {} prediction(s) for predictor '{}'",
        predictions.len(),
        predictor
    );
    Ok(())
}
