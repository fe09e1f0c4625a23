//! Play-by-play source backed by the local log store.

use crate::models::{GameId, RawPbpLog};
use crate::pipeline::PlayByPlayProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;

/// Serves raw play-by-play logs already persisted by the ingestion service.
/// Games without a stored log are absent from the result, which leaves them
/// in the game-data work set for a later run.
pub struct StoredPlayByPlayProvider {
    pool: SqlitePool,
}

impl StoredPlayByPlayProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlayByPlayProvider for StoredPlayByPlayProvider {
    async fn get_play_by_play(&self, ids: &[GameId]) -> Result<HashMap<GameId, RawPbpLog>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql =
            format!("SELECT game_id, log_data FROM PbpLogs WHERE game_id IN ({placeholders})");

        let mut query = sqlx::query_as::<_, (String, String)>(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("Failed to load stored play-by-play logs")?;

        let mut logs = HashMap::with_capacity(rows.len());
        for (game_id, payload) in rows {
            let log: RawPbpLog = serde_json::from_str(&payload)
                .with_context(|| format!("Corrupt play-by-play payload for {game_id}"))?;
            logs.insert(game_id, log);
        }

        debug!("Loaded {}/{} stored play-by-play log(s)", logs.len(), ids.len());
        Ok(logs)
    }

    fn provider_name(&self) -> &str {
        "StoredPlayByPlay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::queries::tests::test_pool;
    use serde_json::json;

    #[tokio::test]
    async fn test_serves_only_stored_logs() {
        let pool = test_pool().await;
        sqlx::query("INSERT INTO PbpLogs (game_id, log_data) VALUES ('g1', ?)")
            .bind(json!({ "final": true, "home_score": 110, "away_score": 102 }).to_string())
            .execute(&pool)
            .await
            .unwrap();

        let provider = StoredPlayByPlayProvider::new(pool);
        let logs = provider
            .get_play_by_play(&["g1".to_string(), "g2".to_string()])
            .await
            .unwrap();

        assert_eq!(logs.len(), 1);
        assert_eq!(logs["g1"]["home_score"], 110);
        assert!(!logs.contains_key("g2"));
    }
}
