//! Atomic batch writer for the `pre_game_data_finalized` flag.
//!
//! This is the only mutating operation in the core and the sole writer of
//! the flag. The whole batch is applied in one transaction: either every
//! row is updated or none are.

use crate::models::GameId;
use anyhow::{Context, Result};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum WriterError {
    /// An update matched zero rows. The batch is built from game ids read
    /// from the same database, so an unknown id is a contract violation,
    /// not a runtime condition to recover from.
    #[error("unknown game id in flag batch: {0}")]
    UnknownGameId(GameId),
}

/// Apply a batch of (finalized, game_id) flag updates in one transaction.
pub async fn apply_pre_game_flags(
    pool: &SqlitePool,
    updates: &[(bool, GameId)],
) -> Result<()> {
    if updates.is_empty() {
        debug!("No pre-game flag updates to apply");
        return Ok(());
    }

    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin flag update transaction")?;

    for (finalized, game_id) in updates {
        let result = sqlx::query(
            "UPDATE Games SET pre_game_data_finalized = ? WHERE game_id = ?",
        )
        .bind(finalized)
        .bind(game_id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to update pre-game flag for {game_id}"))?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .context("Failed to roll back flag update transaction")?;
            return Err(WriterError::UnknownGameId(game_id.clone()).into());
        }
    }

    tx.commit()
        .await
        .context("Failed to commit flag update transaction")?;

    info!("Applied {} pre-game flag update(s)", updates.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::queries::tests::{seed_game, test_pool};
    use sqlx::SqlitePool;

    async fn finalized_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM Games WHERE pre_game_data_finalized = 1")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_batch_applies_all_flags() {
        let pool = test_pool().await;
        seed_game(&pool, "g1", "2023-2024", "Regular Season", "BOS", "LAL", 1, "Completed", true, false).await;
        seed_game(&pool, "g2", "2023-2024", "Regular Season", "MIA", "DEN", 2, "Completed", true, false).await;

        let updates = vec![(true, "g1".to_string()), (false, "g2".to_string())];
        apply_pre_game_flags(&pool, &updates).await.unwrap();

        assert_eq!(finalized_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_batch_rolls_back_on_unknown_id() {
        let pool = test_pool().await;
        seed_game(&pool, "g1", "2023-2024", "Regular Season", "BOS", "LAL", 1, "Completed", true, false).await;
        seed_game(&pool, "g2", "2023-2024", "Regular Season", "MIA", "DEN", 2, "Completed", true, false).await;

        // g1 would be updated first; the unknown id must undo it.
        let updates = vec![
            (true, "g1".to_string()),
            (true, "missing".to_string()),
            (true, "g2".to_string()),
        ];
        let err = apply_pre_game_flags(&pool, &updates).await.unwrap_err();
        assert!(err.to_string().contains("missing"));

        assert_eq!(finalized_count(&pool).await, 0, "no partial updates visible");
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_noop() {
        let pool = test_pool().await;
        apply_pre_game_flags(&pool, &[]).await.unwrap();
    }
}
