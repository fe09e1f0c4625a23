//! Prior-state provider backed by the game database.
//!
//! A team's prior state for a game is the set of its strictly earlier
//! same-season games, summarized from their stored game states. A side is
//! marked missing when any of those earlier games has no final stored state
//! yet; rolling statistics built on top of them would not be trustworthy.

use crate::models::{GameId, GameState, PriorStateRef, PriorStates, Side, TeamGameSummary};
use crate::pipeline::PriorStateProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;

pub struct DbPriorStateProvider {
    pool: SqlitePool,
}

impl DbPriorStateProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriorStateProvider for DbPriorStateProvider {
    /// Two refs per game: the home team's history and the away team's,
    /// both cut off at the game's scheduled tip.
    async fn determine_needed(&self, ids: &[GameId]) -> Result<Vec<PriorStateRef>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT game_id, season, home_team, away_team, date_time_est \
             FROM Games WHERE game_id IN ({placeholders})"
        );

        let mut query =
            sqlx::query_as::<_, (String, String, String, String, DateTime<Utc>)>(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("Failed to look up games for prior state determination")?;

        let mut refs = Vec::with_capacity(rows.len() * 2);
        for (game_id, season, home_team, away_team, date_time_est) in rows {
            refs.push(PriorStateRef {
                game_id: game_id.clone(),
                team: home_team,
                side: Side::Home,
                season: season.clone(),
                cutoff: date_time_est,
            });
            refs.push(PriorStateRef {
                game_id,
                team: away_team,
                side: Side::Away,
                season,
                cutoff: date_time_est,
            });
        }
        Ok(refs)
    }

    async fn load(&self, refs: &[PriorStateRef]) -> Result<HashMap<GameId, PriorStates>> {
        let mut loaded: HashMap<GameId, PriorStates> = HashMap::new();

        for state_ref in refs {
            let rows: Vec<(String, DateTime<Utc>, String, Option<String>)> = sqlx::query_as(
                "SELECT g.game_id, g.date_time_est, g.home_team, s.state_data \
                 FROM Games g LEFT JOIN GameStates s ON g.game_id = s.game_id \
                 WHERE g.season = ? \
                   AND g.date_time_est < ? \
                   AND (g.home_team = ? OR g.away_team = ?) \
                 ORDER BY g.date_time_est",
            )
            .bind(&state_ref.season)
            .bind(state_ref.cutoff)
            .bind(&state_ref.team)
            .bind(&state_ref.team)
            .fetch_all(&self.pool)
            .await
            .with_context(|| {
                format!("Failed to load prior games of {} for {}", state_ref.team, state_ref.game_id)
            })?;

            let mut summaries = Vec::with_capacity(rows.len());
            let mut missing = false;
            for (game_id, date_time_est, home_team, state_data) in rows {
                let Some(payload) = state_data else {
                    missing = true;
                    continue;
                };
                let state: GameState = serde_json::from_str(&payload)
                    .with_context(|| format!("Corrupt game state payload for {game_id}"))?;
                if !state.is_final {
                    missing = true;
                    continue;
                }

                let played_at_home = home_team == state_ref.team;
                let (points_for, points_against) = if played_at_home {
                    (state.home_score, state.away_score)
                } else {
                    (state.away_score, state.home_score)
                };
                summaries.push(TeamGameSummary {
                    game_id,
                    date_time_est,
                    points_for,
                    points_against,
                    won: points_for > points_against,
                });
            }

            let entry = loaded.entry(state_ref.game_id.clone()).or_default();
            match state_ref.side {
                Side::Home => {
                    entry.home = summaries;
                    entry.missing.home = missing;
                }
                Side::Away => {
                    entry.away = summaries;
                    entry.missing.away = missing;
                }
            }
        }

        debug!("Loaded prior states for {} game(s)", loaded.len());
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::queries::tests::{seed_game, test_pool};
    use crate::db::store::save_game_states;
    use chrono::TimeZone;

    const SEASON: &str = "2023-2024";
    const REG: &str = "Regular Season";

    async fn seed_state(pool: &SqlitePool, game_id: &str, home: &str, away: &str, day: u32, home_score: i64, away_score: i64, is_final: bool) {
        let mut states = HashMap::new();
        states.insert(
            game_id.to_string(),
            GameState {
                game_id: game_id.to_string(),
                home_team: home.to_string(),
                away_team: away.to_string(),
                date_time_est: Utc.with_ymd_and_hms(2023, 11, day, 19, 0, 0).unwrap(),
                home_score,
                away_score,
                is_final,
            },
        );
        save_game_states(pool, &states).await.unwrap();
    }

    #[tokio::test]
    async fn test_determine_needed_emits_both_sides() {
        let pool = test_pool().await;
        seed_game(&pool, "g1", SEASON, REG, "BOS", "LAL", 5, "Not Started", false, false).await;

        let provider = DbPriorStateProvider::new(pool);
        let refs = provider.determine_needed(&["g1".to_string()]).await.unwrap();
        assert_eq!(refs.len(), 2);
        assert!(refs.iter().any(|r| r.team == "BOS" && r.side == Side::Home));
        assert!(refs.iter().any(|r| r.team == "LAL" && r.side == Side::Away));
    }

    #[tokio::test]
    async fn test_load_summarizes_finished_history_and_flags_gaps() {
        let pool = test_pool().await;
        // BOS history: g1 has a final state. LAL history: g2 has none yet.
        seed_game(&pool, "g1", SEASON, REG, "BOS", "MIA", 1, "Completed", true, true).await;
        seed_game(&pool, "g2", SEASON, REG, "DEN", "LAL", 2, "Completed", false, false).await;
        seed_game(&pool, "g3", SEASON, REG, "BOS", "LAL", 5, "Not Started", false, false).await;
        seed_state(&pool, "g1", "BOS", "MIA", 1, 110, 98, true).await;

        let provider = DbPriorStateProvider::new(pool);
        let refs = provider.determine_needed(&["g3".to_string()]).await.unwrap();
        let loaded = provider.load(&refs).await.unwrap();

        let prior = &loaded["g3"];
        assert!(!prior.missing.home);
        assert!(prior.missing.away, "LAL has an unprocessed earlier game");

        assert_eq!(prior.home.len(), 1);
        let bos_game = &prior.home[0];
        assert_eq!(bos_game.points_for, 110);
        assert_eq!(bos_game.points_against, 98);
        assert!(bos_game.won);
        assert!(prior.away.is_empty());
    }

    #[tokio::test]
    async fn test_non_final_state_counts_as_missing() {
        let pool = test_pool().await;
        seed_game(&pool, "g1", SEASON, REG, "BOS", "MIA", 1, "In Progress", false, false).await;
        seed_game(&pool, "g2", SEASON, REG, "BOS", "LAL", 5, "Not Started", false, false).await;
        seed_state(&pool, "g1", "BOS", "MIA", 1, 55, 50, false).await;

        let provider = DbPriorStateProvider::new(pool);
        let refs = provider.determine_needed(&["g2".to_string()]).await.unwrap();
        let loaded = provider.load(&refs).await.unwrap();

        assert!(loaded["g2"].missing.home);
    }

    #[tokio::test]
    async fn test_season_opener_has_nothing_missing() {
        let pool = test_pool().await;
        seed_game(&pool, "g1", SEASON, REG, "BOS", "LAL", 1, "Not Started", false, false).await;

        let provider = DbPriorStateProvider::new(pool);
        let refs = provider.determine_needed(&["g1".to_string()]).await.unwrap();
        let loaded = provider.load(&refs).await.unwrap();

        let prior = &loaded["g1"];
        assert!(!prior.missing.home);
        assert!(!prior.missing.away);
        assert!(prior.home.is_empty());
        assert!(prior.away.is_empty());
    }
}
