//! Pipeline orchestrator: schedule → game data → pre-game data → predictions.
//!
//! One invocation runs the four stages strictly in order for a single
//! season. Each stage recomputes its work set from persisted state, so a
//! failed run can simply be re-invoked: the queries are idempotent and find
//! the same or a reduced pending set. No stage retries an earlier stage.
//!
//! At most one concurrent run per season is assumed; there is no locking for
//! overlapping runs. The flag writer's single transaction keeps readiness
//! state torn-free regardless.

use crate::db::{self, queries, store, QueryScope};
use crate::models::{GameId, GameStateInput};
use crate::readiness::evaluate_readiness;
use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

mod contracts;

pub use contracts::{
    FeatureBuilder, GameStateBuilder, PlayByPlayProvider, Predictor, PriorStateProvider,
    ScheduleSync,
};

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Restrict stage queries to Regular Season and Post Season games.
    pub restrict_season_types: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            restrict_season_types: true,
        }
    }
}

/// Per-stage counts for one pipeline run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    /// Game states computed and persisted by the game-data stage
    pub game_states_updated: usize,
    /// Games whose readiness was evaluated by the pre-game stage
    pub pre_game_evaluated: usize,
    /// Games whose pre-game data was marked finalized in this run
    pub pre_game_finalized: usize,
    /// Predictions produced and persisted
    pub predictions_saved: usize,
}

/// The incremental update pipeline.
pub struct UpdatePipeline {
    pool: SqlitePool,
    options: PipelineOptions,
    schedule: Arc<dyn ScheduleSync>,
    pbp: Arc<dyn PlayByPlayProvider>,
    game_states: Arc<dyn GameStateBuilder>,
    prior_states: Arc<dyn PriorStateProvider>,
    features: Arc<dyn FeatureBuilder>,
}

impl UpdatePipeline {
    pub fn new(
        pool: SqlitePool,
        options: PipelineOptions,
        schedule: Arc<dyn ScheduleSync>,
        pbp: Arc<dyn PlayByPlayProvider>,
        game_states: Arc<dyn GameStateBuilder>,
        prior_states: Arc<dyn PriorStateProvider>,
        features: Arc<dyn FeatureBuilder>,
    ) -> Self {
        Self {
            pool,
            options,
            schedule,
            pbp,
            game_states,
            prior_states,
            features,
        }
    }

    fn scope(&self, season: &str) -> QueryScope {
        let scope = QueryScope::new(season);
        if self.options.restrict_season_types {
            scope
        } else {
            scope.all_season_types()
        }
    }

    /// Run the full update for one season. The prediction stage only runs
    /// when a predictor is supplied.
    pub async fn run(
        &self,
        season: &str,
        predictor: Option<&dyn Predictor>,
    ) -> Result<RunSummary> {
        info!("Starting update run for season {}", season);
        let mut summary = RunSummary::default();

        // STEP 1: Schedule
        self.schedule
            .update_schedule(season)
            .await
            .context("Schedule sync failed")?;

        // STEP 2: Game data (play-by-play logs, game states)
        summary.game_states_updated = self.update_game_data(season).await?;

        // STEP 3: Pre-game data (prior states, feature sets, readiness)
        let (evaluated, finalized) = self.update_pre_game_data(season).await?;
        summary.pre_game_evaluated = evaluated;
        summary.pre_game_finalized = finalized;

        // STEP 4: Predictions
        if let Some(predictor) = predictor {
            summary.predictions_saved = self.update_prediction_data(season, predictor).await?;
        }

        info!(
            "Update run for season {} done: {} game state(s), {} readiness evaluation(s) \
             ({} finalized), {} prediction(s)",
            season,
            summary.game_states_updated,
            summary.pre_game_evaluated,
            summary.pre_game_finalized,
            summary.predictions_saved
        );
        Ok(summary)
    }

    /// Game-data stage: fetch and persist play-by-play for stale games, then
    /// compute and persist their game states. The builder collaborator owns
    /// flipping `game_data_finalized`.
    async fn update_game_data(&self, season: &str) -> Result<usize> {
        let scope = self.scope(season);
        let ids = queries::games_needing_game_state_update(&self.pool, &scope).await?;
        if ids.is_empty() {
            debug!("Game-data stage: nothing to do for season {}", season);
            return Ok(0);
        }

        let basic_info = queries::lookup_basic_game_info(&self.pool, &ids).await?;
        let logs = self
            .pbp
            .get_play_by_play(&ids)
            .await
            .with_context(|| format!("Play-by-play provider '{}' failed", self.pbp.provider_name()))?;
        store::save_play_by_play(&self.pool, &logs).await?;

        // Only games with an available log proceed; the rest stay in the
        // work set for the next run.
        let mut inputs: HashMap<GameId, GameStateInput> = HashMap::with_capacity(logs.len());
        for (game_id, log) in &logs {
            let meta = basic_info
                .get(game_id)
                .with_context(|| format!("No basic game info for {game_id}"))?;
            inputs.insert(
                game_id.clone(),
                GameStateInput {
                    home_team: meta.home_team.clone(),
                    away_team: meta.away_team.clone(),
                    date_time_est: meta.date_time_est,
                    pbp_log: log.clone(),
                },
            );
        }

        let states = self.game_states.create_game_states(&inputs).await?;
        self.game_states.save_game_states(&states).await?;
        Ok(states.len())
    }

    /// Pre-game stage: load prior states for stale games, persist their
    /// feature sets, and apply readiness flags in one atomic batch.
    async fn update_pre_game_data(&self, season: &str) -> Result<(usize, usize)> {
        let scope = self.scope(season);
        let ids = queries::games_with_incomplete_pre_game_data(&self.pool, &scope).await?;
        if ids.is_empty() {
            debug!("Pre-game stage: nothing to do for season {}", season);
            return Ok((0, 0));
        }

        let needed = self.prior_states.determine_needed(&ids).await?;
        let prior_states = self.prior_states.load(&needed).await?;

        let feature_sets = self.features.create_feature_sets(&prior_states).await?;
        store::save_feature_sets(&self.pool, &feature_sets).await?;

        let updates = evaluate_readiness(&prior_states);
        let finalized = updates.iter().filter(|(ready, _)| *ready).count();
        db::apply_pre_game_flags(&self.pool, &updates).await?;
        Ok((updates.len(), finalized))
    }

    /// Prediction stage: fill the prediction gaps for one predictor.
    async fn update_prediction_data(
        &self,
        season: &str,
        predictor: &dyn Predictor,
    ) -> Result<usize> {
        let scope = self.scope(season);
        let ids = queries::games_needing_prediction(&self.pool, &scope, predictor.name()).await?;
        if ids.is_empty() {
            debug!("Prediction stage: nothing to do for season {}", season);
            return Ok(0);
        }

        let feature_sets = store::load_feature_sets(&self.pool, &ids).await?;
        let predictions = predictor
            .predict(&feature_sets)
            .await
            .with_context(|| format!("Predictor '{}' failed", predictor.name()))?;
        store::save_predictions(&self.pool, &predictions, predictor.name()).await?;
        Ok(predictions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::queries::tests::{seed_game, test_pool};
    use crate::models::{
        FeatureSet, GameState, Prediction, PriorStateRef, PriorStates, RawPbpLog, SideFlags,
    };
    use async_trait::async_trait;
    use serde_json::json;

    const SEASON: &str = "2023-2024";
    const REG: &str = "Regular Season";

    struct NoopSchedule;

    #[async_trait]
    impl ScheduleSync for NoopSchedule {
        async fn update_schedule(&self, _season: &str) -> Result<()> {
            Ok(())
        }
    }

    /// Serves a fixed final log for every requested game.
    struct FixedPbp;

    #[async_trait]
    impl PlayByPlayProvider for FixedPbp {
        async fn get_play_by_play(&self, ids: &[GameId]) -> Result<HashMap<GameId, RawPbpLog>> {
            Ok(ids
                .iter()
                .map(|id| {
                    (
                        id.clone(),
                        json!({ "final": true, "home_score": 104, "away_score": 99 }),
                    )
                })
                .collect())
        }

        fn provider_name(&self) -> &str {
            "FixedPbp"
        }
    }

    /// Builds states straight from the fixture log and finalizes game data.
    struct TestStateBuilder {
        pool: SqlitePool,
    }

    #[async_trait]
    impl GameStateBuilder for TestStateBuilder {
        async fn create_game_states(
            &self,
            inputs: &HashMap<GameId, GameStateInput>,
        ) -> Result<HashMap<GameId, GameState>> {
            Ok(inputs
                .iter()
                .map(|(id, input)| {
                    (
                        id.clone(),
                        GameState {
                            game_id: id.clone(),
                            home_team: input.home_team.clone(),
                            away_team: input.away_team.clone(),
                            date_time_est: input.date_time_est,
                            home_score: input.pbp_log["home_score"].as_i64().unwrap_or(0),
                            away_score: input.pbp_log["away_score"].as_i64().unwrap_or(0),
                            is_final: input.pbp_log["final"].as_bool().unwrap_or(false),
                        },
                    )
                })
                .collect())
        }

        async fn save_game_states(&self, states: &HashMap<GameId, GameState>) -> Result<()> {
            store::save_game_states(&self.pool, states).await?;
            for (id, state) in states {
                if state.is_final {
                    sqlx::query("UPDATE Games SET game_data_finalized = 1 WHERE game_id = ?")
                        .bind(id)
                        .execute(&self.pool)
                        .await?;
                }
            }
            Ok(())
        }
    }

    /// Declares every requested game's prior states present.
    struct AllPresentPriors;

    #[async_trait]
    impl PriorStateProvider for AllPresentPriors {
        async fn determine_needed(&self, ids: &[GameId]) -> Result<Vec<PriorStateRef>> {
            Ok(ids
                .iter()
                .map(|id| PriorStateRef {
                    game_id: id.clone(),
                    team: "BOS".to_string(),
                    side: crate::models::Side::Home,
                    season: SEASON.to_string(),
                    cutoff: chrono::Utc::now(),
                })
                .collect())
        }

        async fn load(&self, refs: &[PriorStateRef]) -> Result<HashMap<GameId, PriorStates>> {
            Ok(refs
                .iter()
                .map(|r| {
                    (
                        r.game_id.clone(),
                        PriorStates {
                            missing: SideFlags::default(),
                            ..Default::default()
                        },
                    )
                })
                .collect())
        }
    }

    struct EmptyFeatures;

    #[async_trait]
    impl FeatureBuilder for EmptyFeatures {
        async fn create_feature_sets(
            &self,
            prior_states: &HashMap<GameId, PriorStates>,
        ) -> Result<HashMap<GameId, FeatureSet>> {
            Ok(prior_states
                .keys()
                .map(|id| (id.clone(), FeatureSet::default()))
                .collect())
        }
    }

    struct CoinFlip;

    #[async_trait]
    impl Predictor for CoinFlip {
        fn name(&self) -> &str {
            "CoinFlip"
        }

        async fn predict(
            &self,
            feature_sets: &HashMap<GameId, FeatureSet>,
        ) -> Result<HashMap<GameId, Prediction>> {
            Ok(feature_sets
                .keys()
                .map(|id| {
                    (
                        id.clone(),
                        Prediction {
                            home_win_prob: 0.5,
                            predicted_winner: "BOS".to_string(),
                        },
                    )
                })
                .collect())
        }
    }

    fn pipeline(pool: &SqlitePool) -> UpdatePipeline {
        UpdatePipeline::new(
            pool.clone(),
            PipelineOptions::default(),
            Arc::new(NoopSchedule),
            Arc::new(FixedPbp),
            Arc::new(TestStateBuilder { pool: pool.clone() }),
            Arc::new(AllPresentPriors),
            Arc::new(EmptyFeatures),
        )
    }

    #[tokio::test]
    async fn test_full_run_processes_completed_game() {
        let pool = test_pool().await;
        seed_game(&pool, "g1", SEASON, REG, "BOS", "LAL", 1, "Completed", false, false).await;

        let summary = pipeline(&pool).run(SEASON, Some(&CoinFlip)).await.unwrap();
        assert_eq!(summary.game_states_updated, 1);
        assert_eq!(summary.pre_game_evaluated, 1);
        assert_eq!(summary.pre_game_finalized, 1);
        assert_eq!(summary.predictions_saved, 1);

        // Game data is finalized and a state row exists.
        let (gdf, pgdf): (bool, bool) = sqlx::query_as(
            "SELECT game_data_finalized, pre_game_data_finalized FROM Games WHERE game_id = 'g1'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(gdf);
        assert!(pgdf);

        let states = store::load_game_states(&pool, &["g1".to_string()]).await.unwrap();
        assert_eq!(states["g1"].home_score, 104);

        // Converged: a second run finds nothing to do.
        let summary = pipeline(&pool).run(SEASON, Some(&CoinFlip)).await.unwrap();
        assert_eq!(summary.game_states_updated, 0);
        assert_eq!(summary.pre_game_evaluated, 0);
        assert_eq!(summary.predictions_saved, 0);
    }

    #[tokio::test]
    async fn test_prediction_stage_skipped_without_predictor() {
        let pool = test_pool().await;
        seed_game(&pool, "g1", SEASON, REG, "BOS", "LAL", 1, "Completed", false, false).await;

        let summary = pipeline(&pool).run(SEASON, None).await.unwrap();
        assert_eq!(summary.predictions_saved, 0);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM Predictions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_empty_season_short_circuits_every_stage() {
        let pool = test_pool().await;
        let summary = pipeline(&pool).run(SEASON, Some(&CoinFlip)).await.unwrap();
        assert_eq!(summary.game_states_updated, 0);
        assert_eq!(summary.pre_game_evaluated, 0);
        assert_eq!(summary.pre_game_finalized, 0);
        assert_eq!(summary.predictions_saved, 0);
    }
}
