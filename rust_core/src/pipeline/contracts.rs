//! Collaborator contracts for the update pipeline.
//!
//! The orchestrator only sequences work; everything that fetches, computes
//! or interprets game data sits behind one of these traits so sources can be
//! swapped (stored logs today, a live scraper service tomorrow) without
//! touching the stage logic.

use crate::models::{
    FeatureSet, GameId, GameState, GameStateInput, Prediction, PriorStateRef, PriorStates,
    RawPbpLog,
};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Schedule synchronization. Idempotent: repeated calls for the same season
/// must converge to the same Games rows.
#[async_trait]
pub trait ScheduleSync: Send + Sync {
    async fn update_schedule(&self, season: &str) -> Result<()>;
}

/// Source of raw play-by-play logs. Games without an available log are
/// absent from the result and simply retried on a later run.
#[async_trait]
pub trait PlayByPlayProvider: Send + Sync {
    async fn get_play_by_play(&self, ids: &[GameId]) -> Result<HashMap<GameId, RawPbpLog>>;

    /// Provider name for logging and debugging
    fn provider_name(&self) -> &str;
}

/// Turns merged metadata + play-by-play inputs into game states and owns
/// their persistence, including flipping `game_data_finalized` once a
/// game's state is conclusively computed.
#[async_trait]
pub trait GameStateBuilder: Send + Sync {
    async fn create_game_states(
        &self,
        inputs: &HashMap<GameId, GameStateInput>,
    ) -> Result<HashMap<GameId, GameState>>;

    async fn save_game_states(&self, states: &HashMap<GameId, GameState>) -> Result<()>;
}

/// Determines and loads the per-team prior states a set of games depends on.
#[async_trait]
pub trait PriorStateProvider: Send + Sync {
    async fn determine_needed(&self, ids: &[GameId]) -> Result<Vec<PriorStateRef>>;

    async fn load(&self, refs: &[PriorStateRef]) -> Result<HashMap<GameId, PriorStates>>;
}

/// Computes pre-game feature sets from loaded prior states.
#[async_trait]
pub trait FeatureBuilder: Send + Sync {
    async fn create_feature_sets(
        &self,
        prior_states: &HashMap<GameId, PriorStates>,
    ) -> Result<HashMap<GameId, FeatureSet>>;
}

/// Pre-game prediction capability. The pipeline never inspects a model's
/// internals; it only needs a name (for the prediction store) and a single
/// batch operation.
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Predictor name, used as the key in the prediction store
    fn name(&self) -> &str;

    async fn predict(
        &self,
        feature_sets: &HashMap<GameId, FeatureSet>,
    ) -> Result<HashMap<GameId, Prediction>>;
}
