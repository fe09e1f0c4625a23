//! Rolling-average feature sets from loaded prior states.

use crate::models::{FeatureSet, GameId, PriorStates, TeamGameSummary};
use crate::pipeline::FeatureBuilder;
use crate::readiness::pre_game_ready;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

/// Builds per-side rolling aggregates: games played, average points for and
/// against, and win percentage. Games with a missing side produce no
/// feature set; they are retried once their history settles.
pub struct AverageFeatureBuilder;

fn side_features(features: &mut FeatureSet, prefix: &str, games: &[TeamGameSummary]) {
    let n = games.len();
    features.insert(format!("{prefix}_games_played"), n as f64);

    if n == 0 {
        // Season opener: no history yet, neutral priors.
        features.insert(format!("{prefix}_avg_points_for"), 0.0);
        features.insert(format!("{prefix}_avg_points_against"), 0.0);
        features.insert(format!("{prefix}_win_pct"), 0.5);
        return;
    }

    let points_for: i64 = games.iter().map(|g| g.points_for).sum();
    let points_against: i64 = games.iter().map(|g| g.points_against).sum();
    let wins = games.iter().filter(|g| g.won).count();

    features.insert(
        format!("{prefix}_avg_points_for"),
        points_for as f64 / n as f64,
    );
    features.insert(
        format!("{prefix}_avg_points_against"),
        points_against as f64 / n as f64,
    );
    features.insert(format!("{prefix}_win_pct"), wins as f64 / n as f64);
}

#[async_trait]
impl FeatureBuilder for AverageFeatureBuilder {
    async fn create_feature_sets(
        &self,
        prior_states: &HashMap<GameId, PriorStates>,
    ) -> Result<HashMap<GameId, FeatureSet>> {
        let mut feature_sets = HashMap::new();
        for (game_id, prior) in prior_states {
            if !pre_game_ready(prior) {
                continue;
            }

            let mut features = FeatureSet::default();
            side_features(&mut features, "home", &prior.home);
            side_features(&mut features, "away", &prior.away);
            feature_sets.insert(game_id.clone(), features);
        }

        debug!(
            "Built {} feature set(s) from {} loaded game(s)",
            feature_sets.len(),
            prior_states.len()
        );
        Ok(feature_sets)
    }
}
