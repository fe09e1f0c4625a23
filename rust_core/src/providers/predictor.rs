//! Baseline pre-game predictor and the registry that resolves predictors by
//! name for the CLI.

use crate::models::{FeatureSet, GameId, Prediction};
use crate::pipeline::Predictor;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Logistic function for probability calculation
#[inline]
fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Net-rating weight in log-odds per point of differential.
const NET_RATING_SCALE: f64 = 0.08;
/// Home-court advantage in log-odds (~60% for even teams).
const HOME_EDGE_LOG_ODDS: f64 = 0.40;

/// Baseline model: logistic over the teams' net-rating differential plus a
/// constant home-court edge. Deliberately simple; it exists so the pipeline
/// has a working end-to-end predictor and a reference point for real models.
pub struct HomeEdgePredictor;

#[async_trait]
impl Predictor for HomeEdgePredictor {
    fn name(&self) -> &str {
        "HomeEdge"
    }

    async fn predict(
        &self,
        feature_sets: &HashMap<GameId, FeatureSet>,
    ) -> Result<HashMap<GameId, Prediction>> {
        let mut predictions = HashMap::with_capacity(feature_sets.len());
        for (game_id, features) in feature_sets {
            let home_net = features.get("home_avg_points_for").unwrap_or(0.0)
                - features.get("home_avg_points_against").unwrap_or(0.0);
            let away_net = features.get("away_avg_points_for").unwrap_or(0.0)
                - features.get("away_avg_points_against").unwrap_or(0.0);

            let home_win_prob =
                logistic((home_net - away_net) * NET_RATING_SCALE + HOME_EDGE_LOG_ODDS);
            let predicted_winner = if home_win_prob >= 0.5 { "home" } else { "away" };

            predictions.insert(
                game_id.clone(),
                Prediction {
                    home_win_prob,
                    predicted_winner: predicted_winner.to_string(),
                },
            );
        }
        Ok(predictions)
    }
}

/// Registry of predictors, keyed by name.
pub struct PredictorRegistry {
    predictors: HashMap<String, Arc<dyn Predictor>>,
}

impl PredictorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            predictors: HashMap::new(),
        }
    }

    /// Create a registry with the shipped predictors registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(HomeEdgePredictor));
        info!(
            "PredictorRegistry initialized with {} predictor(s)",
            registry.predictors.len()
        );
        registry
    }

    pub fn register(&mut self, predictor: Arc<dyn Predictor>) {
        self.predictors
            .insert(predictor.name().to_string(), predictor);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Predictor>> {
        self.predictors.get(name).cloned()
    }

    /// Registered predictor names, sorted (for error messages)
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.predictors.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for PredictorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
