//! Shipped collaborator implementations.
//!
//! These cover everything reachable from the game database itself: stored
//! play-by-play logs, box-score game states, prior states, rolling-average
//! features and a baseline predictor. Live ingestion (schedule scraping,
//! play-by-play capture) runs in a separate service and lands rows for
//! these providers to consume.

pub mod box_score;
pub mod features;
pub mod predictor;
pub mod prior_states;
pub mod schedule;
pub mod stored_pbp;

pub use box_score::BoxScoreStateBuilder;
pub use features::AverageFeatureBuilder;
pub use predictor::{HomeEdgePredictor, PredictorRegistry};
pub use prior_states::DbPriorStateProvider;
pub use schedule::NoopScheduleSync;
pub use stored_pbp::StoredPlayByPlayProvider;
