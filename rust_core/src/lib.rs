//! Courtcast Core - Incremental game-data update pipeline.
//!
//! This module provides:
//! - Stage queries that compute, per season, which games are stale at each
//!   pipeline stage (game data, pre-game data, predictions)
//! - Dependency-aware readiness detection for pre-game data (a game's prior
//!   states are only trustworthy once every earlier same-season game of
//!   either team has finalized game data)
//! - A four-stage pipeline orchestrator (schedule, game data, pre-game data,
//!   predictions) over pluggable collaborators
//! - An atomic batch writer for the `pre_game_data_finalized` flag

pub mod db;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod readiness;

pub use models::*;
pub use pipeline::{PipelineOptions, RunSummary, UpdatePipeline};
pub use readiness::{evaluate_readiness, pre_game_ready};
