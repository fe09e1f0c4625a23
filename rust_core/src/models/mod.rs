// Shared models for Courtcast services
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique game identifier, as assigned by the league schedule feed.
pub type GameId = String;

/// Raw play-by-play payload as fetched from the ingestion store.
pub type RawPbpLog = serde_json::Value;

// ============================================================================
// Game lifecycle
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl GameStatus {
    /// Database representation ("Not Started", "In Progress", "Completed").
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::NotStarted => "Not Started",
            GameStatus::InProgress => "In Progress",
            GameStatus::Completed => "Completed",
        }
    }

    /// Parse the database representation. Unknown statuses (cancelled,
    /// postponed, feed glitches) return `None` and never enter a work set.
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "Not Started" => Some(GameStatus::NotStarted),
            "In Progress" => Some(GameStatus::InProgress),
            "Completed" => Some(GameStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonType {
    RegularSeason,
    PostSeason,
}

impl SeasonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeasonType::RegularSeason => "Regular Season",
            SeasonType::PostSeason => "Post Season",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "Regular Season" => Some(SeasonType::RegularSeason),
            "Post Season" => Some(SeasonType::PostSeason),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

// ============================================================================
// Game data
// ============================================================================

/// Metadata needed to turn a raw play-by-play log into a game state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicGameInfo {
    pub home_team: String,
    pub away_team: String,
    pub date_time_est: DateTime<Utc>,
}

/// Merged input for the game-state builder: schedule metadata plus the
/// fetched play-by-play log for one game.
#[derive(Debug, Clone)]
pub struct GameStateInput {
    pub home_team: String,
    pub away_team: String,
    pub date_time_est: DateTime<Utc>,
    pub pbp_log: RawPbpLog,
}

/// Computed game state. `is_final` marks a conclusively processed game;
/// the game-data stage flips `game_data_finalized` only for final states.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub game_id: GameId,
    pub home_team: String,
    pub away_team: String,
    pub date_time_est: DateTime<Utc>,
    pub home_score: i64,
    pub away_score: i64,
    pub is_final: bool,
}

// ============================================================================
// Prior states (pre-game stage)
// ============================================================================

/// A request to load one team's rolling prior state for one side of a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorStateRef {
    pub game_id: GameId,
    pub team: String,
    pub side: Side,
    pub season: String,
    /// Scheduled tip of the requesting game; only strictly earlier games
    /// contribute to the prior state.
    pub cutoff: DateTime<Utc>,
}

/// One earlier game of a team, summarized from its stored game state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamGameSummary {
    pub game_id: GameId,
    pub date_time_est: DateTime<Utc>,
    pub points_for: i64,
    pub points_against: i64,
    pub won: bool,
}

/// Per-side missing markers for a game's prior states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideFlags {
    pub home: bool,
    pub away: bool,
}

/// Loaded prior states for one game, both sides, plus missing markers.
/// `missing.home` is set when some earlier same-season game of the home team
/// has no stored game state yet (and symmetrically for `missing.away`).
#[derive(Debug, Clone, Default)]
pub struct PriorStates {
    pub home: Vec<TeamGameSummary>,
    pub away: Vec<TeamGameSummary>,
    pub missing: SideFlags,
}

// ============================================================================
// Features and predictions
// ============================================================================

/// Pre-game feature set, keyed feature name to value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureSet {
    pub values: BTreeMap<String, f64>,
}

impl FeatureSet {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }
}

/// Pre-game prediction produced by a [`crate::pipeline::Predictor`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub home_win_prob: f64,
    pub predicted_winner: String,
}
