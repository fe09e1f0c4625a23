//! Stage queries: which games need work at each pipeline stage.
//!
//! All queries are read-only and scoped to one season. Results are sets of
//! game ids; callers must not rely on ordering (a sorted order is produced
//! only to keep runs deterministic).
//!
//! The pre-game query enforces the dependency closure: a Not Started game is
//! only eligible once every earlier same-season game of either of its teams
//! has finalized game data. The closure is computed in two phases in memory
//! (fetch season rows, index pending games by team, scan candidates) rather
//! than via a correlated subquery, which keeps the check linear in season
//! size.

use crate::models::{BasicGameInfo, GameId, GameStatus, SeasonType};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use sqlx::SqlitePool;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Season scope for stage queries.
///
/// The updater historically shipped two near-identical variants, one
/// restricting work to Regular Season and Post Season games and one taking
/// every season_type; `restrict_season_types` folds both into one engine.
#[derive(Debug, Clone)]
pub struct QueryScope {
    pub season: String,
    pub restrict_season_types: bool,
}

impl QueryScope {
    pub fn new(season: impl Into<String>) -> Self {
        Self {
            season: season.into(),
            restrict_season_types: true,
        }
    }

    pub fn all_season_types(mut self) -> Self {
        self.restrict_season_types = false;
        self
    }

    fn includes(&self, season_type: &str) -> bool {
        !self.restrict_season_types || SeasonType::from_db(season_type).is_some()
    }

    fn season_type_clause(&self, column: &str) -> String {
        if self.restrict_season_types {
            format!(
                " AND {} IN ('{}', '{}')",
                column,
                SeasonType::RegularSeason.as_str(),
                SeasonType::PostSeason.as_str()
            )
        } else {
            String::new()
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SeasonGameRow {
    game_id: String,
    home_team: String,
    away_team: String,
    date_time_est: DateTime<Utc>,
    status: String,
    season_type: String,
    game_data_finalized: bool,
    pre_game_data_finalized: bool,
}

/// Games whose play-by-play and game state need (re)processing: Completed or
/// In Progress, game data not yet finalized. Not Started games have no
/// play-by-play and are excluded.
pub async fn games_needing_game_state_update(
    pool: &SqlitePool,
    scope: &QueryScope,
) -> Result<Vec<GameId>> {
    let sql = format!(
        "SELECT game_id FROM Games \
         WHERE season = ? \
           AND (status = 'Completed' OR status = 'In Progress') \
           AND game_data_finalized = 0{}",
        scope.season_type_clause("season_type")
    );

    let ids: Vec<GameId> = sqlx::query_scalar(&sql)
        .bind(&scope.season)
        .fetch_all(pool)
        .await
        .context("Failed to query games needing game state updates")?;

    debug!(
        "{} game(s) need game state updates in season {}",
        ids.len(),
        scope.season
    );
    Ok(ids)
}

/// Games whose `pre_game_data_finalized` flag needs (re)evaluation.
///
/// Union of two subsets, deduplicated by id:
/// 1. Completed or In Progress games with the flag still unset (known
///    incomplete, always eligible for retry);
/// 2. Not Started games with the flag unset whose dependency closure holds:
///    no earlier same-season game sharing either team still has
///    `game_data_finalized = 0`.
///
/// Blockers are drawn from every game of the season regardless of
/// season_type; the scope only restricts which candidates qualify.
pub async fn games_with_incomplete_pre_game_data(
    pool: &SqlitePool,
    scope: &QueryScope,
) -> Result<Vec<GameId>> {
    let rows: Vec<SeasonGameRow> = sqlx::query_as(
        "SELECT game_id, home_team, away_team, date_time_est, status, season_type, \
                game_data_finalized, pre_game_data_finalized \
         FROM Games WHERE season = ?",
    )
    .bind(&scope.season)
    .fetch_all(pool)
    .await
    .context("Failed to load season games for pre-game work set")?;

    // Phase 1: index the scheduled times of games with pending game data by
    // team. A candidate is blocked by any strictly earlier entry under
    // either of its teams; the candidate never blocks itself because the
    // comparison is strict.
    let mut pending_by_team: FxHashMap<&str, Vec<DateTime<Utc>>> = FxHashMap::default();
    for row in rows.iter().filter(|r| !r.game_data_finalized) {
        pending_by_team
            .entry(row.home_team.as_str())
            .or_default()
            .push(row.date_time_est);
        pending_by_team
            .entry(row.away_team.as_str())
            .or_default()
            .push(row.date_time_est);
    }

    // Phase 2: scan candidates.
    let mut work = BTreeSet::new();
    for row in &rows {
        if row.pre_game_data_finalized || !scope.includes(&row.season_type) {
            continue;
        }
        match GameStatus::from_db(&row.status) {
            Some(GameStatus::Completed) | Some(GameStatus::InProgress) => {
                work.insert(row.game_id.clone());
            }
            Some(GameStatus::NotStarted) => {
                let blocked = [&row.home_team, &row.away_team].into_iter().any(|team| {
                    pending_by_team
                        .get(team.as_str())
                        .is_some_and(|times| times.iter().any(|t| *t < row.date_time_est))
                });
                if !blocked {
                    work.insert(row.game_id.clone());
                }
            }
            None => {}
        }
    }

    debug!(
        "{} game(s) have incomplete pre-game data in season {}",
        work.len(),
        scope.season
    );
    Ok(work.into_iter().collect())
}

/// Games ready for prediction that have no stored prediction for the given
/// predictor: `pre_game_data_finalized = 1` and the (game, predictor) pair is
/// absent from the prediction store.
pub async fn games_needing_prediction(
    pool: &SqlitePool,
    scope: &QueryScope,
    predictor: &str,
) -> Result<Vec<GameId>> {
    let sql = format!(
        "SELECT g.game_id FROM Games g \
         LEFT JOIN Predictions p ON g.game_id = p.game_id AND p.predictor = ? \
         WHERE g.season = ? \
           AND g.pre_game_data_finalized = 1 \
           AND p.game_id IS NULL{}",
        scope.season_type_clause("g.season_type")
    );

    let ids: Vec<GameId> = sqlx::query_scalar(&sql)
        .bind(predictor)
        .bind(&scope.season)
        .fetch_all(pool)
        .await
        .context("Failed to query games needing predictions")?;

    debug!(
        "{} game(s) need predictions from '{}' in season {}",
        ids.len(),
        predictor,
        scope.season
    );
    Ok(ids)
}

/// Look up home/away teams and scheduled tip for a set of games.
pub async fn lookup_basic_game_info(
    pool: &SqlitePool,
    ids: &[GameId],
) -> Result<HashMap<GameId, BasicGameInfo>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "SELECT game_id, home_team, away_team, date_time_est \
         FROM Games WHERE game_id IN ({placeholders})"
    );

    let mut query = sqlx::query_as::<_, (String, String, String, DateTime<Utc>)>(&sql);
    for id in ids {
        query = query.bind(id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to look up basic game info")?;

    Ok(rows
        .into_iter()
        .map(|(game_id, home_team, away_team, date_time_est)| {
            (
                game_id,
                BasicGameInfo {
                    home_team,
                    away_team,
                    date_time_est,
                },
            )
        })
        .collect())
}
