//! Database Updater Service
//!
//! One-shot CLI that reconciles the persisted game dataset for a season:
//! schedule sync, play-by-play and game states, pre-game readiness, and
//! (optionally) predictions. Typically run from cron or invoked after the
//! ingestion service lands new logs.
//!
//! ```text
//! database_updater --season 2023-2024 --predictor HomeEdge
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use courtcast_rust_core::db::{self, schema, DbPoolConfig};
use courtcast_rust_core::pipeline::{PipelineOptions, UpdatePipeline};
use courtcast_rust_core::providers::{
    AverageFeatureBuilder, BoxScoreStateBuilder, DbPriorStateProvider, NoopScheduleSync,
    PredictorRegistry, StoredPlayByPlayProvider,
};
use dotenv::dotenv;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the database updater
#[derive(Parser, Debug)]
#[command(name = "database_updater")]
#[command(about = "Update the database with the latest game data and predictions")]
#[command(version)]
struct Args {
    /// The season to update (e.g. 2023-2024)
    #[arg(short, long, env = "SEASON")]
    season: String,

    /// Predictor to run after the data stages; omit to skip predictions
    #[arg(short, long, env = "PREDICTOR")]
    predictor: Option<String>,

    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Include every season_type instead of Regular/Post Season only
    #[arg(long, default_value_t = false)]
    all_season_types: bool,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    info!("Starting database updater for season {}", args.season);

    // Resolve the predictor up front so a typo fails before any work runs.
    let registry = PredictorRegistry::with_defaults();
    let predictor = match &args.predictor {
        Some(name) => match registry.get(name) {
            Some(predictor) => Some(predictor),
            None => bail!(
                "Unknown predictor '{}'; available: {}",
                name,
                registry.names().join(", ")
            ),
        },
        None => None,
    };

    // Database
    let pool_config = DbPoolConfig::from_env_with_defaults(DbPoolConfig {
        create_if_missing: true,
        ..Default::default()
    });
    let pool = db::create_pool(&args.database_url, &pool_config)
        .await
        .context("Failed to connect to database")?;
    schema::init_schema(&pool).await?;

    // Pipeline
    let options = PipelineOptions {
        restrict_season_types: !args.all_season_types,
    };
    let pipeline = UpdatePipeline::new(
        pool.clone(),
        options,
        Arc::new(NoopScheduleSync),
        Arc::new(StoredPlayByPlayProvider::new(pool.clone())),
        Arc::new(BoxScoreStateBuilder::new(pool.clone())),
        Arc::new(DbPriorStateProvider::new(pool.clone())),
        Arc::new(AverageFeatureBuilder),
    );

    let summary = pipeline
        .run(&args.season, predictor.as_deref())
        .await
        .context("Update run failed")?;

    info!(
        "Done: {} game state(s) updated, {} game(s) evaluated for readiness \
         ({} finalized), {} prediction(s) saved",
        summary.game_states_updated,
        summary.pre_game_evaluated,
        summary.pre_game_finalized,
        summary.predictions_saved
    );
    Ok(())
}
