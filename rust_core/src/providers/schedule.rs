//! Schedule sync stand-in for deployments where schedule ingestion is owned
//! by the external scraper service.

use crate::pipeline::ScheduleSync;
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

/// No-op schedule sync. Games rows (including status transitions) are
/// maintained by the ingestion service; calling this is always safe and
/// trivially idempotent.
pub struct NoopScheduleSync;

#[async_trait]
impl ScheduleSync for NoopScheduleSync {
    async fn update_schedule(&self, season: &str) -> Result<()> {
        debug!(
            "Schedule for season {} is maintained externally, skipping sync",
            season
        );
        Ok(())
    }
}
