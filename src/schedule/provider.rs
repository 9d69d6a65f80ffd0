use async_trait::async_trait;

use crate::error::PipelineResult;
use crate::models::GameRecord;

/// Trait that every schedule source must implement.
#[async_trait]
pub trait ScheduleProvider: Send + Sync {
    /// Return today's games (US Eastern calendar day). An empty list means no
    /// games are scheduled; any fetch or parse failure is `ScheduleUnavailable`.
    async fn fetch_today(&self) -> PipelineResult<Vec<GameRecord>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
