use async_trait::async_trait;

use crate::error::PipelineResult;
use crate::models::{EntityKind, StatRecord};

/// Trait that every statistics source must implement.
///
/// Unknown entities resolve to `StatRecord::default_for`; only a source that
/// is unreachable as a whole returns `StatsUnavailable`.
#[async_trait]
pub trait StatProvider: Send + Sync {
    async fn resolve(&self, entity_id: &str, kind: EntityKind) -> PipelineResult<StatRecord>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
