use thiserror::Error;

use crate::models::EntityKind;

/// Failure taxonomy for the prediction pipeline.
///
/// Only `ScheduleUnavailable` and `StatsUnavailable` ever reach the pipeline
/// boundary, and there they become a `TableStatus` rather than an error.
/// `EntityNotFound` and `InvalidStat` are absorbed by the stat providers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Schedule unavailable: {0}")]
    ScheduleUnavailable(String),

    #[error("Stats unavailable: {0}")]
    StatsUnavailable(String),

    #[error("No stats for {kind} '{name}'")]
    EntityNotFound { kind: EntityKind, name: String },

    #[error("Invalid stat for '{name}': {reason}")]
    InvalidStat { name: String, reason: String },

    #[error("Invalid game: {0}")]
    InvalidGame(String),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
