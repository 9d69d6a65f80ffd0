pub mod csv;

pub use csv::CsvSink;

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::PredictionTable;

/// Something that persists or displays a finished prediction table.
pub trait ResultSink: Send + Sync {
    fn publish(&self, table: &PredictionTable) -> Result<()>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Hand the table to every sink. A failing sink is logged and does not stop
/// the others.
pub fn publish_all(sinks: &[Arc<dyn ResultSink>], table: &PredictionTable) {
    for sink in sinks {
        match sink.publish(table) {
            Ok(()) => info!("Published {} game(s) to {}", table.predictions.len(), sink.name()),
            Err(e) => warn!("Sink {} failed: {:#}", sink.name(), e),
        }
    }
}
