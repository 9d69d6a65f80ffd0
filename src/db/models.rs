use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{TableRow, TableStatus};

/// One stored pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: i64,
    pub generated_at: DateTime<Utc>,
    pub status: TableStatus,
    /// Number of games in the run, undetermined included
    pub games: i64,
    /// Headline for consumers ("No games today", ...)
    pub message: String,
}

/// A stored run together with its ranked rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTable {
    pub run: RunSummary,
    pub rows: Vec<TableRow>,
}
