use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

pub mod models;
use models::*;

use crate::models::{PredictionTable, TableRow, TableStatus};
use crate::output::ResultSink;

/// Thread-safe SQLite handle (single connection behind a mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn =
            Connection::open(path).with_context(|| format!("Failed to open database {}", path))?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database mutex poisoned"))
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        self.conn()?.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Runs ──────────────────────────────────────────────────────────────────

    /// Store a full table, undetermined games included, in rank order.
    pub fn record_run(&self, table: &PredictionTable) -> Result<i64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO runs (generated_at, status, detail, games) VALUES (?1, ?2, ?3, ?4)",
            params![
                table.generated_at,
                table.status.kind(),
                table.status.detail(),
                table.predictions.len() as i64,
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO predictions (
                    run_id, rank, event_id, game_time, matchup, pitchers,
                    prediction, confidence, composite_score
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            )?;
            for (rank, p) in table.predictions.iter().enumerate() {
                let row = TableRow::from(p);
                stmt.execute(params![
                    run_id,
                    rank as i64,
                    p.game.event_id,
                    row.game_time,
                    row.matchup,
                    row.pitchers,
                    row.prediction,
                    row.confidence,
                    p.composite_score,
                ])?;
            }
        }

        tx.commit()?;
        Ok(run_id)
    }

    /// Most recent runs, newest first
    pub fn list_runs(&self, limit: i64) -> Result<Vec<RunSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, generated_at, status, detail, games
             FROM runs ORDER BY id DESC LIMIT ?1",
        )?;
        let runs = stmt
            .query_map(params![limit], map_run)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }

    /// The most recent run as recorded. An outage run comes back with its
    /// `ScheduleUnavailable` status and no rows, never an older table.
    pub fn latest_table(&self) -> Result<Option<StoredTable>> {
        let conn = self.conn()?;
        let run = conn
            .query_row(
                "SELECT id, generated_at, status, detail, games
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                map_run,
            )
            .optional()?;
        let Some(run) = run else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT game_time, matchup, pitchers, prediction, confidence
             FROM predictions WHERE run_id = ?1 ORDER BY rank ASC",
        )?;
        let rows = stmt
            .query_map(params![run.id], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(StoredTable { run, rows }))
    }
}

impl ResultSink for Database {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn publish(&self, table: &PredictionTable) -> Result<()> {
        self.record_run(table)?;
        Ok(())
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn map_run(row: &rusqlite::Row) -> rusqlite::Result<RunSummary> {
    let generated_at: DateTime<Utc> = row.get(1)?;
    let kind: String = row.get(2)?;
    let detail: Option<String> = row.get(3)?;
    let games: i64 = row.get(4)?;
    let status = TableStatus::from_parts(&kind, detail);
    Ok(RunSummary {
        id: row.get(0)?,
        generated_at,
        message: status.message(games as usize).to_string(),
        status,
        games,
    })
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<TableRow> {
    Ok(TableRow {
        game_time: row.get(0)?,
        matchup: row.get(1)?,
        pitchers: row.get(2)?,
        prediction: row.get(3)?,
        confidence: row.get(4)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS runs (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    generated_at TEXT    NOT NULL,
    status       TEXT    NOT NULL,
    detail       TEXT,
    games        INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS predictions (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id          INTEGER NOT NULL,
    rank            INTEGER NOT NULL,
    event_id        TEXT    NOT NULL,
    game_time       TEXT    NOT NULL,
    matchup         TEXT    NOT NULL,
    pitchers        TEXT    NOT NULL,
    prediction      TEXT    NOT NULL,
    confidence      INTEGER,
    composite_score REAL,
    FOREIGN KEY (run_id) REFERENCES runs(id)
);

CREATE INDEX IF NOT EXISTS idx_predictions_run ON predictions(run_id, rank);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameRecord, Label, PitcherSlot, Prediction};
    use chrono::TimeZone;

    fn prediction(id: &str, label: Label, confidence: Option<u8>) -> Prediction {
        Prediction {
            game: GameRecord::new(
                id,
                Utc.with_ymd_and_hms(2024, 7, 4, 23, 5, 0).unwrap(),
                format!("Away {}", id),
                format!("Home {}", id),
                PitcherSlot::Known("A".into()),
                PitcherSlot::Known("B".into()),
            )
            .unwrap(),
            label,
            confidence_percent: confidence,
            composite_score: confidence.map(|c| c as f64 / 100.0),
        }
    }

    #[test]
    fn test_record_and_reload_latest() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.latest_table().unwrap().is_none());

        let table = PredictionTable::new(
            TableStatus::Complete,
            vec![
                prediction("1", Label::NoScorePredicted, Some(80)),
                prediction("2", Label::ScorePredicted, Some(65)),
                Prediction::undetermined(prediction("3", Label::Undetermined, None).game),
            ],
        );
        db.publish(&table).unwrap();

        let stored = db.latest_table().unwrap().unwrap();
        assert_eq!(stored.run.status, TableStatus::Complete);
        assert_eq!(stored.run.games, 3);
        assert_eq!(stored.rows, table.rows(true));
    }

    #[test]
    fn test_outage_replaces_previous_table() {
        let db = Database::open_in_memory().unwrap();
        let good = PredictionTable::new(
            TableStatus::Complete,
            vec![prediction("1", Label::NoScorePredicted, Some(70))],
        );
        db.record_run(&good).unwrap();
        db.record_run(&PredictionTable::schedule_unavailable("HTTP 502"))
            .unwrap();

        let stored = db.latest_table().unwrap().unwrap();
        assert!(matches!(
            stored.run.status,
            TableStatus::ScheduleUnavailable { .. }
        ));
        assert!(stored.rows.is_empty());
        assert_eq!(stored.run.message, "No data available, try again later");

        let runs = db.list_runs(10).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].status.kind(), "schedule_unavailable");
        assert_eq!(runs[0].message, "No data available, try again later");
    }

    #[test]
    fn test_only_outage_is_reported() {
        let db = Database::open_in_memory().unwrap();
        db.record_run(&PredictionTable::schedule_unavailable("timeout"))
            .unwrap();
        let stored = db.latest_table().unwrap().unwrap();
        assert!(matches!(
            stored.run.status,
            TableStatus::ScheduleUnavailable { .. }
        ));
        assert!(stored.rows.is_empty());
    }
}
