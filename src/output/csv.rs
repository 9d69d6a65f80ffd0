use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::warn;

use super::ResultSink;
use crate::models::{PredictionTable, TableRow};

/// Writes the five-column table to a CSV file for downstream display.
pub struct CsvSink {
    path: PathBuf,
    include_undetermined: bool,
    label: String,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>, include_undetermined: bool) -> Self {
        let path = path.into();
        let label = format!("csv:{}", path.display());
        CsvSink {
            path,
            include_undetermined,
            label,
        }
    }
}

impl ResultSink for CsvSink {
    fn name(&self) -> &str {
        &self.label
    }

    /// A failed schedule fetch leaves the previous file in place rather than
    /// replacing it with an empty table.
    fn publish(&self, table: &PredictionTable) -> Result<()> {
        if !table.is_available() {
            warn!(
                "Not overwriting {}: {}",
                self.path.display(),
                table.message()
            );
            return Ok(());
        }

        let body = render(&table.rows(self.include_undetermined));
        let tmp = self.path.with_extension("csv.tmp");
        std::fs::write(&tmp, body)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to move {} into place", tmp.display()))?;
        Ok(())
    }
}

pub fn render(rows: &[TableRow]) -> String {
    let mut out = TableRow::HEADERS.join(",");
    out.push('\n');
    for row in rows {
        let confidence = row.confidence.map(|c| c.to_string()).unwrap_or_default();
        let fields = [
            row.game_time.as_str(),
            row.matchup.as_str(),
            row.pitchers.as_str(),
            row.prediction.as_str(),
            confidence.as_str(),
        ];
        let line: Vec<String> = fields.iter().map(|f| escape(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

fn escape(field: &str) -> String {
    if field.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TableStatus;

    fn row(matchup: &str, prediction: &str, confidence: Option<u8>) -> TableRow {
        TableRow {
            game_time: "7:05 PM ET".into(),
            matchup: matchup.into(),
            pitchers: "A vs B".into(),
            prediction: prediction.into(),
            confidence,
        }
    }

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "nrfi-{}-{}-{}.csv",
            tag,
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ))
    }

    #[test]
    fn test_render_header_and_rows() {
        let out = render(&[
            row("Red Sox @ Yankees", "NRFI", Some(72)),
            row("Cubs, Chicago @ Reds", "TBD", None),
        ]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Game Time,Matchup,Pitchers,Prediction,Confidence %");
        assert_eq!(lines[1], "7:05 PM ET,Red Sox @ Yankees,A vs B,NRFI,72");
        assert_eq!(lines[2], "7:05 PM ET,\"Cubs, Chicago @ Reds\",A vs B,TBD,");
    }

    #[test]
    fn test_escape_quotes() {
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_unavailable_table_keeps_previous_file() {
        let path = temp_path("keep");
        std::fs::write(&path, "previous").unwrap();

        let sink = CsvSink::new(&path, false);
        sink.publish(&PredictionTable::schedule_unavailable("down"))
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous");

        sink.publish(&PredictionTable::new(TableStatus::Complete, vec![]))
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Game Time,Matchup,Pitchers,Prediction,Confidence %\n"
        );
        let _ = std::fs::remove_file(&path);
    }
}
