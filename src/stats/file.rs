use async_trait::async_trait;
use std::path::Path;
use tracing::{info, warn};

use super::provider::StatProvider;
use super::table::{RawStat, StatTable};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{EntityKind, StatRecord};

/// Stat provider backed by two local CSV reference tables (teams, pitchers).
///
/// The tables are read once at construction. If either cannot be read the
/// provider stays usable but every `resolve` reports `StatsUnavailable`, so
/// the pipeline degrades to defaults instead of refusing to start.
pub struct FileStatProvider {
    table: Result<StatTable, String>,
}

impl FileStatProvider {
    pub fn open(team_path: impl AsRef<Path>, pitcher_path: impl AsRef<Path>) -> Self {
        let load = || -> PipelineResult<StatTable> {
            let teams = read(team_path.as_ref())?;
            let pitchers = read(pitcher_path.as_ref())?;
            Self::table_from_csv(&teams, &pitchers)
        };
        let table = load().map_err(|e| e.to_string());
        match &table {
            Ok(t) => info!(
                "Loaded stat tables: {} teams, {} pitchers",
                t.len(EntityKind::Team),
                t.len(EntityKind::Pitcher)
            ),
            Err(e) => warn!("Stat tables unavailable: {}", e),
        }
        FileStatProvider { table }
    }

    #[cfg(test)]
    pub fn from_csv(team_csv: &str, pitcher_csv: &str) -> PipelineResult<Self> {
        Ok(FileStatProvider {
            table: Ok(Self::table_from_csv(team_csv, pitcher_csv)?),
        })
    }

    fn table_from_csv(team_csv: &str, pitcher_csv: &str) -> PipelineResult<StatTable> {
        let mut table = StatTable::new();
        for (text, kind) in [
            (team_csv, EntityKind::Team),
            (pitcher_csv, EntityKind::Pitcher),
        ] {
            for raw in parse_stat_csv(text)? {
                if let Err(e) = table.insert(raw, kind) {
                    warn!("Skipping {} row: {}", kind, e);
                }
            }
        }
        Ok(table)
    }
}

fn read(path: &Path) -> PipelineResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        PipelineError::StatsUnavailable(format!("cannot read {}: {}", path.display(), e))
    })
}

#[async_trait]
impl StatProvider for FileStatProvider {
    fn name(&self) -> &str {
        "local tables"
    }

    async fn resolve(&self, entity_id: &str, kind: EntityKind) -> PipelineResult<StatRecord> {
        match &self.table {
            Ok(table) => Ok(table.resolve_or_default(entity_id, kind)),
            Err(e) => Err(PipelineError::StatsUnavailable(e.clone())),
        }
    }
}

const NAME_COLUMNS: [&str; 3] = ["team", "pitcher", "name"];
const RATE_COLUMNS: [&str; 4] = ["nrfi_rate", "nrfi %", "nrfi%", "no_score_rate"];
const ERA_COLUMNS: [&str; 2] = ["first_inning_era", "era"];
const RPG_COLUMNS: [&str; 2] = ["runs_per_game", "rpg"];
const PARK_COLUMNS: [&str; 1] = ["park_factor"];

/// Parse a stat table with a header row. Rows with an unparseable rate are
/// skipped; a table without name or rate columns is rejected outright.
pub fn parse_stat_csv(text: &str) -> PipelineResult<Vec<RawStat>> {
    let mut rows = parse_rows(text).into_iter();
    let header: Vec<String> = rows
        .next()
        .unwrap_or_default()
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let column = |names: &[&str]| header.iter().position(|h| names.contains(&h.as_str()));
    let name_col = column(&NAME_COLUMNS[..])
        .ok_or_else(|| PipelineError::StatsUnavailable("stat table has no name column".into()))?;
    let rate_col = column(&RATE_COLUMNS[..]).ok_or_else(|| {
        PipelineError::StatsUnavailable("stat table has no nrfi_rate column".into())
    })?;
    let era_col = column(&ERA_COLUMNS[..]);
    let rpg_col = column(&RPG_COLUMNS[..]);
    let park_col = column(&PARK_COLUMNS[..]);

    let stats = rows
        .filter_map(|row| {
            let cell = |idx: Option<usize>| -> Option<f64> {
                idx.and_then(|i| row.get(i))
                    .map(|s| s.trim().trim_end_matches('%'))
                    .filter(|s| !s.is_empty())
                    .and_then(|s| s.parse().ok())
            };
            let name = row.get(name_col)?.trim().to_string();
            let Some(nrfi_rate) = cell(Some(rate_col)) else {
                warn!("Skipping stat row '{}': unparseable rate", name);
                return None;
            };
            Some(RawStat {
                name,
                nrfi_rate,
                first_inning_era: cell(era_col),
                runs_per_game: cell(rpg_col),
                park_factor: cell(park_col),
            })
        })
        .collect();

    Ok(stats)
}

/// Minimal CSV reader: quoted fields, doubled-quote escapes, CRLF.
fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => row.push(std::mem::take(&mut field)),
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                row.push(std::mem::take(&mut field));
                if !(row.len() == 1 && row[0].trim().is_empty()) {
                    rows.push(std::mem::take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(ch),
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TEAMS: &str = "Team,NRFI_Rate,First_Inning_ERA,Runs_Per_Game,Park_Factor\r\n\
        \"St. Louis Cardinals\",0.61,3.9,4.3,0.98\r\n\
        Colorado Rockies,47%,6.1,5.8,1.28\r\n\
        Broken Row,n/a,,,\r\n";
    const PITCHERS: &str = "pitcher,nrfi_rate,era\nGerrit Cole,0.74,2.5\nSonny Gray,70,\n";

    #[test]
    fn test_parse_rows_quotes() {
        let rows = parse_rows("a,\"b,c\",\"say \"\"hi\"\"\"\n\nx,y,z");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["a", "b,c", "say \"hi\""]);
        assert_eq!(rows[1], vec!["x", "y", "z"]);
    }

    #[test]
    fn test_parse_stat_csv_columns() {
        let stats = parse_stat_csv(TEAMS).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].name, "St. Louis Cardinals");
        assert_relative_eq!(stats[1].nrfi_rate, 47.0);
        assert_eq!(stats[1].park_factor, Some(1.28));
    }

    #[test]
    fn test_missing_rate_column_rejected() {
        let res = parse_stat_csv("team,wins\nCubs,80\n");
        assert!(matches!(res, Err(PipelineError::StatsUnavailable(_))));
    }

    #[tokio::test]
    async fn test_resolve_known_and_unknown() {
        let provider = FileStatProvider::from_csv(TEAMS, PITCHERS).unwrap();

        let rockies = provider
            .resolve("Colorado Rockies", EntityKind::Team)
            .await
            .unwrap();
        assert_relative_eq!(rockies.first_inning_no_score_rate, 0.47);

        let gray = provider.resolve("sonny gray", EntityKind::Pitcher).await.unwrap();
        assert_relative_eq!(gray.first_inning_no_score_rate, 0.70);
        assert_eq!(gray.first_inning_era, None);

        let unknown = provider.resolve("Rookie Call-Up", EntityKind::Pitcher).await.unwrap();
        assert!(unknown.is_default);
    }

    #[tokio::test]
    async fn test_missing_files_report_unavailable() {
        let provider = FileStatProvider::open("/nonexistent/teams.csv", "/nonexistent/p.csv");
        let res = provider.resolve("Cubs", EntityKind::Team).await;
        assert!(matches!(res, Err(PipelineError::StatsUnavailable(_))));
    }
}
