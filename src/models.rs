use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PipelineError, PipelineResult};
use crate::schedule::eastern;

/// A probable starting pitcher, or the `UNKNOWN` sentinel when none has been
/// announced yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PitcherSlot {
    Known(String),
    Unknown,
}

impl PitcherSlot {
    /// Blank or missing names map to `Unknown`.
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some(n) if !n.is_empty() && !n.eq_ignore_ascii_case("tbd") => {
                PitcherSlot::Known(n.to_string())
            }
            _ => PitcherSlot::Unknown,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            PitcherSlot::Known(n) => Some(n),
            PitcherSlot::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, PitcherSlot::Unknown)
    }

    pub fn display(&self) -> &str {
        self.name().unwrap_or("TBD")
    }
}

/// One scheduled game, built fresh on every pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Upstream event ID from the schedule source
    pub event_id: String,
    pub start_time: DateTime<Utc>,
    pub away_team: String,
    pub home_team: String,
    pub away_pitcher: PitcherSlot,
    pub home_pitcher: PitcherSlot,
}

impl GameRecord {
    pub fn new(
        event_id: impl Into<String>,
        start_time: DateTime<Utc>,
        away_team: impl Into<String>,
        home_team: impl Into<String>,
        away_pitcher: PitcherSlot,
        home_pitcher: PitcherSlot,
    ) -> PipelineResult<Self> {
        let away_team = away_team.into();
        let home_team = home_team.into();
        if away_team.trim().is_empty() || home_team.trim().is_empty() {
            return Err(PipelineError::InvalidGame("missing team name".into()));
        }
        if away_team == home_team {
            return Err(PipelineError::InvalidGame(format!(
                "{} listed as both home and away",
                home_team
            )));
        }
        Ok(GameRecord {
            event_id: event_id.into(),
            start_time,
            away_team,
            home_team,
            away_pitcher,
            home_pitcher,
        })
    }

    /// "Away @ Home"
    pub fn matchup(&self) -> String {
        format!("{} @ {}", self.away_team, self.home_team)
    }

    /// "Away starter vs Home starter", with TBD for unannounced starters
    pub fn pitchers(&self) -> String {
        format!(
            "{} vs {}",
            self.away_pitcher.display(),
            self.home_pitcher.display()
        )
    }

    /// Start time in US Eastern, e.g. "7:05 PM ET".
    pub fn display_time(&self) -> String {
        eastern::format_game_time(self.start_time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Team,
    Pitcher,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Team => write!(f, "team"),
            EntityKind::Pitcher => write!(f, "pitcher"),
        }
    }
}

/// First-inning performance figures for one team or pitcher.
///
/// `first_inning_no_score_rate` is always in [0, 1]; the stats layer rescales
/// or clamps upstream values before a record is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    pub entity_id: String,
    pub kind: EntityKind,
    pub first_inning_no_score_rate: f64,
    /// First-inning ERA (earned runs per nine first innings)
    pub first_inning_era: Option<f64>,
    /// Runs allowed per game (teams only)
    pub runs_per_game: Option<f64>,
    /// Home park run factor, 1.0 = neutral (teams only)
    pub park_factor: Option<f64>,
    /// True when the record is the neutral fallback rather than a real lookup
    pub is_default: bool,
}

impl StatRecord {
    pub const DEFAULT_RATE: f64 = 0.5;

    /// Neutral record used when an entity cannot be resolved.
    pub fn default_for(entity_id: &str, kind: EntityKind) -> Self {
        StatRecord {
            entity_id: entity_id.to_string(),
            kind,
            first_inning_no_score_rate: Self::DEFAULT_RATE,
            first_inning_era: None,
            runs_per_game: None,
            park_factor: None,
            is_default: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
    NoScorePredicted,
    ScorePredicted,
    Undetermined,
}

impl Label {
    /// Short form used in output tables.
    pub fn short(&self) -> &'static str {
        match self {
            Label::NoScorePredicted => "NRFI",
            Label::ScorePredicted => "YRFI",
            Label::Undetermined => "TBD",
        }
    }
}

/// The scoring result for a single game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub game: GameRecord,
    pub label: Label,
    /// Confidence in `label`, 0–100. `None` iff the label is `Undetermined`.
    pub confidence_percent: Option<u8>,
    /// Composite no-score estimate S the label was derived from
    pub composite_score: Option<f64>,
}

impl Prediction {
    pub fn undetermined(game: GameRecord) -> Self {
        Prediction {
            game,
            label: Label::Undetermined,
            confidence_percent: None,
            composite_score: None,
        }
    }

    pub fn is_determined(&self) -> bool {
        self.label != Label::Undetermined
    }
}

/// How complete a prediction table is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableStatus {
    Complete,
    /// Some or all stat lookups fell back to defaults
    StatsDegraded { reason: String },
    /// The schedule could not be fetched; the table is empty
    ScheduleUnavailable { reason: String },
}

impl TableStatus {
    pub fn kind(&self) -> &'static str {
        match self {
            TableStatus::Complete => "complete",
            TableStatus::StatsDegraded { .. } => "stats_degraded",
            TableStatus::ScheduleUnavailable { .. } => "schedule_unavailable",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            TableStatus::Complete => None,
            TableStatus::StatsDegraded { reason } | TableStatus::ScheduleUnavailable { reason } => {
                Some(reason)
            }
        }
    }

    /// Rebuild a status from its stored `kind` / `detail` pair.
    pub fn from_parts(kind: &str, detail: Option<String>) -> Self {
        let reason = detail.unwrap_or_default();
        match kind {
            "stats_degraded" => TableStatus::StatsDegraded { reason },
            "schedule_unavailable" => TableStatus::ScheduleUnavailable { reason },
            _ => TableStatus::Complete,
        }
    }

    /// Headline a consumer can render. An empty schedule and a failed fetch
    /// must never read the same.
    pub fn message(&self, game_count: usize) -> &'static str {
        match self {
            TableStatus::ScheduleUnavailable { .. } => "No data available, try again later",
            _ if game_count == 0 => "No games today",
            TableStatus::StatsDegraded { .. } => "Predictions use default stats for some entries",
            TableStatus::Complete => "Predictions up to date",
        }
    }
}

/// The pipeline's output: predictions ranked by confidence, undetermined last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionTable {
    pub generated_at: DateTime<Utc>,
    pub status: TableStatus,
    pub predictions: Vec<Prediction>,
}

impl PredictionTable {
    pub fn new(status: TableStatus, predictions: Vec<Prediction>) -> Self {
        PredictionTable {
            generated_at: Utc::now(),
            status,
            predictions,
        }
    }

    pub fn schedule_unavailable(reason: impl Into<String>) -> Self {
        Self::new(
            TableStatus::ScheduleUnavailable {
                reason: reason.into(),
            },
            Vec::new(),
        )
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.status, TableStatus::ScheduleUnavailable { .. })
    }

    pub fn message(&self) -> &'static str {
        self.status.message(self.predictions.len())
    }

    /// Flatten into display rows. Undetermined games are dropped here, at the
    /// presentation boundary, unless `include_undetermined` is set.
    pub fn rows(&self, include_undetermined: bool) -> Vec<TableRow> {
        self.predictions
            .iter()
            .filter(|p| include_undetermined || p.is_determined())
            .map(TableRow::from)
            .collect()
    }
}

/// One line of the output table: Game Time, Matchup, Pitchers, Prediction,
/// Confidence %.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub game_time: String,
    pub matchup: String,
    pub pitchers: String,
    pub prediction: String,
    pub confidence: Option<u8>,
}

impl TableRow {
    pub const HEADERS: [&'static str; 5] =
        ["Game Time", "Matchup", "Pitchers", "Prediction", "Confidence %"];
}

impl From<&Prediction> for TableRow {
    fn from(p: &Prediction) -> Self {
        TableRow {
            game_time: p.game.display_time(),
            matchup: p.game.matchup(),
            pitchers: p.game.pitchers(),
            prediction: p.label.short().to_string(),
            confidence: p.confidence_percent,
        }
    }
}
