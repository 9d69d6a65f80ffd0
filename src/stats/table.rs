//! In-memory stat lookup shared by every provider.
//!
//! Records are keyed by a normalised name so "St. Louis Cardinals",
//! "st louis cardinals" and "St Louis  Cardinals" all hit the same row.
//! Validation happens on insert: anything that reaches the scoring engine has
//! a finite rate in [0, 1].

use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::models::{EntityKind, StatRecord};

/// A stat row as read from a source, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStat {
    #[serde(alias = "team", alias = "pitcher")]
    pub name: String,
    #[serde(alias = "no_score_rate", alias = "first_inning_no_score_rate")]
    pub nrfi_rate: f64,
    #[serde(default, alias = "era")]
    pub first_inning_era: Option<f64>,
    #[serde(default, alias = "rpg")]
    pub runs_per_game: Option<f64>,
    #[serde(default)]
    pub park_factor: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct StatTable {
    teams: HashMap<String, StatRecord>,
    pitchers: HashMap<String, StatRecord>,
}

impl StatTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and insert a row. Rejected rows leave the table untouched.
    pub fn insert(&mut self, raw: RawStat, kind: EntityKind) -> PipelineResult<()> {
        let record = validate(raw, kind)?;
        let key = normalize_name(&record.entity_id);
        self.map_mut(kind).insert(key, record);
        Ok(())
    }

    pub fn lookup(&self, name: &str, kind: EntityKind) -> PipelineResult<StatRecord> {
        let key = normalize_name(name);
        self.map(kind)
            .get(&key)
            .cloned()
            .ok_or_else(|| PipelineError::EntityNotFound {
                kind,
                name: name.to_string(),
            })
    }

    /// Lookup that absorbs misses into the neutral default record.
    pub fn resolve_or_default(&self, name: &str, kind: EntityKind) -> StatRecord {
        match self.lookup(name, kind) {
            Ok(record) => record,
            Err(e) => {
                debug!("{}; using default stats", e);
                StatRecord::default_for(name, kind)
            }
        }
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.map(kind).len()
    }

    fn map(&self, kind: EntityKind) -> &HashMap<String, StatRecord> {
        match kind {
            EntityKind::Team => &self.teams,
            EntityKind::Pitcher => &self.pitchers,
        }
    }

    fn map_mut(&mut self, kind: EntityKind) -> &mut HashMap<String, StatRecord> {
        match kind {
            EntityKind::Team => &mut self.teams,
            EntityKind::Pitcher => &mut self.pitchers,
        }
    }
}

/// "St. Louis  Cardinals" → "st louis cardinals"
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Bring a rate into [0, 1]. Values in (1, 100] are read as percentages;
/// anything else out of range is clamped. Non-finite values are rejected.
pub fn normalize_rate(value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let v = if value > 1.0 && value <= 100.0 {
        value / 100.0
    } else {
        value
    };
    Some(v.clamp(0.0, 1.0))
}

/// Optional modifiers must be finite and non-negative; bad ones are dropped
/// rather than failing the row.
fn sanitize_modifier(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

fn validate(raw: RawStat, kind: EntityKind) -> PipelineResult<StatRecord> {
    let name = raw.name.trim();
    if normalize_name(name).is_empty() {
        return Err(PipelineError::InvalidStat {
            name: raw.name.clone(),
            reason: "empty name".into(),
        });
    }
    let rate = normalize_rate(raw.nrfi_rate).ok_or_else(|| PipelineError::InvalidStat {
        name: name.to_string(),
        reason: format!("non-finite rate {}", raw.nrfi_rate),
    })?;

    let (runs_per_game, park_factor) = match kind {
        EntityKind::Team => (
            sanitize_modifier(raw.runs_per_game),
            sanitize_modifier(raw.park_factor),
        ),
        EntityKind::Pitcher => (None, None),
    };

    Ok(StatRecord {
        entity_id: name.to_string(),
        kind,
        first_inning_no_score_rate: rate,
        first_inning_era: sanitize_modifier(raw.first_inning_era),
        runs_per_game,
        park_factor,
        is_default: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn raw(name: &str, rate: f64) -> RawStat {
        RawStat {
            name: name.into(),
            nrfi_rate: rate,
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("St. Louis  Cardinals"), "st louis cardinals");
        assert_eq!(normalize_name("  "), "");
    }

    #[test]
    fn test_normalize_rate() {
        assert_relative_eq!(normalize_rate(0.58).unwrap(), 0.58);
        assert_relative_eq!(normalize_rate(58.0).unwrap(), 0.58);
        assert_relative_eq!(normalize_rate(-0.2).unwrap(), 0.0);
        assert_relative_eq!(normalize_rate(250.0).unwrap(), 1.0);
        assert!(normalize_rate(f64::NAN).is_none());
        assert!(normalize_rate(f64::INFINITY).is_none());
    }

    #[test]
    fn test_lookup_is_name_insensitive() {
        let mut table = StatTable::new();
        table
            .insert(raw("St. Louis Cardinals", 0.61), EntityKind::Team)
            .unwrap();
        let rec = table.lookup("st louis cardinals", EntityKind::Team).unwrap();
        assert_eq!(rec.entity_id, "St. Louis Cardinals");
        assert!(!rec.is_default);

        // Kinds are separate namespaces
        assert!(matches!(
            table.lookup("St. Louis Cardinals", EntityKind::Pitcher),
            Err(PipelineError::EntityNotFound { .. })
        ));
    }

    #[test]
    fn test_miss_resolves_to_default() {
        let table = StatTable::new();
        let rec = table.resolve_or_default("Nobody", EntityKind::Pitcher);
        assert!(rec.is_default);
        assert_relative_eq!(rec.first_inning_no_score_rate, StatRecord::DEFAULT_RATE);
    }

    #[test]
    fn test_nan_row_rejected() {
        let mut table = StatTable::new();
        let err = table.insert(raw("Broken", f64::NAN), EntityKind::Pitcher);
        assert!(matches!(err, Err(PipelineError::InvalidStat { .. })));
        assert_eq!(table.len(EntityKind::Pitcher), 0);
    }

    #[test]
    fn test_bad_modifiers_dropped() {
        let mut table = StatTable::new();
        let row = RawStat {
            name: "Rockies".into(),
            nrfi_rate: 0.45,
            first_inning_era: Some(f64::NAN),
            runs_per_game: Some(-1.0),
            park_factor: Some(1.3),
        };
        table.insert(row, EntityKind::Team).unwrap();
        let rec = table.lookup("Rockies", EntityKind::Team).unwrap();
        assert_eq!(rec.first_inning_era, None);
        assert_eq!(rec.runs_per_game, None);
        assert_eq!(rec.park_factor, Some(1.3));
    }

    #[test]
    fn test_pitcher_team_only_fields_ignored() {
        let mut table = StatTable::new();
        let row = RawStat {
            name: "Ace".into(),
            nrfi_rate: 0.7,
            first_inning_era: Some(2.1),
            runs_per_game: Some(3.0),
            park_factor: Some(0.9),
        };
        table.insert(row, EntityKind::Pitcher).unwrap();
        let rec = table.lookup("ace", EntityKind::Pitcher).unwrap();
        assert_eq!(rec.first_inning_era, Some(2.1));
        assert_eq!(rec.park_factor, None);
        assert_eq!(rec.runs_per_game, None);
    }
}
