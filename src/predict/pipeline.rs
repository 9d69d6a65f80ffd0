use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::scoring::ScoringEngine;
use crate::error::PipelineError;
use crate::models::{
    EntityKind, GameRecord, PitcherSlot, Prediction, PredictionTable, StatRecord, TableStatus,
};
use crate::schedule::ScheduleProvider;
use crate::stats::StatProvider;

/// Orchestrates schedule → stats → scoring → ranking.
///
/// `run` never fails: whole-source failures come back as a `TableStatus` on
/// the returned table so the caller can render them.
pub struct PredictionPipeline {
    schedule: Arc<dyn ScheduleProvider>,
    stats: Arc<dyn StatProvider>,
    engine: ScoringEngine,
    lookup_timeout: Duration,
}

/// Outcome of one stat lookup: the record to score with, plus the failure if
/// the record is a fallback for an unavailable source.
struct Resolution {
    record: StatRecord,
    failure: Option<PipelineError>,
}

impl PredictionPipeline {
    pub fn new(
        schedule: Arc<dyn ScheduleProvider>,
        stats: Arc<dyn StatProvider>,
        engine: ScoringEngine,
        lookup_timeout: Duration,
    ) -> Self {
        PredictionPipeline {
            schedule,
            stats,
            engine,
            lookup_timeout,
        }
    }

    pub async fn run(&self) -> PredictionTable {
        info!(
            "Pipeline run started (schedule={}, stats={})",
            self.schedule.name(),
            self.stats.name()
        );

        let games = match self.schedule.fetch_today().await {
            Ok(games) => games,
            Err(e) => {
                error!("{}", e);
                return PredictionTable::schedule_unavailable(e.to_string());
            }
        };

        if games.is_empty() {
            info!("No games scheduled today");
            return PredictionTable::new(TableStatus::Complete, Vec::new());
        }

        // Games are scored concurrently; join_all keeps schedule order, which
        // the stable sort in `rank` relies on for ties.
        let scored = join_all(games.into_iter().map(|g| self.score_game(g))).await;

        let mut failures: Vec<PipelineError> = Vec::new();
        let mut predictions = Vec::with_capacity(scored.len());
        for (prediction, errs) in scored {
            predictions.push(prediction);
            failures.extend(errs);
        }

        let status = if failures.is_empty() {
            TableStatus::Complete
        } else {
            warn!(
                "{} stat lookup(s) fell back to defaults: {}",
                failures.len(),
                failures[0]
            );
            TableStatus::StatsDegraded {
                reason: format!("{} lookup(s) failed: {}", failures.len(), failures[0]),
            }
        };

        let table = PredictionTable::new(status, rank(predictions));
        info!(
            "Pipeline run finished: {} game(s), {} determined, status={}",
            table.predictions.len(),
            table.predictions.iter().filter(|p| p.is_determined()).count(),
            table.status.kind()
        );
        table
    }

    async fn score_game(&self, game: GameRecord) -> (Prediction, Vec<PipelineError>) {
        // Nothing to look up: the engine marks the game undetermined anyway
        if game.home_pitcher.is_unknown() || game.away_pitcher.is_unknown() {
            debug!("Skipping stat lookups for {}: starter TBD", game.matchup());
            return (Prediction::undetermined(game), Vec::new());
        }

        let (home_team, away_team, home_pitcher, away_pitcher) = tokio::join!(
            self.resolve(&game.home_team, EntityKind::Team),
            self.resolve(&game.away_team, EntityKind::Team),
            self.resolve_pitcher(&game.home_pitcher),
            self.resolve_pitcher(&game.away_pitcher),
        );

        let prediction = self.engine.score(
            game,
            &home_team.record,
            &away_team.record,
            &home_pitcher.record,
            &away_pitcher.record,
        );

        let failures = [home_team, away_team, home_pitcher, away_pitcher]
            .into_iter()
            .filter_map(|r| r.failure)
            .collect();
        (prediction, failures)
    }

    async fn resolve_pitcher(&self, slot: &PitcherSlot) -> Resolution {
        match slot {
            PitcherSlot::Known(name) => self.resolve(name, EntityKind::Pitcher).await,
            PitcherSlot::Unknown => Resolution {
                record: StatRecord::default_for("UNKNOWN", EntityKind::Pitcher),
                failure: None,
            },
        }
    }

    async fn resolve(&self, name: &str, kind: EntityKind) -> Resolution {
        let lookup = tokio::time::timeout(self.lookup_timeout, self.stats.resolve(name, kind));
        let failure = match lookup.await {
            Ok(Ok(record)) => {
                return Resolution {
                    record,
                    failure: None,
                }
            }
            Ok(Err(e)) => e,
            Err(_) => PipelineError::StatsUnavailable(format!(
                "{} lookup for '{}' timed out after {:?}",
                kind, name, self.lookup_timeout
            )),
        };
        debug!("Using default stats for {} '{}': {}", kind, name, failure);
        Resolution {
            record: StatRecord::default_for(name, kind),
            failure: Some(failure),
        }
    }
}

/// Sort by confidence descending; undetermined games last. Stable, so ties
/// keep schedule order.
pub fn rank(mut predictions: Vec<Prediction>) -> Vec<Prediction> {
    // Option<u8> orders None below Some(_), so descending puts TBD last
    predictions.sort_by(|a, b| b.confidence_percent.cmp(&a.confidence_percent));
    predictions
}
