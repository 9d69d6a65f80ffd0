//! First-inning scoring heuristic.
//!
//! The composite score S is a weighted mean of components that are each
//! already in [0, 1], where higher always means "more likely scoreless":
//!
//! - **team**: mean of both teams' first-inning no-score rates
//! - **pitcher**: mean of both starters' first-inning no-score rates
//! - **era** (optional): run prevention from first-inning ERA (pitchers) and
//!   runs allowed per game (teams), each mapped as `1 - runs / 9`
//! - **park** (optional): home park factor, `1.5 - factor` (1.0 → 0.5)
//!
//! Optional components that have no data drop out and the remaining weights
//! are renormalised, so the weights in play always sum to 1.
//!
//! S is thresholded into NRFI/YRFI and the confidence is S (NRFI) or 1 − S
//! (YRFI), rounded half-up to a whole percent.

use crate::models::{GameRecord, Label, Prediction, StatRecord};

/// Runs per nine innings at which the run-prevention component reaches 0.
const RUNS_CEILING: f64 = 9.0;
/// Float slack for the rounding and threshold comparisons, so a composite that
/// lands a hair under its exact value after weighted-mean math is not pushed
/// across a boundary.
const ROUND_EPS: f64 = 1e-9;

pub const DEFAULT_THRESHOLD: f64 = 0.60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub team: f64,
    pub pitcher: f64,
    pub era: f64,
    pub park: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        ScoringWeights {
            team: 0.40,
            pitcher: 0.40,
            era: 0.15,
            park: 0.05,
        }
    }
}

impl ScoringWeights {
    /// Scale so the weights sum to 1. `None` if any weight is negative or
    /// non-finite, or if they sum to zero.
    pub fn normalized(self) -> Option<Self> {
        let all = [self.team, self.pitcher, self.era, self.park];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return None;
        }
        let sum: f64 = all.iter().sum();
        if sum <= 0.0 {
            return None;
        }
        Some(ScoringWeights {
            team: self.team / sum,
            pitcher: self.pitcher / sum,
            era: self.era / sum,
            park: self.park / sum,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ScoringEngine {
    weights: ScoringWeights,
    threshold: f64,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        ScoringEngine::new(ScoringWeights::default(), DEFAULT_THRESHOLD)
    }
}

impl ScoringEngine {
    pub fn new(weights: ScoringWeights, threshold: f64) -> Self {
        ScoringEngine {
            weights: weights.normalized().unwrap_or_default(),
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    /// Score one game. Games with an unannounced starter are never scored.
    pub fn score(
        &self,
        game: GameRecord,
        home_team: &StatRecord,
        away_team: &StatRecord,
        home_pitcher: &StatRecord,
        away_pitcher: &StatRecord,
    ) -> Prediction {
        if game.home_pitcher.is_unknown() || game.away_pitcher.is_unknown() {
            return Prediction::undetermined(game);
        }

        let s = self.composite(home_team, away_team, home_pitcher, away_pitcher);
        let (label, confidence) = classify(s, self.threshold);

        Prediction {
            game,
            label,
            confidence_percent: Some(confidence),
            composite_score: Some(s),
        }
    }

    /// The composite no-score estimate S, clamped to [0, 1].
    pub fn composite(
        &self,
        home_team: &StatRecord,
        away_team: &StatRecord,
        home_pitcher: &StatRecord,
        away_pitcher: &StatRecord,
    ) -> f64 {
        let all = [home_team, away_team, home_pitcher, away_pitcher];
        debug_assert!(
            all.iter().all(|r| r.first_inning_no_score_rate.is_finite()),
            "non-finite rate reached the scoring engine"
        );

        let mut components = vec![
            (
                self.weights.team,
                mean(&[
                    home_team.first_inning_no_score_rate,
                    away_team.first_inning_no_score_rate,
                ]),
            ),
            (
                self.weights.pitcher,
                mean(&[
                    home_pitcher.first_inning_no_score_rate,
                    away_pitcher.first_inning_no_score_rate,
                ]),
            ),
        ];

        let run_prevention: Vec<f64> = [
            home_pitcher.first_inning_era,
            away_pitcher.first_inning_era,
            home_team.runs_per_game,
            away_team.runs_per_game,
        ]
        .into_iter()
        .flatten()
        .map(runs_to_unit)
        .collect();
        if !run_prevention.is_empty() {
            components.push((self.weights.era, mean(&run_prevention)));
        }

        if let Some(pf) = home_team.park_factor {
            components.push((self.weights.park, (1.5 - pf).clamp(0.0, 1.0)));
        }

        weighted_mean(&components).clamp(0.0, 1.0)
    }
}

/// Threshold S into a label and the confidence in that label.
pub fn classify(s: f64, threshold: f64) -> (Label, u8) {
    let s = s.clamp(0.0, 1.0);
    if s + ROUND_EPS >= threshold {
        (Label::NoScorePredicted, round_percent(s))
    } else {
        (Label::ScorePredicted, round_percent(1.0 - s))
    }
}

/// Fraction → whole percent, rounding half up.
pub fn round_percent(fraction: f64) -> u8 {
    let pct = (fraction.clamp(0.0, 1.0) * 100.0 + 0.5 + ROUND_EPS).floor();
    pct.min(100.0) as u8
}

fn runs_to_unit(runs: f64) -> f64 {
    (1.0 - runs / RUNS_CEILING).clamp(0.0, 1.0)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return StatRecord::DEFAULT_RATE;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn weighted_mean(components: &[(f64, f64)]) -> f64 {
    let total: f64 = components.iter().map(|(w, _)| w).sum();
    if total <= 0.0 {
        return StatRecord::DEFAULT_RATE;
    }
    components.iter().map(|(w, v)| w * v).sum::<f64>() / total
}
