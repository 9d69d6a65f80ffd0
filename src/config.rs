use clap::{Parser, ValueEnum};
use std::time::Duration;

use crate::http::RetryPolicy;
use crate::predict::ScoringWeights;
use crate::schedule::espn::DEFAULT_SCOREBOARD_URL;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatsSource {
    /// Local CSV reference tables
    File,
    /// Remote JSON stats document
    Http,
}

/// Daily NRFI/YRFI prediction table for MLB games
#[derive(Parser, Debug, Clone)]
#[command(name = "nrfi-predictor", version, about)]
pub struct Config {
    /// Run the pipeline once, write the outputs and exit
    #[arg(long, env = "RUN_ONCE", default_value = "false")]
    pub once: bool,

    /// Seconds between pipeline runs in service mode
    #[arg(long, env = "REFRESH_INTERVAL_SECS", default_value = "14400")]
    pub refresh_interval_secs: u64,

    /// Prediction API listen address (service mode)
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
    pub dashboard_addr: String,

    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "nrfi.db")]
    pub database_path: String,

    /// CSV output path
    #[arg(long, env = "OUTPUT_CSV", default_value = "nrfi_model.csv")]
    pub output_csv: String,

    /// Include games with unannounced starters (TBD) in the CSV output
    #[arg(long, env = "INCLUDE_UNDETERMINED", default_value = "false")]
    pub include_undetermined: bool,

    /// Scoreboard URL for today's schedule
    #[arg(long, env = "SCHEDULE_URL", default_value = DEFAULT_SCOREBOARD_URL)]
    pub schedule_url: String,

    /// Where team and pitcher stats come from
    #[arg(long, env = "STATS_SOURCE", value_enum, default_value = "file")]
    pub stats_source: StatsSource,

    /// Team stats CSV (file source)
    #[arg(long, env = "TEAM_STATS_PATH", default_value = "data/team_stats.csv")]
    pub team_stats_path: String,

    /// Pitcher stats CSV (file source)
    #[arg(long, env = "PITCHER_STATS_PATH", default_value = "data/pitcher_stats.csv")]
    pub pitcher_stats_path: String,

    /// Remote stats document URL (http source)
    #[arg(long, env = "STATS_URL")]
    pub stats_url: Option<String>,

    /// How long a fetched stats document stays fresh
    #[arg(long, env = "STATS_CACHE_TTL_SECS", default_value = "3600")]
    pub stats_cache_ttl_secs: u64,

    /// Per-request timeout for upstream fetches
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "10")]
    pub http_timeout_secs: u64,

    /// Retries after a failed upstream fetch
    #[arg(long, env = "HTTP_RETRIES", default_value = "2")]
    pub http_retries: u32,

    /// Composite score at or above which NRFI is predicted
    #[arg(long, env = "NRFI_THRESHOLD", default_value = "0.60")]
    pub threshold: f64,

    /// Weight of the team no-score rate component
    #[arg(long, env = "WEIGHT_TEAM", default_value = "0.40")]
    pub weight_team: f64,

    /// Weight of the pitcher no-score rate component
    #[arg(long, env = "WEIGHT_PITCHER", default_value = "0.40")]
    pub weight_pitcher: f64,

    /// Weight of the ERA / runs-allowed modifier
    #[arg(long, env = "WEIGHT_ERA", default_value = "0.15")]
    pub weight_era: f64,

    /// Weight of the park factor modifier
    #[arg(long, env = "WEIGHT_PARK", default_value = "0.05")]
    pub weight_park: f64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            anyhow::bail!("threshold must be between 0.0 and 1.0 (exclusive)");
        }
        if self.raw_weights().normalized().is_none() {
            anyhow::bail!("weights must be finite, non-negative and not all zero");
        }
        if self.stats_source == StatsSource::Http && self.stats_url.is_none() {
            anyhow::bail!("STATS_URL is required when --stats-source http is used");
        }
        if self.http_timeout_secs == 0 {
            anyhow::bail!("http_timeout_secs must be positive");
        }
        if !self.once && self.refresh_interval_secs < 60 {
            anyhow::bail!("refresh_interval_secs must be at least 60");
        }
        Ok(())
    }

    fn raw_weights(&self) -> ScoringWeights {
        ScoringWeights {
            team: self.weight_team,
            pitcher: self.weight_pitcher,
            era: self.weight_era,
            park: self.weight_park,
        }
    }

    /// Weights scaled to sum to 1
    pub fn scoring_weights(&self) -> ScoringWeights {
        self.raw_weights().normalized().unwrap_or_default()
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.http_retries,
            ..RetryPolicy::default()
        }
    }

    /// Upper bound on a single stat lookup: a full fetch with every retry.
    pub fn lookup_timeout(&self) -> Duration {
        self.http_timeout() * (self.http_retries + 1) + Duration::from_secs(5)
    }
}
