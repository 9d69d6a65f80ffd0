use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::eastern;
use super::provider::ScheduleProvider;
use crate::error::{PipelineError, PipelineResult};
use crate::http::{self, RetryPolicy};
use crate::models::{GameRecord, PitcherSlot};

pub const DEFAULT_SCOREBOARD_URL: &str =
    "https://site.api.espn.com/apis/site/v2/sports/baseball/mlb/scoreboard";

/// Schedule provider backed by ESPN's public MLB scoreboard.
pub struct EspnScoreboard {
    http: Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl EspnScoreboard {
    pub fn new(base_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid scoreboard URL: {}", base_url))?;
        Ok(EspnScoreboard {
            http: http::build_client(timeout)?,
            base_url,
            retry,
        })
    }

    fn url_for(&self, date: NaiveDate) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("dates", &date.format("%Y%m%d").to_string());
        url
    }

    pub async fn fetch_date(&self, date: NaiveDate) -> PipelineResult<Vec<GameRecord>> {
        let url = self.url_for(date);
        debug!("Fetching schedule for {} from {}", date, url);

        let raw = http::get_json(&self.http, url.as_str(), self.retry)
            .await
            .map_err(|e| PipelineError::ScheduleUnavailable(format!("{:#}", e)))?;

        let games = parse_scoreboard(&raw)?;
        info!("Schedule for {}: {} game(s)", date, games.len());
        Ok(games)
    }
}

#[async_trait]
impl ScheduleProvider for EspnScoreboard {
    fn name(&self) -> &str {
        "ESPN"
    }

    async fn fetch_today(&self) -> PipelineResult<Vec<GameRecord>> {
        self.fetch_date(eastern::today(Utc::now())).await
    }
}

/// Parse a scoreboard document. A missing `events` array is a malformed
/// response; an empty one is a day without games.
pub fn parse_scoreboard(raw: &serde_json::Value) -> PipelineResult<Vec<GameRecord>> {
    let events = raw["events"].as_array().ok_or_else(|| {
        PipelineError::ScheduleUnavailable("scoreboard response has no events array".into())
    })?;

    let games = events
        .iter()
        .filter_map(|ev| match parse_event(ev) {
            Ok(game) => Some(game),
            Err(e) => {
                warn!(
                    "Skipping scoreboard event {}: {}",
                    ev["id"].as_str().unwrap_or("?"),
                    e
                );
                None
            }
        })
        .collect();

    Ok(games)
}

fn parse_event(ev: &serde_json::Value) -> PipelineResult<GameRecord> {
    let invalid = |msg: &str| PipelineError::InvalidGame(msg.to_string());

    let event_id = ev["id"].as_str().unwrap_or_default().to_string();
    let start_time = ev["date"]
        .as_str()
        .and_then(parse_event_time)
        .ok_or_else(|| invalid("missing or malformed date"))?;

    let competitors = ev["competitions"][0]["competitors"]
        .as_array()
        .ok_or_else(|| invalid("no competitors"))?;

    let side = |flag: &str| {
        competitors
            .iter()
            .find(|c| c["homeAway"].as_str() == Some(flag))
    };
    let home = side("home").ok_or_else(|| invalid("no home competitor"))?;
    let away = side("away").ok_or_else(|| invalid("no away competitor"))?;

    let team_name = |c: &serde_json::Value| {
        c["team"]["displayName"]
            .as_str()
            .or_else(|| c["team"]["name"].as_str())
            .map(str::to_string)
    };
    let home_team = team_name(home).ok_or_else(|| invalid("home team has no name"))?;
    let away_team = team_name(away).ok_or_else(|| invalid("away team has no name"))?;

    GameRecord::new(
        event_id,
        start_time,
        away_team,
        home_team,
        probable_pitcher(away),
        probable_pitcher(home),
    )
}

/// ESPN lists probables as an array; prefer the starting-pitcher entry.
fn probable_pitcher(competitor: &serde_json::Value) -> PitcherSlot {
    let Some(probables) = competitor["probables"].as_array() else {
        return PitcherSlot::Unknown;
    };
    let entry = probables
        .iter()
        .find(|p| p["name"].as_str() == Some("probableStartingPitcher"))
        .or_else(|| probables.first());

    PitcherSlot::from_name(entry.and_then(|p| {
        p["athlete"]["displayName"]
            .as_str()
            .or_else(|| p["athlete"]["fullName"].as_str())
    }))
}

/// ESPN timestamps usually omit seconds ("2024-07-04T23:05Z").
fn parse_event_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%MZ")
                .ok()
                .map(|dt| dt.and_utc())
        })
}
