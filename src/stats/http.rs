//! Remote stat provider with a time-boxed in-memory cache.
//!
//! The remote document is fetched once per TTL window and indexed into a
//! `StatTable`. Concurrent resolves share one fetch. A failed refresh keeps
//! serving the previous table if there is one; otherwise the failure is
//! remembered for `FAILURE_BACKOFF` so a run with dozens of lookups does not
//! hammer a dead upstream.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::provider::StatProvider;
use super::table::{RawStat, StatTable};
use crate::error::{PipelineError, PipelineResult};
use crate::http::{self, RetryPolicy};
use crate::models::{EntityKind, StatRecord};

const FAILURE_BACKOFF: Duration = Duration::from_secs(60);

/// Wire format of the remote stats document.
#[derive(Debug, Default, Deserialize)]
pub struct StatsDocument {
    #[serde(default)]
    pub teams: Vec<RawStat>,
    #[serde(default)]
    pub pitchers: Vec<RawStat>,
}

impl StatsDocument {
    pub fn into_table(self) -> StatTable {
        let mut table = StatTable::new();
        let rows = self
            .teams
            .into_iter()
            .map(|r| (r, EntityKind::Team))
            .chain(self.pitchers.into_iter().map(|r| (r, EntityKind::Pitcher)));
        for (raw, kind) in rows {
            if let Err(e) = table.insert(raw, kind) {
                warn!("Skipping remote {} row: {}", kind, e);
            }
        }
        table
    }
}

#[derive(Default)]
struct CacheState {
    table: Option<(StatTable, Instant)>,
    last_failure: Option<(Instant, String)>,
}

pub struct HttpStatProvider {
    http: Client,
    url: String,
    retry: RetryPolicy,
    ttl: Duration,
    cache: Mutex<CacheState>,
}

impl HttpStatProvider {
    pub fn new(url: &str, ttl: Duration, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        Ok(HttpStatProvider {
            http: http::build_client(timeout)?,
            url: url.to_string(),
            retry,
            ttl,
            cache: Mutex::new(CacheState::default()),
        })
    }

    async fn fetch_table(&self) -> PipelineResult<StatTable> {
        debug!("Fetching stats from {}", self.url);
        let raw = http::get_json(&self.http, &self.url, self.retry)
            .await
            .map_err(|e| PipelineError::StatsUnavailable(format!("{:#}", e)))?;
        let doc: StatsDocument = serde_json::from_value(raw).map_err(|e| {
            PipelineError::StatsUnavailable(format!("malformed stats document: {}", e))
        })?;
        let table = doc.into_table();
        info!(
            "Stats refreshed from {}: {} teams, {} pitchers",
            self.url,
            table.len(EntityKind::Team),
            table.len(EntityKind::Pitcher)
        );
        Ok(table)
    }
}

#[async_trait]
impl StatProvider for HttpStatProvider {
    fn name(&self) -> &str {
        &self.url
    }

    async fn resolve(&self, entity_id: &str, kind: EntityKind) -> PipelineResult<StatRecord> {
        let mut cache = self.cache.lock().await;

        let fresh = matches!(&cache.table, Some((_, at)) if at.elapsed() < self.ttl);
        if !fresh {
            let backing_off = matches!(
                &cache.last_failure,
                Some((at, _)) if at.elapsed() < FAILURE_BACKOFF
            );
            if !backing_off {
                match self.fetch_table().await {
                    Ok(table) => {
                        cache.table = Some((table, Instant::now()));
                        cache.last_failure = None;
                    }
                    Err(e) => {
                        warn!("{}", e);
                        cache.last_failure = Some((Instant::now(), e.to_string()));
                    }
                }
            }
        }

        match (&cache.table, &cache.last_failure) {
            (Some((table, _)), _) => Ok(table.resolve_or_default(entity_id, kind)),
            (None, Some((_, reason))) => Err(PipelineError::StatsUnavailable(reason.clone())),
            (None, None) => Err(PipelineError::StatsUnavailable("no stats loaded".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_document_into_table() {
        let doc: StatsDocument = serde_json::from_str(
            r#"{
                "teams": [
                    {"name": "Seattle Mariners", "nrfi_rate": 0.66, "park_factor": 0.92},
                    {"team": "Cincinnati Reds", "nrfi_rate": 52.5}
                ],
                "pitchers": [
                    {"pitcher": "Logan Gilbert", "nrfi_rate": 0.71, "era": 2.8}
                ]
            }"#,
        )
        .unwrap();
        let table = doc.into_table();
        let reds = table.lookup("Cincinnati Reds", EntityKind::Team).unwrap();
        assert_relative_eq!(reds.first_inning_no_score_rate, 0.525);
        let gilbert = table.lookup("logan gilbert", EntityKind::Pitcher).unwrap();
        assert_eq!(gilbert.first_inning_era, Some(2.8));
    }

    #[tokio::test]
    async fn test_unreachable_source_is_unavailable_and_backs_off() {
        let provider = HttpStatProvider::new(
            "http://127.0.0.1:1/stats.json",
            Duration::from_secs(3600),
            Duration::from_secs(2),
            RetryPolicy::none(),
        )
        .unwrap();

        let first = provider.resolve("Cubs", EntityKind::Team).await;
        assert!(matches!(first, Err(PipelineError::StatsUnavailable(_))));

        // Second call is answered from the negative cache without a fetch
        let started = Instant::now();
        let second = provider.resolve("Cubs", EntityKind::Team).await;
        assert!(matches!(second, Err(PipelineError::StatsUnavailable(_))));
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
