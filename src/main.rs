use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

mod config;
mod dashboard;
mod db;
mod error;
mod http;
mod models;
mod output;
mod predict;
mod schedule;
mod stats;

use config::{Config, StatsSource};
use dashboard::AppState;
use db::Database;
use output::{publish_all, CsvSink, ResultSink};
use predict::{PredictionPipeline, ScoringEngine};
use schedule::{EspnScoreboard, ScheduleProvider};
use stats::{FileStatProvider, HttpStatProvider, StatProvider};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let schedule: Arc<dyn ScheduleProvider> = Arc::new(EspnScoreboard::new(
        &config.schedule_url,
        config.http_timeout(),
        config.retry_policy(),
    )?);

    let stats: Arc<dyn StatProvider> = match config.stats_source {
        StatsSource::File => Arc::new(FileStatProvider::open(
            &config.team_stats_path,
            &config.pitcher_stats_path,
        )),
        StatsSource::Http => {
            let url = config.stats_url.as_deref().unwrap_or_default();
            Arc::new(HttpStatProvider::new(
                url,
                Duration::from_secs(config.stats_cache_ttl_secs),
                config.http_timeout(),
                config.retry_policy(),
            )?)
        }
    };

    let engine = ScoringEngine::new(config.scoring_weights(), config.threshold);
    info!(
        "Scoring with threshold {:.2}, weights {:?}",
        engine.threshold(),
        engine.weights()
    );
    let pipeline = PredictionPipeline::new(schedule, stats, engine, config.lookup_timeout());

    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    let sinks: Vec<Arc<dyn ResultSink>> = vec![
        Arc::new(CsvSink::new(&config.output_csv, config.include_undetermined)),
        Arc::new(db.clone()),
    ];

    if config.once {
        let table = pipeline.run().await;
        publish_all(&sinks, &table);
        info!("{}", table.message());
        return Ok(());
    }

    // Service mode: periodic pipeline runs + prediction API
    let app = dashboard::router(AppState { db });
    let addr: SocketAddr = config.dashboard_addr.parse()?;
    info!("Prediction API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let refresh = Duration::from_secs(config.refresh_interval_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(refresh);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let table = pipeline.run().await;
            if !table.is_available() {
                error!("{}", table.message());
            }
            publish_all(&sinks, &table);
        }
    });

    axum::serve(listener, app).await?;

    Ok(())
}
