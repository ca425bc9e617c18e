use anyhow::Context;
use clipfeed_ranking::jobs::{PgScoreStore, ScoreJobConfig, ScoreUpdaterJob};
use clipfeed_ranking::Config;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load config")?;

    // Initialize tracing
    let json = config.service.log_format.eq_ignore_ascii_case("json");
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer()))
        .init();

    info!(service = %config.service.service_name, "Starting ranking core");

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    // The binary only runs the score updater. Hosts that serve feeds build a
    // FeedRanker and keep it current with jobs::spawn_snapshot_refresh.
    let job_config = ScoreJobConfig::from_env().context("Failed to load score job config")?;
    let job = ScoreUpdaterJob::new(job_config, Arc::new(PgScoreStore::new(pool.clone())));

    tokio::select! {
        stats = job.run() => {
            info!(failed_steps = stats.failed_steps(), "Score updater finished");
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        }
    }

    pool.close().await;
    info!("Ranking core stopped");
    Ok(())
}
