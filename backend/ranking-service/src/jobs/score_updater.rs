// ============================================
// Score Updater Job
// ============================================
//
// Periodic batch job keeping ranking inputs fresh:
// 1. Content scores from aggregated interactions
// 2. Co-occurrence topic edges
// 3. User profile embeddings
//
// Each step fails on its own; the next step still runs.

use super::co_occurrence::{self, generate_co_occurrence_edges};
use super::content_score::{self, update_content_scores};
use super::store::ScoreStore;
use super::user_embedding::update_user_embeddings;
use crate::config::parse_var;
use crate::error::Result;
use crate::metrics;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info};

/// Score updater configuration
#[derive(Debug, Clone)]
pub struct ScoreJobConfig {
    pub interval_secs: u64,
    pub min_views: i64,
    pub co_occurrence_min_clips: i64,
    /// Exit after one pass instead of looping
    pub run_once: bool,
}

impl Default for ScoreJobConfig {
    fn default() -> Self {
        Self {
            interval_secs: 900,
            min_views: content_score::DEFAULT_MIN_VIEWS,
            co_occurrence_min_clips: co_occurrence::DEFAULT_MIN_CLIPS,
            run_once: false,
        }
    }
}

impl ScoreJobConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            interval_secs: parse_var("SCORE_UPDATE_INTERVAL", defaults.interval_secs)?,
            min_views: parse_var("SCORE_MIN_VIEWS", defaults.min_views)?,
            co_occurrence_min_clips: parse_var(
                "CO_OCCURRENCE_MIN_CLIPS",
                defaults.co_occurrence_min_clips,
            )?,
            run_once: parse_var("SCORE_RUN_ONCE", defaults.run_once)?,
        })
    }
}

/// Outcome of one pass. A `None` count means the step failed.
#[derive(Debug, Clone, Default)]
pub struct ScoreJobStats {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub clips_scored: Option<u64>,
    pub edge_pairs: Option<usize>,
    pub user_embeddings: Option<usize>,
    pub total_duration_ms: u64,
}

impl ScoreJobStats {
    pub fn failed_steps(&self) -> usize {
        [
            self.clips_scored.is_none(),
            self.edge_pairs.is_none(),
            self.user_embeddings.is_none(),
        ]
        .iter()
        .filter(|failed| **failed)
        .count()
    }
}

pub struct ScoreUpdaterJob {
    config: ScoreJobConfig,
    store: Arc<dyn ScoreStore>,
}

impl ScoreUpdaterJob {
    pub fn new(config: ScoreJobConfig, store: Arc<dyn ScoreStore>) -> Self {
        Self { config, store }
    }

    /// Run passes until `run_once` says stop.
    pub async fn run(&self) -> ScoreJobStats {
        info!(interval_secs = self.config.interval_secs, "Score updater started");
        loop {
            let stats = self.run_single_pass().await;

            info!(
                clips_scored = ?stats.clips_scored,
                edge_pairs = ?stats.edge_pairs,
                user_embeddings = ?stats.user_embeddings,
                failed_steps = stats.failed_steps(),
                duration_ms = stats.total_duration_ms,
                "Score updater pass completed"
            );

            if self.config.run_once {
                return stats;
            }
            sleep(Duration::from_secs(self.config.interval_secs)).await;
        }
    }

    pub async fn run_single_pass(&self) -> ScoreJobStats {
        let start_time = Instant::now();
        let mut stats = ScoreJobStats {
            started_at: Some(Utc::now()),
            ..Default::default()
        };
        let store = self.store.as_ref();

        stats.clips_scored = run_step(
            "content_scores",
            update_content_scores(store, self.config.min_views),
        )
        .await;
        stats.edge_pairs = run_step(
            "co_occurrence_edges",
            generate_co_occurrence_edges(store, self.config.co_occurrence_min_clips),
        )
        .await;
        stats.user_embeddings = run_step("user_embeddings", update_user_embeddings(store)).await;

        stats.completed_at = Some(Utc::now());
        stats.total_duration_ms = start_time.elapsed().as_millis() as u64;
        stats
    }
}

async fn run_step<T, F>(step: &str, fut: F) -> Option<T>
where
    F: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let outcome = fut.await;
    metrics::record_job_duration(step, started.elapsed());

    match outcome {
        Ok(value) => {
            metrics::record_job_run(step, "success");
            Some(value)
        }
        Err(e) => {
            metrics::record_job_run(step, "error");
            error!(step, error = %e, "Score updater step failed");
            None
        }
    }
}
