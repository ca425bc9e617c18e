use super::store::{InteractionAggregate, ScoreStore};
use crate::error::Result;
use tracing::info;

/// Clips need this many views before their score is trusted.
pub const DEFAULT_MIN_VIEWS: i64 = 5;

const WATCH_WEIGHT: f64 = 0.35;
const LIKE_WEIGHT: f64 = 0.25;
const SAVE_WEIGHT: f64 = 0.20;
const COMPLETE_WEIGHT: f64 = 0.15;
const SKIP_WEIGHT: f64 = 0.30;
const DISLIKE_WEIGHT: f64 = 0.15;

/// Engagement score in [0, 1].
///
/// Rates are counts over views; the mean watch percentage defaults to 0.5
/// when no view carried one. `None` below `min_views`: the clip keeps its
/// current score.
pub fn compute_content_score(aggregate: &InteractionAggregate, min_views: i64) -> Option<f64> {
    if aggregate.views < min_views.max(1) {
        return None;
    }

    let views = aggregate.views as f64;
    let rate = |count: i64| count as f64 / views;

    let score = aggregate.avg_watch_percentage.unwrap_or(0.5) * WATCH_WEIGHT
        + rate(aggregate.likes) * LIKE_WEIGHT
        + rate(aggregate.saves) * SAVE_WEIGHT
        + rate(aggregate.completes) * COMPLETE_WEIGHT
        - rate(aggregate.skips) * SKIP_WEIGHT
        - rate(aggregate.dislikes) * DISLIKE_WEIGHT;

    Some(score.clamp(0.0, 1.0))
}

/// Rescore every ready clip with enough views. Returns the rows written.
pub async fn update_content_scores(store: &dyn ScoreStore, min_views: i64) -> Result<u64> {
    let aggregates = store.interaction_aggregates(min_views).await?;
    let scores: Vec<(String, f64)> = aggregates
        .iter()
        .filter_map(|a| compute_content_score(a, min_views).map(|s| (a.clip_id.clone(), s)))
        .collect();

    let written = store.write_content_scores(&scores).await?;
    info!(candidates = aggregates.len(), updated = written, "Updated content scores");
    Ok(written)
}
