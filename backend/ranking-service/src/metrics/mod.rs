//! Ranking Metrics
//!
//! Prometheus metrics for model evaluation, snapshot refresh and the score
//! updater job

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};
use std::time::Duration;

static LTR_MALFORMED_TREES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "ranking_ltr_malformed_trees_total",
        "Tree evaluations abandoned because the tree data was malformed",
        &["reason"]
    )
    .expect("Failed to register malformed tree metric")
});

static SNAPSHOT_REFRESH_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "ranking_snapshot_refresh_total",
        "Snapshot reload attempts (success/error)",
        &["kind", "status"]
    )
    .expect("Failed to register snapshot refresh metric")
});

static JOB_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "ranking_score_job_runs_total",
        "Score updater steps run (success/error)",
        &["step", "status"]
    )
    .expect("Failed to register score job runs metric")
});

static JOB_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "ranking_score_job_duration_seconds",
        "Duration of score updater steps",
        &["step"],
        vec![0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0]
    )
    .expect("Failed to register score job duration metric")
});

/// Record a tree abandoned mid-walk (feature_out_of_range/child_out_of_range/step_budget)
pub fn record_malformed_tree(reason: &str) {
    LTR_MALFORMED_TREES_TOTAL.with_label_values(&[reason]).inc();
}

/// Record a snapshot reload result for the topic graph or the LTR model
pub fn record_snapshot_refresh(kind: &str, status: &str) {
    SNAPSHOT_REFRESH_TOTAL.with_label_values(&[kind, status]).inc();
}

pub fn record_job_run(step: &str, status: &str) {
    JOB_RUNS_TOTAL.with_label_values(&[step, status]).inc();
}

pub fn record_job_duration(step: &str, duration: Duration) {
    JOB_DURATION_SECONDS
        .with_label_values(&[step])
        .observe(duration.as_secs_f64());
}
