//! Snapshot refresh loops
//!
//! Each loop rebuilds its snapshot from scratch on a fixed interval and
//! swaps it in. A failed reload keeps whatever was published before.

use crate::config::RefreshConfig;
use crate::metrics;
use crate::services::ltr::LtrModel;
use crate::services::pipeline::FeedRanker;
use crate::services::snapshot::Snapshot;
use crate::services::topic_graph::{load_topic_graph, StemPolicy, TopicGraph, TopicStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

const TOPIC_GRAPH: &str = "topic_graph";
const LTR_MODEL: &str = "ltr_model";

/// Reload the topic graph once. Returns whether a new snapshot was published.
pub async fn refresh_topic_graph(
    store: &dyn TopicStore,
    policy: &dyn StemPolicy,
    snapshot: &Snapshot<TopicGraph>,
) -> bool {
    match load_topic_graph(store, policy).await {
        Ok(graph) => {
            snapshot.replace(graph).await;
            metrics::record_snapshot_refresh(TOPIC_GRAPH, "success");
            true
        }
        Err(e) => {
            warn!(error = %e, "Topic graph refresh failed, keeping previous snapshot");
            metrics::record_snapshot_refresh(TOPIC_GRAPH, "error");
            false
        }
    }
}

/// Reload the LTR model once. A missing file is the normal state before the
/// first training run and is only logged at info.
pub async fn refresh_ltr_model(path: &Path, snapshot: &Snapshot<LtrModel>) -> bool {
    if tokio::fs::metadata(path).await.is_err() {
        info!(path = %path.display(), "No LTR model file, keeping current model");
        metrics::record_snapshot_refresh(LTR_MODEL, "missing");
        return false;
    }

    match LtrModel::load_from_path(path).await {
        Ok(model) => {
            snapshot.replace(model).await;
            metrics::record_snapshot_refresh(LTR_MODEL, "success");
            true
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "LTR model refresh failed, keeping previous model");
            metrics::record_snapshot_refresh(LTR_MODEL, "error");
            false
        }
    }
}

/// First tick fires immediately, so the snapshot is populated at startup.
pub fn spawn_topic_graph_refresh(
    store: Arc<dyn TopicStore>,
    policy: Arc<dyn StemPolicy>,
    snapshot: Snapshot<TopicGraph>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            refresh_topic_graph(store.as_ref(), policy.as_ref(), &snapshot).await;
        }
    })
}

pub fn spawn_ltr_model_refresh(
    path: PathBuf,
    snapshot: Snapshot<LtrModel>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            refresh_ltr_model(&path, &snapshot).await;
        }
    })
}

/// Handles of the two refresh loops behind a [`FeedRanker`].
pub struct RefreshHandles {
    pub topic_graph: JoinHandle<()>,
    pub ltr_model: JoinHandle<()>,
}

impl RefreshHandles {
    pub fn abort(&self) {
        self.topic_graph.abort();
        self.ltr_model.abort();
    }
}

/// Keep a ranker's snapshots current for the lifetime of the host that
/// serves feeds from it.
pub fn spawn_snapshot_refresh(
    ranker: &FeedRanker,
    store: Arc<dyn TopicStore>,
    policy: Arc<dyn StemPolicy>,
    config: &RefreshConfig,
) -> RefreshHandles {
    RefreshHandles {
        topic_graph: spawn_topic_graph_refresh(
            store,
            policy,
            ranker.topic_graph().clone(),
            Duration::from_secs(config.topic_graph_interval_secs),
        ),
        ltr_model: spawn_ltr_model_refresh(
            PathBuf::from(&config.ltr_model_path),
            ranker.ltr_model().clone(),
            Duration::from_secs(config.ltr_model_interval_secs),
        ),
    }
}
