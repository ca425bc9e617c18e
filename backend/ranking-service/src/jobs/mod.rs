// ============================================
// Background Jobs Module
// ============================================
//
// - Score updater: content scores, co-occurrence edges, user embeddings
// - Snapshot refresh loops for the topic graph and the LTR model

pub mod co_occurrence;
pub mod content_score;
pub mod refresh;
pub mod score_updater;
pub mod store;
pub mod user_embedding;

pub use content_score::compute_content_score;
pub use refresh::{
    spawn_ltr_model_refresh, spawn_snapshot_refresh, spawn_topic_graph_refresh, RefreshHandles,
};
pub use score_updater::{ScoreJobConfig, ScoreJobStats, ScoreUpdaterJob};
pub use store::{InteractionAggregate, MemoryScoreStore, PgScoreStore, ScoreStore};
