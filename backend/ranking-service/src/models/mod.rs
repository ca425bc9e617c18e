use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One candidate clip as handed over by the candidate fetch.
///
/// Carries only inputs. Scores computed during a ranking pass are kept in
/// side tables keyed by position and never written back here, so the list
/// returned to the caller has exactly the fields it was given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipCandidate {
    pub id: String,
    pub content_score: f64,
    /// Topic names as denormalized on the clip row
    #[serde(default)]
    pub topics: Vec<String>,
    /// Topic ids from the clip/topic join table
    #[serde(default)]
    pub topic_ids: Vec<String>,
    pub channel: Option<String>,
    pub platform: Option<String>,
    pub source_id: Option<String>,
    #[serde(default)]
    pub age_hours: f64,
    #[serde(default)]
    pub duration_seconds: f64,
    #[serde(default)]
    pub transcript_length: f64,
    #[serde(default)]
    pub file_size_bytes: f64,
    /// Decoded text embedding, absent when the clip has not been embedded
    #[serde(default, skip_serializing)]
    pub embedding: Option<Vec<f32>>,
    /// Interactions recorded in the trending window
    #[serde(default)]
    pub recent_interactions: f64,
}

/// Per-user algorithm tuning preferences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedPrefs {
    /// 0 = no diversity reranking, 1 = maximum diversity
    pub diversity_mix: f64,
    pub trending_boost: bool,
    /// 0 = old content ok, 1 = strongly prefer fresh
    pub freshness_bias: f64,
}

impl Default for FeedPrefs {
    fn default() -> Self {
        Self {
            diversity_mix: 0.5,
            trending_boost: true,
            freshness_bias: 0.5,
        }
    }
}

/// Viewer-level statistics used as LTR features.
#[derive(Debug, Clone, PartialEq)]
pub struct LtrUserStats {
    pub total_views: f64,
    pub avg_watch_percentage: f64,
    pub like_rate: f64,
    pub save_rate: f64,
    pub hours_since_last_session: f64,
    /// source_id → accumulated channel affinity
    pub channel_affinity: HashMap<String, f64>,
    /// Topic ids with a stored affinity row
    pub topic_affinities: HashSet<String>,
}

impl Default for LtrUserStats {
    fn default() -> Self {
        Self {
            total_views: 0.0,
            avg_watch_percentage: 0.0,
            like_rate: 0.0,
            save_rate: 0.0,
            hours_since_last_session: 24.0 * 7.0,
            channel_affinity: HashMap::new(),
            topic_affinities: HashSet::new(),
        }
    }
}

/// Everything one ranking pass needs besides the shared snapshots.
#[derive(Debug, Clone, Default)]
pub struct RankingRequest {
    pub user_id: Option<String>,
    pub candidates: Vec<ClipCandidate>,
    /// Explicit name-keyed preference sliders
    pub topic_weights: HashMap<String, f64>,
    /// Stored topic_id → weight rows for the user
    pub stored_affinities: HashMap<String, f64>,
    pub user_embedding: Option<Vec<f32>>,
    pub user_stats: LtrUserStats,
    pub prefs: FeedPrefs,
    /// Maximum clips returned; 0 keeps the whole list
    pub limit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_deserializes_with_missing_optionals() {
        let clip: ClipCandidate =
            serde_json::from_str(r#"{"id":"c1","content_score":0.7,"channel":null,"platform":"youtube","source_id":null}"#)
                .unwrap();
        assert_eq!(clip.id, "c1");
        assert!(clip.topics.is_empty());
        assert!(clip.embedding.is_none());
        assert_eq!(clip.platform.as_deref(), Some("youtube"));
    }
}
