use super::store::{CoOccurrenceStats, ScoreStore};
use crate::error::Result;
use crate::services::topic_graph::TopicEdge;
use tracing::info;

pub const CO_OCCURS_RELATION: &str = "co_occurs";
pub const DEFAULT_MIN_CLIPS: i64 = 3;

/// PMI-scaled edge weight, `clamp((pmi + 2) / 4, 0.1, 1.0)`.
///
/// Topics missing from the per-topic counts are treated as tagged once.
/// Any zero probability gives the neutral 0.5.
pub fn edge_weight(co_count: i64, first_count: i64, second_count: i64, ready_clips: i64) -> f64 {
    if ready_clips <= 0 {
        return 0.5;
    }
    let total = ready_clips as f64;
    let p_first = first_count as f64 / total;
    let p_second = second_count as f64 / total;
    let p_joint = co_count as f64 / total;

    if p_first > 0.0 && p_second > 0.0 && p_joint > 0.0 {
        let pmi = (p_joint / (p_first * p_second)).ln();
        ((pmi + 2.0) / 4.0).clamp(0.1, 1.0)
    } else {
        0.5
    }
}

/// Symmetric `co_occurs` edges for every pair in `stats`.
pub fn build_co_occurrence_edges(stats: &CoOccurrenceStats) -> Vec<TopicEdge> {
    if stats.ready_clips <= 0 {
        return Vec::new();
    }

    let count_of = |topic: &str| stats.topic_clip_counts.get(topic).copied().unwrap_or(1);
    let mut edges = Vec::with_capacity(stats.pairs.len() * 2);
    for (first, second, co_count) in &stats.pairs {
        let weight = edge_weight(*co_count, count_of(first), count_of(second), stats.ready_clips);
        for (source, target) in [(first, second), (second, first)] {
            edges.push(TopicEdge {
                source_id: source.clone(),
                target_id: target.clone(),
                relation: CO_OCCURS_RELATION.to_string(),
                weight,
            });
        }
    }
    edges
}

/// Returns the number of topic pairs linked.
pub async fn generate_co_occurrence_edges(store: &dyn ScoreStore, min_clips: i64) -> Result<usize> {
    let stats = store.co_occurrence_stats(min_clips).await?;
    let edges = build_co_occurrence_edges(&stats);
    if edges.is_empty() {
        info!("No co-occurrence edges to generate");
        return Ok(0);
    }

    store.upsert_topic_edges(&edges).await?;
    let pairs = edges.len() / 2;
    info!(pairs, "Generated co-occurrence edges");
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::store::MemoryScoreStore;
    use std::collections::HashMap;

    #[test]
    fn test_edge_weight_scaling() {
        // independent topics: pmi 0 → 0.5
        assert!((edge_weight(25, 50, 50, 100) - 0.5).abs() < 1e-9);
        // always together: pmi ln(10) → clamped to 1.0
        assert_eq!(edge_weight(10, 10, 10, 100), 1.0);
        // rarely together: strongly negative pmi → floor
        assert_eq!(edge_weight(1, 90, 90, 100), 0.1);
    }

    #[test]
    fn test_edge_weight_degenerate_inputs() {
        assert_eq!(edge_weight(3, 0, 10, 100), 0.5);
        assert_eq!(edge_weight(3, 10, 10, 0), 0.5);
    }

    #[test]
    fn test_edges_are_symmetric() {
        let stats = CoOccurrenceStats {
            pairs: vec![("a".to_string(), "b".to_string(), 25)],
            topic_clip_counts: HashMap::from([("a".to_string(), 50), ("b".to_string(), 50)]),
            ready_clips: 100,
        };
        let edges = build_co_occurrence_edges(&stats);
        assert_eq!(edges.len(), 2);
        assert_eq!((edges[0].source_id.as_str(), edges[0].target_id.as_str()), ("a", "b"));
        assert_eq!((edges[1].source_id.as_str(), edges[1].target_id.as_str()), ("b", "a"));
        assert!(edges.iter().all(|e| e.relation == "co_occurs"));
        assert_eq!(edges[0].weight, edges[1].weight);
    }

    #[test]
    fn test_no_ready_clips_no_edges() {
        let stats = CoOccurrenceStats {
            pairs: vec![("a".to_string(), "b".to_string(), 5)],
            ..Default::default()
        };
        assert!(build_co_occurrence_edges(&stats).is_empty());
    }

    #[tokio::test]
    async fn test_generate_respects_min_clips() {
        let store = MemoryScoreStore {
            co_occurrence: CoOccurrenceStats {
                pairs: vec![
                    ("a".to_string(), "b".to_string(), 5),
                    ("a".to_string(), "c".to_string(), 2),
                ],
                topic_clip_counts: HashMap::from([
                    ("a".to_string(), 10),
                    ("b".to_string(), 8),
                    ("c".to_string(), 4),
                ]),
                ready_clips: 40,
            },
            ..Default::default()
        };

        assert_eq!(generate_co_occurrence_edges(&store, DEFAULT_MIN_CLIPS).await.unwrap(), 1);
        let edges = store.edges().await;
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.target_id != "c" && e.source_id != "c"));
    }
}
