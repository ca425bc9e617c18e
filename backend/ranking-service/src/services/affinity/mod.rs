use crate::services::topic_graph::TopicGraph;
use std::collections::HashMap;
use tracing::debug;

/// Build the per-request topic_id → weight map.
///
/// 1. Explicit name-keyed sliders resolve through exact name lookup;
///    unknown names are dropped.
/// 2. Stored per-user affinities override explicit weights on the same id.
/// 3. Every weight is lifted onto the topic's canonical id when the
///    canonical has no weight yet or a smaller one.
///
/// Without a loaded graph nothing can be resolved and the map is empty.
pub fn resolve_affinities(
    graph: &TopicGraph,
    explicit: &HashMap<String, f64>,
    stored: &HashMap<String, f64>,
) -> HashMap<String, f64> {
    if graph.is_empty() {
        return HashMap::new();
    }

    let mut affinities = HashMap::with_capacity(explicit.len() + stored.len());

    for (name, &weight) in explicit {
        match graph.resolve_by_name(name) {
            Some(node) => {
                affinities.insert(node.id.clone(), weight);
            }
            None => debug!(topic = %name, "Explicit topic weight has no matching topic"),
        }
    }

    for (topic_id, &weight) in stored {
        affinities.insert(topic_id.clone(), weight);
    }

    if graph.merged_count() > 0 {
        let lifts: Vec<(String, f64)> = affinities
            .iter()
            .filter_map(|(id, &w)| graph.canonical_of(id).map(|canon| (canon.to_string(), w)))
            .collect();
        for (canon, weight) in lifts {
            let slot = affinities.entry(canon).or_insert(weight);
            if weight > *slot {
                *slot = weight;
            }
        }
    }

    affinities
}
