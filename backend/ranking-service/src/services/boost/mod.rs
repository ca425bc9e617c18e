/// Topical Boost Module
///
/// Turns a clip's topics and the viewer's affinity map into a relevance
/// multiplier by walking the topic graph:
///
/// - direct and canonical affinity
/// - ancestors, `w * decay^hops`, up to the root
/// - descendants, `w * decay^depth`, up to a depth bound
/// - lateral edges, `w * Π edge_weight * decay^hops`, up to a hop bound
///
/// Every walk carries a visited-set: the data is meant to be acyclic but
/// nothing enforces it.
use crate::config::RankingConfig;
use crate::services::topic_graph::TopicGraph;
use std::collections::{HashMap, HashSet, VecDeque};

/// Neutral multiplier; "no match" must never zero a clip out.
pub const NEUTRAL_BOOST: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostParams {
    pub decay: f64,
    pub max_lateral_hops: usize,
    pub max_descendant_depth: usize,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self::from(&RankingConfig::default())
    }
}

impl From<&RankingConfig> for BoostParams {
    fn from(config: &RankingConfig) -> Self {
        Self {
            decay: config.hierarchical_decay,
            max_lateral_hops: config.max_lateral_hops,
            max_descendant_depth: config.max_descendant_depth,
        }
    }
}

pub struct BoostComputer<'g> {
    graph: &'g TopicGraph,
    params: BoostParams,
}

impl<'g> BoostComputer<'g> {
    pub fn new(graph: &'g TopicGraph, params: BoostParams) -> Self {
        Self { graph, params }
    }

    /// Mean best boost over the clip's matching topics.
    ///
    /// Topics whose best boost is not positive are left out of both sum and
    /// count. Returns [`NEUTRAL_BOOST`] when either input is empty or
    /// nothing matched.
    pub fn compute_boost(&self, clip_topic_ids: &[String], affinities: &HashMap<String, f64>) -> f64 {
        if clip_topic_ids.is_empty() || affinities.is_empty() {
            return NEUTRAL_BOOST;
        }

        let mut total = 0.0;
        let mut matched = 0usize;
        for topic_id in clip_topic_ids {
            let best = self.best_boost(topic_id, affinities);
            if best > 0.0 {
                total += best;
                matched += 1;
            }
        }

        if matched == 0 {
            NEUTRAL_BOOST
        } else {
            total / matched as f64
        }
    }

    fn best_boost(&self, topic_id: &str, affinities: &HashMap<String, f64>) -> f64 {
        let mut best = 0.0_f64;

        if let Some(&w) = affinities.get(topic_id) {
            best = best.max(w);
        }
        if let Some(&w) = self
            .graph
            .canonical_of(topic_id)
            .and_then(|canon| affinities.get(canon))
        {
            best = best.max(w);
        }

        if self.graph.node(topic_id).is_some() {
            best = best.max(self.ancestor_boost(topic_id, affinities));
            best = best.max(self.descendant_boost(topic_id, affinities));
        }
        best.max(self.lateral_boost(topic_id, affinities))
    }

    fn decayed(&self, weight: f64, hops: usize) -> f64 {
        weight * self.params.decay.powi(hops as i32)
    }

    /// Walk the parent chain to the root. A distant strong match may beat a
    /// close weak one, so the whole chain is scanned.
    fn ancestor_boost(&self, topic_id: &str, affinities: &HashMap<String, f64>) -> f64 {
        let mut best = 0.0_f64;
        let mut visited: HashSet<&str> = HashSet::from([topic_id]);
        let mut current = topic_id;
        let mut hops = 0usize;

        while let Some(parent_id) = self.graph.parent_of(current) {
            if !visited.insert(parent_id) {
                break;
            }
            hops += 1;
            if let Some(&w) = affinities.get(parent_id) {
                best = best.max(self.decayed(w, hops));
            }
            if self.graph.node(parent_id).is_none() {
                break;
            }
            current = parent_id;
        }
        best
    }

    fn descendant_boost(&self, topic_id: &str, affinities: &HashMap<String, f64>) -> f64 {
        let max_depth = self.params.max_descendant_depth;
        let mut best = 0.0_f64;
        let mut visited: HashSet<&str> = HashSet::from([topic_id]);
        let mut stack: Vec<(&str, usize)> = self
            .graph
            .children_of(topic_id)
            .iter()
            .map(|c| (c.as_str(), 1))
            .collect();

        while let Some((id, depth)) = stack.pop() {
            if depth > max_depth || !visited.insert(id) {
                continue;
            }
            if let Some(&w) = affinities.get(id) {
                best = best.max(self.decayed(w, depth));
            }
            if depth < max_depth {
                stack.extend(self.graph.children_of(id).iter().map(|c| (c.as_str(), depth + 1)));
            }
        }
        best
    }

    /// Breadth-first over lateral edges. Each node is expanded at most once,
    /// so edge cycles cannot loop.
    fn lateral_boost(&self, topic_id: &str, affinities: &HashMap<String, f64>) -> f64 {
        let max_hops = self.params.max_lateral_hops;
        if max_hops == 0 {
            return 0.0;
        }

        let mut best = 0.0_f64;
        let mut seen: HashSet<&str> = HashSet::from([topic_id]);
        let mut queue: VecDeque<(&str, usize, f64)> = self
            .graph
            .edges_of(topic_id)
            .iter()
            .map(|e| (e.target_id.as_str(), 1, e.weight))
            .collect();

        while let Some((id, hops, path_weight)) = queue.pop_front() {
            if hops > max_hops || !seen.insert(id) {
                continue;
            }
            if let Some(&w) = affinities.get(id) {
                best = best.max(self.decayed(w * path_weight, hops));
            }
            if hops < max_hops {
                for edge in self.graph.edges_of(id) {
                    if !seen.contains(edge.target_id.as_str()) {
                        queue.push_back((edge.target_id.as_str(), hops + 1, path_weight * edge.weight));
                    }
                }
            }
        }
        best
    }
}

/// Name-keyed fallback used when no topic graph is loaded: mean explicit
/// weight over the clip's matching topic names, neutral when none match.
pub fn flat_topic_boost(topics: &[String], weights: &HashMap<String, f64>) -> f64 {
    let matched: Vec<f64> = topics.iter().filter_map(|t| weights.get(t).copied()).collect();
    if matched.is_empty() {
        NEUTRAL_BOOST
    } else {
        matched.iter().sum::<f64>() / matched.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::topic_graph::fixtures::{edge, node, sample_graph};
    use crate::services::topic_graph::NaiveDepluralizer;
    use std::time::{Duration, Instant};

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn aff(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_inputs_are_neutral() {
        let graph = sample_graph();
        let boost = BoostComputer::new(&graph, BoostParams::default());
        assert_eq!(boost.compute_boost(&[], &aff(&[("physics", 1.0)])), 1.0);
        assert_eq!(boost.compute_boost(&ids(&["physics"]), &HashMap::new()), 1.0);
        assert_eq!(boost.compute_boost(&[], &HashMap::new()), 1.0);

        let empty = TopicGraph::empty();
        let boost = BoostComputer::new(&empty, BoostParams::default());
        assert_eq!(boost.compute_boost(&[], &HashMap::new()), 1.0);
    }

    #[test]
    fn test_grandparent_two_hops() {
        let graph = sample_graph();
        let boost = BoostComputer::new(&graph, BoostParams::default());
        let value = boost.compute_boost(&ids(&["quantum"]), &aff(&[("science", 1.0)]));
        assert!(approx(value, 0.49), "got {}", value);
    }

    #[test]
    fn test_direct_affinity_wins_over_decayed() {
        let graph = sample_graph();
        let boost = BoostComputer::new(&graph, BoostParams::default());
        let value = boost.compute_boost(&ids(&["physics"]), &aff(&[("physics", 0.9), ("science", 1.0)]));
        assert!(approx(value, 0.9));
    }

    #[test]
    fn test_distant_strong_ancestor_beats_close_weak_one() {
        let graph = sample_graph();
        let boost = BoostComputer::new(&graph, BoostParams::default());
        // physics at 1 hop: 0.1 * 0.7 = 0.07; science at 2 hops: 1.0 * 0.49
        let value = boost.compute_boost(&ids(&["quantum"]), &aff(&[("physics", 0.1), ("science", 1.0)]));
        assert!(approx(value, 0.49));
    }

    #[test]
    fn test_descendant_propagation() {
        let graph = sample_graph();
        let boost = BoostComputer::new(&graph, BoostParams::default());
        let value = boost.compute_boost(&ids(&["science"]), &aff(&[("quantum", 1.0)]));
        assert!(approx(value, 0.49));
    }

    #[test]
    fn test_descendant_depth_bound() {
        let graph = TopicGraph::build(
            vec![
                node("d0", "D0", None, 0, 1),
                node("d1", "D1", Some("d0"), 1, 1),
                node("d2", "D2", Some("d1"), 2, 1),
                node("d3", "D3", Some("d2"), 3, 1),
                node("d4", "D4", Some("d3"), 4, 1),
            ],
            vec![],
            &NaiveDepluralizer,
        );
        let boost = BoostComputer::new(&graph, BoostParams::default());
        let at_three = boost.compute_boost(&ids(&["d0"]), &aff(&[("d3", 1.0)]));
        assert!(approx(at_three, 0.343));
        let at_four = boost.compute_boost(&ids(&["d0"]), &aff(&[("d4", 1.0)]));
        assert_eq!(at_four, 1.0);
    }

    #[test]
    fn test_lateral_propagation_multiplies_edge_weight() {
        let graph = sample_graph();
        let boost = BoostComputer::new(&graph, BoostParams::default());
        let value = boost.compute_boost(&ids(&["math"]), &aff(&[("physics", 1.0)]));
        assert!(approx(value, 0.8 * 0.7));
    }

    #[test]
    fn test_lateral_hop_bound() {
        let graph = TopicGraph::build(
            vec![
                node("a", "A", None, 0, 1),
                node("b", "B", None, 0, 1),
                node("c", "C", None, 0, 1),
                node("d", "D", None, 0, 1),
            ],
            vec![edge("a", "b", 1.0), edge("b", "c", 0.5), edge("c", "d", 1.0)],
            &NaiveDepluralizer,
        );
        let boost = BoostComputer::new(&graph, BoostParams::default());
        let two_hops = boost.compute_boost(&ids(&["a"]), &aff(&[("c", 1.0)]));
        assert!(approx(two_hops, 0.5 * 0.49));
        let three_hops = boost.compute_boost(&ids(&["a"]), &aff(&[("d", 1.0)]));
        assert_eq!(three_hops, 1.0);
    }

    #[test]
    fn test_cycles_terminate() {
        let graph = TopicGraph::build(
            vec![
                node("x", "X", Some("y"), 1, 1),
                node("y", "Y", Some("x"), 1, 1),
                node("z", "Z", None, 0, 1),
            ],
            vec![
                edge("x", "y", 1.0),
                edge("y", "x", 1.0),
                edge("x", "x", 1.0),
                edge("z", "x", 1.0),
            ],
            &NaiveDepluralizer,
        );
        let boost = BoostComputer::new(
            &graph,
            BoostParams {
                max_lateral_hops: 50,
                max_descendant_depth: 50,
                ..Default::default()
            },
        );
        let start = Instant::now();
        let value = boost.compute_boost(&ids(&["x", "z"]), &aff(&[("q", 1.0)]));
        assert_eq!(value, 1.0);
        let value = boost.compute_boost(&ids(&["x"]), &aff(&[("y", 1.0)]));
        assert!(approx(value, 0.7));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_canonical_affinity_counts() {
        let graph = TopicGraph::build(
            vec![node("tech", "Tech", None, 0, 10), node("techs", "Techs", None, 0, 3)],
            vec![],
            &NaiveDepluralizer,
        );
        let boost = BoostComputer::new(&graph, BoostParams::default());
        let value = boost.compute_boost(&ids(&["techs"]), &aff(&[("tech", 0.6)]));
        assert!(approx(value, 0.6));
    }

    #[test]
    fn test_mean_excludes_unmatched_topics() {
        let graph = sample_graph();
        let boost = BoostComputer::new(&graph, BoostParams::default());
        let value = boost.compute_boost(
            &ids(&["physics", "cooking", "unknown"]),
            &aff(&[("physics", 0.8)]),
        );
        assert!(approx(value, 0.8));

        let value = boost.compute_boost(&ids(&["physics", "biology"]), &aff(&[("physics", 0.8), ("biology", 0.4)]));
        assert!(approx(value, 0.6));
    }

    #[test]
    fn test_no_match_is_neutral_not_zero() {
        let graph = sample_graph();
        let boost = BoostComputer::new(&graph, BoostParams::default());
        assert_eq!(boost.compute_boost(&ids(&["cooking"]), &aff(&[("physics", 1.0)])), 1.0);
        assert_eq!(boost.compute_boost(&ids(&["cooking"]), &aff(&[("cooking", 0.0)])), 1.0);
    }

    #[test]
    fn test_flat_topic_boost() {
        let weights = aff(&[("tech", 0.8), ("music", 0.4)]);
        assert!(approx(flat_topic_boost(&ids(&["tech", "music", "art"]), &weights), 0.6));
        assert_eq!(flat_topic_boost(&ids(&["art"]), &weights), 1.0);
        assert_eq!(flat_topic_boost(&[], &weights), 1.0);
    }
}
