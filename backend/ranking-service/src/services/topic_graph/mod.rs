/// Topic Graph Module
///
/// In-memory snapshot of the topic hierarchy (parent/child), the lateral
/// edge graph and the name-consolidation map.
///
/// # Lifecycle
/// A snapshot is built once from the store and never mutated afterwards.
/// Refresh builds a brand-new `TopicGraph` and swaps it into the shared
/// [`Snapshot`](crate::services::snapshot::Snapshot) handle; in-flight
/// ranking passes keep the `Arc` they already hold.
pub mod consolidation;
pub mod store;

pub use consolidation::{build_canonical_map, NaiveDepluralizer, StemPolicy};
pub use store::{load_topic_graph, PgTopicStore, StaticTopicStore, TopicStore};

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicNode {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub path: String,
    pub parent_id: Option<String>,
    pub depth: i64,
    pub clip_count: i64,
}

/// Typed, weighted, non-hierarchical association between two topics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicEdge {
    pub source_id: String,
    pub target_id: String,
    pub relation: String,
    pub weight: f64,
}

/// Nested view of the hierarchy for topic browsing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicTreeNode {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub clip_count: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TopicTreeNode>,
}

#[derive(Debug, Clone, Default)]
pub struct TopicGraph {
    nodes: HashMap<String, TopicNode>,
    by_slug: HashMap<String, String>,
    by_name: HashMap<String, String>,
    children: HashMap<String, Vec<String>>,
    edges: HashMap<String, Vec<TopicEdge>>,
    canonical: HashMap<String, String>,
    edge_count: usize,
}

impl TopicGraph {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build all indexes and the canonical map from raw rows.
    ///
    /// Edges with a non-finite or non-positive weight are dropped, weights
    /// above 1.0 are clamped to 1.0. Self-parenting rows are kept as nodes
    /// but not linked as their own child.
    pub fn build(nodes: Vec<TopicNode>, edges: Vec<TopicEdge>, policy: &dyn StemPolicy) -> Self {
        let mut graph = TopicGraph::empty();

        for node in nodes {
            graph.by_slug.insert(node.slug.clone(), node.id.clone());
            graph
                .by_name
                .insert(node.name.to_lowercase(), node.id.clone());
            if let Some(parent_id) = node.parent_id.as_deref().filter(|p| !p.is_empty()) {
                if parent_id != node.id {
                    graph
                        .children
                        .entry(parent_id.to_string())
                        .or_default()
                        .push(node.id.clone());
                }
            }
            graph.nodes.insert(node.id.clone(), node);
        }

        let mut dropped = 0usize;
        for mut edge in edges {
            if !edge.weight.is_finite() || edge.weight <= 0.0 {
                dropped += 1;
                continue;
            }
            edge.weight = edge.weight.min(1.0);
            graph
                .edges
                .entry(edge.source_id.clone())
                .or_default()
                .push(edge);
            graph.edge_count += 1;
        }
        if dropped > 0 {
            debug!(dropped, "Dropped topic edges with invalid weight");
        }

        graph.canonical = build_canonical_map(graph.nodes.values(), policy);
        graph
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn merged_count(&self) -> usize {
        self.canonical.len()
    }

    pub fn node(&self, id: &str) -> Option<&TopicNode> {
        self.nodes.get(id)
    }

    /// Exact, case-insensitive name lookup. No fuzzy matching.
    pub fn resolve_by_name(&self, name: &str) -> Option<&TopicNode> {
        self.by_name
            .get(&name.to_lowercase())
            .and_then(|id| self.nodes.get(id))
    }

    pub fn resolve_by_slug(&self, slug: &str) -> Option<&TopicNode> {
        self.by_slug.get(slug).and_then(|id| self.nodes.get(id))
    }

    pub fn canonical_of(&self, id: &str) -> Option<&str> {
        self.canonical.get(id).map(String::as_str)
    }

    pub fn canonical_map(&self) -> &HashMap<String, String> {
        &self.canonical
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.nodes
            .get(id)
            .and_then(|n| n.parent_id.as_deref())
            .filter(|p| !p.is_empty())
    }

    pub fn children_of(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edges_of(&self, id: &str) -> &[TopicEdge] {
        self.edges.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids of every topic in the subtrees rooted at the named topics,
    /// roots included, in preorder. Unknown names are ignored.
    pub fn expand_descendants<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();

        for name in names {
            let Some(root) = self.resolve_by_name(name.as_ref()) else {
                continue;
            };
            let mut stack = vec![root.id.as_str()];
            while let Some(id) = stack.pop() {
                if !seen.insert(id) {
                    continue;
                }
                ids.push(id.to_string());
                for child in self.children_of(id).iter().rev() {
                    stack.push(child.as_str());
                }
            }
        }
        ids
    }

    /// The hierarchy as a nested forest. Roots are topics without a parent
    /// or whose parent is unknown, sorted by clip_count descending.
    pub fn tree(&self) -> Vec<TopicTreeNode> {
        let mut roots: Vec<&TopicNode> = self
            .nodes
            .values()
            .filter(|n| match self.parent_of(&n.id) {
                None => true,
                Some(parent) => parent == n.id || !self.nodes.contains_key(parent),
            })
            .collect();
        roots.sort_by(|a, b| b.clip_count.cmp(&a.clip_count).then_with(|| a.id.cmp(&b.id)));

        let mut visited = HashSet::new();
        roots
            .into_iter()
            .filter_map(|root| self.subtree(root, &mut visited))
            .collect()
    }

    fn subtree<'a>(
        &'a self,
        node: &'a TopicNode,
        visited: &mut HashSet<&'a str>,
    ) -> Option<TopicTreeNode> {
        if !visited.insert(node.id.as_str()) {
            return None;
        }
        let children = self
            .children_of(&node.id)
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .filter_map(|child| self.subtree(child, visited))
            .collect();
        Some(TopicTreeNode {
            id: node.id.clone(),
            name: node.name.clone(),
            slug: node.slug.clone(),
            clip_count: node.clip_count,
            children,
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn node(id: &str, name: &str, parent: Option<&str>, depth: i64, clip_count: i64) -> TopicNode {
        TopicNode {
            id: id.to_string(),
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            path: name.to_lowercase(),
            parent_id: parent.map(str::to_string),
            depth,
            clip_count,
        }
    }

    pub fn edge(source: &str, target: &str, weight: f64) -> TopicEdge {
        TopicEdge {
            source_id: source.to_string(),
            target_id: target.to_string(),
            relation: "related_to".to_string(),
            weight,
        }
    }

    /// science ─ physics ─ quantum
    ///         └ biology
    /// math ↔ physics (lateral, 0.8), cooking unconnected
    pub fn sample_graph() -> TopicGraph {
        TopicGraph::build(
            vec![
                node("science", "Science", None, 0, 40),
                node("physics", "Physics", Some("science"), 1, 20),
                node("quantum", "Quantum", Some("physics"), 2, 5),
                node("biology", "Biology", Some("science"), 1, 12),
                node("math", "Math", None, 0, 8),
                node("cooking", "Cooking", None, 0, 30),
            ],
            vec![edge("physics", "math", 0.8), edge("math", "physics", 0.8)],
            &NaiveDepluralizer,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_build_indexes() {
        let graph = sample_graph();
        assert_eq!(graph.len(), 6);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.resolve_by_slug("quantum").map(|n| n.id.as_str()), Some("quantum"));
        assert_eq!(graph.parent_of("quantum"), Some("physics"));
        assert_eq!(graph.children_of("science"), &["physics".to_string(), "biology".to_string()]);
        assert!(graph.children_of("cooking").is_empty());
        assert_eq!(graph.edges_of("physics").len(), 1);
    }

    #[test]
    fn test_resolve_by_name_is_exact_and_case_insensitive() {
        let graph = sample_graph();
        assert_eq!(graph.resolve_by_name("PHYSICS").map(|n| n.id.as_str()), Some("physics"));
        assert_eq!(graph.resolve_by_name("physics").map(|n| n.id.as_str()), Some("physics"));
        assert!(graph.resolve_by_name("physic").is_none());
        assert!(graph.resolve_by_name("Phys").is_none());
    }

    #[test]
    fn test_invalid_edges_are_dropped_or_clamped() {
        let graph = TopicGraph::build(
            vec![node("a", "A", None, 0, 1), node("b", "B", None, 0, 1)],
            vec![
                edge("a", "b", 0.0),
                edge("a", "b", -1.0),
                edge("a", "b", f64::NAN),
                edge("b", "a", 3.0),
            ],
            &NaiveDepluralizer,
        );
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.edges_of("a").is_empty());
        assert_eq!(graph.edges_of("b")[0].weight, 1.0);
    }

    #[test]
    fn test_consolidation_in_build() {
        let graph = TopicGraph::build(
            vec![node("t1", "Tech", None, 0, 10), node("t2", "Techs", None, 0, 3)],
            vec![],
            &NaiveDepluralizer,
        );
        assert_eq!(graph.canonical_of("t2"), Some("t1"));
        assert_eq!(graph.canonical_of("t1"), None);
        assert_eq!(graph.merged_count(), 1);
    }

    #[test]
    fn test_expand_descendants() {
        let graph = sample_graph();
        let ids = graph.expand_descendants(&["science"]);
        assert_eq!(ids, vec!["science", "physics", "quantum", "biology"]);

        let ids = graph.expand_descendants(&["Physics", "quantum", "unknown"]);
        assert_eq!(ids, vec!["physics", "quantum"]);
    }

    #[test]
    fn test_tree_survives_parent_cycle() {
        let graph = TopicGraph::build(
            vec![
                node("root", "Root", None, 0, 3),
                node("x", "X", Some("y"), 1, 1),
                node("y", "Y", Some("x"), 1, 1),
                node("self", "Selfish", Some("self"), 0, 2),
            ],
            vec![],
            &NaiveDepluralizer,
        );
        let tree = graph.tree();
        let ids: Vec<_> = tree.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["root", "self"]);
        // The two-node cycle has no root and is left out
        assert!(graph.expand_descendants(&["x"]).len() == 2);
    }

    #[test]
    fn test_tree_nesting_and_order() {
        let graph = sample_graph();
        let tree = graph.tree();
        let roots: Vec<_> = tree.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(roots, vec!["science", "cooking", "math"]);
        let science = &tree[0];
        assert_eq!(science.children.len(), 2);
        assert_eq!(science.children[0].children[0].id, "quantum");

        let json = serde_json::to_value(&tree[1]).unwrap();
        assert!(json.get("children").is_none());
    }
}
