use super::{StemPolicy, TopicEdge, TopicGraph, TopicNode};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{info, warn};

/// Read-only source of topic rows.
#[async_trait]
pub trait TopicStore: Send + Sync {
    async fn load_nodes(&self) -> Result<Vec<TopicNode>>;
    async fn load_edges(&self) -> Result<Vec<TopicEdge>>;
}

/// PostgreSQL-backed topic store (`topics`, `topic_edges`).
pub struct PgTopicStore {
    pool: PgPool,
}

impl PgTopicStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TopicStore for PgTopicStore {
    async fn load_nodes(&self) -> Result<Vec<TopicNode>> {
        let rows: Vec<(String, String, String, String, Option<String>, i64, i64)> =
            sqlx::query_as(
                "SELECT id, name, slug, path, parent_id, depth::BIGINT, clip_count::BIGINT
                 FROM topics",
            )
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, slug, path, parent_id, depth, clip_count)| TopicNode {
                id,
                name,
                slug,
                path,
                parent_id,
                depth,
                clip_count,
            })
            .collect())
    }

    async fn load_edges(&self) -> Result<Vec<TopicEdge>> {
        let rows: Vec<(String, String, String, f64)> = sqlx::query_as(
            "SELECT source_id, target_id, relation, weight::DOUBLE PRECISION
             FROM topic_edges",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(source_id, target_id, relation, weight)| TopicEdge {
                source_id,
                target_id,
                relation,
                weight,
            })
            .collect())
    }
}

/// Fixed in-memory rows; used for fixtures and local runs without a database.
#[derive(Debug, Clone, Default)]
pub struct StaticTopicStore {
    pub nodes: Vec<TopicNode>,
    pub edges: Vec<TopicEdge>,
}

#[async_trait]
impl TopicStore for StaticTopicStore {
    async fn load_nodes(&self) -> Result<Vec<TopicNode>> {
        Ok(self.nodes.clone())
    }

    async fn load_edges(&self) -> Result<Vec<TopicEdge>> {
        Ok(self.edges.clone())
    }
}

/// Read every node and edge and build a fresh snapshot.
///
/// A node query failure is returned so the caller keeps its previous
/// snapshot. An edge query failure only loses the lateral graph.
pub async fn load_topic_graph(store: &dyn TopicStore, policy: &dyn StemPolicy) -> Result<TopicGraph> {
    let nodes = store.load_nodes().await?;
    let edges = match store.load_edges().await {
        Ok(edges) => edges,
        Err(e) => {
            warn!(error = %e, "Topic edges load failed, building hierarchy only");
            Vec::new()
        }
    };

    let graph = TopicGraph::build(nodes, edges, policy);
    info!(
        nodes = graph.len(),
        edges = graph.edge_count(),
        merged = graph.merged_count(),
        "Topic graph loaded"
    );
    Ok(graph)
}
