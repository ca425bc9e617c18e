use crate::error::Result;
use crate::services::topic_graph::TopicEdge;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Interaction counts for one ready clip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionAggregate {
    pub clip_id: String,
    pub views: i64,
    /// Mean watch percentage over view rows; `None` when no view carried one
    pub avg_watch_percentage: Option<f64>,
    pub likes: i64,
    pub saves: i64,
    pub completes: i64,
    pub skips: i64,
    pub dislikes: i64,
}

/// Inputs of the co-occurrence pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoOccurrenceStats {
    /// (topic_a, topic_b, clips carrying both) with topic_a < topic_b
    pub pairs: Vec<(String, String, i64)>,
    pub topic_clip_counts: HashMap<String, i64>,
    pub ready_clips: i64,
}

/// Storage side of the score updater job.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Aggregates for ready clips with at least `min_views` views.
    async fn interaction_aggregates(&self, min_views: i64) -> Result<Vec<InteractionAggregate>>;
    async fn write_content_scores(&self, scores: &[(String, f64)]) -> Result<u64>;

    async fn co_occurrence_stats(&self, min_clips: i64) -> Result<CoOccurrenceStats>;
    async fn upsert_topic_edges(&self, edges: &[TopicEdge]) -> Result<u64>;

    /// Users with at least one like/save/watch_full interaction.
    async fn engaged_users(&self) -> Result<Vec<String>>;
    /// Raw embedding blobs of the clips a user liked, saved or fully watched.
    async fn positive_clip_embeddings(&self, user_id: &str) -> Result<Vec<Vec<u8>>>;
    async fn upsert_user_embedding(
        &self,
        user_id: &str,
        blob: &[u8],
        interaction_count: i64,
    ) -> Result<()>;
}

pub struct PgScoreStore {
    pool: PgPool,
}

impl PgScoreStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScoreStore for PgScoreStore {
    async fn interaction_aggregates(&self, min_views: i64) -> Result<Vec<InteractionAggregate>> {
        let rows: Vec<(String, i64, Option<f64>, i64, i64, i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT
                i.clip_id,
                COUNT(*) FILTER (WHERE i.action = 'view') AS views,
                AVG(i.watch_percentage::DOUBLE PRECISION) FILTER (WHERE i.action = 'view'),
                COUNT(*) FILTER (WHERE i.action = 'like'),
                COUNT(*) FILTER (WHERE i.action = 'save'),
                COUNT(*) FILTER (WHERE i.action = 'watch_full'),
                COUNT(*) FILTER (WHERE i.action = 'skip'),
                COUNT(*) FILTER (WHERE i.action = 'dislike')
            FROM interactions i
            JOIN clips c ON c.id = i.clip_id
            WHERE c.status = 'ready'
            GROUP BY i.clip_id
            HAVING COUNT(*) FILTER (WHERE i.action = 'view') >= $1
            "#,
        )
        .bind(min_views)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(clip_id, views, avg_watch_percentage, likes, saves, completes, skips, dislikes)| {
                    InteractionAggregate {
                        clip_id,
                        views,
                        avg_watch_percentage,
                        likes,
                        saves,
                        completes,
                        skips,
                        dislikes,
                    }
                },
            )
            .collect())
    }

    async fn write_content_scores(&self, scores: &[(String, f64)]) -> Result<u64> {
        if scores.is_empty() {
            return Ok(0);
        }
        let (ids, values): (Vec<String>, Vec<f64>) = scores.iter().cloned().unzip();

        let result = sqlx::query(
            r#"
            UPDATE clips AS c
            SET content_score = u.score
            FROM UNNEST($1::TEXT[], $2::DOUBLE PRECISION[]) AS u(id, score)
            WHERE c.id = u.id AND c.status = 'ready'
            "#,
        )
        .bind(&ids)
        .bind(&values)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn co_occurrence_stats(&self, min_clips: i64) -> Result<CoOccurrenceStats> {
        let pairs: Vec<(String, String, i64)> = sqlx::query_as(
            r#"
            SELECT a.topic_id, b.topic_id, COUNT(*) AS co_count
            FROM clip_topics a
            JOIN clip_topics b ON a.clip_id = b.clip_id AND a.topic_id < b.topic_id
            GROUP BY a.topic_id, b.topic_id
            HAVING COUNT(*) >= $1
            "#,
        )
        .bind(min_clips)
        .fetch_all(&self.pool)
        .await?;

        if pairs.is_empty() {
            return Ok(CoOccurrenceStats::default());
        }

        let (ready_clips,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM clips WHERE status = 'ready'")
                .fetch_one(&self.pool)
                .await?;

        let counts: Vec<(String, i64)> =
            sqlx::query_as("SELECT topic_id, COUNT(*) FROM clip_topics GROUP BY topic_id")
                .fetch_all(&self.pool)
                .await?;

        Ok(CoOccurrenceStats {
            pairs,
            topic_clip_counts: counts.into_iter().collect(),
            ready_clips,
        })
    }

    async fn upsert_topic_edges(&self, edges: &[TopicEdge]) -> Result<u64> {
        if edges.is_empty() {
            return Ok(0);
        }
        let sources: Vec<&str> = edges.iter().map(|e| e.source_id.as_str()).collect();
        let targets: Vec<&str> = edges.iter().map(|e| e.target_id.as_str()).collect();
        let relations: Vec<&str> = edges.iter().map(|e| e.relation.as_str()).collect();
        let weights: Vec<f64> = edges.iter().map(|e| e.weight).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO topic_edges (source_id, target_id, relation, weight)
            SELECT * FROM UNNEST($1::TEXT[], $2::TEXT[], $3::TEXT[], $4::DOUBLE PRECISION[])
            ON CONFLICT (source_id, target_id) DO UPDATE
            SET weight = EXCLUDED.weight
            "#,
        )
        .bind(&sources)
        .bind(&targets)
        .bind(&relations)
        .bind(&weights)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn engaged_users(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT user_id FROM interactions
             WHERE action IN ('like', 'save', 'watch_full')",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn positive_clip_embeddings(&self, user_id: &str) -> Result<Vec<Vec<u8>>> {
        let rows: Vec<(Vec<u8>,)> = sqlx::query_as(
            r#"
            SELECT e.text_embedding
            FROM interactions i
            JOIN clip_embeddings e ON e.clip_id = i.clip_id
            WHERE i.user_id = $1
              AND i.action IN ('like', 'save', 'watch_full')
              AND e.text_embedding IS NOT NULL
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(blob,)| blob).collect())
    }

    async fn upsert_user_embedding(
        &self,
        user_id: &str,
        blob: &[u8],
        interaction_count: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_embeddings (user_id, text_embedding, interaction_count, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET text_embedding = EXCLUDED.text_embedding,
                interaction_count = EXCLUDED.interaction_count,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id)
        .bind(blob)
        .bind(interaction_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// In-memory store for local runs and tests. Reads return the seeded rows;
/// writes are recorded so callers can inspect them.
#[derive(Default)]
pub struct MemoryScoreStore {
    pub aggregates: Vec<InteractionAggregate>,
    pub co_occurrence: CoOccurrenceStats,
    pub user_embeddings: HashMap<String, Vec<Vec<u8>>>,
    pub written_scores: Mutex<HashMap<String, f64>>,
    pub written_edges: Mutex<Vec<TopicEdge>>,
    pub written_user_embeddings: Mutex<HashMap<String, (Vec<u8>, i64)>>,
}

impl MemoryScoreStore {
    pub async fn scores(&self) -> HashMap<String, f64> {
        self.written_scores.lock().await.clone()
    }

    pub async fn edges(&self) -> Vec<TopicEdge> {
        self.written_edges.lock().await.clone()
    }

    pub async fn user_embedding(&self, user_id: &str) -> Option<(Vec<u8>, i64)> {
        self.written_user_embeddings.lock().await.get(user_id).cloned()
    }
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn interaction_aggregates(&self, min_views: i64) -> Result<Vec<InteractionAggregate>> {
        Ok(self
            .aggregates
            .iter()
            .filter(|a| a.views >= min_views)
            .cloned()
            .collect())
    }

    async fn write_content_scores(&self, scores: &[(String, f64)]) -> Result<u64> {
        let mut written = self.written_scores.lock().await;
        for (id, score) in scores {
            written.insert(id.clone(), *score);
        }
        Ok(scores.len() as u64)
    }

    async fn co_occurrence_stats(&self, min_clips: i64) -> Result<CoOccurrenceStats> {
        let mut stats = self.co_occurrence.clone();
        stats.pairs.retain(|(_, _, count)| *count >= min_clips);
        Ok(stats)
    }

    async fn upsert_topic_edges(&self, edges: &[TopicEdge]) -> Result<u64> {
        let mut written = self.written_edges.lock().await;
        for edge in edges {
            match written
                .iter_mut()
                .find(|e| e.source_id == edge.source_id && e.target_id == edge.target_id)
            {
                Some(existing) => existing.weight = edge.weight,
                None => written.push(edge.clone()),
            }
        }
        Ok(edges.len() as u64)
    }

    async fn engaged_users(&self) -> Result<Vec<String>> {
        let mut users: Vec<String> = self.user_embeddings.keys().cloned().collect();
        users.sort();
        Ok(users)
    }

    async fn positive_clip_embeddings(&self, user_id: &str) -> Result<Vec<Vec<u8>>> {
        Ok(self.user_embeddings.get(user_id).cloned().unwrap_or_default())
    }

    async fn upsert_user_embedding(
        &self,
        user_id: &str,
        blob: &[u8],
        interaction_count: i64,
    ) -> Result<()> {
        self.written_user_embeddings
            .lock()
            .await
            .insert(user_id.to_string(), (blob.to_vec(), interaction_count));
        Ok(())
    }
}
