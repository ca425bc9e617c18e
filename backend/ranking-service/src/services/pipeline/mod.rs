/// Feed Ranking Pipeline
///
/// One ranking pass over a pre-filtered candidate list:
///
/// 1. Topic/embedding pass: `content_score × blended boost`, stable sort
/// 2. LTR rescoring when a model with trees is loaded
/// 3. Trending multiplier on the active score (no re-sort)
/// 4. Diversity re-rank
/// 5. Truncate to the requested limit
///
/// Scores live in a side vector aligned with the candidate list and are
/// dropped before returning, so callers get back the records they sent.
use crate::config::RankingConfig;
use crate::models::{ClipCandidate, RankingRequest};
use crate::services::affinity::resolve_affinities;
use crate::services::boost::{flat_topic_boost, BoostComputer, BoostParams, NEUTRAL_BOOST};
use crate::services::diversity::DiversityReranker;
use crate::services::embedding::EmbeddingBlender;
use crate::services::ltr::{build_features, LtrModel};
use crate::services::snapshot::Snapshot;
use crate::services::topic_graph::TopicGraph;
use ndarray::Array2;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

struct Scored {
    clip: ClipCandidate,
    working: Option<f64>,
    ltr: Option<f64>,
}

impl Scored {
    fn active(&self) -> Option<f64> {
        self.ltr.or(self.working)
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

pub struct FeedRanker {
    topic_graph: Snapshot<TopicGraph>,
    ltr_model: Snapshot<LtrModel>,
    config: RankingConfig,
}

impl FeedRanker {
    pub fn new(
        topic_graph: Snapshot<TopicGraph>,
        ltr_model: Snapshot<LtrModel>,
        config: RankingConfig,
    ) -> Self {
        Self {
            topic_graph,
            ltr_model,
            config,
        }
    }

    pub fn topic_graph(&self) -> &Snapshot<TopicGraph> {
        &self.topic_graph
    }

    pub fn ltr_model(&self) -> &Snapshot<LtrModel> {
        &self.ltr_model
    }

    /// Rank against the snapshots current at call time. Both are pinned for
    /// the whole pass; a refresh landing mid-pass is picked up next request.
    pub async fn rank(&self, request: RankingRequest) -> Vec<ClipCandidate> {
        let graph = self.topic_graph.current().await;
        let model = self.ltr_model.current().await;
        self.rank_with(&graph, &model, request)
    }

    pub fn rank_with(
        &self,
        graph: &TopicGraph,
        model: &LtrModel,
        request: RankingRequest,
    ) -> Vec<ClipCandidate> {
        let RankingRequest {
            user_id,
            candidates,
            topic_weights,
            stored_affinities,
            user_embedding,
            user_stats,
            prefs,
            limit,
        } = request;

        if candidates.is_empty() {
            return Vec::new();
        }

        let total = candidates.len();
        let mut scored: Vec<Scored> = candidates
            .into_iter()
            .map(|clip| Scored {
                clip,
                working: None,
                ltr: None,
            })
            .collect();

        // A loaded model replaces the topic pass rather than refining it.
        if model.is_empty() {
            self.apply_topic_pass(
                &mut scored,
                graph,
                &topic_weights,
                &stored_affinities,
                user_embedding.as_deref(),
            );
        } else {
            let width = model.feature_count();
            let rows: Vec<Vec<f64>> = scored
                .iter()
                .map(|s| build_features(&s.clip, &user_stats, width))
                .collect();
            let matrix = Array2::from_shape_fn((rows.len(), width), |(i, j)| rows[i][j]);
            let scores = model.score_batch(&matrix);
            for (entry, score) in scored.iter_mut().zip(scores.iter()) {
                entry.ltr = Some(*score);
            }
            scored.sort_by(|a, b| {
                descending(a.ltr.unwrap_or(0.0), b.ltr.unwrap_or(0.0))
                    .then_with(|| descending(a.clip.content_score, b.clip.content_score))
            });
        }

        if prefs.trending_boost {
            self.apply_trending(&mut scored);
        }

        let (clips, scores): (Vec<ClipCandidate>, Vec<Option<f64>>) = scored
            .into_iter()
            .map(|s| {
                let active = s.active();
                (s.clip, active)
            })
            .unzip();

        let mut ranked = if prefs.diversity_mix > 0.0 {
            DiversityReranker::new(&self.config).rerank(clips, &scores, prefs.diversity_mix)
        } else {
            clips
        };

        if limit > 0 {
            ranked.truncate(limit);
        }

        debug!(
            user_id = user_id.as_deref().unwrap_or("anonymous"),
            candidates = total,
            returned = ranked.len(),
            ltr = !model.is_empty(),
            "Ranked feed"
        );
        ranked
    }

    /// Working score = `content_score × boost`, then a stable descending sort.
    ///
    /// Skipped entirely when there is neither a loaded graph nor an explicit
    /// weight: the candidate order from the fetch is kept as is.
    fn apply_topic_pass(
        &self,
        scored: &mut [Scored],
        graph: &TopicGraph,
        topic_weights: &HashMap<String, f64>,
        stored_affinities: &HashMap<String, f64>,
        user_embedding: Option<&[f32]>,
    ) {
        let has_graph = !graph.is_empty();
        if !has_graph && topic_weights.is_empty() {
            return;
        }

        let affinities = resolve_affinities(graph, topic_weights, stored_affinities);
        let boost = BoostComputer::new(graph, BoostParams::from(&self.config));
        let blender = EmbeddingBlender::from(&self.config);

        for entry in scored.iter_mut() {
            let clip = &entry.clip;
            let graph_boost =
                if has_graph && !affinities.is_empty() && !clip.topic_ids.is_empty() {
                    boost.compute_boost(&clip.topic_ids, &affinities)
                } else if !topic_weights.is_empty() {
                    flat_topic_boost(&clip.topics, topic_weights)
                } else {
                    NEUTRAL_BOOST
                };
            let similarity = blender.similarity(user_embedding, clip.embedding.as_deref());
            entry.working = Some(clip.content_score * blender.combine(graph_boost, similarity));
        }

        scored.sort_by(|a, b| descending(a.working.unwrap_or(0.0), b.working.unwrap_or(0.0)));
    }

    /// `× (1 + ln(1 + velocity) × factor)` for clips with recent interactions.
    fn apply_trending(&self, scored: &mut [Scored]) {
        for entry in scored.iter_mut() {
            let velocity = entry.clip.recent_interactions;
            if velocity <= 0.0 || velocity.is_nan() {
                continue;
            }
            let multiplier = 1.0 + velocity.ln_1p() * self.config.trending_factor;
            if let Some(ltr) = entry.ltr.as_mut() {
                *ltr *= multiplier;
            } else if let Some(working) = entry.working.as_mut() {
                *working *= multiplier;
            }
        }
    }
}
