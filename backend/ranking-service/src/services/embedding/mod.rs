pub mod codec;
pub mod similar;

pub use codec::{blob_to_f32, f32_to_blob};
pub use similar::{rank_similar, similar_limit, ClipEmbeddingBlobs, SimilarCandidate, SimilarClip};

use crate::config::RankingConfig;

/// Cosine similarity of two embeddings.
///
/// Empty input, mismatched lengths and zero-norm vectors all give 0.0.
/// Accumulates in f64 so long vectors keep precision.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    dot / denom
}

/// Blends the graph boost with embedding similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmbeddingBlender {
    pub graph_weight: f64,
    pub embedding_weight: f64,
}

impl Default for EmbeddingBlender {
    fn default() -> Self {
        Self::from(&RankingConfig::default())
    }
}

impl From<&RankingConfig> for EmbeddingBlender {
    fn from(config: &RankingConfig) -> Self {
        Self {
            graph_weight: config.graph_blend_weight,
            embedding_weight: config.embedding_blend_weight,
        }
    }
}

impl EmbeddingBlender {
    /// Similarity between viewer and clip, clamped at 0 so anti-correlation
    /// never suppresses a clip. Missing embeddings give 0.
    pub fn similarity(&self, user: Option<&[f32]>, clip: Option<&[f32]>) -> f64 {
        match (user, clip) {
            (Some(u), Some(c)) => cosine_similarity(u, c).max(0.0),
            _ => 0.0,
        }
    }

    /// Weighted sum when a positive similarity exists, the graph boost alone
    /// otherwise.
    pub fn combine(&self, graph_boost: f64, similarity: f64) -> f64 {
        if similarity > 0.0 {
            self.graph_weight * graph_boost + self.embedding_weight * similarity
        } else {
            graph_boost
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_identical_vectors() {
        let v = [0.3, -1.2, 4.0];
        assert!(approx(cosine_similarity(&v, &v), 1.0));
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        assert!(approx(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0));
        assert!(approx(cosine_similarity(&[1.0, 2.0, 3.0], &[-1.0, -2.0, -3.0]), -1.0));
    }

    #[test]
    fn test_scale_invariance() {
        let a = [0.5, 0.25, -2.0];
        let b = [1.0, 3.0, 0.5];
        let scaled: Vec<f32> = a.iter().map(|x| x * 7.5).collect();
        assert!(approx(cosine_similarity(&a, &b), cosine_similarity(&scaled, &b)));
    }

    #[test]
    fn test_degenerate_inputs_are_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 1.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_blend_clamps_negative_similarity() {
        let blender = EmbeddingBlender::default();
        let user = [1.0, 0.0];
        let opposite = [-1.0, 0.0];
        assert_eq!(blender.similarity(Some(&user), Some(&opposite)), 0.0);
        assert_eq!(blender.combine(1.3, 0.0), 1.3);
    }

    #[test]
    fn test_blend_weighted_sum() {
        let blender = EmbeddingBlender::default();
        let sim = blender.similarity(Some(&[1.0, 0.0]), Some(&[1.0, 0.0]));
        assert!(approx(blender.combine(0.5, sim), 0.6 * 0.5 + 0.4));
    }

    #[test]
    fn test_missing_embedding_falls_back_to_graph_boost() {
        let blender = EmbeddingBlender::default();
        assert_eq!(blender.similarity(None, Some(&[1.0])), 0.0);
        assert_eq!(blender.similarity(Some(&[1.0]), None), 0.0);
        assert_eq!(blender.combine(0.8, 0.0), 0.8);
    }
}
