//! "More like this": ranks clips by embedding closeness to a reference clip.

use super::{blob_to_f32, cosine_similarity};
use std::cmp::Ordering;
use tracing::debug;

pub const DEFAULT_SIMILAR_LIMIT: usize = 10;
pub const MAX_SIMILAR_LIMIT: usize = 50;

const TEXT_WEIGHT: f64 = 0.6;
const VISUAL_WEIGHT: f64 = 0.4;

/// Raw stored embedding blobs of one clip. An empty blob means absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipEmbeddingBlobs {
    pub text: Vec<u8>,
    pub visual: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarCandidate {
    pub clip_id: String,
    pub embeddings: ClipEmbeddingBlobs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarClip {
    pub clip_id: String,
    /// Rounded to three decimals.
    pub similarity: f64,
}

/// Requested limits outside `1..=50` fall back to the default of 10.
pub fn similar_limit(requested: Option<i64>) -> usize {
    match requested {
        Some(n) if n > 0 && n <= MAX_SIMILAR_LIMIT as i64 => n as usize,
        _ => DEFAULT_SIMILAR_LIMIT,
    }
}

/// Rank `candidates` by similarity to the reference clip, most similar first.
///
/// Returns `None` when the reference has neither a decodable text nor a
/// decodable visual embedding. The reference itself is never returned.
/// Candidate blobs that are present but undecodable score 0 for that side.
pub fn rank_similar(
    reference_id: &str,
    reference: &ClipEmbeddingBlobs,
    candidates: Vec<SimilarCandidate>,
    limit: usize,
) -> Option<Vec<SimilarClip>> {
    let ref_text = blob_to_f32(&reference.text);
    let ref_visual = blob_to_f32(&reference.visual);
    if ref_text.is_none() && ref_visual.is_none() {
        return None;
    }

    let side = |reference: &Option<Vec<f32>>, blob: &[u8]| -> Option<f64> {
        let reference = reference.as_deref()?;
        if blob.is_empty() {
            return None;
        }
        Some(
            blob_to_f32(blob)
                .map(|v| cosine_similarity(reference, &v))
                .unwrap_or(0.0),
        )
    };

    let total = candidates.len();
    let mut scored: Vec<(String, f64)> = candidates
        .into_iter()
        .filter(|c| c.clip_id != reference_id)
        .map(|c| {
            let text = side(&ref_text, &c.embeddings.text);
            let visual = side(&ref_visual, &c.embeddings.visual);
            let sim = match (text, visual) {
                (Some(t), Some(v)) => TEXT_WEIGHT * t + VISUAL_WEIGHT * v,
                (Some(t), None) => t,
                (None, Some(v)) => v,
                (None, None) => 0.0,
            };
            (c.clip_id, sim)
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(limit);

    debug!(
        reference = reference_id,
        candidates = total,
        returned = scored.len(),
        "Ranked similar clips"
    );

    Some(
        scored
            .into_iter()
            .map(|(clip_id, sim)| SimilarClip {
                clip_id,
                similarity: (sim * 1000.0).round() / 1000.0,
            })
            .collect(),
    )
}
