use crate::config::RankingConfig;
use crate::models::ClipCandidate;
use std::collections::HashMap;

const SCORE_FLOOR: f64 = 0.0001;

/// Diversity Layer - greedy re-rank penalizing repeated topic/channel/platform
///
/// Each pick maximizes
/// `score × Π topic_decay^seen(topic) × channel_decay^seen × platform_decay^seen`
/// where `seen` counts how often that attribute was already placed.
#[derive(Debug, Clone, Copy)]
pub struct DiversityReranker {
    topic_min_decay: f64,
    channel_min_decay: f64,
    platform_min_decay: f64,
}

impl Default for DiversityReranker {
    fn default() -> Self {
        Self::new(&RankingConfig::default())
    }
}

#[derive(Debug, Clone, Copy)]
struct Decays {
    topic: f64,
    channel: f64,
    platform: f64,
}

#[derive(Default)]
struct SeenCounts<'a> {
    topics: HashMap<&'a str, i32>,
    channels: HashMap<&'a str, i32>,
    platforms: HashMap<&'a str, i32>,
}

impl<'a> SeenCounts<'a> {
    fn penalty(&self, clip: &ClipCandidate, decays: Decays) -> f64 {
        let mut penalty = 1.0;
        for topic in &clip.topics {
            if let Some(&count) = self.topics.get(topic.as_str()) {
                penalty *= decays.topic.powi(count);
            }
        }
        if let Some(count) = attr(&clip.channel).and_then(|c| self.channels.get(c)) {
            penalty *= decays.channel.powi(*count);
        }
        if let Some(count) = attr(&clip.platform).and_then(|p| self.platforms.get(p)) {
            penalty *= decays.platform.powi(*count);
        }
        penalty
    }

    fn record(&mut self, clip: &'a ClipCandidate) {
        for topic in &clip.topics {
            *self.topics.entry(topic.as_str()).or_insert(0) += 1;
        }
        if let Some(channel) = attr(&clip.channel) {
            *self.channels.entry(channel).or_insert(0) += 1;
        }
        if let Some(platform) = attr(&clip.platform) {
            *self.platforms.entry(platform).or_insert(0) += 1;
        }
    }
}

/// Absent and empty attributes never count as a repeat.
fn attr(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl DiversityReranker {
    pub fn new(config: &RankingConfig) -> Self {
        Self {
            topic_min_decay: config.topic_min_decay,
            channel_min_decay: config.channel_min_decay,
            platform_min_decay: config.platform_min_decay,
        }
    }

    fn decays(&self, mix: f64) -> Decays {
        Decays {
            topic: 1.0 - mix * (1.0 - self.topic_min_decay),
            channel: 1.0 - mix * (1.0 - self.channel_min_decay),
            platform: 1.0 - mix * (1.0 - self.platform_min_decay),
        }
    }

    /// Re-rank `clips` for diversity.
    ///
    /// `scores[i]` is the active score of `clips[i]`; a missing entry falls
    /// back to the rank-derived `n - i`. Non-positive scores are floored so
    /// penalties still discriminate. `mix` is clamped into [0, 1]; 0 and
    /// single-clip input return the list untouched.
    pub fn rerank(
        &self,
        clips: Vec<ClipCandidate>,
        scores: &[Option<f64>],
        mix: f64,
    ) -> Vec<ClipCandidate> {
        let mix = if mix.is_finite() { mix.clamp(0.0, 1.0) } else { 0.0 };
        if clips.len() <= 1 || mix == 0.0 {
            return clips;
        }

        let decays = self.decays(mix);
        let n = clips.len();
        let base: Vec<f64> = (0..n)
            .map(|i| {
                let score = scores
                    .get(i)
                    .copied()
                    .flatten()
                    .unwrap_or((n - i) as f64);
                if score > 0.0 {
                    score
                } else {
                    SCORE_FLOOR
                }
            })
            .collect();

        let order = Self::selection_order(&clips, &base, decays);

        let mut slots: Vec<Option<ClipCandidate>> = clips.into_iter().map(Some).collect();
        order
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect()
    }

    /// Greedy pick order as indices into `clips`. The first maximum wins.
    fn selection_order(clips: &[ClipCandidate], base: &[f64], decays: Decays) -> Vec<usize> {
        let mut remaining: Vec<usize> = (0..clips.len()).collect();
        let mut order = Vec::with_capacity(clips.len());
        let mut seen = SeenCounts::default();

        while !remaining.is_empty() {
            let mut best_pos = 0;
            let mut best_score = f64::NEG_INFINITY;
            for (pos, &idx) in remaining.iter().enumerate() {
                let candidate = base[idx] * seen.penalty(&clips[idx], decays);
                if candidate > best_score {
                    best_score = candidate;
                    best_pos = pos;
                }
            }
            let picked = remaining.remove(best_pos);
            seen.record(&clips[picked]);
            order.push(picked);
        }

        order
    }
}

/// Convenience wrapper with the default decay floors.
pub fn apply_diversity_penalty(
    clips: Vec<ClipCandidate>,
    scores: &[Option<f64>],
    diversity_mix: f64,
) -> Vec<ClipCandidate> {
    DiversityReranker::default().rerank(clips, scores, diversity_mix)
}
