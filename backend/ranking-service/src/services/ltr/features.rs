use crate::models::{ClipCandidate, LtrUserStats};

/// Column order of the feature vector the model was trained on.
pub const LTR_FEATURE_NAMES: [&str; 13] = [
    "content_score",
    "duration_seconds",
    "topic_count",
    "transcript_length",
    "age_hours",
    "file_size_bytes",
    "topic_overlap",
    "channel_affinity",
    "user_total_views",
    "user_avg_watch_percentage",
    "user_like_rate",
    "user_save_rate",
    "hours_since_last_session",
];

/// Build one clip's feature row, `feature_count` wide.
///
/// Columns past the known layout stay 0; a narrower model simply never sees
/// the trailing features.
pub fn build_features(
    clip: &ClipCandidate,
    stats: &LtrUserStats,
    feature_count: usize,
) -> Vec<f64> {
    let mut features = vec![0.0; feature_count];
    let mut set = |idx: usize, value: f64| {
        if let Some(slot) = features.get_mut(idx) {
            *slot = value;
        }
    };

    let topic_overlap = clip
        .topic_ids
        .iter()
        .filter(|id| stats.topic_affinities.contains(id.as_str()))
        .count();
    let channel_affinity = clip
        .source_id
        .as_deref()
        .and_then(|source| stats.channel_affinity.get(source))
        .copied()
        .unwrap_or(0.0);

    set(0, clip.content_score);
    set(1, clip.duration_seconds);
    set(2, clip.topic_ids.len() as f64);
    set(3, clip.transcript_length);
    set(4, clip.age_hours);
    set(5, clip.file_size_bytes);
    set(6, topic_overlap as f64);
    set(7, channel_affinity);
    set(8, stats.total_views);
    set(9, stats.avg_watch_percentage);
    set(10, stats.like_rate);
    set(11, stats.save_rate);
    set(12, stats.hours_since_last_session);

    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn clip() -> ClipCandidate {
        ClipCandidate {
            id: "c1".to_string(),
            content_score: 0.7,
            topic_ids: vec!["t1".to_string(), "t2".to_string(), "t3".to_string()],
            source_id: Some("src-9".to_string()),
            age_hours: 12.0,
            duration_seconds: 45.0,
            transcript_length: 800.0,
            file_size_bytes: 2_000_000.0,
            ..Default::default()
        }
    }

    fn stats() -> LtrUserStats {
        LtrUserStats {
            total_views: 120.0,
            avg_watch_percentage: 0.64,
            like_rate: 0.1,
            save_rate: 0.02,
            hours_since_last_session: 5.0,
            channel_affinity: HashMap::from([("src-9".to_string(), 0.4)]),
            topic_affinities: HashSet::from(["t1".to_string(), "t3".to_string(), "t8".to_string()]),
        }
    }

    #[test]
    fn test_full_layout() {
        let features = build_features(&clip(), &stats(), LTR_FEATURE_NAMES.len());
        assert_eq!(
            features,
            vec![0.7, 45.0, 3.0, 800.0, 12.0, 2_000_000.0, 2.0, 0.4, 120.0, 0.64, 0.1, 0.02, 5.0]
        );
    }

    #[test]
    fn test_wider_model_pads_with_zero() {
        let features = build_features(&clip(), &stats(), 15);
        assert_eq!(features.len(), 15);
        assert_eq!(&features[13..], &[0.0, 0.0]);
    }

    #[test]
    fn test_narrower_model_truncates() {
        let features = build_features(&clip(), &stats(), 2);
        assert_eq!(features, vec![0.7, 45.0]);
    }

    #[test]
    fn test_anonymous_viewer_defaults() {
        let mut anonymous_clip = clip();
        anonymous_clip.source_id = None;
        let features = build_features(&anonymous_clip, &LtrUserStats::default(), 13);
        assert_eq!(features[6], 0.0);
        assert_eq!(features[7], 0.0);
        assert_eq!(features[12], 168.0);
    }
}
