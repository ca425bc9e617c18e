use super::store::ScoreStore;
use crate::error::Result;
use crate::services::embedding::{blob_to_f32, f32_to_blob};
use tracing::{debug, info};

/// Mean of the decodable blobs, L2-normalized.
///
/// The first decodable blob fixes the dimension; blobs of another length
/// are skipped. Returns the profile and the number of vectors averaged.
pub fn average_embedding(blobs: &[Vec<u8>]) -> Option<(Vec<f32>, usize)> {
    let mut sum: Vec<f64> = Vec::new();
    let mut used = 0usize;

    for vector in blobs.iter().filter_map(|b| blob_to_f32(b)) {
        if used == 0 {
            sum = vec![0.0; vector.len()];
        } else if vector.len() != sum.len() {
            continue;
        }
        for (acc, v) in sum.iter_mut().zip(&vector) {
            *acc += *v as f64;
        }
        used += 1;
    }

    if used == 0 {
        return None;
    }

    let mean: Vec<f64> = sum.iter().map(|v| v / used as f64).collect();
    let norm = mean.iter().map(|v| v * v).sum::<f64>().sqrt();
    let profile = if norm > 0.0 {
        mean.iter().map(|v| (v / norm) as f32).collect()
    } else {
        mean.iter().map(|v| *v as f32).collect()
    };
    Some((profile, used))
}

/// Rebuild the profile embedding of every engaged user. Returns the number
/// of profiles written.
pub async fn update_user_embeddings(store: &dyn ScoreStore) -> Result<usize> {
    let users = store.engaged_users().await?;
    let mut updated = 0usize;

    for user_id in &users {
        let blobs = store.positive_clip_embeddings(user_id).await?;
        let Some((profile, used)) = average_embedding(&blobs) else {
            debug!(user_id = %user_id, "No usable clip embeddings");
            continue;
        };
        store
            .upsert_user_embedding(user_id, &f32_to_blob(&profile), used as i64)
            .await?;
        updated += 1;
    }

    info!(users = users.len(), updated, "Updated user embeddings");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::store::MemoryScoreStore;
    use std::collections::HashMap;

    #[test]
    fn test_average_is_normalized() {
        let blobs = vec![f32_to_blob(&[3.0, 0.0]), f32_to_blob(&[0.0, 3.0])];
        let (profile, used) = average_embedding(&blobs).unwrap();
        assert_eq!(used, 2);
        let expected = std::f32::consts::FRAC_1_SQRT_2;
        assert!((profile[0] - expected).abs() < 1e-6);
        assert!((profile[1] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_skips_bad_blobs_and_mismatched_lengths() {
        let blobs = vec![
            vec![1, 2, 3],
            f32_to_blob(&[2.0, 0.0]),
            f32_to_blob(&[0.0, 1.0, 5.0]),
            Vec::new(),
        ];
        let (profile, used) = average_embedding(&blobs).unwrap();
        assert_eq!(used, 1);
        assert_eq!(profile, vec![1.0, 0.0]);
    }

    #[test]
    fn test_nothing_decodable() {
        assert_eq!(average_embedding(&[vec![0u8; 5]]), None);
        assert_eq!(average_embedding(&[]), None);
    }

    #[test]
    fn test_zero_mean_stays_zero() {
        let blobs = vec![f32_to_blob(&[1.0, -1.0]), f32_to_blob(&[-1.0, 1.0])];
        let (profile, _) = average_embedding(&blobs).unwrap();
        assert_eq!(profile, vec![0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_update_writes_profiles() {
        let store = MemoryScoreStore {
            user_embeddings: HashMap::from([
                ("u1".to_string(), vec![f32_to_blob(&[0.0, 4.0])]),
                ("u2".to_string(), vec![vec![9u8; 3]]),
            ]),
            ..Default::default()
        };

        assert_eq!(update_user_embeddings(&store).await.unwrap(), 1);
        let (blob, count) = store.user_embedding("u1").await.unwrap();
        assert_eq!(blob_to_f32(&blob), Some(vec![0.0, 1.0]));
        assert_eq!(count, 1);
        assert!(store.user_embedding("u2").await.is_none());
    }
}
