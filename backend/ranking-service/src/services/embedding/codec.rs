/// Fixed-width little-endian float32 blob codec, the storage format of clip
/// and user embeddings.
const F32_WIDTH: usize = 4;

/// Decode a raw blob. Empty input or a length that is not a multiple of 4
/// yields `None`, never a truncated vector.
pub fn blob_to_f32(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.is_empty() || blob.len() % F32_WIDTH != 0 {
        return None;
    }
    Some(
        blob.chunks_exact(F32_WIDTH)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}

pub fn f32_to_blob(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}
