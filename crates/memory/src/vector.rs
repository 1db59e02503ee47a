//! Vector similarity and top-K ranking.

use archie_core::memory::MemoryRecord;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 for empty or mismatched inputs, when either norm is zero, and
/// when a component is not finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b).fold((0.0f64, 0.0f64, 0.0f64), |acc, (x, y)| {
        let (x, y) = (f64::from(*x), f64::from(*y));
        (acc.0 + x * y, acc.1 + x * x, acc.2 + y * y)
    });

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }
    let similarity = dot / denom;
    if similarity.is_finite() { similarity as f32 } else { 0.0 }
}

/// The `top_k` records most similar to `query`, best first.
///
/// Records whose dimension differs from the query are skipped. Ties keep
/// insertion order. Returns `min(top_k, eligible)` results.
pub fn rank_by_similarity<'a>(
    records: &'a [MemoryRecord],
    query: &[f32],
    top_k: usize,
) -> Vec<(f32, &'a MemoryRecord)> {
    if top_k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(f32, &MemoryRecord)> = records
        .iter()
        .filter(|r| r.dimension() == query.len())
        .map(|r| (cosine_similarity(&r.embedding, query), r))
        .collect();

    // sort_by is stable, so equal scores stay in insertion order
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(top_k);
    scored
}
