//! Vector similarity and diversity-aware ranking.
//!
//! Pure-Rust implementations of:
//! - Cosine similarity
//! - Maximal marginal relevance (MMR) selection

/// Cosine similarity in [-1, 1]. Returns 0.0 for empty, mismatched, or zero
/// vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Indices of the `n` vectors most similar to `query`, best first.
pub fn top_n(query: &[f32], vectors: &[Vec<f32>], n: usize) -> Vec<usize> {
    let mut scored: Vec<(usize, f32)> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| (i, cosine_similarity(query, v)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(n);
    scored.into_iter().map(|(i, _)| i).collect()
}

/// Pick `k` of `candidates` by maximal marginal relevance.
///
/// Each step takes the candidate maximizing
/// `lambda * sim(query, c) - (1 - lambda) * max(sim(c, already_picked))`.
/// `lambda = 1.0` is plain similarity ranking; lower values favour variety.
/// Returns indices into `candidates` in selection order.
pub fn mmr_select(query: &[f32], candidates: &[Vec<f32>], k: usize, lambda: f32) -> Vec<usize> {
    let relevance: Vec<f32> = candidates.iter().map(|c| cosine_similarity(query, c)).collect();
    let mut picked: Vec<usize> = Vec::with_capacity(k.min(candidates.len()));
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();

    while picked.len() < k && !remaining.is_empty() {
        let (pos, _) = remaining
            .iter()
            .enumerate()
            .map(|(pos, &i)| {
                let redundancy = picked
                    .iter()
                    .map(|&j| cosine_similarity(&candidates[i], &candidates[j]))
                    .fold(f32::NEG_INFINITY, f32::max);
                let redundancy = if picked.is_empty() { 0.0 } else { redundancy };
                (pos, lambda * relevance[i] - (1.0 - lambda) * redundancy)
            })
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or((0, 0.0));
        picked.push(remaining.remove(pos));
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn cosine_known_value() {
        let sim = cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]);
        assert!((sim - 0.7071).abs() < 0.001);
    }

    #[test]
    fn top_n_orders_by_similarity() {
        let vectors = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.7, 0.7]];
        assert_eq!(top_n(&[1.0, 0.0], &vectors, 2), vec![1, 2]);
    }

    #[test]
    fn mmr_with_full_lambda_is_similarity_order() {
        let vectors = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.9, 0.1]];
        assert_eq!(mmr_select(&[1.0, 0.0], &vectors, 3, 1.0), vec![1, 2, 0]);
    }

    #[test]
    fn mmr_skips_near_duplicates() {
        let vectors = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.99, 0.01, 0.0],
            vec![0.6, 0.0, 0.8],
        ];
        let picked = mmr_select(&[1.0, 0.0, 0.1], &vectors, 2, 0.5);
        assert_eq!(picked[0], 0);
        assert_eq!(picked[1], 2);
    }

    #[test]
    fn mmr_k_larger_than_candidates() {
        let vectors = vec![vec![1.0, 0.0]];
        assert_eq!(mmr_select(&[1.0, 0.0], &vectors, 5, 0.5), vec![0]);
        assert!(mmr_select(&[1.0, 0.0], &[], 5, 0.5).is_empty());
    }
}
