//! Maximal marginal relevance.
//!
//! Iteratively picks the candidate maximizing
//! `λ·relevance − (1−λ)·max_similarity_to_selected`, so the result stays
//! relevant to the query without repeating what is already selected. λ = 1
//! degenerates to pure relevance ranking, λ = 0 to pure diversity after the
//! seed.

use askdb_core::types::ChunkId;
use askdb_core::vecmath::cosine_similarity;

/// Select up to `top_k` diverse candidate ids.
///
/// `candidate_embeddings[i]` belongs to `candidate_ids[i]`. When there are
/// no more candidates than `top_k`, the input ids are returned unchanged
/// (a pass-through, not an MMR-ranked output). Ties pick the first
/// candidate in iteration order (the caller's input order).
pub fn maximal_marginal_relevance(
    query_embedding: &[f32],
    candidate_embeddings: &[Vec<f32>],
    candidate_ids: &[ChunkId],
    lambda: f32,
    top_k: usize,
) -> Vec<ChunkId> {
    if candidate_ids.len() <= top_k {
        return candidate_ids.to_vec();
    }

    let relevance: Vec<f32> = candidate_embeddings
        .iter()
        .map(|embedding| cosine_similarity(query_embedding, embedding))
        .collect();

    // Seed with the most relevant candidate; first maximum wins.
    let mut seed = 0;
    for (index, score) in relevance.iter().enumerate() {
        if *score > relevance[seed] {
            seed = index;
        }
    }

    let mut selected = vec![seed];
    let mut remaining: Vec<usize> = (0..candidate_ids.len()).filter(|i| *i != seed).collect();

    while selected.len() < top_k && !remaining.is_empty() {
        let mut best_slot = 0;
        let mut best_score = f32::NEG_INFINITY;
        for (slot, &index) in remaining.iter().enumerate() {
            // Redundancy is measured against the current selected set,
            // including the member picked in the previous iteration.
            let max_similarity = selected
                .iter()
                .map(|&s| cosine_similarity(&candidate_embeddings[index], &candidate_embeddings[s]))
                .fold(f32::NEG_INFINITY, f32::max);
            let marginal = lambda * relevance[index] - (1.0 - lambda) * max_similarity;
            if marginal > best_score {
                best_score = marginal;
                best_slot = slot;
            }
        }
        selected.push(remaining.remove(best_slot));
    }

    selected.into_iter().map(|i| candidate_ids[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(dim: usize, index: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[index] = 1.0;
        v
    }

    #[test]
    fn pass_through_keeps_input_order_when_not_enough_candidates() {
        let ids = vec![3, 1, 2];
        let embeddings = vec![axis(4, 0), axis(4, 1), axis(4, 2)];
        let picked = maximal_marginal_relevance(&axis(4, 0), &embeddings, &ids, 0.7, 3);
        assert_eq!(picked, ids);
    }

    #[test]
    fn lambda_one_reproduces_descending_relevance_order() {
        let query = vec![1.0, 0.0, 0.0];
        let embeddings = vec![
            vec![0.2, 0.98, 0.0], // low relevance
            vec![1.0, 0.0, 0.0],  // highest
            vec![0.7, 0.71, 0.0], // middle
            vec![0.0, 1.0, 0.0],  // none
        ];
        let ids = vec![10, 20, 30, 40];
        let picked = maximal_marginal_relevance(&query, &embeddings, &ids, 1.0, 3);
        assert_eq!(picked, vec![20, 30, 10]);
    }

    #[test]
    fn output_is_bounded_and_duplicate_free() {
        let query = axis(8, 0);
        let embeddings: Vec<Vec<f32>> = (0..8).map(|i| axis(8, i)).collect();
        let ids: Vec<ChunkId> = (0..8).collect();
        let picked = maximal_marginal_relevance(&query, &embeddings, &ids, 0.7, 4);

        assert_eq!(picked.len(), 4);
        let mut deduped = picked.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), picked.len());
    }

    #[test]
    fn diversity_avoids_near_duplicates_of_the_seed() {
        let query = vec![1.0, 0.0];
        let embeddings = vec![
            vec![0.95, 0.31], // seed: most relevant
            vec![0.94, 0.34], // near-duplicate of the seed
            vec![0.8, -0.6],  // different direction, still relevant
        ];
        let ids = vec![1, 2, 3];
        let picked = maximal_marginal_relevance(&query, &embeddings, &ids, 0.5, 2);
        assert_eq!(picked, vec![1, 3], "the near-duplicate loses to diversity");
    }
}
