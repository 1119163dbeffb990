//! Reciprocal Rank Fusion: `score(item) = Σ 1/(k + rank_i)`.
//!
//! Fuses rankings whose raw scores live on incomparable scales (unbounded
//! BM25 vs. bounded similarity) by using rank position only. Works over any
//! number of input rankings; an item absent from a ranking contributes
//! nothing for it.

use std::collections::HashMap;

use askdb_core::types::ChunkId;

/// Fuse ranked id lists (rank 1 = first element). Returns `(id, score)`
/// pairs sorted by fused score descending; equal scores order by ascending
/// chunk id so the output never depends on map iteration order.
pub fn reciprocal_rank_fusion(rankings: &[Vec<ChunkId>], k: u32) -> Vec<(ChunkId, f32)> {
    let mut scores: HashMap<ChunkId, f32> = HashMap::new();
    for ranking in rankings {
        for (index, id) in ranking.iter().enumerate() {
            let rank = index + 1;
            *scores.entry(*id).or_default() += 1.0 / (k as f32 + rank as f32);
        }
    }

    let mut fused: Vec<(ChunkId, f32)> = scores.into_iter().collect();
    fused.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_rankings_preserve_order_with_decreasing_scores() {
        let rankings = vec![vec![10, 20, 30], vec![10, 20, 30]];
        let fused = reciprocal_rank_fusion(&rankings, 60);

        let ids: Vec<ChunkId> = fused.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
        assert!(fused[0].1 > fused[1].1);
        assert!(fused[1].1 > fused[2].1);
    }

    #[test]
    fn double_presence_beats_single_presence_at_the_same_rank() {
        let both = reciprocal_rank_fusion(&[vec![1], vec![1]], 60);
        let once = reciprocal_rank_fusion(&[vec![1], vec![]], 60);
        assert!(both[0].1 > once[0].1);
    }

    #[test]
    fn ties_order_by_ascending_chunk_id() {
        // 7 and 3 each appear once at rank 1, so their scores tie exactly.
        let fused = reciprocal_rank_fusion(&[vec![7], vec![3]], 60);
        let ids: Vec<ChunkId> = fused.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![3, 7]);
    }

    #[test]
    fn fuses_more_than_two_rankings() {
        let fused = reciprocal_rank_fusion(&[vec![1, 2], vec![2, 1], vec![2, 3]], 60);
        assert_eq!(fused[0].0, 2, "2 is ranked well in all three lists");
        assert_eq!(fused.len(), 3);
    }

    #[test]
    fn empty_input_fuses_to_nothing() {
        assert!(reciprocal_rank_fusion(&[], 60).is_empty());
        assert!(reciprocal_rank_fusion(&[vec![], vec![]], 60).is_empty());
    }
}
