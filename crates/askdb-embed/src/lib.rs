//! askdb-embed
//!
//! Deterministic hashed bag-of-words embeddings. This is the offline
//! default and the provider every test runs against: no model download, no
//! network, and the same text always maps to the same vector, which is what
//! makes the pipeline's numeric contracts reproducible.

use std::hash::{Hash, Hasher};

use askdb_core::error::Result;
use askdb_core::traits::EmbeddingProvider;
use twox_hash::XxHash64;

/// Token-hashed bag-of-words embedder.
///
/// Each whitespace token is hashed into one of `dim` buckets (xxHash64) and
/// contributes a magnitude derived from the hash's upper bits plus a small
/// position-dependent term, then the vector is L2 normalized. Texts sharing
/// vocabulary land near each other, which is all the retrieval and
/// validation math requires of a provider.
pub struct HashedEmbedder {
    dim: usize,
}

impl HashedEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl EmbeddingProvider for HashedEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.to_lowercase().split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askdb_core::vecmath::cosine_similarity;

    #[test]
    fn embedding_is_deterministic() {
        let embedder = HashedEmbedder::new(64);
        let a = embedder.embed("gradient descent").unwrap();
        let b = embedder.embed("gradient descent").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn embedding_has_the_requested_dimension_and_unit_norm() {
        let embedder = HashedEmbedder::new(128);
        let v = embedder.embed("backpropagation computes gradients").unwrap();
        assert_eq!(v.len(), 128);
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn shared_vocabulary_scores_higher_than_disjoint() {
        let embedder = HashedEmbedder::new(256);
        let query = embedder.embed("neural network training").unwrap();
        let near = embedder.embed("training a neural network").unwrap();
        let far = embedder.embed("sourdough starter hydration").unwrap();
        assert!(cosine_similarity(&query, &near) > cosine_similarity(&query, &far));
    }

    #[test]
    fn batch_matches_single_calls() {
        let embedder = HashedEmbedder::new(64);
        let texts = vec!["one fish".to_string(), "two fish".to_string()];
        let batch = embedder.embed_batch(&texts).unwrap();
        assert_eq!(batch[0], embedder.embed("one fish").unwrap());
        assert_eq!(batch[1], embedder.embed("two fish").unwrap());
    }

    #[test]
    fn empty_text_embeds_to_a_finite_vector() {
        let embedder = HashedEmbedder::new(32);
        let v = embedder.embed("").unwrap();
        assert!(v.iter().all(|x| x.is_finite()));
    }
}
