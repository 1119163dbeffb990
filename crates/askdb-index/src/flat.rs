//! Brute-force nearest-neighbor index under squared L2 distance.
//!
//! Exact rather than approximate: the corpus sizes this serves do not
//! justify an ANN structure, and exact distances keep the
//! distance-to-similarity conversion downstream reproducible.

use askdb_core::traits::VectorIndex;
use askdb_core::vecmath::squared_l2;

pub struct FlatIndex {
    dim: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: Vec::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Append vectors and return their assigned positions. Vectors of the
    /// wrong dimension are skipped with a warning rather than poisoning the
    /// index.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>) -> Vec<usize> {
        let mut positions = Vec::with_capacity(vectors.len());
        for vector in vectors {
            if vector.len() != self.dim {
                tracing::warn!(
                    expected = self.dim,
                    got = vector.len(),
                    "skipping vector with wrong dimension"
                );
                continue;
            }
            positions.push(self.vectors.len());
            self.vectors.push(vector);
        }
        positions
    }
}

impl VectorIndex for FlatIndex {
    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut hits: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| (position, squared_l2(query, vector)))
            .collect();
        hits.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        hits.truncate(k);
        hits
    }
}
