//! Assembles one immutable snapshot from chunk texts and their embeddings.
//!
//! Ingestion is rebuild-and-swap: a new builder consumes the whole corpus,
//! produces a fresh `IndexSnapshot`, and the caller swaps it into the
//! `SharedIndex`. Positions in the keyword and vector indices both map
//! through the same `chunk_ids` table.

use std::collections::HashMap;

use askdb_core::snapshot::IndexSnapshot;
use askdb_core::types::ChunkId;

use crate::bm25::{tokenize, Bm25Index};
use crate::flat::FlatIndex;

pub struct SnapshotBuilder {
    dim: usize,
    chunk_ids: Vec<ChunkId>,
    corpus_tokens: Vec<Vec<String>>,
    vectors: Vec<Vec<f32>>,
}

impl SnapshotBuilder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            chunk_ids: Vec::new(),
            corpus_tokens: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// A snapshot with nothing in it; retrieval over it degrades to empty
    /// candidate lists.
    pub fn empty(dim: usize) -> IndexSnapshot {
        Self::new(dim).build()
    }

    pub fn push(&mut self, id: ChunkId, text: &str, embedding: Vec<f32>) {
        self.chunk_ids.push(id);
        self.corpus_tokens.push(tokenize(text));
        self.vectors.push(embedding);
    }

    pub fn len(&self) -> usize {
        self.chunk_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunk_ids.is_empty()
    }

    pub fn build(self) -> IndexSnapshot {
        let keyword = Bm25Index::new(&self.corpus_tokens);

        let embeddings: HashMap<ChunkId, Vec<f32>> = self
            .chunk_ids
            .iter()
            .copied()
            .zip(self.vectors.iter().cloned())
            .collect();

        let mut vector = FlatIndex::new(self.dim);
        vector.add(self.vectors);

        tracing::info!(chunks = self.chunk_ids.len(), "built index snapshot");
        IndexSnapshot {
            keyword: Box::new(keyword),
            vector: Box::new(vector),
            chunk_ids: self.chunk_ids,
            embeddings,
        }
    }
}
