//! One immutable generation of the corpus index, plus the handle used to
//! swap generations in.
//!
//! Ingestion rebuilds the whole snapshot and swaps it; a request `load()`s
//! exactly one `Arc` up front and works against that generation for its
//! entire lifetime, so an in-flight rebuild can never produce a torn read.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::traits::{KeywordIndex, VectorIndex};
use crate::types::ChunkId;

pub struct IndexSnapshot {
    pub keyword: Box<dyn KeywordIndex>,
    pub vector: Box<dyn VectorIndex>,
    /// Position -> chunk id. Both indices address positions in this table.
    pub chunk_ids: Vec<ChunkId>,
    /// Embeddings computed at ingest, keyed by chunk id. Consulted before
    /// asking the provider to re-embed a candidate at query time.
    pub embeddings: HashMap<ChunkId, Vec<f32>>,
}

impl IndexSnapshot {
    pub fn chunk_id_at(&self, position: usize) -> Option<ChunkId> {
        self.chunk_ids.get(position).copied()
    }

    pub fn cached_embedding(&self, id: ChunkId) -> Option<&[f32]> {
        self.embeddings.get(&id).map(Vec::as_slice)
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunk_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunk_ids.is_empty()
    }
}

/// Swappable snapshot handle shared between ingestion and the engine.
pub struct SharedIndex {
    current: RwLock<Arc<IndexSnapshot>>,
}

impl SharedIndex {
    pub fn new(snapshot: IndexSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The current generation. Holding the returned `Arc` keeps that
    /// generation alive across any number of later swaps.
    pub fn load(&self) -> Arc<IndexSnapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Replace the current generation wholesale.
    pub fn swap(&self, snapshot: IndexSnapshot) {
        let next = Arc::new(snapshot);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}
