//! In-memory chunk and document store.

use std::collections::HashMap;

use askdb_core::error::Result;
use askdb_core::traits::ChunkStore;
use askdb_core::types::{ChunkId, DocumentId, DocumentInfo, StoredChunk};

#[derive(Default)]
pub struct MemoryStore {
    chunks: HashMap<ChunkId, StoredChunk>,
    documents: HashMap<DocumentId, DocumentInfo>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_document(&mut self, id: DocumentId, info: DocumentInfo) {
        self.documents.insert(id, info);
    }

    pub fn insert_chunk(&mut self, id: ChunkId, chunk: StoredChunk) {
        self.chunks.insert(id, chunk);
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

impl ChunkStore for MemoryStore {
    fn get_by_ids(&self, ids: &[ChunkId]) -> Result<HashMap<ChunkId, StoredChunk>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.chunks.get(id).map(|c| (*id, c.clone())))
            .collect())
    }

    fn document(&self, id: DocumentId) -> Result<Option<DocumentInfo>> {
        Ok(self.documents.get(&id).cloned())
    }
}
