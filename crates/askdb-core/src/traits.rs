//! Collaborator interfaces the pipeline is built against. Concrete
//! implementations live in `askdb-embed`, `askdb-index` and `askdb-llm`;
//! everything is injected explicitly, nothing is process-global.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;
use crate::types::{ChunkId, DocumentId, DocumentInfo, StoredChunk};

/// Produces fixed-dimension embedding vectors. The dimension must stay
/// stable for the lifetime of any index built from this provider.
pub trait EmbeddingProvider: Send + Sync {
    fn dim(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Keyword index built over the tokenized corpus.
pub trait KeywordIndex: Send + Sync {
    /// Number of indexed positions.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One relevance score per indexed position, unbounded real, higher is
    /// more relevant. Query tokens must come from the same tokenization the
    /// index was built with.
    fn get_scores(&self, query_tokens: &[String]) -> Vec<f32>;
}

/// Nearest-neighbor index over chunk embeddings.
pub trait VectorIndex: Send + Sync {
    /// Number of indexed vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `k` nearest neighbors as `(position, distance)` pairs, distance
    /// ascending, `distance >= 0`. An empty index yields no pairs.
    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)>;
}

/// Read access to chunk rows and their owning documents.
pub trait ChunkStore: Send + Sync {
    fn get_by_ids(&self, ids: &[ChunkId]) -> Result<HashMap<ChunkId, StoredChunk>>;

    fn document(&self, id: DocumentId) -> Result<Option<DocumentInfo>>;
}

/// One hosted-model completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Budget for the whole call; exceeding it is a failure, not a retry.
    pub timeout: Duration,
}

/// A hosted language model. Implementations must report failure (including
/// timeout) through the error type so callers can apply their own recovery.
pub trait LanguageModel: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> Result<String>;
}
