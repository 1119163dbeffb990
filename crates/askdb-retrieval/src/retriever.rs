//! Multi-method retrieval against one index snapshot.
//!
//! One `Retriever` serves one request generation: it borrows the snapshot
//! the engine loaded at request entry, so every variant of the request sees
//! the same corpus.

use askdb_core::error::Result;
use askdb_core::snapshot::IndexSnapshot;
use askdb_core::traits::{ChunkStore, EmbeddingProvider, KeywordIndex};
use askdb_core::types::{ChunkId, RetrievalMethod, ScoredHit};
use askdb_index::bm25::{tokenize, Bm25Index};

use crate::fusion::reciprocal_rank_fusion;

/// Hybrid retrieval pulls this many candidates per branch, capped so small
/// `k` values still see a reasonably wide fusion pool.
const MAX_BRANCH_BREADTH: usize = 20;

pub struct Retriever<'a> {
    snapshot: &'a IndexSnapshot,
    embedder: &'a dyn EmbeddingProvider,
    store: &'a dyn ChunkStore,
    rrf_k: u32,
}

impl<'a> Retriever<'a> {
    pub fn new(
        snapshot: &'a IndexSnapshot,
        embedder: &'a dyn EmbeddingProvider,
        store: &'a dyn ChunkStore,
        rrf_k: u32,
    ) -> Self {
        Self {
            snapshot,
            embedder,
            store,
            rrf_k,
        }
    }

    /// Up to `k` scored hits for one query string. Fewer (or none) when the
    /// index holds fewer entries; an empty index is not an error.
    pub fn retrieve(
        &self,
        query: &str,
        method: RetrievalMethod,
        k: usize,
        use_rerank: bool,
    ) -> Result<Vec<ScoredHit>> {
        let hits = match method {
            RetrievalMethod::Lexical => self.lexical(query, k)?,
            RetrievalMethod::Vector => self.vector(query, k)?,
            RetrievalMethod::Hybrid => self.hybrid(query, k, use_rerank)?,
        };
        tracing::debug!(%method, k, hits = hits.len(), "retrieved");
        Ok(hits)
    }

    /// BM25 over the whole corpus. Scores every position and cuts the top
    /// `k` (score descending, position ascending on ties), so a small
    /// corpus returns its zero-score tail rather than nothing.
    fn lexical(&self, query: &str, k: usize) -> Result<Vec<ScoredHit>> {
        if self.snapshot.keyword.is_empty() {
            return Ok(Vec::new());
        }

        let tokens = tokenize(query);
        let scores = self.snapshot.keyword.get_scores(&tokens);

        let mut ranked: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        ranked.truncate(k);

        Ok(ranked
            .into_iter()
            .filter_map(|(position, score)| {
                self.snapshot
                    .chunk_id_at(position)
                    .map(|id| ScoredHit { id, score })
            })
            .collect())
    }

    /// Nearest neighbors by embedding distance, converted to a similarity
    /// in (0, 1] via `1/(1 + distance)`.
    fn vector(&self, query: &str, k: usize) -> Result<Vec<ScoredHit>> {
        if self.snapshot.vector.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query)?;
        Ok(self
            .snapshot
            .vector
            .search(&query_embedding, k)
            .into_iter()
            .filter_map(|(position, distance)| {
                self.snapshot.chunk_id_at(position).map(|id| ScoredHit {
                    id,
                    score: 1.0 / (1.0 + distance),
                })
            })
            .collect())
    }

    /// Both branches at widened breadth, optional keyword rescoring of the
    /// vector branch, then rank fusion.
    fn hybrid(&self, query: &str, k: usize, use_rerank: bool) -> Result<Vec<ScoredHit>> {
        let breadth = (4 * k).min(MAX_BRANCH_BREADTH);

        let lexical_hits = self.lexical(query, breadth)?;
        let mut vector_hits = self.vector(query, breadth)?;

        if use_rerank && !vector_hits.is_empty() {
            vector_hits = self.rerank_with_keywords(query, vector_hits)?;
        }

        let rankings = [
            lexical_hits.iter().map(|h| h.id).collect::<Vec<ChunkId>>(),
            vector_hits.iter().map(|h| h.id).collect::<Vec<ChunkId>>(),
        ];
        let fused = reciprocal_rank_fusion(&rankings, self.rrf_k);

        Ok(fused
            .into_iter()
            .take(k)
            .map(|(id, score)| ScoredHit { id, score })
            .collect())
    }

    /// Rescore the vector branch with a keyword index scoped to exactly its
    /// candidates. Nearest-neighbor search can surface topically related
    /// but keyword-irrelevant passages; scoring the semantic candidate set
    /// lexically keeps its recall while restoring precision. The branch is
    /// re-sorted by the new scores; rank fusion only sees ranks, so an
    /// unsorted rescoring would change nothing.
    fn rerank_with_keywords(&self, query: &str, hits: Vec<ScoredHit>) -> Result<Vec<ScoredHit>> {
        let ids: Vec<ChunkId> = hits.iter().map(|h| h.id).collect();
        let chunks = self.store.get_by_ids(&ids)?;

        let mut kept_ids = Vec::with_capacity(ids.len());
        let mut scoped_corpus = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(chunk) = chunks.get(id) {
                kept_ids.push(*id);
                scoped_corpus.push(tokenize(&chunk.text));
            }
        }
        if kept_ids.is_empty() {
            return Ok(hits);
        }

        let scoped = Bm25Index::new(&scoped_corpus);
        let scores = scoped.get_scores(&tokenize(query));

        let mut rescored: Vec<ScoredHit> = kept_ids
            .into_iter()
            .zip(scores)
            .map(|(id, score)| ScoredHit { id, score })
            .collect();
        rescored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        tracing::debug!(candidates = rescored.len(), "reranked vector branch");
        Ok(rescored)
    }
}
