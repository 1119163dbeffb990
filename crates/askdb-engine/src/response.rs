//! The assembled query response.

use askdb_core::types::ChunkId;
use askdb_validate::{GroundingReport, ValidationReport};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceChunk {
    pub chunk_id: ChunkId,
    pub text: String,
    /// The chunk's best pre-selection score across variants.
    pub score: f32,
    pub doc_name: String,
    pub doc_type: String,
    pub position: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSection {
    pub entropy_analysis: ValidationReport,
    pub grounding_check: GroundingReport,
    pub overall_confidence: f64,
}

/// Stage counters for observability: how many candidates survived each
/// narrowing step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalStats {
    pub method: String,
    pub total_retrieved: usize,
    pub after_dedup: usize,
    pub after_rerank: usize,
    pub after_mmr: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceChunk>,
    pub variants: Vec<String>,
    pub validation: ValidationSection,
    pub retrieval_stats: RetrievalStats,
}
