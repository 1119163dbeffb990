//! Domain types shared by the retrieval, validation and engine crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub type ChunkId = u64;
pub type DocumentId = u64;

/// A chunk row as the chunk store returns it.
///
/// - `text`: the chunk payload
/// - `document_id`: owning document
/// - `position`: 0-based order within the document
/// - `token_count`: size estimate recorded at chunking time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub text: String,
    pub document_id: DocumentId,
    pub position: usize,
    pub token_count: usize,
}

/// Document metadata attached to each source chunk in a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub name: String,
    pub doc_type: String,
}

/// One retrieval candidate.
///
/// `score` is method-scoped: BM25 scores are unbounded reals, vector scores
/// live in (0, 1], fused scores are reciprocal-rank sums. Scores are only
/// comparable within a single result list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredHit {
    pub id: ChunkId,
    pub score: f32,
}

/// How a single query variant is run against the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMethod {
    Lexical,
    Vector,
    Hybrid,
}

impl RetrievalMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            RetrievalMethod::Lexical => "lexical",
            RetrievalMethod::Vector => "vector",
            RetrievalMethod::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for RetrievalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetrievalMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lexical" => Ok(RetrievalMethod::Lexical),
            "vector" => Ok(RetrievalMethod::Vector),
            "hybrid" => Ok(RetrievalMethod::Hybrid),
            other => Err(Error::InvalidRequest(format!(
                "unknown retrieval method '{other}', expected lexical, vector or hybrid"
            ))),
        }
    }
}

/// The query reformulations used for one request. The first entry is always
/// the original query. Request-scoped, discarded after response assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryVariants {
    variants: Vec<String>,
}

impl QueryVariants {
    /// A variant set holding only the original query.
    pub fn original_only(original: impl Into<String>) -> Self {
        Self {
            variants: vec![original.into()],
        }
    }

    /// The degraded set used when expansion fails: the original repeated.
    pub fn fallback(original: &str) -> Self {
        Self {
            variants: vec![original.to_string(); 3],
        }
    }

    pub fn push(&mut self, variant: String) {
        self.variants.push(variant);
    }

    pub fn original(&self) -> &str {
        &self.variants[0]
    }

    pub fn as_slice(&self) -> &[String] {
        &self.variants
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.variants.iter()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}
