//! askdb-retrieval
//!
//! The retrieval half of the pipeline: reciprocal rank fusion, the
//! lexical/vector/hybrid retriever, and MMR diversity selection.

pub mod fusion;
pub mod mmr;
pub mod retriever;

pub use fusion::reciprocal_rank_fusion;
pub use mmr::maximal_marginal_relevance;
pub use retriever::Retriever;
