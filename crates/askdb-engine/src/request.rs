//! The query request surface.

use askdb_core::error::{Error, Result};
use askdb_core::types::RetrievalMethod;
use serde::{Deserialize, Serialize};

pub const MAX_TOP_K: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default = "default_method")]
    pub method: RetrievalMethod,
    #[serde(default = "default_use_rerank")]
    pub use_rerank: bool,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_method() -> RetrievalMethod {
    RetrievalMethod::Hybrid
}

fn default_use_rerank() -> bool {
    true
}

fn default_top_k() -> usize {
    5
}

impl QueryRequest {
    /// Checked before any index or provider call is issued.
    pub fn validate(&self) -> Result<()> {
        if self.query.is_empty() {
            return Err(Error::InvalidRequest("query must not be empty".to_string()));
        }
        if self.top_k < 1 || self.top_k > MAX_TOP_K {
            return Err(Error::InvalidRequest(format!(
                "top_k must be between 1 and {MAX_TOP_K}, got {}",
                self.top_k
            )));
        }
        Ok(())
    }
}
