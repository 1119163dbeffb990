//! Configuration loading.
//!
//! Figment merges the built-in defaults, `config.toml`, an optional
//! `config.<env>.toml` selected by `RUST_ENV`, and `ASKDB_*` environment
//! variables (double underscore separates sections, e.g.
//! `ASKDB_RETRIEVAL__RRF_K=20`). Every tuning constant of the pipeline is a
//! named field here so none of them hides in code.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub retrieval: RetrievalSettings,
    pub validation: ValidationSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub ingest: IngestSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Results returned when a request does not say otherwise.
    pub top_k_default: usize,
    /// Reciprocal rank fusion smoothing constant.
    pub rrf_k: u32,
    /// MMR relevance/diversity trade-off; 1.0 is pure relevance.
    pub mmr_lambda: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k_default: 5,
            rrf_k: 60,
            mmr_lambda: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Normalized retrieval entropy below this counts as consistent.
    pub entropy_threshold: f64,
    /// Consensus similarity above this counts as semantically coherent.
    pub consistency_threshold: f64,
    /// Consistency reported when fewer than two consensus chunks exist.
    pub consensus_fallback: f64,
    /// Consistency reported when consensus chunks exist but fewer than two
    /// of them have resolvable embeddings.
    pub neutral_consistency: f64,
    /// Token-overlap ratio at or above which an answer counts as grounded.
    pub grounding_threshold: f64,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            entropy_threshold: 0.3,
            consistency_threshold: 0.6,
            consensus_fallback: 0.3,
            neutral_consistency: 0.5,
            grounding_threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// OpenAI-compatible chat-completions endpoint.
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    /// Synthesis sampling temperature; low keeps answers factual.
    pub temperature: f32,
    pub max_tokens: u32,
    pub expansion_temperature: f32,
    pub expansion_max_tokens: u32,
    /// Expansion failures are recoverable, so this budget is short.
    pub expansion_timeout_secs: u64,
    /// Synthesis failures abort the request, so this budget is longer.
    pub synthesis_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.1,
            max_tokens: 500,
            expansion_temperature: 0.3,
            expansion_max_tokens: 100,
            expansion_timeout_secs: 30,
            synthesis_timeout_secs: 60,
        }
    }
}

impl LlmSettings {
    pub fn expansion_timeout(&self) -> Duration {
        Duration::from_secs(self.expansion_timeout_secs)
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Vector dimension; fixed for the lifetime of an index.
    pub dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { dim: 384 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Target chunk size in (estimated) tokens.
    pub chunk_size: usize,
    /// Tokens shared between consecutive chunks.
    pub chunk_overlap: usize,
    pub data_dir: String,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 50,
            data_dir: "data".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("ASKDB_").split("__"));

        figment.extract().map_err(|e| Error::Config(e.to_string()))
    }
}
