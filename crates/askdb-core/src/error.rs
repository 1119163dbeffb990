use thiserror::Error;

/// Failure kinds the pipeline distinguishes. Expansion failures never show
/// up here (the expander degrades to a fallback variant set); synthesis
/// failures abort the whole request.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Embedding provider failed: {0}")]
    Embedding(String),

    #[error("Language model call failed: {0}")]
    Completion(String),

    #[error("Answer synthesis failed: {0}")]
    Synthesis(String),

    #[error("Chunk store lookup failed: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, Error>;
