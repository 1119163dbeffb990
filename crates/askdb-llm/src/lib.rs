//! askdb-llm
//!
//! The hosted-language-model boundary: an OpenAI-compatible chat client and
//! the two pipeline collaborators built on it, query expansion and answer
//! synthesis. Expansion failures are recoverable; synthesis failures are
//! not.

pub mod client;
pub mod expander;
pub mod synthesizer;

pub use client::ChatClient;
pub use expander::QueryExpander;
pub use synthesizer::AnswerSynthesizer;
