//! Answer synthesis.
//!
//! Builds the index-labeled context block from the selected chunks and asks
//! the model for a factual answer. Unlike expansion, a failure here aborts
//! the whole request: there is no answer to return without one.

use std::sync::Arc;
use std::time::Duration;

use askdb_core::config::LlmSettings;
use askdb_core::error::{Error, Result};
use askdb_core::traits::{CompletionRequest, LanguageModel};

const SYNTHESIS_SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based \
    on provided context. Be concise and factual. Only use information from the provided context. \
    If the context doesn't contain enough information to answer the question, say so.";

const EMPTY_ANSWER_FALLBACK: &str = "I couldn't generate an answer from the provided context.";

pub struct AnswerSynthesizer {
    llm: Arc<dyn LanguageModel>,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn LanguageModel>, settings: &LlmSettings) -> Self {
        Self {
            llm,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            timeout: settings.synthesis_timeout(),
        }
    }

    /// Generate an answer from the selected chunk texts. Provider failure
    /// or timeout is terminal; an empty completion maps to a fixed
    /// could-not-answer sentence.
    pub fn synthesize(&self, question: &str, chunk_texts: &[String]) -> Result<String> {
        let context = chunk_texts
            .iter()
            .enumerate()
            .map(|(i, text)| format!("[{}] {}", i + 1, text))
            .collect::<Vec<String>>()
            .join("\n\n");
        let user_prompt = format!("Context:\n{context}\n\nQuestion: {question}");

        let request = CompletionRequest {
            system_prompt: SYNTHESIS_SYSTEM_PROMPT.to_string(),
            user_prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: self.timeout,
        };

        let answer = self
            .llm
            .complete(&request)
            .map_err(|e| Error::Synthesis(e.to_string()))?;
        if answer.is_empty() {
            return Ok(EMPTY_ANSWER_FALLBACK.to_string());
        }
        Ok(answer)
    }
}
