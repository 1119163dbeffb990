//! Query expansion.
//!
//! Different phrasings of the same question retrieve different chunks; the
//! expander asks the model for two alternative phrasings and always hands
//! back a set of exactly three variants, original first. Every failure mode
//! degrades; a request never dies here.

use std::sync::Arc;
use std::time::Duration;

use askdb_core::config::LlmSettings;
use askdb_core::traits::{CompletionRequest, LanguageModel};
use askdb_core::types::QueryVariants;

const EXPANSION_SYSTEM_PROMPT: &str = "You are a helpful assistant that generates alternative \
    phrasings of questions. Generate exactly 2 alternative ways to ask the given question. Keep \
    them concise and focused. Output only the alternatives, one per line, without numbering or \
    labels.";

const VARIANT_COUNT: usize = 3;
/// Parsed lines at or below this length are treated as parser noise.
const MIN_VARIANT_CHARS: usize = 10;

pub struct QueryExpander {
    llm: Arc<dyn LanguageModel>,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl QueryExpander {
    pub fn new(llm: Arc<dyn LanguageModel>, settings: &LlmSettings) -> Self {
        Self {
            llm,
            temperature: settings.expansion_temperature,
            max_tokens: settings.expansion_max_tokens,
            timeout: settings.expansion_timeout(),
        }
    }

    /// Exactly three variants, original first. Model failure or timeout
    /// yields the original repeated three times.
    pub fn expand(&self, original: &str) -> QueryVariants {
        let request = CompletionRequest {
            system_prompt: EXPANSION_SYSTEM_PROMPT.to_string(),
            user_prompt: format!("Generate 2 alternative phrasings for: {original}"),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: self.timeout,
        };

        match self.llm.complete(&request) {
            Ok(generated) => parse_variants(original, &generated),
            Err(e) => {
                tracing::warn!(error = %e, "query expansion failed, using fallback variants");
                QueryVariants::fallback(original)
            }
        }
    }
}

fn parse_variants(original: &str, generated: &str) -> QueryVariants {
    let mut variants = QueryVariants::original_only(original);

    for line in generated
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(VARIANT_COUNT - 1)
    {
        let clean = line
            .replace("Alternative 1:", "")
            .replace("Alternative 2:", "");
        let clean = clean
            .trim()
            .trim_start_matches(['1', '2', '.', '-', ')', ' '])
            .trim();
        if clean.chars().count() > MIN_VARIANT_CHARS {
            variants.push(clean.to_string());
        }
    }

    // Pad with simple reformulations when the model's output was unusable.
    if variants.len() < VARIANT_COUNT {
        variants.push(format!("Explain {}", original.to_lowercase()));
    }
    if variants.len() < VARIANT_COUNT {
        variants.push(format!("What is {}?", original.to_lowercase()));
    }

    variants
}
