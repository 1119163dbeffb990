//! Lexical grounding check.
//!
//! Decides whether a generated answer is actually supported by the chunks
//! it was generated from, using token-set overlap. Deliberately simple: the
//! answer's content words either appear in the source text or they were
//! made up.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// The reporting buckets are fixed and independent of the grounded/not
/// threshold, so an answer can read "medium" while still failing the
/// grounding bar (e.g. overlap 0.65 with the default 0.7 threshold). That
/// asymmetry is intentional.
const HIGH_OVERLAP: f64 = 0.8;
const MEDIUM_OVERLAP: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroundingConfidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundingReport {
    pub is_grounded: bool,
    pub overlap_ratio: f64,
    pub confidence: GroundingConfidence,
}

/// Token-set overlap of the answer against the concatenated source chunks.
/// An answer with no content tokens is ungrounded by definition.
pub fn check_grounding(answer: &str, source_chunks: &[String], threshold: f64) -> GroundingReport {
    let answer_tokens = content_tokens(answer);
    if answer_tokens.is_empty() {
        return GroundingReport {
            is_grounded: false,
            overlap_ratio: 0.0,
            confidence: GroundingConfidence::Low,
        };
    }

    let source_tokens = content_tokens(&source_chunks.join(" "));
    let overlapping = answer_tokens.intersection(&source_tokens).count();
    let overlap_ratio = overlapping as f64 / answer_tokens.len() as f64;

    let confidence = if overlap_ratio >= HIGH_OVERLAP {
        GroundingConfidence::High
    } else if overlap_ratio >= MEDIUM_OVERLAP {
        GroundingConfidence::Medium
    } else {
        GroundingConfidence::Low
    };

    GroundingReport {
        is_grounded: overlap_ratio >= threshold,
        overlap_ratio,
        confidence,
    }
}

/// Lower-case, split on whitespace, strip surrounding punctuation, keep
/// alphanumeric tokens of length >= 3. Set semantics: repeats don't count.
fn content_tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() >= 3 && w.chars().all(char::is_alphanumeric))
        .map(str::to_string)
        .collect()
}
