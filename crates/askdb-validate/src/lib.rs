//! askdb-validate
//!
//! Answer-quality signals: cross-variant retrieval consistency (entropy)
//! and lexical grounding of a generated answer in its source text.

pub mod entropy;
pub mod grounding;

pub use entropy::{ConfidenceValidator, ValidationReport};
pub use grounding::{check_grounding, GroundingConfidence, GroundingReport};
