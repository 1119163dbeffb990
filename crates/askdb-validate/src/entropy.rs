//! Entropy-based retrieval validation.
//!
//! A robust answer should converge when the question is approached from
//! multiple reformulations. The validator pools every variant's retrieved
//! ids (with repetition), measures the Shannon entropy of the frequency
//! distribution, and checks whether the chunks the variants agree on are
//! semantically coherent. Low entropy means the variants converge on few
//! chunks; high entropy means they disagree and the answer rests on weak
//! ground.

use std::collections::{HashMap, HashSet};

use askdb_core::config::ValidationSettings;
use askdb_core::types::{ChunkId, QueryVariants};
use askdb_core::vecmath::cosine_similarity;
use serde::{Deserialize, Serialize};

/// Pairwise-similarity work is capped at this many consensus chunks.
const MAX_CONSENSUS_CHUNKS: usize = 5;

/// Weighting of the two signals in the overall confidence score.
const ENTROPY_WEIGHT: f64 = 0.6;
const CONSISTENCY_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_confident: bool,
    pub confidence_score: f64,
    /// Normalized to [0, 1]; 0 means every variant retrieved the same
    /// single chunk, 1 means the frequency distribution is uniform.
    pub retrieval_entropy: f64,
    pub semantic_consistency: f64,
    pub interpretation: String,
}

pub struct ConfidenceValidator {
    config: ValidationSettings,
}

impl ConfidenceValidator {
    pub fn new(config: ValidationSettings) -> Self {
        Self { config }
    }

    /// Score cross-variant agreement.
    ///
    /// `retrieved_by_variant` holds each variant's raw pre-fusion id list,
    /// aligned with the variant set; repeats across variants are the whole
    /// point and must not be collapsed. `embeddings` maps the candidate ids
    /// that survived truncation to their vectors.
    pub fn validate(
        &self,
        variants: &QueryVariants,
        retrieved_by_variant: &[Vec<ChunkId>],
        embeddings: &HashMap<ChunkId, Vec<f32>>,
    ) -> ValidationReport {
        let pooled: Vec<ChunkId> = retrieved_by_variant
            .iter()
            .flat_map(|ids| ids.iter().copied())
            .collect();
        if pooled.is_empty() {
            return Self::no_results();
        }

        let mut frequency: HashMap<ChunkId, usize> = HashMap::new();
        for id in &pooled {
            *frequency.entry(*id).or_insert(0) += 1;
        }

        let total = pooled.len() as f64;
        let mut entropy = 0.0;
        for &count in frequency.values() {
            let p = count as f64 / total;
            entropy -= p * p.ln();
        }
        // Max entropy is ln(distinct); a single distinct chunk has max
        // entropy 0, so normalization must not divide by it.
        let distinct = frequency.len();
        let normalized_entropy = if distinct > 1 {
            entropy / (distinct as f64).ln()
        } else {
            0.0
        };

        let semantic_consistency = self.consensus_consistency(&pooled, &frequency, embeddings);

        let is_confident = normalized_entropy < self.config.entropy_threshold
            && semantic_consistency > self.config.consistency_threshold;
        let confidence_score =
            ENTROPY_WEIGHT * (1.0 - normalized_entropy) + CONSISTENCY_WEIGHT * semantic_consistency;

        let max_frequency = frequency.values().copied().max().unwrap_or(0);
        let interpretation = interpretation(
            is_confident,
            normalized_entropy,
            max_frequency,
            variants.len(),
        );

        tracing::debug!(
            retrieval_entropy = normalized_entropy,
            semantic_consistency,
            is_confident,
            "validated retrieval consistency"
        );
        ValidationReport {
            is_confident,
            confidence_score,
            retrieval_entropy: normalized_entropy,
            semantic_consistency,
            interpretation,
        }
    }

    /// Mean pairwise similarity of the chunks at least two variants agree
    /// on, in first-retrieved order, capped at `MAX_CONSENSUS_CHUNKS`.
    fn consensus_consistency(
        &self,
        pooled: &[ChunkId],
        frequency: &HashMap<ChunkId, usize>,
        embeddings: &HashMap<ChunkId, Vec<f32>>,
    ) -> f64 {
        let mut consensus: Vec<ChunkId> = Vec::new();
        let mut seen: HashSet<ChunkId> = HashSet::new();
        for id in pooled {
            if seen.insert(*id) && frequency.get(id).copied().unwrap_or(0) >= 2 {
                consensus.push(*id);
            }
        }

        if consensus.len() < 2 {
            return self.config.consensus_fallback;
        }

        let vectors: Vec<&Vec<f32>> = consensus
            .iter()
            .take(MAX_CONSENSUS_CHUNKS)
            .filter_map(|id| embeddings.get(id))
            .collect();
        if vectors.len() < 2 {
            return self.config.neutral_consistency;
        }

        let mut sum = 0.0;
        let mut pairs = 0usize;
        for i in 0..vectors.len() {
            for j in (i + 1)..vectors.len() {
                sum += f64::from(cosine_similarity(vectors[i], vectors[j]));
                pairs += 1;
            }
        }
        sum / pairs as f64
    }

    /// The fixed report used when no variant retrieved anything: entropy is
    /// treated as maximal and confidence bottoms out.
    fn no_results() -> ValidationReport {
        ValidationReport {
            is_confident: false,
            confidence_score: 0.0,
            retrieval_entropy: 1.0,
            semantic_consistency: 0.0,
            interpretation: "NO RESULTS: No relevant chunks found for this query.".to_string(),
        }
    }
}

fn interpretation(
    is_confident: bool,
    normalized_entropy: f64,
    max_frequency: usize,
    variant_count: usize,
) -> String {
    if is_confident {
        if normalized_entropy < 0.2 {
            format!(
                "HIGH CONFIDENCE: Query variants converge strongly. \
                 Top chunks appear in {max_frequency}/{variant_count} variants. \
                 Answer is well-supported."
            )
        } else {
            "MODERATE CONFIDENCE: Query variants show reasonable agreement. \
             Answer is likely accurate but may benefit from more context."
                .to_string()
        }
    } else if normalized_entropy > 0.7 {
        "LOW CONFIDENCE: Query variants retrieve different chunks. \
         Results are inconsistent - possible hallucination risk. \
         Consider rephrasing the question."
            .to_string()
    } else {
        "UNCERTAIN: Some consistency in retrieval but semantic similarity is low. \
         Answer may be partially grounded but lacks strong support."
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> ConfidenceValidator {
        ConfidenceValidator::new(ValidationSettings::default())
    }

    fn variants3() -> QueryVariants {
        let mut v = QueryVariants::original_only("q");
        v.push("q again".to_string());
        v.push("q once more".to_string());
        v
    }

    #[test]
    fn unanimous_single_chunk_has_zero_entropy_but_is_not_confident() {
        // Three variants all retrieving only chunk 7: frequency {7: 3}.
        // Entropy is 0, but with a single consensus chunk the consistency
        // fallback (0.3) keeps confidence below the bar.
        let retrieved = vec![vec![7], vec![7], vec![7]];
        let report = validator().validate(&variants3(), &retrieved, &HashMap::new());

        assert_eq!(report.retrieval_entropy, 0.0);
        assert_eq!(report.semantic_consistency, 0.3);
        assert!(!report.is_confident);
        // 0.6 * (1 - 0) + 0.4 * 0.3
        assert!((report.confidence_score - 0.72).abs() < 1e-9);
    }

    #[test]
    fn no_results_yields_the_fixed_degenerate_report() {
        let retrieved = vec![vec![], vec![], vec![]];
        let report = validator().validate(&variants3(), &retrieved, &HashMap::new());

        assert!(!report.is_confident);
        assert_eq!(report.confidence_score, 0.0);
        assert_eq!(report.retrieval_entropy, 1.0);
        assert_eq!(report.semantic_consistency, 0.0);
        assert!(report.interpretation.starts_with("NO RESULTS"));
    }

    #[test]
    fn full_disagreement_has_maximal_entropy_and_low_confidence_wording() {
        // Every variant retrieves a disjoint chunk: uniform distribution.
        let retrieved = vec![vec![1], vec![2], vec![3]];
        let report = validator().validate(&variants3(), &retrieved, &HashMap::new());

        assert!((report.retrieval_entropy - 1.0).abs() < 1e-9);
        assert!(!report.is_confident);
        assert!(report.interpretation.starts_with("LOW CONFIDENCE"));
    }

    #[test]
    fn consensus_pairs_average_their_cosine_similarity() {
        let retrieved = vec![vec![1, 2], vec![1, 2], vec![1]];
        let mut embeddings = HashMap::new();
        embeddings.insert(1, vec![1.0, 0.0]);
        embeddings.insert(2, vec![1.0, 0.0]);

        let report = validator().validate(&variants3(), &retrieved, &embeddings);
        assert!((report.semantic_consistency - 1.0).abs() < 1e-6);
    }

    #[test]
    fn consensus_without_embeddings_falls_back_to_neutral() {
        let retrieved = vec![vec![1, 2], vec![1, 2], vec![]];
        let report = validator().validate(&variants3(), &retrieved, &HashMap::new());
        assert_eq!(report.semantic_consistency, 0.5);
    }

    #[test]
    fn one_embeddable_consensus_chunk_is_also_neutral() {
        let retrieved = vec![vec![1, 2], vec![1, 2], vec![]];
        let mut embeddings = HashMap::new();
        embeddings.insert(1, vec![1.0, 0.0]);

        let report = validator().validate(&variants3(), &retrieved, &embeddings);
        assert_eq!(report.semantic_consistency, 0.5);
    }

    #[test]
    fn duplicate_fallback_variants_still_count_three_times() {
        // The degraded expansion set repeats the original query; each copy's
        // retrieval must still contribute to the frequency pool.
        let fallback = QueryVariants::fallback("q");
        let retrieved = vec![vec![7], vec![7], vec![7]];
        let report = validator().validate(&fallback, &retrieved, &HashMap::new());
        assert_eq!(report.retrieval_entropy, 0.0);
    }

    #[test]
    fn interpretation_buckets_follow_the_entropy_bands() {
        assert!(interpretation(true, 0.1, 3, 3).starts_with("HIGH CONFIDENCE"));
        assert!(interpretation(true, 0.25, 2, 3).starts_with("MODERATE CONFIDENCE"));
        assert!(interpretation(false, 0.9, 1, 3).starts_with("LOW CONFIDENCE"));
        assert!(interpretation(false, 0.5, 2, 3).starts_with("UNCERTAIN"));
    }
}
