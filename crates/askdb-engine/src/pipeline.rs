//! The query pipeline.
//!
//! Stages, strictly in order: expansion, per-variant retrieval,
//! cross-variant deduplication, candidate truncation, embedding resolution,
//! diversity selection, confidence validation, answer synthesis, grounding
//! check, response assembly. Expansion failures degrade; synthesis failures
//! abort the request; everything in between operates on request-local state
//! plus one immutable snapshot generation.

use std::collections::HashMap;
use std::sync::Arc;

use askdb_core::config::Settings;
use askdb_core::error::Result;
use askdb_core::snapshot::SharedIndex;
use askdb_core::traits::{ChunkStore, EmbeddingProvider, LanguageModel};
use askdb_core::types::ChunkId;
use askdb_llm::{AnswerSynthesizer, QueryExpander};
use askdb_retrieval::{maximal_marginal_relevance, Retriever};
use askdb_validate::{check_grounding, ConfidenceValidator};

use crate::request::QueryRequest;
use crate::response::{QueryResponse, RetrievalStats, SourceChunk, ValidationSection};

pub struct QueryEngine {
    index: Arc<SharedIndex>,
    store: Arc<dyn ChunkStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    expander: QueryExpander,
    synthesizer: AnswerSynthesizer,
    validator: ConfidenceValidator,
    settings: Settings,
}

impl QueryEngine {
    pub fn new(
        index: Arc<SharedIndex>,
        store: Arc<dyn ChunkStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LanguageModel>,
        settings: Settings,
    ) -> Self {
        let expander = QueryExpander::new(Arc::clone(&llm), &settings.llm);
        let synthesizer = AnswerSynthesizer::new(llm, &settings.llm);
        let validator = ConfidenceValidator::new(settings.validation.clone());
        Self {
            index,
            store,
            embedder,
            expander,
            synthesizer,
            validator,
            settings,
        }
    }

    /// Run one request end to end.
    pub fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        request.validate()?;

        // One consistent generation for the whole request; a concurrent
        // rebuild-and-swap cannot tear it.
        let snapshot = self.index.load();
        tracing::info!(
            query = %request.query,
            method = %request.method,
            top_k = request.top_k,
            indexed = snapshot.len(),
            "running query pipeline"
        );

        // Stage 1: expansion (recoverable; never fails the request).
        let variants = self.expander.expand(&request.query);

        // Stage 2: retrieval per variant at double breadth, keeping each
        // variant's raw id list for the validator.
        let retriever = Retriever::new(
            &snapshot,
            self.embedder.as_ref(),
            self.store.as_ref(),
            self.settings.retrieval.rrf_k,
        );
        let breadth = request.top_k * 2;
        let mut retrieved_by_variant: Vec<Vec<ChunkId>> = Vec::with_capacity(variants.len());
        let mut best_scores: HashMap<ChunkId, f32> = HashMap::new();
        for variant in variants.iter() {
            let hits = retriever.retrieve(variant, request.method, breadth, request.use_rerank)?;
            retrieved_by_variant.push(hits.iter().map(|h| h.id).collect());
            // Stage 3 (merge half): a chunk keeps its best score across
            // variants, so one weak phrasing cannot penalize it.
            for hit in hits {
                best_scores
                    .entry(hit.id)
                    .and_modify(|score| {
                        if hit.score > *score {
                            *score = hit.score;
                        }
                    })
                    .or_insert(hit.score);
            }
        }

        // Stage 3 (order half): descending by best score, ascending id on
        // ties, independent of retrieval completion order.
        let mut deduped: Vec<(ChunkId, f32)> =
            best_scores.iter().map(|(id, score)| (*id, *score)).collect();
        deduped.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        let after_dedup = deduped.len();

        // Stage 4: only the best 2k candidates go into the diversity stage.
        deduped.truncate((request.top_k * 2).min(deduped.len()));

        // Stage 5: resolve text and embeddings for the surviving
        // candidates. The snapshot's ingest-time cache answers most lookups;
        // anything else is embedded on the spot.
        let wanted: Vec<ChunkId> = deduped.iter().map(|(id, _)| *id).collect();
        let chunk_rows = self.store.get_by_ids(&wanted)?;

        let mut candidate_ids: Vec<ChunkId> = Vec::with_capacity(wanted.len());
        let mut candidate_embeddings: Vec<Vec<f32>> = Vec::with_capacity(wanted.len());
        let mut embeddings_by_id: HashMap<ChunkId, Vec<f32>> = HashMap::new();
        for id in &wanted {
            let Some(row) = chunk_rows.get(id) else {
                tracing::warn!(chunk_id = id, "candidate missing from chunk store, dropping");
                continue;
            };
            let vector = match snapshot.cached_embedding(*id) {
                Some(cached) => cached.to_vec(),
                None => self.embedder.embed(&row.text)?,
            };
            candidate_ids.push(*id);
            candidate_embeddings.push(vector.clone());
            embeddings_by_id.insert(*id, vector);
        }

        // Stage 6: diversity selection, only when there is something to
        // narrow; otherwise every candidate survives as-is.
        let selected_ids: Vec<ChunkId> = if candidate_ids.len() > request.top_k {
            let query_embedding = self.embedder.embed(&request.query)?;
            maximal_marginal_relevance(
                &query_embedding,
                &candidate_embeddings,
                &candidate_ids,
                self.settings.retrieval.mmr_lambda,
                request.top_k,
            )
        } else {
            candidate_ids.clone()
        };

        // Stage 7: cross-variant consistency.
        let entropy_analysis =
            self.validator
                .validate(&variants, &retrieved_by_variant, &embeddings_by_id);

        // Stage 8: synthesis (terminal on failure).
        let chunk_texts: Vec<String> = selected_ids
            .iter()
            .filter_map(|id| chunk_rows.get(id).map(|row| row.text.clone()))
            .collect();
        let answer = self.synthesizer.synthesize(&request.query, &chunk_texts)?;

        // Stage 9: is the answer actually supported by those texts?
        let grounding_check = check_grounding(
            &answer,
            &chunk_texts,
            self.settings.validation.grounding_threshold,
        );

        // Stage 10: response assembly.
        let mut sources = Vec::with_capacity(selected_ids.len());
        for id in &selected_ids {
            let Some(row) = chunk_rows.get(id) else {
                continue;
            };
            let document = self.store.document(row.document_id)?;
            let (doc_name, doc_type) = document
                .map(|d| (d.name, d.doc_type))
                .unwrap_or_else(|| ("unknown".to_string(), "unknown".to_string()));
            sources.push(SourceChunk {
                chunk_id: *id,
                text: row.text.clone(),
                score: best_scores.get(id).copied().unwrap_or(0.0),
                doc_name,
                doc_type,
                position: row.position,
            });
        }

        let method = if request.use_rerank {
            format!("{}_rerank", request.method)
        } else {
            request.method.to_string()
        };
        let retrieval_stats = RetrievalStats {
            method,
            total_retrieved: best_scores.len(),
            after_dedup,
            // Reranking happens inside hybrid retrieval, before dedup.
            after_rerank: after_dedup,
            after_mmr: selected_ids.len(),
        };
        tracing::debug!(
            total_retrieved = retrieval_stats.total_retrieved,
            after_mmr = retrieval_stats.after_mmr,
            grounded = grounding_check.is_grounded,
            "pipeline complete"
        );

        let overall_confidence = entropy_analysis.confidence_score;
        Ok(QueryResponse {
            answer,
            sources,
            variants: variants.as_slice().to_vec(),
            validation: ValidationSection {
                entropy_analysis,
                grounding_check,
                overall_confidence,
            },
            retrieval_stats,
        })
    }
}
