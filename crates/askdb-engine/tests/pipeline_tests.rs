use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use askdb_core::config::Settings;
use askdb_core::error::{Error, Result};
use askdb_core::snapshot::SharedIndex;
use askdb_core::traits::{
    ChunkStore, CompletionRequest, EmbeddingProvider, LanguageModel,
};
use askdb_core::types::{ChunkId, DocumentId, DocumentInfo, RetrievalMethod, StoredChunk};
use askdb_embed::HashedEmbedder;
use askdb_engine::{QueryEngine, QueryRequest};
use askdb_index::{MemoryStore, SnapshotBuilder};

const DIM: usize = 64;

/// Embedding provider that counts how often it is asked to embed.
struct CountingEmbedder {
    inner: HashedEmbedder,
    calls: AtomicUsize,
}

impl CountingEmbedder {
    fn new() -> Self {
        Self {
            inner: HashedEmbedder::new(DIM),
            calls: AtomicUsize::new(0),
        }
    }
}

impl EmbeddingProvider for CountingEmbedder {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text)
    }
}

/// Chunk store wrapper that counts lookups.
struct CountingStore {
    inner: MemoryStore,
    calls: AtomicUsize,
}

impl ChunkStore for CountingStore {
    fn get_by_ids(&self, ids: &[ChunkId]) -> Result<HashMap<ChunkId, StoredChunk>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_ids(ids)
    }

    fn document(&self, id: DocumentId) -> Result<Option<DocumentInfo>> {
        self.inner.document(id)
    }
}

/// Language model double. Expansion and synthesis calls are told apart by
/// their system prompts, mirroring how the real collaborators prompt.
struct ScriptedLlm {
    expansion: Option<String>,
    synthesis: Option<String>,
    expansion_calls: AtomicUsize,
    synthesis_calls: AtomicUsize,
}

impl ScriptedLlm {
    fn new(expansion: Option<&str>, synthesis: Option<&str>) -> Self {
        Self {
            expansion: expansion.map(str::to_string),
            synthesis: synthesis.map(str::to_string),
            expansion_calls: AtomicUsize::new(0),
            synthesis_calls: AtomicUsize::new(0),
        }
    }

    fn total_calls(&self) -> usize {
        self.expansion_calls.load(Ordering::SeqCst) + self.synthesis_calls.load(Ordering::SeqCst)
    }
}

impl LanguageModel for ScriptedLlm {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        if request.system_prompt.contains("alternative") {
            self.expansion_calls.fetch_add(1, Ordering::SeqCst);
            self.expansion
                .clone()
                .ok_or_else(|| Error::Completion("expansion unavailable".to_string()))
        } else {
            self.synthesis_calls.fetch_add(1, Ordering::SeqCst);
            self.synthesis
                .clone()
                .ok_or_else(|| Error::Completion("synthesis unavailable".to_string()))
        }
    }
}

struct Fixture {
    engine: QueryEngine,
    embedder: Arc<CountingEmbedder>,
    store: Arc<CountingStore>,
    llm: Arc<ScriptedLlm>,
}

fn fixture(texts: &[&str], llm: ScriptedLlm) -> Fixture {
    let embedder = Arc::new(CountingEmbedder::new());
    let mut builder = SnapshotBuilder::new(DIM);
    let mut store = MemoryStore::new();
    store.insert_document(
        1,
        DocumentInfo {
            name: "ml_notes.md".to_string(),
            doc_type: "markdown".to_string(),
        },
    );
    for (index, text) in texts.iter().enumerate() {
        let id = index as ChunkId + 1;
        builder.push(id, text, embedder.inner.embed(text).expect("embed"));
        store.insert_chunk(
            id,
            StoredChunk {
                text: (*text).to_string(),
                document_id: 1,
                position: index,
                token_count: text.split_whitespace().count(),
            },
        );
    }
    let store = Arc::new(CountingStore {
        inner: store,
        calls: AtomicUsize::new(0),
    });
    let llm = Arc::new(llm);
    let engine = QueryEngine::new(
        Arc::new(SharedIndex::new(builder.build())),
        store.clone(),
        embedder.clone(),
        llm.clone(),
        Settings::default(),
    );
    Fixture {
        engine,
        embedder,
        store,
        llm,
    }
}

const BACKPROP_CHUNK: &str = "Backpropagation computes gradients using the chain rule.";

fn backprop_request() -> QueryRequest {
    QueryRequest {
        query: "What is backpropagation?".to_string(),
        method: RetrievalMethod::Hybrid,
        use_rerank: true,
        top_k: 1,
    }
}

#[test]
fn single_chunk_corpus_end_to_end() {
    let fx = fixture(
        &[BACKPROP_CHUNK],
        ScriptedLlm::new(
            Some("How does backpropagation work?\nWhat does backpropagation do?"),
            Some(BACKPROP_CHUNK),
        ),
    );

    let response = fx.engine.query(&backprop_request()).expect("query");

    assert_eq!(response.sources.len(), 1);
    assert_eq!(response.sources[0].chunk_id, 1);
    assert_eq!(response.sources[0].doc_name, "ml_notes.md");
    assert_eq!(response.sources[0].doc_type, "markdown");
    assert_eq!(response.retrieval_stats.after_mmr, 1);
    assert_eq!(response.retrieval_stats.method, "hybrid_rerank");

    assert_eq!(response.variants.len(), 3);
    assert_eq!(response.variants[0], "What is backpropagation?");

    // A verbatim answer is fully grounded.
    assert!(response.validation.grounding_check.is_grounded);
    assert_eq!(response.validation.grounding_check.overlap_ratio, 1.0);
    assert_eq!(response.answer, BACKPROP_CHUNK);
}

#[test]
fn expansion_failure_degrades_to_the_repeated_original() {
    let fx = fixture(
        &[BACKPROP_CHUNK],
        ScriptedLlm::new(None, Some("Gradients come from the chain rule.")),
    );

    let response = fx.engine.query(&backprop_request()).expect("query");

    assert_eq!(response.variants, vec!["What is backpropagation?"; 3]);
    assert_eq!(response.sources.len(), 1, "retrieval still ran");
}

#[test]
fn synthesis_failure_aborts_the_request() {
    let fx = fixture(
        &[BACKPROP_CHUNK],
        ScriptedLlm::new(Some("variant a is long enough\nvariant b is long enough"), None),
    );

    let err = fx.engine.query(&backprop_request()).unwrap_err();
    assert!(matches!(err, Error::Synthesis(_)));
}

#[test]
fn invalid_requests_are_rejected_before_any_collaborator_call() {
    let fx = fixture(&[BACKPROP_CHUNK], ScriptedLlm::new(None, None));

    let empty_query = QueryRequest {
        query: String::new(),
        ..backprop_request()
    };
    assert!(matches!(
        fx.engine.query(&empty_query),
        Err(Error::InvalidRequest(_))
    ));

    let oversized = QueryRequest {
        top_k: 21,
        ..backprop_request()
    };
    assert!(matches!(
        fx.engine.query(&oversized),
        Err(Error::InvalidRequest(_))
    ));

    assert_eq!(fx.llm.total_calls(), 0);
    assert_eq!(fx.embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(fx.store.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn unknown_method_fails_at_the_request_boundary() {
    // "foo" never deserializes into a request, so no engine (and hence no
    // index adapter) is ever reached.
    let result = serde_json::from_str::<QueryRequest>(
        r#"{ "query": "test", "method": "foo", "use_rerank": false, "top_k": 3 }"#,
    );
    assert!(result.is_err());
}

#[test]
fn empty_corpus_degrades_without_erroring() {
    let fx = fixture(
        &[],
        ScriptedLlm::new(
            Some("variant one is long enough\nvariant two is long enough"),
            Some("The context does not contain enough information."),
        ),
    );

    let response = fx.engine.query(&backprop_request()).expect("query");

    assert!(response.sources.is_empty());
    assert_eq!(response.retrieval_stats.total_retrieved, 0);
    assert_eq!(response.retrieval_stats.after_mmr, 0);

    let entropy = &response.validation.entropy_analysis;
    assert!(!entropy.is_confident);
    assert_eq!(entropy.confidence_score, 0.0);
    assert_eq!(entropy.retrieval_entropy, 1.0);
    assert_eq!(entropy.semantic_consistency, 0.0);
}

#[test]
fn top_k_bounds_the_selection_over_a_larger_corpus() {
    let fx = fixture(
        &[
            "backpropagation computes gradients using the chain rule",
            "the chain rule differentiates composed functions",
            "gradients are propagated backwards through the layers",
            "stochastic gradient descent updates weights iteratively",
            "tomato seedlings need regular watering",
            "sourdough starter doubles after feeding",
        ],
        ScriptedLlm::new(
            Some("how are gradients computed\nwhat role does the chain rule play"),
            Some("Gradients are computed with the chain rule."),
        ),
    );

    let request = QueryRequest {
        query: "how does backpropagation compute gradients?".to_string(),
        method: RetrievalMethod::Hybrid,
        use_rerank: true,
        top_k: 2,
    };
    let response = fx.engine.query(&request).expect("query");

    assert!(response.sources.len() <= 2);
    assert_eq!(response.retrieval_stats.after_mmr, response.sources.len());
    assert!(response.retrieval_stats.after_dedup >= response.sources.len());

    let mut ids: Vec<ChunkId> = response.sources.iter().map(|s| s.chunk_id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), response.sources.len(), "no duplicate sources");
}

#[test]
fn response_serializes_with_the_public_field_names() {
    let fx = fixture(
        &[BACKPROP_CHUNK],
        ScriptedLlm::new(
            Some("How does backpropagation work?\nWhat does backpropagation do?"),
            Some(BACKPROP_CHUNK),
        ),
    );

    let response = fx.engine.query(&backprop_request()).expect("query");
    let json = serde_json::to_value(&response).expect("serialize");

    assert!(json.get("answer").is_some());
    assert!(json.get("sources").is_some());
    assert!(json.get("variants").is_some());
    let validation = json.get("validation").expect("validation");
    assert!(validation.get("entropy_analysis").is_some());
    assert!(validation.get("grounding_check").is_some());
    assert!(validation.get("overall_confidence").is_some());
    let stats = json.get("retrieval_stats").expect("stats");
    for field in [
        "method",
        "total_retrieved",
        "after_dedup",
        "after_rerank",
        "after_mmr",
    ] {
        assert!(stats.get(field).is_some(), "missing field {field}");
    }
    let source = &json["sources"][0];
    for field in ["chunk_id", "text", "score", "doc_name", "doc_type", "position"] {
        assert!(source.get(field).is_some(), "missing source field {field}");
    }
}
