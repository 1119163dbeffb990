use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use askdb_core::config::Settings;
use askdb_core::snapshot::SharedIndex;
use askdb_core::types::RetrievalMethod;
use askdb_embed::HashedEmbedder;
use askdb_engine::{QueryEngine, QueryRequest};
use askdb_llm::ChatClient;
use tracing_subscriber::EnvFilter;

mod ingest;

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {prog} <index|ask> [args...]");
        eprintln!("  index [data_dir]");
        eprintln!("  ask \"<question>\" [data_dir] [lexical|vector|hybrid] [top_k]");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = Settings::load()?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "index" => {
            let data_dir = args
                .first()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(&settings.ingest.data_dir));
            println!("Indexing {}", data_dir.display());

            let embedder = HashedEmbedder::new(settings.embedding.dim);
            let (snapshot, store, report) =
                ingest::ingest_directory(&data_dir, &embedder, &settings.ingest)?;
            println!(
                "Indexed {} chunks from {} documents ({} vectors)",
                report.chunks,
                store.document_count(),
                snapshot.len()
            );
        }
        "ask" => {
            let Some(question) = args.first().cloned() else {
                eprintln!("Usage: askdb-cli ask \"<question>\" [data_dir] [method] [top_k]");
                std::process::exit(1);
            };
            let data_dir = args
                .get(1)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(&settings.ingest.data_dir));
            let method: RetrievalMethod = match args.get(2) {
                Some(raw) => raw.parse()?,
                None => RetrievalMethod::Hybrid,
            };
            let top_k: usize = match args.get(3) {
                Some(raw) => raw.parse()?,
                None => settings.retrieval.top_k_default,
            };

            if settings.llm.api_key.is_empty() {
                tracing::warn!(
                    "no API key configured (ASKDB_LLM__API_KEY); expansion will degrade and \
                     synthesis will fail"
                );
            }

            let embedder = Arc::new(HashedEmbedder::new(settings.embedding.dim));
            let (snapshot, store, report) =
                ingest::ingest_directory(&data_dir, embedder.as_ref(), &settings.ingest)?;
            println!(
                "Indexed {} chunks from {} documents",
                report.chunks, report.documents
            );

            let llm = Arc::new(ChatClient::new(&settings.llm)?);
            let engine = QueryEngine::new(
                Arc::new(SharedIndex::new(snapshot)),
                Arc::new(store),
                embedder,
                llm,
                settings,
            );

            let request = QueryRequest {
                query: question,
                method,
                use_rerank: true,
                top_k,
            };
            let response = engine.query(&request)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        _ => {
            eprintln!("Unknown command: {cmd}");
            std::process::exit(1);
        }
    }
    Ok(())
}
