//! Directory ingestion: walk, decode leniently, chunk, embed, index.
//!
//! Builds one complete snapshot plus its chunk store from a directory of
//! `.txt`/`.md` files. Chunking slices each document into overlapping word
//! windows sized by an estimated 0.75 words per token, so the configured
//! token budgets translate directly.

use std::path::{Path, PathBuf};

use anyhow::Result;
use askdb_core::config::IngestSettings;
use askdb_core::snapshot::IndexSnapshot;
use askdb_core::traits::EmbeddingProvider;
use askdb_core::types::{ChunkId, DocumentId, DocumentInfo, StoredChunk};
use askdb_index::{MemoryStore, SnapshotBuilder};
use indicatif::ProgressBar;

const WORDS_PER_TOKEN: f32 = 0.75;

pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
}

pub fn ingest_directory(
    data_dir: &Path,
    embedder: &dyn EmbeddingProvider,
    settings: &IngestSettings,
) -> Result<(IndexSnapshot, MemoryStore, IngestReport)> {
    let files = list_source_files(data_dir);
    if files.is_empty() {
        println!("No .txt or .md files found under {}.", data_dir.display());
    }

    let mut store = MemoryStore::new();
    let mut pending: Vec<(ChunkId, String, usize)> = Vec::new();
    let mut next_chunk_id: ChunkId = 1;

    for (file_index, path) in files.iter().enumerate() {
        let document_id = file_index as DocumentId + 1;
        let content = read_lossy(path)?;
        let (name, doc_type) = describe(path);
        store.insert_document(document_id, DocumentInfo { name, doc_type });

        for (position, (text, token_count)) in
            chunk_words(&content, settings.chunk_size, settings.chunk_overlap)
                .into_iter()
                .enumerate()
        {
            store.insert_chunk(
                next_chunk_id,
                StoredChunk {
                    text: text.clone(),
                    document_id,
                    position,
                    token_count,
                },
            );
            pending.push((next_chunk_id, text, token_count));
            next_chunk_id += 1;
        }
    }

    let mut builder = SnapshotBuilder::new(embedder.dim());
    let bar = ProgressBar::new(pending.len() as u64);
    for (id, text, _) in &pending {
        builder.push(*id, text, embedder.embed(text)?);
        bar.inc(1);
    }
    bar.finish_and_clear();

    let report = IngestReport {
        documents: files.len(),
        chunks: pending.len(),
    };
    tracing::info!(
        documents = report.documents,
        chunks = report.chunks,
        "ingest complete"
    );
    Ok((builder.build(), store, report))
}

fn list_source_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| {
            matches!(
                p.extension().and_then(|s| s.to_str()),
                Some("txt") | Some("md")
            )
        })
        .collect();
    files.sort();
    files
}

fn read_lossy(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&std::fs::read(path)?).to_string()),
    }
}

fn describe(path: &Path) -> (String, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let doc_type = match path.extension().and_then(|s| s.to_str()) {
        Some("md") => "markdown",
        Some("txt") => "text",
        _ => "unknown",
    };
    (name, doc_type.to_string())
}

/// Overlapping word windows with estimated token counts.
fn chunk_words(text: &str, chunk_tokens: usize, overlap_tokens: usize) -> Vec<(String, usize)> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let words_per_chunk = ((chunk_tokens as f32 * WORDS_PER_TOKEN) as usize).max(1);
    let overlap_words = (overlap_tokens as f32 * WORDS_PER_TOKEN) as usize;
    let step = words_per_chunk.saturating_sub(overlap_words).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + words_per_chunk).min(words.len());
        let token_estimate = ((end - start) as f32 / WORDS_PER_TOKEN) as usize;
        chunks.push((words[start..end].join(" "), token_estimate));
        if end >= words.len() {
            break;
        }
        start += step;
    }
    chunks
}
