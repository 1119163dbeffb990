//! BM25-Okapi keyword scoring.
//!
//! Scores every indexed position for a query, rather than returning a
//! pre-cut top list; callers rank and cut. Constants follow the common
//! Okapi parametrization (k1 = 1.5, b = 0.75) with negative idf values
//! floored at `EPSILON * mean(idf)` so very common terms still contribute a
//! small positive signal instead of flipping the score's sign.

use std::collections::HashMap;

use askdb_core::traits::KeywordIndex;

const K1: f64 = 1.5;
const B: f64 = 0.75;
const EPSILON: f64 = 0.25;

/// The corpus-wide tokenization contract: lower-case, then whitespace
/// split. Index construction, lexical queries and the scoped rerank all go
/// through this one function; a query tokenized any other way scores
/// against the wrong vocabulary.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

pub struct Bm25Index {
    /// Term frequency per document.
    doc_freqs: Vec<HashMap<String, usize>>,
    doc_lens: Vec<usize>,
    avgdl: f64,
    idf: HashMap<String, f64>,
}

impl Bm25Index {
    /// Build over a tokenized corpus; position `i` of any score vector
    /// corresponds to `corpus[i]`.
    pub fn new(corpus: &[Vec<String>]) -> Self {
        let doc_lens: Vec<usize> = corpus.iter().map(Vec::len).collect();
        let total_len: usize = doc_lens.iter().sum();
        let avgdl = if corpus.is_empty() {
            0.0
        } else {
            total_len as f64 / corpus.len() as f64
        };

        let mut doc_freqs = Vec::with_capacity(corpus.len());
        let mut containing_docs: HashMap<String, usize> = HashMap::new();
        for doc in corpus {
            let mut freqs: HashMap<String, usize> = HashMap::new();
            for token in doc {
                *freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for token in freqs.keys() {
                *containing_docs.entry(token.clone()).or_insert(0) += 1;
            }
            doc_freqs.push(freqs);
        }

        let n = corpus.len() as f64;
        let mut idf: HashMap<String, f64> = HashMap::new();
        let mut idf_sum = 0.0;
        let mut negative: Vec<String> = Vec::new();
        for (token, df) in &containing_docs {
            let value = (n - *df as f64 + 0.5).ln() - (*df as f64 + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(token.clone());
            }
            idf.insert(token.clone(), value);
        }
        if !idf.is_empty() {
            let floor = EPSILON * (idf_sum / idf.len() as f64);
            for token in negative {
                idf.insert(token, floor);
            }
        }

        Self {
            doc_freqs,
            doc_lens,
            avgdl,
            idf,
        }
    }
}

impl KeywordIndex for Bm25Index {
    fn len(&self) -> usize {
        self.doc_freqs.len()
    }

    fn get_scores(&self, query_tokens: &[String]) -> Vec<f32> {
        let mut scores = vec![0f32; self.doc_freqs.len()];
        for token in query_tokens {
            let Some(idf) = self.idf.get(token) else {
                continue;
            };
            for (position, freqs) in self.doc_freqs.iter().enumerate() {
                let f = freqs.get(token).copied().unwrap_or(0) as f64;
                if f == 0.0 {
                    continue;
                }
                let dl = self.doc_lens[position] as f64;
                let denom = f + K1 * (1.0 - B + B * dl / self.avgdl);
                scores[position] += (idf * f * (K1 + 1.0) / denom) as f32;
            }
        }
        scores
    }
}
