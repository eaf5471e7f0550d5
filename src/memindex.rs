//! In-memory index: the live-serving counterpart to the persisted layout.
//!
//! A sharded `RwLock<FxHashMap<...>>` so concurrent readers and writers only
//! contend within one shard, plus `parking_lot` locks rather than the
//! standard library's. Intentionally thin — it exists to show the same
//! logical postings (doc_id, tf, positions, offsets) a persisted index
//! exposes, reusing [`crate::scorer::bm25_term_score`] and
//! [`crate::highlight::highlight`] directly, rather than re-specifying a
//! second on-disk storage engine.

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::config::Bm25Params;
use crate::highlight::{self, TermOffsets};
use crate::scorer::{self, ScoredDoc, TopK};
use crate::tokenizer;

const NUM_SHARDS: usize = 16;

#[derive(Debug, Clone)]
struct MemPosting {
    doc_id: u32,
    positions: Vec<u32>,
    offsets: Vec<(u32, u32)>,
}

#[derive(Default)]
struct Shard {
    terms: FxHashMap<String, Vec<MemPosting>>,
}

fn shard_index(term: &str) -> usize {
    use std::hash::{Hash, Hasher};
    let mut hasher = rustc_hash::FxHasher::default();
    term.hash(&mut hasher);
    (hasher.finish() as usize) % NUM_SHARDS
}

/// A live, mutable full-text index serving concurrent readers and writers.
/// Documents are assigned strictly increasing ids; nothing is ever removed.
pub struct MemIndex {
    shards: Vec<RwLock<Shard>>,
    doc_lengths: RwLock<Vec<u32>>,
    doc_bodies: RwLock<Vec<String>>,
    next_doc_id: AtomicU32,
}

impl MemIndex {
    pub fn new() -> Self {
        Self {
            shards: (0..NUM_SHARDS).map(|_| RwLock::new(Shard::default())).collect(),
            doc_lengths: RwLock::new(Vec::new()),
            doc_bodies: RwLock::new(Vec::new()),
            next_doc_id: AtomicU32::new(0),
        }
    }

    /// Tokenize `body` on whitespace and add it as the next document.
    /// Returns the assigned doc-id.
    pub fn add_document(&self, body: &str) -> u32 {
        let doc_id = self.next_doc_id.fetch_add(1, Ordering::Relaxed);
        let tokenized = tokenizer::tokenize(body);

        let mut per_term: FxHashMap<&str, (Vec<u32>, Vec<(u32, u32)>)> = FxHashMap::default();
        for (pos, (term, &off)) in tokenized.tokens.iter().zip(tokenized.offsets.iter()).enumerate() {
            let entry = per_term.entry(term.as_str()).or_default();
            entry.0.push(pos as u32);
            entry.1.push(off);
        }
        for (term, (positions, offsets)) in per_term {
            let shard = &self.shards[shard_index(term)];
            shard.write().terms.entry(term.to_string()).or_default().push(MemPosting { doc_id, positions, offsets });
        }

        self.doc_lengths.write().push(tokenized.len() as u32);
        self.doc_bodies.write().push(body.to_string());
        doc_id
    }

    pub fn doc_count(&self) -> u32 {
        self.next_doc_id.load(Ordering::Relaxed)
    }

    pub fn avg_len(&self) -> f64 {
        let lengths = self.doc_lengths.read();
        if lengths.is_empty() {
            0.0
        } else {
            lengths.iter().map(|&l| l as f64).sum::<f64>() / lengths.len() as f64
        }
    }

    fn postings_for(&self, term: &str) -> Vec<MemPosting> {
        let shard = self.shards[shard_index(term)].read();
        shard.terms.get(term).cloned().unwrap_or_default()
    }

    /// Conjunctive search over `terms`, scored with BM25 and bounded to
    /// `n_results` via a min-heap, mirroring the persisted index's
    /// intersection driver: the term with fewest postings drives the merge.
    pub fn search(&self, terms: &[String], n_results: usize, bm25: &Bm25Params) -> Vec<ScoredDoc> {
        if terms.is_empty() {
            return Vec::new();
        }
        let mut lists: Vec<Vec<MemPosting>> = terms.iter().map(|t| self.postings_for(t)).collect();
        if lists.iter().any(|l| l.is_empty()) {
            return Vec::new();
        }
        lists.sort_by_key(|l| l.len());

        let n_docs = self.doc_count();
        let avg_len = self.avg_len();
        let doc_lengths = self.doc_lengths.read();
        let mut top_k = TopK::new(n_results);

        'driver: for driver_posting in &lists[0] {
            let doc_id = driver_posting.doc_id;
            let mut matched = Vec::with_capacity(lists.len());
            matched.push(driver_posting);
            for list in &lists[1..] {
                match list.binary_search_by_key(&doc_id, |p| p.doc_id) {
                    Ok(idx) => matched.push(&list[idx]),
                    Err(_) => continue 'driver,
                }
            }
            let doc_len = doc_lengths.get(doc_id as usize).copied().unwrap_or(0);
            let score: f64 = matched
                .iter()
                .map(|p| scorer::bm25_term_score(p.positions.len() as u32, lists_doc_freq(&lists, p), n_docs, doc_len, avg_len, bm25))
                .sum();
            top_k.push(ScoredDoc { doc_id, score });
        }
        top_k.into_sorted_vec()
    }

    /// Highlight `terms`' occurrences in `doc_id`'s body. Empty string if
    /// the doc-id is out of range.
    pub fn snippet_for(&self, doc_id: u32, terms: &[String], n_passages: usize) -> String {
        let bodies = self.doc_bodies.read();
        let Some(body) = bodies.get(doc_id as usize) else { return String::new() };

        let mut term_offsets: TermOffsets = std::collections::HashMap::new();
        let lists: Vec<(String, Vec<MemPosting>)> = terms.iter().map(|t| (t.clone(), self.postings_for(t))).collect();
        for (term, postings) in &lists {
            if let Ok(idx) = postings.binary_search_by_key(&doc_id, |p| p.doc_id) {
                term_offsets.insert(term.as_str(), postings[idx].offsets.clone());
            }
        }
        highlight::highlight(body, &term_offsets, n_passages)
    }
}

impl Default for MemIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// doc-freq of whichever list `p` came from, by identity of its postings vec.
fn lists_doc_freq(lists: &[Vec<MemPosting>], p: &MemPosting) -> u32 {
    lists
        .iter()
        .find(|l| l.iter().any(|q| std::ptr::eq(q, p)))
        .map(|l| l.len() as u32)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_document_containing_unique_term() {
        let index = MemIndex::new();
        index.add_document("hello world");
        index.add_document("hello wisconsin");
        index.add_document("hello world big world");

        let bm25 = Bm25Params::default();
        let results = index.search(&["wisconsin".to_string()], 10, &bm25);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].doc_id, 1);
    }

    #[test]
    fn conjunctive_search_requires_all_terms() {
        let index = MemIndex::new();
        index.add_document("hello world");
        index.add_document("hello wisconsin");

        let bm25 = Bm25Params::default();
        let results = index.search(&["hello".to_string(), "world".to_string()], 10, &bm25);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].doc_id, 0);
    }

    #[test]
    fn snippet_highlights_matched_term() {
        let index = MemIndex::new();
        index.add_document("hello world");
        let snippet = index.snippet_for(0, &["hello".to_string()], 1);
        assert_eq!(snippet, "<b>hello<\\b> world\n");
    }

    #[test]
    fn avg_len_tracks_documents_added() {
        let index = MemIndex::new();
        index.add_document("a b");
        index.add_document("a b c d");
        assert!((index.avg_len() - 3.0).abs() < 1e-9);
    }
}
