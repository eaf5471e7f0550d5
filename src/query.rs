//! Query coordinator.
//!
//! Ties term lookup, posting iteration, intersection and scoring, document
//! body fetches, and highlighting into one end-to-end search. Phrase
//! filtering lives here rather than in the scorer: it needs the position
//! sub-iterators of a candidate doc at the moment every term matches,
//! before the driver advances past it.

use std::collections::HashMap;
use std::time::Instant;

use crate::config::Config;
use crate::docstore::DocStore;
use crate::doclen::DocLenStore;
use crate::error::QueryError;
use crate::highlight::{self, TermOffsets};
use crate::reader::{FlashReader, PostingIterator};
use crate::scorer::{self, ScoredDoc, TopK};

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub terms: Vec<String>,
    pub n_results: usize,
    pub return_snippets: bool,
    pub n_snippet_passages: usize,
    pub is_phrase: bool,
}

#[derive(Debug, Clone)]
pub struct ResultEntry {
    pub doc_id: u32,
    pub doc_score: f64,
    pub snippet: String,
}

#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    pub entries: Vec<ResultEntry>,
    /// Set when the per-request deadline expired before the full
    /// intersection finished; `entries` holds the best results gathered so far.
    pub partial: bool,
}

pub struct QueryCoordinator<'a> {
    reader: &'a FlashReader,
    doc_store: &'a DocStore,
    doc_len: &'a DocLenStore,
    config: &'a Config,
}

impl<'a> QueryCoordinator<'a> {
    pub fn new(reader: &'a FlashReader, doc_store: &'a DocStore, doc_len: &'a DocLenStore, config: &'a Config) -> Self {
        Self { reader, doc_store, doc_len, config }
    }

    pub fn search(&self, query: &SearchQuery) -> Result<SearchResult, QueryError> {
        if query.terms.is_empty() {
            return Ok(SearchResult::default());
        }

        let mut pairs: Vec<(usize, String, PostingIterator<'a>)> = Vec::with_capacity(query.terms.len());
        for (orig_idx, term) in query.terms.iter().enumerate() {
            let it = self.reader.posting_iterator(term)?;
            pairs.push((orig_idx, term.clone(), it));
        }
        // Pre-sort by doc-freq so `scorer::intersect`'s own (stable) sort is
        // a no-op and `orig_idx`/`terms` stay aligned with `iterators`.
        pairs.sort_by_key(|(_, _, it)| it.doc_freq());
        let orig_idx: Vec<usize> = pairs.iter().map(|(i, _, _)| *i).collect();
        let terms: Vec<String> = pairs.iter().map(|(_, t, _)| t.clone()).collect();
        let mut iterators: Vec<PostingIterator<'a>> = pairs.into_iter().map(|(_, _, it)| it).collect();

        let n_docs = self.doc_len.n_docs();
        let deadline = Instant::now() + self.config.query_deadline;
        let mut heap = TopK::new(query.n_results);
        let mut partial = false;

        scorer::intersect(&mut iterators, |doc_id, matched| {
            if Instant::now() >= deadline {
                partial = true;
                return false;
            }
            if query.is_phrase && !phrase_matches(matched, &orig_idx) {
                return true;
            }
            let doc_len = self.doc_len.len_of(doc_id);
            let avg_len = self.doc_len.avg_len();
            let score: f64 = matched
                .iter()
                .map(|it| scorer::bm25_term_score(it.tf(), it.doc_freq(), n_docs, doc_len, avg_len, &self.config.bm25))
                .sum();
            heap.push(ScoredDoc { doc_id, score });
            true
        });

        let ranked = heap.into_sorted_vec();
        let mut entries = Vec::with_capacity(ranked.len().min(query.n_results));
        for ScoredDoc { doc_id, score } in ranked.into_iter().take(query.n_results) {
            let snippet = if query.return_snippets {
                self.snippet_for(doc_id, &terms, query.n_snippet_passages)?
            } else {
                String::new()
            };
            entries.push(ResultEntry { doc_id, doc_score: score, snippet });
        }
        Ok(SearchResult { entries, partial })
    }

    fn snippet_for(&self, doc_id: u32, terms: &[String], n_passages: usize) -> Result<String, QueryError> {
        let body_bytes = self.doc_store.get(doc_id)?;
        let body = String::from_utf8(body_bytes).map_err(|e| QueryError::Corrupted(e.to_string()))?;

        let mut term_offsets: TermOffsets = HashMap::new();
        for term in terms {
            let mut it = self.reader.posting_iterator(term)?;
            it.skip_to(doc_id);
            if !it.is_end() && it.doc_id() == doc_id {
                term_offsets.insert(term.as_str(), it.offsets());
            }
        }
        let n = if n_passages == 0 { self.config.n_snippet_passages } else { n_passages };
        Ok(highlight::highlight(&body, &term_offsets, n))
    }
}

/// Checks whether the query terms' position lists contain an arithmetic
/// progression with step 1 in the *original query order* — i.e. the terms
/// occur as a contiguous phrase. `matched` is ordered by ascending doc-freq
/// (the intersection driver order), so `orig_idx[i]` maps `matched[i]` back
/// to its position in the query.
fn phrase_matches(matched: &mut [PostingIterator<'_>], orig_idx: &[usize]) -> bool {
    let mut ordered: Vec<Vec<u32>> = vec![Vec::new(); matched.len()];
    for (sorted_i, it) in matched.iter_mut().enumerate() {
        ordered[orig_idx[sorted_i]] = it.positions();
    }
    let Some(first) = ordered.first() else { return true };
    'candidate: for &start in first {
        for (i, list) in ordered.iter().enumerate().skip(1) {
            let target = start + i as u32;
            if list.binary_search(&target).is_err() {
                continue 'candidate;
            }
        }
        return true;
    }
    false
}
