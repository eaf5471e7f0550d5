//! Intersection + BM25 scorer.
//!
//! Drives an N-way conjunctive merge over posting iterators using the
//! lowest-doc-freq iterator as the driver, and scores every fully-matched
//! candidate with ElasticSearch-equivalent BM25. Callers supply an
//! `on_match` callback (phrase filtering, top-K accumulation) that runs once
//! per matched doc-id while every iterator still sits on that posting.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::config::Bm25Params;
use crate::reader::PostingIterator;

/// `idf_t · tf_norm` for one query term against one document.
pub fn bm25_term_score(tf: u32, df: u32, n_docs: u32, doc_len: u32, avg_len: f64, bm25: &Bm25Params) -> f64 {
    let idf = ((n_docs as f64 - df as f64 + 0.5) / (df as f64 + 0.5) + 1.0).ln();
    let tf = tf as f64;
    let tf_norm = (tf * (bm25.k1 + 1.0)) / (tf + bm25.k1 * (1.0 - bm25.b + bm25.b * doc_len as f64 / avg_len));
    idf * tf_norm
}

/// Drives the conjunctive merge. `on_match` is invoked once per doc-id
/// present in every iterator, with every iterator still positioned on that
/// posting (so it can read `tf()`, `positions()`, `offsets()`). Returning
/// `false` stops the merge immediately (used for deadline/cancellation
/// polling); otherwise the driver iterator advances past the match.
pub fn intersect<'a, F>(iterators: &mut [PostingIterator<'a>], mut on_match: F)
where
    F: FnMut(u32, &mut [PostingIterator<'a>]) -> bool,
{
    if iterators.is_empty() {
        return;
    }
    iterators.sort_by_key(|it| it.doc_freq());

    loop {
        if iterators[0].is_end() {
            return;
        }
        let mut candidate = iterators[0].doc_id();
        loop {
            let mut all_match = true;
            let mut max_candidate = candidate;
            for it in iterators.iter_mut().skip(1) {
                it.skip_to(candidate);
                if it.is_end() {
                    return;
                }
                if it.doc_id() != candidate {
                    all_match = false;
                    max_candidate = max_candidate.max(it.doc_id());
                }
            }
            if all_match {
                if !on_match(candidate, iterators) {
                    return;
                }
                iterators[0].advance();
                break;
            } else {
                iterators[0].skip_to(max_candidate);
                if iterators[0].is_end() {
                    return;
                }
                candidate = iterators[0].doc_id();
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: u32,
    pub score: f64,
}

/// Ordering used only by the bounded top-K heap: "worse" (lower score, or
/// equal score with a larger doc-id) compares as greater, so the heap's max
/// is always the entry to evict first.
impl Eq for ScoredDoc {}

impl PartialOrd for ScoredDoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredDoc {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.doc_id.cmp(&other.doc_id))
    }
}

/// Bounded min-heap of size `k`, keyed by score with the tie-break rule
/// "smaller doc-id wins".
pub struct TopK {
    k: usize,
    heap: BinaryHeap<ScoredDoc>,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        Self { k, heap: BinaryHeap::with_capacity(k) }
    }

    pub fn push(&mut self, doc: ScoredDoc) {
        if self.k == 0 {
            return;
        }
        if self.heap.len() < self.k {
            self.heap.push(doc);
        } else if let Some(worst) = self.heap.peek() {
            if doc.cmp(worst) == Ordering::Less {
                self.heap.pop();
                self.heap.push(doc);
            }
        }
    }

    /// Best-first order: descending score, ascending doc-id on ties.
    pub fn into_sorted_vec(self) -> Vec<ScoredDoc> {
        self.heap.into_sorted_vec()
    }
}
