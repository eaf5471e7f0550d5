//! Highlighter.
//!
//! Splits a document body into sentence-bounded passages, scores each
//! passage by how many distinct query terms land inside it, and emits the
//! top `n` passages with matched tokens wrapped in literal `<b>`…`<\b>`
//! delimiters. The sentence splitter uses a simple rule rather than chasing
//! ICU bug-for-bug compatibility (Unicode UAX #29 sentence boundaries,
//! simplified): a boundary falls after `.`, `!`, or `?` when followed by
//! whitespace or end-of-input.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Passage {
    pub start: usize,
    pub end: usize,
}

/// Split `body` into sentence-bounded byte ranges. An empty body yields no
/// passages.
pub fn split_sentences(body: &str) -> Vec<Passage> {
    let bytes = body.as_bytes();
    if bytes.is_empty() {
        return Vec::new();
    }
    let mut passages = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        let c = bytes[i];
        if c == b'.' || c == b'!' || c == b'?' {
            let at_boundary = match bytes.get(i + 1) {
                None => true,
                Some(b) => b.is_ascii_whitespace(),
            };
            if at_boundary {
                passages.push(Passage { start, end: i + 1 });
                let mut j = i + 1;
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                start = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    if start < bytes.len() {
        passages.push(Passage { start, end: bytes.len() });
    }
    passages
}

/// One term's matched byte ranges in the document body, keyed by term text.
/// Each `(s, e)` is inclusive on both ends — a one-byte match has `s == e`.
pub type TermOffsets<'a> = HashMap<&'a str, Vec<(u32, u32)>>;

/// Build up to `n_passages` highlighted snippets for `body` given each query
/// term's byte offsets in it. Query terms should be supplied in the order
/// they should win ties for emphasis, though output order always follows
/// the body's natural reading order.
pub fn highlight(body: &str, term_offsets: &TermOffsets<'_>, n_passages: usize) -> String {
    if body.is_empty() || n_passages == 0 {
        return String::new();
    }
    let passages = split_sentences(body);
    if passages.is_empty() {
        return String::new();
    }

    let mut occurrences: Vec<Vec<(u32, u32)>> = vec![Vec::new(); passages.len()];
    for offsets in term_offsets.values() {
        for &(s, e) in offsets {
            if let Some(pi) = passages.iter().position(|p| (p.start as u32) <= s && e < p.end as u32) {
                occurrences[pi].push((s, e));
            }
        }
    }

    let mut scored: Vec<(usize, f64)> = passages
        .iter()
        .enumerate()
        .map(|(pi, _)| {
            let distinct_terms = term_offsets
                .values()
                .filter(|offs| offs.iter().any(|&(s, e)| (passages[pi].start as u32) <= s && e < passages[pi].end as u32))
                .count() as f64;
            let total_occurrences = occurrences[pi].len() as f64;
            (pi, total_occurrences * distinct_terms)
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then(a.0.cmp(&b.0)));
    let mut chosen: Vec<usize> = scored.into_iter().take(n_passages).map(|(pi, _)| pi).collect();
    chosen.sort_unstable();

    let bytes = body.as_bytes();
    let mut out = String::new();
    for pi in chosen {
        let passage = passages[pi];
        let mut spans = occurrences[pi].clone();
        spans.sort_by_key(|&(s, _)| s);

        let mut cursor = passage.start as u32;
        for (s, e) in spans {
            if s < cursor {
                continue; // overlapping token, already covered
            }
            out.push_str(std::str::from_utf8(&bytes[cursor as usize..s as usize]).unwrap_or(""));
            out.push_str("<b>");
            out.push_str(std::str::from_utf8(&bytes[s as usize..=e as usize]).unwrap_or(""));
            out.push_str("<\\b>");
            cursor = e + 1;
        }
        out.push_str(std::str::from_utf8(&bytes[cursor as usize..passage.end]).unwrap_or(""));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn determinism_reference_case() {
        let mut offsets: TermOffsets = HashMap::new();
        offsets.insert("hello", vec![(0, 4)]);
        offsets.insert("world", vec![(6, 10)]);
        let out = highlight("hello world", &offsets, 3);
        assert_eq!(out, "<b>hello<\\b> <b>world<\\b>\n");
    }

    #[test]
    fn empty_body_yields_empty_string() {
        let offsets: TermOffsets = HashMap::new();
        assert_eq!(highlight("", &offsets, 3), "");
    }

    #[test]
    fn single_character_match() {
        let mut offsets: TermOffsets = HashMap::new();
        offsets.insert("a", vec![(0, 0)]);
        assert_eq!(highlight("a", &offsets, 3), "<b>a<\\b>\n");
    }

    #[test]
    fn no_matches_emits_unhighlighted_leading_passages() {
        let offsets: TermOffsets = HashMap::new();
        let out = highlight("First sentence. Second sentence.", &offsets, 3);
        assert_eq!(out, "First sentence.\nSecond sentence.\n");
    }

    #[test]
    fn sentence_splitter_breaks_on_terminal_punctuation() {
        let passages = split_sentences("Hello world. This is Kan. Madison!");
        assert_eq!(passages.len(), 3);
        assert_eq!(&"Hello world. This is Kan. Madison!"[passages[0].start..passages[0].end], "Hello world.");
        assert_eq!(&"Hello world. This is Kan. Madison!"[passages[2].start..passages[2].end], "Madison!");
    }
}
