//! Whitespace tokenization.
//!
//! Terms are exactly the whitespace-delimited substrings of the body — no
//! stemming, case-folding, or punctuation stripping. Query terms are
//! tokenized the same way so a stored term and a query term can only match
//! by exact byte equality.

use crate::document::TokenizedDocument;

/// Split `body` on whitespace, recording each token's byte range alongside
/// its text. Offsets are inclusive on both ends: `(s, e)` covers bytes `s`
/// through `e`, so a one-byte token has `s == e`.
pub fn tokenize(body: &str) -> TokenizedDocument {
    let mut tokens = Vec::new();
    let mut offsets = Vec::new();

    let mut start: Option<usize> = None;
    for (i, c) in body.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                tokens.push(body[s..i].to_string());
                offsets.push((s as u32, (i - 1) as u32));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(body[s..].to_string());
        offsets.push((s as u32, (body.len() - 1) as u32));
    }

    TokenizedDocument { tokens, offsets }
}

/// Tokenize a query string into its term sequence (duplicates kept, since
/// phrase queries care about order and repetition).
pub fn tokenize_query(query: &str) -> Vec<String> {
    tokenize(query).tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_single_spaces() {
        let td = tokenize("hello world");
        assert_eq!(td.tokens, vec!["hello", "world"]);
        assert_eq!(td.offsets, vec![(0, 4), (6, 10)]);
    }

    #[test]
    fn collapses_runs_of_whitespace() {
        let td = tokenize("  hello   world  ");
        assert_eq!(td.tokens, vec!["hello", "world"]);
        assert_eq!(td.offsets, vec![(2, 6), (10, 14)]);
    }

    #[test]
    fn preserves_punctuation_inside_tokens() {
        let td = tokenize("hello, world!");
        assert_eq!(td.tokens, vec!["hello,", "world!"]);
    }

    #[test]
    fn empty_body_yields_no_tokens() {
        let td = tokenize("");
        assert!(td.is_empty());
    }

    #[test]
    fn query_tokenization_keeps_duplicates_and_order() {
        let terms = tokenize_query("hello hello world");
        assert_eq!(terms, vec!["hello", "hello", "world"]);
    }
}
