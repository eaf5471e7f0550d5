//! Document data model.
//!
//! A document is an immutable record assigned a monotonically increasing
//! id at ingest time. Tokenization (see [`crate::tokenizer`]) turns its body
//! into a position-ordered token sequence with parallel byte offsets;
//! grouping that sequence by term into per-term position/offset lists — the
//! posting-construction step — happens downstream in the ingest builder, not
//! here.

/// An ingested document: a numeric id and its raw UTF-8 body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: u32,
    pub body: String,
}

impl Document {
    pub fn new(id: u32, body: impl Into<String>) -> Self {
        Self { id, body: body.into() }
    }
}

/// A document's body after whitespace tokenization. `tokens[i]` is the term
/// text at position `i`, occupying byte range `offsets[i]` in the original
/// body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizedDocument {
    pub tokens: Vec<String>,
    pub offsets: Vec<(u32, u32)>,
}

impl TokenizedDocument {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_stores_id_and_body_verbatim() {
        let doc = Document::new(7, "hello world");
        assert_eq!(doc.id, 7);
        assert_eq!(doc.body, "hello world");
    }

    #[test]
    fn tokenized_document_len_tracks_token_count() {
        let td = TokenizedDocument {
            tokens: vec!["hello".to_string(), "world".to_string()],
            offsets: vec![(0, 5), (6, 11)],
        };
        assert_eq!(td.len(), 2);
        assert!(!td.is_empty());
        assert!(TokenizedDocument::default().is_empty());
    }
}
