//! Tab-separated line-doc parser.
//!
//! One document per line: `title\turl\tbody[\ttokens\toffsets\tpositions]`.
//! The three trailing columns are optional — when absent, the body is
//! tokenized by [`crate::tokenizer`] at ingest; when present, they carry a
//! pre-tokenized document (e.g. produced by an external tokenizer) and are
//! trusted as-is. Per distinct term, in first-occurrence order: `tokens` is
//! whitespace-separated term text, `offsets` is that term's `start,end`
//! pairs (inclusive on both ends — a one-byte token has `start == end`)
//! joined by `;` and terminated by `.`, and `positions` is that term's
//! token indices joined by `,` and terminated by `.` — both columns
//! concatenate their per-term groups with no separator between groups,
//! since the trailing `.` already marks the boundary.

use crate::document::TokenizedDocument;
use crate::error::FlashError;

/// One parsed line-doc record.
#[derive(Debug, Clone)]
pub struct LineDoc {
    pub title: String,
    pub url: String,
    pub body: String,
    /// Present only when the line carried the optional pre-tokenized columns.
    pub pretokenized: Option<TokenizedDocument>,
}

/// Parse a single line. Returns `Err` on too few columns or malformed
/// offsets/positions groups.
pub fn parse_line(line: &str, line_no: usize) -> Result<LineDoc, FlashError> {
    let mut cols = line.split('\t');
    let title = cols
        .next()
        .ok_or_else(|| FlashError::Input { line: line_no, reason: "missing title column".into() })?
        .to_string();
    let url = cols
        .next()
        .ok_or_else(|| FlashError::Input { line: line_no, reason: "missing url column".into() })?
        .to_string();
    let body = cols
        .next()
        .ok_or_else(|| FlashError::Input { line: line_no, reason: "missing body column".into() })?
        .to_string();

    let rest: Vec<&str> = cols.collect();
    let pretokenized = match rest.as_slice() {
        [] => None,
        [tokens, offsets, positions] => Some(parse_pretokenized(tokens, offsets, positions, line_no)?),
        _ => {
            return Err(FlashError::Input {
                line: line_no,
                reason: format!("expected 3 or 6 columns, found {} extra", rest.len()),
            })
        }
    };

    Ok(LineDoc { title, url, body, pretokenized })
}

fn parse_pretokenized(tokens_col: &str, offsets_col: &str, positions_col: &str, line_no: usize) -> Result<TokenizedDocument, FlashError> {
    let terms: Vec<&str> = tokens_col.split_whitespace().collect();
    let offset_groups = split_dot_terminated(offsets_col);
    let position_groups = split_dot_terminated(positions_col);
    if offset_groups.len() != terms.len() || position_groups.len() != terms.len() {
        return Err(FlashError::Input {
            line: line_no,
            reason: "tokens/offsets/positions column counts disagree".into(),
        });
    }

    let mut tokens = Vec::new();
    let mut offsets = Vec::new();
    for ((term, offset_group), position_group) in terms.iter().zip(&offset_groups).zip(&position_groups) {
        let pairs = parse_offset_pairs(offset_group, line_no)?;
        let positions = parse_positions(position_group, line_no)?;
        if pairs.len() != positions.len() {
            return Err(FlashError::Input { line: line_no, reason: "offsets/positions arity mismatch for a term".into() });
        }
        for (&(start, end), _pos) in pairs.iter().zip(&positions) {
            tokens.push(term.to_string());
            offsets.push((start, end));
        }
    }
    Ok(TokenizedDocument { tokens, offsets })
}

/// Split a `.`-terminated sequence of groups into the groups themselves
/// (without their trailing `.`).
fn split_dot_terminated(s: &str) -> Vec<&str> {
    s.split('.').filter(|g| !g.is_empty()).collect()
}

fn parse_offset_pairs(group: &str, line_no: usize) -> Result<Vec<(u32, u32)>, FlashError> {
    group
        .split(';')
        .map(|pair| {
            let (s, e) = pair
                .split_once(',')
                .ok_or_else(|| FlashError::Input { line: line_no, reason: format!("malformed offset pair: {pair}") })?;
            let s: u32 = s.parse().map_err(|_| FlashError::Input { line: line_no, reason: format!("bad offset start: {s}") })?;
            let e: u32 = e.parse().map_err(|_| FlashError::Input { line: line_no, reason: format!("bad offset end: {e}") })?;
            Ok((s, e))
        })
        .collect()
}

fn parse_positions(group: &str, line_no: usize) -> Result<Vec<u32>, FlashError> {
    group
        .split(',')
        .map(|p| p.parse().map_err(|_| FlashError::Input { line: line_no, reason: format!("bad position: {p}") }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_three_column_line() {
        let doc = parse_line("Title\thttp://example\thello world", 1).unwrap();
        assert_eq!(doc.title, "Title");
        assert_eq!(doc.body, "hello world");
        assert!(doc.pretokenized.is_none());
    }

    #[test]
    fn parses_pretokenized_columns() {
        let line = "T\tu\thello world\thello world\t0,4.6,10.\t0.1.";
        let doc = parse_line(line, 1).unwrap();
        let td = doc.pretokenized.unwrap();
        assert_eq!(td.tokens, vec!["hello", "world"]);
        assert_eq!(td.offsets, vec![(0, 4), (6, 10)]);
    }

    #[test]
    fn missing_body_column_is_an_input_error() {
        assert!(parse_line("title\turl", 3).is_err());
    }

    #[test]
    fn malformed_offset_pair_is_an_input_error() {
        let line = "T\tu\thello\thello\tbad.\t0.";
        assert!(parse_line(line, 5).is_err());
    }
}
