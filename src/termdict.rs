//! Term dictionary + term index.
//!
//! `terms.tim` is a flat sequence of entries, each a three-VarInt header
//! `{kind, doc_freq, payload_len}` followed by `payload_len` bytes. `kind=0`
//! entries carry a serialized skip list; `kind=1` entries carry a compact
//! inline posting list for terms whose doc-freq is below
//! `Config::inline_posting_threshold`, skipping the skip list entirely.
//! `terms.tip` is the separately persisted term→offset mapping, loaded
//! wholly into memory on open.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::error::FlashError;
use crate::varint;

pub const KIND_SKIP_LIST: u8 = 0;
pub const KIND_INLINE: u8 = 1;

/// A parsed view over one term-dict entry's header and payload.
#[derive(Debug, Clone, Copy)]
pub struct TermDictEntry<'a> {
    pub kind: u8,
    pub doc_freq: u32,
    pub payload: &'a [u8],
}

impl<'a> TermDictEntry<'a> {
    /// Parse the entry starting at `offset` in `bytes`. Returns the entry
    /// and the number of bytes consumed (header + payload).
    pub fn parse(bytes: &'a [u8], offset: usize) -> (Self, usize) {
        let mut cursor = offset;
        let (kind, n) = varint::decode(bytes, cursor);
        cursor += n;
        let (doc_freq, n) = varint::decode(bytes, cursor);
        cursor += n;
        let (payload_len, n) = varint::decode(bytes, cursor);
        cursor += n;
        let payload = &bytes[cursor..cursor + payload_len as usize];
        cursor += payload_len as usize;
        (
            Self { kind: kind as u8, doc_freq: doc_freq as u32, payload },
            cursor - offset,
        )
    }
}

/// Append-only writer for `terms.tim`.
pub struct TermDictWriter {
    file: File,
    path: std::path::PathBuf,
    offset: u64,
}

impl TermDictWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, FlashError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| FlashError::io(&path, e))?;
        Ok(Self { file, path, offset: 0 })
    }

    /// Append one entry, returning the file offset it starts at (this is
    /// what the term index records for this term).
    pub fn append_entry(&mut self, kind: u8, doc_freq: u32, payload: &[u8]) -> Result<u64, FlashError> {
        let start = self.offset;
        let mut header = Vec::with_capacity(10);
        varint::encode(kind as u64, &mut header);
        varint::encode_u32(doc_freq, &mut header);
        varint::encode(payload.len() as u64, &mut header);

        self.file.write_all(&header).map_err(|e| FlashError::io(&self.path, e))?;
        self.file.write_all(payload).map_err(|e| FlashError::io(&self.path, e))?;
        self.offset += (header.len() + payload.len()) as u64;
        Ok(start)
    }

    pub fn flush(&mut self) -> Result<(), FlashError> {
        self.file.sync_all().map_err(|e| FlashError::io(&self.path, e))
    }
}

/// Append-only writer for `terms.tip`.
pub struct TermIndexWriter {
    file: File,
    path: std::path::PathBuf,
}

impl TermIndexWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, FlashError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| FlashError::io(&path, e))?;
        Ok(Self { file, path })
    }

    pub fn append(&mut self, term: &str, entry_offset: u64) -> Result<(), FlashError> {
        writeln!(self.file, "{term}\t{entry_offset}").map_err(|e| FlashError::io(&self.path, e))
    }

    pub fn flush(&mut self) -> Result<(), FlashError> {
        self.file.sync_all().map_err(|e| FlashError::io(&self.path, e))
    }
}

/// Fully in-memory mapping term→offset-into-`terms.tim`, loaded once at open.
pub struct TermIndex {
    offsets: FxHashMap<String, u64>,
}

impl TermIndex {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FlashError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| FlashError::io(path, e))?;
        let reader = BufReader::new(file);
        let mut offsets = FxHashMap::default();
        for line in reader.lines() {
            let line = line.map_err(|e| FlashError::io(path, e))?;
            if line.is_empty() {
                continue;
            }
            let (term, offset_str) = line
                .rsplit_once('\t')
                .ok_or_else(|| FlashError::invariant("termdict", format!("malformed term-index line: {line}")))?;
            let offset: u64 = offset_str
                .parse()
                .map_err(|_| FlashError::invariant("termdict", format!("bad offset in line: {line}")))?;
            offsets.insert(term.to_string(), offset);
        }
        Ok(Self { offsets })
    }

    pub fn get(&self, term: &str) -> Option<u64> {
        self.offsets.get(term).copied()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Compact inline encoding for low-frequency terms: header-free sequence of
/// `(doc_id_delta, tf, positions[tf] delta-reset, offsets[tf] delta-reset)`.
pub mod inline {
    use crate::varint;

    pub struct InlinePosting {
        pub doc_id: u32,
        pub positions: Vec<u32>,
        pub offsets: Vec<(u32, u32)>,
    }

    pub fn encode(postings: &[InlinePosting]) -> Vec<u8> {
        let mut buf = Vec::new();
        varint::encode(postings.len() as u64, &mut buf);
        let mut prev_doc = 0u32;
        for p in postings {
            varint::encode_u32(p.doc_id - prev_doc, &mut buf);
            prev_doc = p.doc_id;
            varint::encode_u32(p.positions.len() as u32, &mut buf);

            let mut prev_pos = 0u32;
            for &pos in &p.positions {
                varint::encode_u32(pos - prev_pos, &mut buf);
                prev_pos = pos;
            }
            let mut prev_off = 0u32;
            for &(s, e) in &p.offsets {
                varint::encode_u32(s - prev_off, &mut buf);
                varint::encode_u32(e - s, &mut buf);
                prev_off = e;
            }
        }
        buf
    }

    pub fn decode(bytes: &[u8]) -> Vec<InlinePosting> {
        let mut cursor = 0usize;
        let (n, read) = varint::decode(bytes, cursor);
        cursor += read;
        let mut out = Vec::with_capacity(n as usize);
        let mut prev_doc = 0u32;
        for _ in 0..n {
            let (delta, read) = varint::decode_u32(bytes, cursor);
            cursor += read;
            let doc_id = prev_doc + delta;
            prev_doc = doc_id;

            let (tf, read) = varint::decode_u32(bytes, cursor);
            cursor += read;

            let mut positions = Vec::with_capacity(tf as usize);
            let mut prev_pos = 0u32;
            for _ in 0..tf {
                let (d, read) = varint::decode_u32(bytes, cursor);
                cursor += read;
                prev_pos += d;
                positions.push(prev_pos);
            }
            let mut offsets = Vec::with_capacity(tf as usize);
            let mut prev_off = 0u32;
            for _ in 0..tf {
                let (ds, read) = varint::decode_u32(bytes, cursor);
                cursor += read;
                let start = prev_off + ds;
                let (de, read) = varint::decode_u32(bytes, cursor);
                cursor += read;
                let end = start + de;
                offsets.push((start, end));
                prev_off = end;
            }
            out.push(InlinePosting { doc_id, positions, offsets });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_header_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = TermDictWriter::create(dir.path().join("terms.tim")).unwrap();
        let off1 = writer.append_entry(KIND_SKIP_LIST, 300, b"skiplistbytes").unwrap();
        let off2 = writer.append_entry(KIND_INLINE, 2, b"ab").unwrap();
        writer.flush().unwrap();
        assert_eq!(off1, 0);
        assert!(off2 > off1);

        let bytes = std::fs::read(dir.path().join("terms.tim")).unwrap();
        let (e1, consumed1) = TermDictEntry::parse(&bytes, 0);
        assert_eq!(e1.kind, KIND_SKIP_LIST);
        assert_eq!(e1.doc_freq, 300);
        assert_eq!(e1.payload, b"skiplistbytes");

        let (e2, _) = TermDictEntry::parse(&bytes, consumed1);
        assert_eq!(e2.kind, KIND_INLINE);
        assert_eq!(e2.doc_freq, 2);
        assert_eq!(e2.payload, b"ab");
    }

    #[test]
    fn term_index_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terms.tip");
        let mut writer = TermIndexWriter::create(&path).unwrap();
        writer.append("hello", 0).unwrap();
        writer.append("world", 42).unwrap();
        writer.flush().unwrap();

        let index = TermIndex::load(&path).unwrap();
        assert_eq!(index.get("hello"), Some(0));
        assert_eq!(index.get("world"), Some(42));
        assert_eq!(index.get("zzz"), None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn inline_postings_round_trip() {
        let postings = vec![
            inline::InlinePosting { doc_id: 3, positions: vec![1, 4], offsets: vec![(0, 3), (10, 14)] },
            inline::InlinePosting { doc_id: 9, positions: vec![0], offsets: vec![(2, 5)] },
        ];
        let bytes = inline::encode(&postings);
        let decoded = inline::decode(&bytes);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].doc_id, 3);
        assert_eq!(decoded[0].positions, vec![1, 4]);
        assert_eq!(decoded[0].offsets, vec![(0, 3), (10, 14)]);
        assert_eq!(decoded[1].doc_id, 9);
        assert_eq!(decoded[1].positions, vec![0]);
    }
}
