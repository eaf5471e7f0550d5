//! Mmap reader + posting iterator.
//!
//! Opens the four stream files plus the term dictionary read-only via
//! `memmap2`, loads the term index fully into memory, and hands out
//! per-term posting iterators. Everything downstream of `open` is a view
//! over borrowed mmap bytes — no copies until a caller asks for decoded
//! values.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::QueryError;
use crate::packed::{PackedBlockReader, BLOCK_LEN};
use crate::skiplist::{SkipList, StreamStart, TermPostingsHeader};
use crate::termdict::{self, TermDictEntry, TermIndex};
use crate::varint;

fn mmap_file(path: impl AsRef<Path>) -> Result<Mmap, QueryError> {
    let file = File::open(path)?;
    // Safety: the mapped files are owned by this index instance and never
    // mutated after the builder closes; callers never write through this
    // mapping themselves.
    unsafe { Mmap::map(&file) }.map_err(QueryError::Io)
}

pub struct FlashReader {
    doc_ids: Mmap,
    term_freqs: Mmap,
    positions: Mmap,
    offsets: Mmap,
    terms_tim: Mmap,
    term_index: TermIndex,
}

impl FlashReader {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, QueryError> {
        let dir = dir.as_ref();
        Ok(Self {
            doc_ids: mmap_file(dir.join("doc_ids.pack"))?,
            term_freqs: mmap_file(dir.join("term_freqs.pack"))?,
            positions: mmap_file(dir.join("positions.pack"))?,
            offsets: mmap_file(dir.join("offsets.pack"))?,
            terms_tim: mmap_file(dir.join("terms.tim"))?,
            term_index: TermIndex::load(dir.join("terms.tip")).map_err(QueryError::from)?,
        })
    }

    /// Look up a term and build a posting iterator for it. An absent term
    /// is not an error — it yields an iterator with zero postings.
    pub fn posting_iterator(&self, term: &str) -> Result<PostingIterator<'_>, QueryError> {
        let Some(entry_offset) = self.term_index.get(term) else {
            return Ok(PostingIterator::empty());
        };
        let (entry, _) = TermDictEntry::parse(&self.terms_tim, entry_offset as usize);
        match entry.kind {
            termdict::KIND_SKIP_LIST => {
                let header = TermPostingsHeader::parse(entry.payload);
                Ok(PostingIterator::from_header(self, header, entry.doc_freq))
            }
            termdict::KIND_INLINE => {
                let postings = termdict::inline::decode(entry.payload);
                Ok(PostingIterator::from_inline(postings))
            }
            other => Err(QueryError::Corrupted(format!("unknown term-dict entry kind {other}"))),
        }
    }

    pub fn term_count(&self) -> usize {
        self.term_index.len()
    }
}

/// Sequential cursor over one delta-encoded value stream: a run of packed
/// blocks followed by a VarInt tail. `next()` transparently crosses block
/// boundaries and the packed/tail transition.
#[derive(Clone, Copy)]
struct ValueCursor<'a> {
    bytes: &'a [u8],
    n_packs: u32,
    block_index: u32,
    in_block_index: u32,
    /// File offset of the start of the current block (while packed) or of
    /// the next unread byte (while in the VarInt tail).
    offset: u64,
}

impl<'a> ValueCursor<'a> {
    fn at_start(bytes: &'a [u8], start: StreamStart) -> Self {
        Self { bytes, n_packs: start.n_packs, block_index: 0, in_block_index: 0, offset: start.offset }
    }

    /// Build a cursor resuming at the posting whose stream-relative index is
    /// `(block_index, in_block_index)`, with `offset` the file offset of
    /// that block (while packed) or of the VarInt tail's first byte (while
    /// `block_index >= n_packs`). In the tail case `in_block_index` is the
    /// value's index *within* the tail, not a block-local index — the tail
    /// has no random access, so those `in_block_index` values are decoded
    /// and discarded here to land `offset` on the right one.
    fn at(bytes: &'a [u8], n_packs: u32, block_index: u32, in_block_index: u32, offset: u64) -> Self {
        let mut cursor = Self { bytes, n_packs, block_index, in_block_index: 0, offset };
        if block_index >= n_packs {
            cursor.skip(in_block_index as usize);
        } else {
            cursor.in_block_index = in_block_index;
        }
        cursor
    }

    fn next(&mut self) -> u32 {
        if self.block_index < self.n_packs {
            let reader = PackedBlockReader::new(&self.bytes[self.offset as usize..]);
            let v = reader.get(self.in_block_index as usize);
            self.in_block_index += 1;
            if self.in_block_index as usize == BLOCK_LEN {
                self.offset += reader.byte_len() as u64;
                self.in_block_index = 0;
                self.block_index += 1;
            }
            v
        } else {
            let (v, read) = varint::decode_u32(self.bytes, self.offset as usize);
            self.offset += read as u64;
            v
        }
    }

    fn skip(&mut self, n: usize) {
        for _ in 0..n {
            self.next();
        }
    }
}

/// An inline (kind=1) term's postings, already fully decoded, walked with a
/// plain index instead of stream cursors.
struct InlineCursor {
    postings: Vec<termdict::inline::InlinePosting>,
}

enum Backing<'a> {
    Empty,
    Packed {
        doc: ValueCursor<'a>,
        tf: ValueCursor<'a>,
        pos: ValueCursor<'a>,
        off: ValueCursor<'a>,
        skip: SkipList<'a>,
    },
    Inline(InlineCursor),
}

/// Iterates one term's postings. `positions()`/`offsets()` borrow `self`
/// mutably, so the type system forbids holding two sub-iterators — or
/// calling `advance`/`skip_to` while one is alive — at the same time.
pub struct PostingIterator<'a> {
    backing: Backing<'a>,
    doc_freq: u32,
    k: usize,
    cur_doc_id: u32,
    cur_tf: u32,
    positions_taken: bool,
    offsets_taken: bool,
    ended: bool,
}

impl<'a> PostingIterator<'a> {
    pub fn empty() -> Self {
        Self {
            backing: Backing::Empty,
            doc_freq: 0,
            k: 0,
            cur_doc_id: 0,
            cur_tf: 0,
            positions_taken: false,
            offsets_taken: false,
            ended: true,
        }
    }

    fn from_header(reader: &'a FlashReader, header: TermPostingsHeader<'a>, doc_freq: u32) -> Self {
        let doc = ValueCursor::at_start(&reader.doc_ids, header.doc);
        let tf = ValueCursor::at_start(&reader.term_freqs, header.tf);
        let pos = ValueCursor::at_start(&reader.positions, header.pos);
        let off = ValueCursor::at_start(&reader.offsets, header.off);
        let mut it = Self {
            backing: Backing::Packed { doc, tf, pos, off, skip: header.skip },
            doc_freq,
            k: 0,
            cur_doc_id: 0,
            cur_tf: 0,
            positions_taken: false,
            offsets_taken: false,
            ended: doc_freq == 0,
        };
        if !it.ended {
            it.load_current();
        }
        it
    }

    fn from_inline(postings: Vec<termdict::inline::InlinePosting>) -> Self {
        let doc_freq = postings.len() as u32;
        let mut it = Self {
            backing: Backing::Inline(InlineCursor { postings }),
            doc_freq,
            k: 0,
            cur_doc_id: 0,
            cur_tf: 0,
            positions_taken: false,
            offsets_taken: false,
            ended: doc_freq == 0,
        };
        if !it.ended {
            it.load_current();
        }
        it
    }

    fn load_current(&mut self) {
        match &mut self.backing {
            Backing::Empty => {}
            Backing::Packed { doc, tf, .. } => {
                self.cur_doc_id = self.cur_doc_id.wrapping_add(doc.next());
                self.cur_tf = tf.next();
            }
            Backing::Inline(cursor) => {
                let p = &cursor.postings[self.k];
                self.cur_doc_id = p.doc_id;
                self.cur_tf = p.positions.len() as u32;
            }
        }
        self.positions_taken = false;
        self.offsets_taken = false;
    }

    pub fn is_end(&self) -> bool {
        self.ended
    }

    pub fn doc_id(&self) -> u32 {
        self.cur_doc_id
    }

    pub fn tf(&self) -> u32 {
        self.cur_tf
    }

    /// Total postings in this term's list — used to pick the intersection
    /// driver (the lowest-doc-freq iterator).
    pub fn doc_freq(&self) -> u32 {
        self.doc_freq
    }

    pub fn advance(&mut self) {
        if self.ended {
            return;
        }
        self.drain_unread_substreams();
        self.k += 1;
        if self.k as u32 >= self.doc_freq {
            self.ended = true;
            return;
        }
        self.load_current();
    }

    fn drain_unread_substreams(&mut self) {
        if let Backing::Packed { pos, off, .. } = &mut self.backing {
            if !self.positions_taken {
                pos.skip(self.cur_tf as usize);
            }
            if !self.offsets_taken {
                off.skip(self.cur_tf as usize * 2);
            }
        }
    }

    /// Binary-searches the skip list for the greatest entry whose
    /// `doc_skip` is below the target, jumps all four stream cursors
    /// there, then advances one posting at a time until `doc_id() >=
    /// target_doc_id`.
    pub fn skip_to(&mut self, target_doc_id: u32) {
        if self.ended || self.cur_doc_id >= target_doc_id {
            return;
        }
        if let Backing::Packed { doc, tf, pos, off, skip } = &mut self.backing {
            if let Some(i) = skip.locate(target_doc_id) {
                let e = skip.entry(i);
                let boundary_k = BLOCK_LEN * (i + 1) - 1;
                let boundary_in_block = (boundary_k % BLOCK_LEN) as u32;
                *doc = ValueCursor::at(doc.bytes, doc.n_packs, e.doc_block_index, boundary_in_block, e.doc_file_offset);
                *tf = ValueCursor::at(tf.bytes, tf.n_packs, e.tf_block_index, boundary_in_block, e.tf_file_offset);
                *pos = ValueCursor::at(pos.bytes, pos.n_packs, e.pos_block_index, e.pos_in_block_index, e.pos_file_offset);
                *off = ValueCursor::at(off.bytes, off.n_packs, e.off_block_index, e.off_in_block_index, e.off_file_offset);

                self.k = boundary_k;
                self.cur_doc_id = e.doc_skip;
                doc.next(); // the skip key already told us this value; discard it
                self.cur_tf = tf.next();
                self.positions_taken = false;
                self.offsets_taken = false;
            }
        }
        while !self.ended && self.cur_doc_id < target_doc_id {
            self.advance();
        }
    }

    /// Decode the current posting's `tf()` positions, delta-reconstructed
    /// against a running total that resets to zero at this posting's
    /// start. May be called at most once per posting — a second call
    /// returns an empty list, matching the "fresh sub-iterator" contract:
    /// once consumed, the parent's cursor has moved past these values.
    pub fn positions(&mut self) -> Vec<u32> {
        if self.ended || self.positions_taken {
            return Vec::new();
        }
        self.positions_taken = true;
        let tf = self.cur_tf as usize;
        match &mut self.backing {
            Backing::Empty => Vec::new(),
            Backing::Packed { pos, .. } => {
                let mut running = 0u32;
                let mut out = Vec::with_capacity(tf);
                for _ in 0..tf {
                    running += pos.next();
                    out.push(running);
                }
                out
            }
            Backing::Inline(cursor) => cursor.postings[self.k].positions.clone(),
        }
    }

    /// Decode the current posting's `tf()` offset pairs, delta-reconstructed
    /// the same way as `positions()`. Same single-call-per-posting contract.
    pub fn offsets(&mut self) -> Vec<(u32, u32)> {
        if self.ended || self.offsets_taken {
            return Vec::new();
        }
        self.offsets_taken = true;
        let tf = self.cur_tf as usize;
        match &mut self.backing {
            Backing::Empty => Vec::new(),
            Backing::Packed { off, .. } => {
                let mut running = 0u32;
                let mut out = Vec::with_capacity(tf);
                for _ in 0..tf {
                    let start = running + off.next();
                    let end = start + off.next();
                    running = end;
                    out.push((start, end));
                }
                out
            }
            Backing::Inline(cursor) => cursor.postings[self.k].offsets.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_cursor_crosses_block_boundary_into_tail() {
        // Build a tiny packed+tail stream by hand: one block of 128 zeros,
        // then a two-value VarInt tail.
        use crate::packed::PackedBlockWriter;
        let mut w = PackedBlockWriter::new();
        for _ in 0..BLOCK_LEN {
            w.add(0);
        }
        let mut bytes = w.serialize();
        varint::encode_u32(5, &mut bytes);
        varint::encode_u32(9, &mut bytes);

        let mut cursor = ValueCursor::at_start(&bytes, StreamStart { offset: 0, n_packs: 1 });
        for _ in 0..BLOCK_LEN {
            assert_eq!(cursor.next(), 0);
        }
        assert_eq!(cursor.next(), 5);
        assert_eq!(cursor.next(), 9);
    }

    /// 129 postings for "tag": docs 0..63 mention it twice, docs 64..128
    /// mention it once. Posting 127 (the lone skip entry's boundary) then
    /// has its first position at stream index 191 — `block_index == n_packs
    /// == 1`, i.e. inside the VarInt tail — so a jump that ignores
    /// `in_block_index` there reads the tail's 0th value instead of its
    /// 63rd, corrupting everything decoded afterward.
    #[test]
    fn skip_to_crosses_tail_boundary_without_desync() {
        use crate::config::Config;
        use crate::ingest::IndexBuilder;

        let dir = tempfile::tempdir().unwrap();
        let config = Config::default(); // inline threshold 128, 129 postings forces the skip-list path
        let mut builder = IndexBuilder::create(dir.path(), &config).unwrap();

        for i in 0..64u32 {
            builder.add_document(&format!("tag tag {i}")).unwrap();
        }
        for i in 64..129u32 {
            builder.add_document(&format!("tag {i}")).unwrap();
        }
        builder.finalize().unwrap();

        let reader = FlashReader::open(dir.path()).unwrap();
        let mut it = reader.posting_iterator("tag").unwrap();
        assert_eq!(it.doc_freq(), 129);

        // Target 128 forces a real skip-list jump (locate() needs a
        // `doc_skip < target` entry, and the only entry's `doc_skip` is 127)
        // landing on posting 127, then walking one step to posting 128.
        it.skip_to(128);
        assert!(!it.is_end());
        assert_eq!(it.doc_id(), 128);
        assert_eq!(it.tf(), 1);
        assert_eq!(it.positions(), vec![0]);
        assert_eq!(it.offsets(), vec![(0, 2)]);
    }

    /// `skip_to` past the last posting ends the iterator instead of
    /// returning a stale doc-id.
    #[test]
    fn skip_to_past_last_posting_ends_iterator() {
        use crate::config::Config;
        use crate::ingest::IndexBuilder;

        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let mut builder = IndexBuilder::create(dir.path(), &config).unwrap();
        for i in 0..150u32 {
            builder.add_document(&format!("tag {i}")).unwrap();
        }
        builder.finalize().unwrap();

        let reader = FlashReader::open(dir.path()).unwrap();
        let mut it = reader.posting_iterator("tag").unwrap();
        it.skip_to(10_000);
        assert!(it.is_end());
    }
}
