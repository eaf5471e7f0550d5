//! Per-term skip list.
//!
//! Samples one entry every 128 postings with pointers into all four stream
//! files, so a query can jump near a target doc-id instead of scanning the
//! whole posting list. Doc/TF streams are one-value-per-posting, so their
//! in-block index at a boundary is always `k % 128` and is not stored;
//! position/offset streams run at a different cadence and need their
//! in-block index recorded explicitly.

use crate::dumper::TermStreamOffsets;
use crate::packed::BLOCK_LEN;
use crate::term_entry::PostingLocation;
use crate::varint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipEntry {
    pub doc_skip: u32,
    pub doc_file_offset: u64,
    pub tf_file_offset: u64,
    pub pos_file_offset: u64,
    pub off_file_offset: u64,
    /// Block index of the referenced block within each stream, so a jump
    /// lands on a cursor that already knows whether it sits in the packed
    /// region or the VarInt tail.
    pub doc_block_index: u32,
    pub tf_block_index: u32,
    pub pos_block_index: u32,
    pub off_block_index: u32,
    pub pos_in_block_index: u32,
    pub off_in_block_index: u32,
}

/// Builds a skip list from the stream offsets and per-stream posting
/// locations recorded while dumping one term.
pub fn build(
    doc_ids: &[u32],
    offsets: &TermStreamOffsets,
    doc_locs: &[PostingLocation],
    tf_locs: &[PostingLocation],
    pos_locs: &[PostingLocation],
    off_locs: &[PostingLocation],
) -> Vec<SkipEntry> {
    let n = doc_ids.len();
    let n_entries = n / BLOCK_LEN;
    let mut entries = Vec::with_capacity(n_entries);
    for i in 0..n_entries {
        let k = BLOCK_LEN * (i + 1) - 1;
        entries.push(SkipEntry {
            doc_skip: doc_ids[k],
            doc_file_offset: offsets.doc.file_offset(doc_locs[k].block_index),
            tf_file_offset: offsets.tf.file_offset(tf_locs[k].block_index),
            pos_file_offset: offsets.pos.file_offset(pos_locs[k].block_index),
            off_file_offset: offsets.off.file_offset(off_locs[k].block_index),
            doc_block_index: doc_locs[k].block_index as u32,
            tf_block_index: tf_locs[k].block_index as u32,
            pos_block_index: pos_locs[k].block_index as u32,
            off_block_index: off_locs[k].block_index as u32,
            pos_in_block_index: pos_locs[k].in_block_index as u32,
            off_in_block_index: off_locs[k].in_block_index as u32,
        });
    }
    entries
}

pub fn serialize(entries: &[SkipEntry]) -> Vec<u8> {
    let mut buf = Vec::new();
    varint::encode(entries.len() as u64, &mut buf);
    for e in entries {
        varint::encode_u32(e.doc_skip, &mut buf);
        varint::encode(e.doc_file_offset, &mut buf);
        varint::encode(e.tf_file_offset, &mut buf);
        varint::encode(e.pos_file_offset, &mut buf);
        varint::encode(e.off_file_offset, &mut buf);
        varint::encode_u32(e.doc_block_index, &mut buf);
        varint::encode_u32(e.tf_block_index, &mut buf);
        varint::encode_u32(e.pos_block_index, &mut buf);
        varint::encode_u32(e.off_block_index, &mut buf);
        varint::encode_u32(e.pos_in_block_index, &mut buf);
        varint::encode_u32(e.off_in_block_index, &mut buf);
    }
    buf
}

/// Read-only view over a serialized skip list, typically backed by mmapped
/// term-dict memory.
pub struct SkipList<'a> {
    bytes: &'a [u8],
    /// Byte offset of each entry's first field within `bytes`.
    entry_starts: Vec<usize>,
}

impl<'a> SkipList<'a> {
    pub fn parse(bytes: &'a [u8]) -> Self {
        let (n, mut offset) = varint::decode(bytes, 0);
        let mut entry_starts = Vec::with_capacity(n as usize);
        for _ in 0..n {
            entry_starts.push(offset);
            for _ in 0..11 {
                let (_, read) = varint::decode(bytes, offset);
                offset += read;
            }
        }
        Self { bytes, entry_starts }
    }

    pub fn len(&self) -> usize {
        self.entry_starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_starts.is_empty()
    }

    pub fn entry(&self, i: usize) -> SkipEntry {
        let mut offset = self.entry_starts[i];
        let mut next = || {
            let (v, read) = varint::decode(self.bytes, offset);
            offset += read;
            v
        };
        let doc_skip = next() as u32;
        let doc_file_offset = next();
        let tf_file_offset = next();
        let pos_file_offset = next();
        let off_file_offset = next();
        let doc_block_index = next() as u32;
        let tf_block_index = next() as u32;
        let pos_block_index = next() as u32;
        let off_block_index = next() as u32;
        let pos_in_block_index = next() as u32;
        let off_in_block_index = next() as u32;
        SkipEntry {
            doc_skip,
            doc_file_offset,
            tf_file_offset,
            pos_file_offset,
            off_file_offset,
            doc_block_index,
            tf_block_index,
            pos_block_index,
            off_block_index,
            pos_in_block_index,
            off_in_block_index,
        }
    }

    /// Greatest `i` such that `entry(i).doc_skip < target_doc_id`, or `None`
    /// if no entry qualifies (a conventional "none" sentinel).
    pub fn locate(&self, target_doc_id: u32) -> Option<usize> {
        let n = self.len();
        if n == 0 {
            return None;
        }
        // Binary search for the first entry with doc_skip >= target; the
        // answer is one before that.
        let mut lo = 0usize;
        let mut hi = n;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.entry(mid).doc_skip < target_doc_id {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo == 0 {
            None
        } else {
            Some(lo - 1)
        }
    }
}

/// The full kind=0 term-dict payload: where block 0 of each stream starts,
/// how many full packed blocks each stream holds, and the skip list itself.
/// Block counts let a posting iterator tell a packed block from the VarInt
/// tail apart after jumping straight to an absolute file offset.
#[derive(Debug, Clone, Copy)]
pub struct StreamStart {
    pub offset: u64,
    pub n_packs: u32,
}

pub struct TermPostingsHeader<'a> {
    pub doc: StreamStart,
    pub tf: StreamStart,
    pub pos: StreamStart,
    pub off: StreamStart,
    pub skip: SkipList<'a>,
}

impl<'a> TermPostingsHeader<'a> {
    pub fn serialize(doc: StreamStart, tf: StreamStart, pos: StreamStart, off: StreamStart, entries: &[SkipEntry]) -> Vec<u8> {
        let mut buf = Vec::new();
        for s in [doc, tf, pos, off] {
            varint::encode(s.offset, &mut buf);
            varint::encode_u32(s.n_packs, &mut buf);
        }
        buf.extend_from_slice(&serialize(entries));
        buf
    }

    pub fn parse(bytes: &'a [u8]) -> Self {
        let mut offset = 0usize;
        let mut next_start = || {
            let (o, read) = varint::decode(bytes, offset);
            offset += read;
            let (n, read) = varint::decode_u32(bytes, offset);
            offset += read;
            StreamStart { offset: o, n_packs: n }
        };
        let doc = next_start();
        let tf = next_start();
        let pos = next_start();
        let off = next_start();
        let skip = SkipList::parse(&bytes[offset..]);
        Self { doc, tf, pos, off, skip }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entries() -> Vec<SkipEntry> {
        vec![
            SkipEntry {
                doc_skip: 127,
                doc_file_offset: 0,
                tf_file_offset: 0,
                pos_file_offset: 0,
                off_file_offset: 0,
                doc_block_index: 0,
                tf_block_index: 0,
                pos_block_index: 0,
                off_block_index: 0,
                pos_in_block_index: 0,
                off_in_block_index: 0,
            },
            SkipEntry {
                doc_skip: 255,
                doc_file_offset: 10,
                tf_file_offset: 10,
                pos_file_offset: 40,
                off_file_offset: 80,
                doc_block_index: 1,
                tf_block_index: 1,
                pos_block_index: 2,
                off_block_index: 4,
                pos_in_block_index: 3,
                off_in_block_index: 6,
            },
            SkipEntry {
                doc_skip: 400,
                doc_file_offset: 20,
                tf_file_offset: 20,
                pos_file_offset: 90,
                off_file_offset: 180,
                doc_block_index: 2,
                tf_block_index: 2,
                pos_block_index: 5,
                off_block_index: 9,
                pos_in_block_index: 1,
                off_in_block_index: 2,
            },
        ]
    }

    #[test]
    fn round_trips_through_serialization() {
        let entries = sample_entries();
        let bytes = serialize(&entries);
        let parsed = SkipList::parse(&bytes);
        assert_eq!(parsed.len(), 3);
        for (i, e) in entries.iter().enumerate() {
            assert_eq!(parsed.entry(i), *e);
        }
    }

    #[test]
    fn locate_finds_greatest_entry_below_target() {
        let entries = sample_entries();
        let bytes = serialize(&entries);
        let parsed = SkipList::parse(&bytes);

        assert_eq!(parsed.locate(100), None); // below every doc_skip
        assert_eq!(parsed.locate(128), Some(0));
        assert_eq!(parsed.locate(256), Some(1));
        assert_eq!(parsed.locate(1000), Some(2));
    }

    #[test]
    fn postings_header_round_trips_starts_and_skip_list() {
        let entries = sample_entries();
        let doc = StreamStart { offset: 0, n_packs: 3 };
        let tf = StreamStart { offset: 100, n_packs: 3 };
        let pos = StreamStart { offset: 400, n_packs: 6 };
        let off = StreamStart { offset: 900, n_packs: 10 };
        let bytes = TermPostingsHeader::serialize(doc, tf, pos, off, &entries);
        let parsed = TermPostingsHeader::parse(&bytes);
        assert_eq!(parsed.doc.offset, 0);
        assert_eq!(parsed.doc.n_packs, 3);
        assert_eq!(parsed.off.offset, 900);
        assert_eq!(parsed.off.n_packs, 10);
        assert_eq!(parsed.skip.len(), 3);
        assert_eq!(parsed.skip.entry(1), entries[1]);
    }

    #[test]
    fn empty_skip_list_locates_nothing() {
        let bytes = serialize(&[]);
        let parsed = SkipList::parse(&bytes);
        assert!(parsed.is_empty());
        assert_eq!(parsed.locate(5), None);
    }
}
