//! Term-entry builder.
//!
//! Buffers one term's postings group-by-group (one group per posting: a
//! single doc-id, a single TF, or a run of position/offset deltas), then on
//! `finalize` splits the flattened, optionally delta-encoded value sequence
//! into full 128-value packed blocks plus a VarInt tail. Also emits the
//! per-posting `(block_index, in_block_index)` table that feeds skip-list
//! construction — the direct analogue of the C++ original's
//! `GeneralTermEntry::LocationTable` in `flash_engine_dumper.h`.

use crate::packed::{PackedBlockWriter, BLOCK_LEN};
use crate::varint;

/// How successive values in a stream relate to their predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaMode {
    /// Values are stored as-is (term frequencies).
    None,
    /// Delta against the previous value in the whole stream (doc-ids).
    Continuous,
    /// Delta against the previous value, reset to zero at each posting
    /// boundary (positions, offsets — an explicit invariant).
    PerPosting,
}

/// Where a posting's first value lands once the stream is packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingLocation {
    pub block_index: usize,
    pub in_block_index: usize,
}

/// The serialized form of one stream (doc, tf, pos, or off) for one term.
pub struct TermEntryBlob {
    /// Each element is one fully serialized 128-value packed block.
    pub blocks: Vec<Vec<u8>>,
    /// VarInt-encoded remainder (`n % 128` values), concatenated.
    pub tail: Vec<u8>,
    /// Per-posting location of that posting's first value in this stream.
    pub locations: Vec<PostingLocation>,
    pub n_values: usize,
    pub n_postings: usize,
}

pub struct TermEntryBuilder {
    mode: DeltaMode,
    flat: Vec<u32>,
    posting_sizes: Vec<usize>,
}

impl TermEntryBuilder {
    pub fn new(mode: DeltaMode) -> Self {
        Self { mode, flat: Vec::new(), posting_sizes: Vec::new() }
    }

    /// Add one posting's worth of raw (pre-delta) values.
    pub fn add_posting(&mut self, values: &[u32]) {
        self.flat.extend_from_slice(values);
        self.posting_sizes.push(values.len());
    }

    fn apply_delta(&self) -> Vec<u32> {
        match self.mode {
            DeltaMode::None => self.flat.clone(),
            DeltaMode::Continuous => {
                let mut out = Vec::with_capacity(self.flat.len());
                let mut prev = 0u32;
                for &v in &self.flat {
                    out.push(v - prev);
                    prev = v;
                }
                out
            }
            DeltaMode::PerPosting => {
                let mut out = Vec::with_capacity(self.flat.len());
                let mut idx = 0usize;
                for &size in &self.posting_sizes {
                    let mut prev = 0u32;
                    for _ in 0..size {
                        let v = self.flat[idx];
                        out.push(v - prev);
                        prev = v;
                        idx += 1;
                    }
                }
                out
            }
        }
    }

    fn locations(&self) -> Vec<PostingLocation> {
        let mut locations = Vec::with_capacity(self.posting_sizes.len());
        let mut val_index = 0usize;
        for &size in &self.posting_sizes {
            locations.push(PostingLocation {
                block_index: val_index / BLOCK_LEN,
                in_block_index: val_index % BLOCK_LEN,
            });
            val_index += size;
        }
        locations
    }

    pub fn finalize(self) -> TermEntryBlob {
        let locations = self.locations();
        let n_postings = self.posting_sizes.len();
        let vals = self.apply_delta();
        let n_values = vals.len();

        let n_packs = n_values / BLOCK_LEN;
        let mut blocks = Vec::with_capacity(n_packs);
        for pack_i in 0..n_packs {
            let mut writer = PackedBlockWriter::new();
            for offset in 0..BLOCK_LEN {
                writer.add(vals[pack_i * BLOCK_LEN + offset]);
            }
            blocks.push(writer.serialize());
        }

        let mut tail = Vec::new();
        for &v in &vals[n_packs * BLOCK_LEN..] {
            varint::encode_u32(v, &mut tail);
        }

        TermEntryBlob { blocks, tail, locations, n_values, n_postings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_id_stream_deltas_continuously() {
        let mut builder = TermEntryBuilder::new(DeltaMode::Continuous);
        for doc_id in [3u32, 10, 10 + 5, 40] {
            builder.add_posting(&[doc_id]);
        }
        let blob = builder.finalize();
        assert_eq!(blob.n_values, 4);
        assert_eq!(blob.tail, {
            let mut buf = Vec::new();
            for v in [3u32, 7, 5, 25] {
                varint::encode_u32(v, &mut buf);
            }
            buf
        });
    }

    #[test]
    fn position_stream_resets_delta_per_posting() {
        let mut builder = TermEntryBuilder::new(DeltaMode::PerPosting);
        builder.add_posting(&[2, 5, 9]); // posting 0: positions 2,5,9
        builder.add_posting(&[1, 3]); // posting 1: positions 1,3 (reset)
        let blob = builder.finalize();

        let mut expected = Vec::new();
        for v in [2u32, 3, 4, 1, 2] {
            varint::encode_u32(v, &mut expected);
        }
        assert_eq!(blob.tail, expected);
        assert_eq!(blob.locations[0], PostingLocation { block_index: 0, in_block_index: 0 });
        assert_eq!(blob.locations[1], PostingLocation { block_index: 0, in_block_index: 3 });
    }

    #[test]
    fn locations_track_block_boundaries_across_many_postings() {
        let mut builder = TermEntryBuilder::new(DeltaMode::None);
        // 130 single-value postings: posting 128 starts the varint tail.
        for i in 0..130u32 {
            builder.add_posting(&[i]);
        }
        let blob = builder.finalize();
        assert_eq!(blob.blocks.len(), 1);
        assert_eq!(blob.locations[0], PostingLocation { block_index: 0, in_block_index: 0 });
        assert_eq!(blob.locations[127], PostingLocation { block_index: 0, in_block_index: 127 });
        assert_eq!(blob.locations[128], PostingLocation { block_index: 1, in_block_index: 0 });
        assert_eq!(blob.n_postings, 130);
    }
}
