//! File dumper.
//!
//! Appends one term's packed blocks and VarInt tail to the appropriate
//! stream file, recording the absolute file offset of every block so the
//! skip list can address them later. The original `FileDumper` this is
//! grounded on (`flash_engine_dumper.h` in the C++ source) left
//! `DumpPackedBlock` falling off the end of the function with no explicit
//! return value; here `dump_packed_block` always returns the block's
//! starting offset explicitly.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::FlashError;
use crate::term_entry::TermEntryBlob;

/// Where every packed block (and the VarInt tail, if any) of one stream for
/// one term landed on disk.
#[derive(Debug, Clone, Default)]
pub struct PackFileOffsets {
    pub pack_offs: Vec<u64>,
    pub vints_off: Option<u64>,
}

impl PackFileOffsets {
    pub fn n_packs(&self) -> usize {
        self.pack_offs.len()
    }

    /// Resolve a block index to its file offset, treating `n_packs` as the
    /// address of the virtual trailing block holding the VarInt tail.
    pub fn file_offset(&self, block_index: usize) -> u64 {
        if block_index < self.pack_offs.len() {
            self.pack_offs[block_index]
        } else {
            self.vints_off
                .expect("block_index addresses an empty VarInt tail")
        }
    }
}

/// Append-only writer over a single stream file, tracking the current
/// absolute offset so every write can report where it landed.
pub struct StreamDumper {
    file: File,
    offset: u64,
}

impl StreamDumper {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, FlashError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| FlashError::io(path, e))?;
        Ok(Self { file, offset: 0 })
    }

    fn write_all_retrying(&mut self, path_hint: &Path, bytes: &[u8]) -> Result<(), FlashError> {
        let mut remaining = bytes;
        while !remaining.is_empty() {
            match self.file.write(remaining) {
                Ok(0) => {
                    return Err(FlashError::io(
                        path_hint,
                        std::io::Error::new(std::io::ErrorKind::WriteZero, "short write"),
                    ))
                }
                Ok(n) => {
                    remaining = &remaining[n..];
                    self.offset += n as u64;
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(FlashError::io(path_hint, e)),
            }
        }
        Ok(())
    }

    /// Append one packed block, returning the offset it starts at.
    pub fn dump_packed_block(&mut self, path_hint: &Path, block: &[u8]) -> Result<u64, FlashError> {
        let start = self.offset;
        self.write_all_retrying(path_hint, block)?;
        Ok(start)
    }

    /// Append every block plus the VarInt tail of one term's blob, recording
    /// where each piece landed.
    pub fn dump_blob(&mut self, path_hint: &Path, blob: &TermEntryBlob) -> Result<PackFileOffsets, FlashError> {
        let mut pack_offs = Vec::with_capacity(blob.blocks.len());
        for block in &blob.blocks {
            pack_offs.push(self.dump_packed_block(path_hint, block)?);
        }
        let vints_off = if blob.tail.is_empty() {
            None
        } else {
            let start = self.offset;
            self.write_all_retrying(path_hint, &blob.tail)?;
            Some(start)
        };
        Ok(PackFileOffsets { pack_offs, vints_off })
    }

    pub fn flush(&mut self, path_hint: &Path) -> Result<(), FlashError> {
        self.file.sync_all().map_err(|e| FlashError::io(path_hint, e))
    }
}

/// The four per-term stream offsets a skip list is built from.
#[derive(Debug, Clone, Default)]
pub struct TermStreamOffsets {
    pub doc: PackFileOffsets,
    pub tf: PackFileOffsets,
    pub pos: PackFileOffsets,
    pub off: PackFileOffsets,
}

/// Owns the four parallel stream files and appends one term's blobs at a time.
pub struct FileDumper {
    doc_path: PathBuf,
    tf_path: PathBuf,
    pos_path: PathBuf,
    off_path: PathBuf,
    doc_ids: StreamDumper,
    term_freqs: StreamDumper,
    positions: StreamDumper,
    offsets: StreamDumper,
}

impl FileDumper {
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, FlashError> {
        let dir = dir.as_ref();
        let doc_path = dir.join("doc_ids.pack");
        let tf_path = dir.join("term_freqs.pack");
        let pos_path = dir.join("positions.pack");
        let off_path = dir.join("offsets.pack");
        Ok(Self {
            doc_ids: StreamDumper::create(&doc_path)?,
            term_freqs: StreamDumper::create(&tf_path)?,
            positions: StreamDumper::create(&pos_path)?,
            offsets: StreamDumper::create(&off_path)?,
            doc_path,
            tf_path,
            pos_path,
            off_path,
        })
    }

    pub fn dump_term(
        &mut self,
        doc: &TermEntryBlob,
        tf: &TermEntryBlob,
        pos: &TermEntryBlob,
        off: &TermEntryBlob,
    ) -> Result<TermStreamOffsets, FlashError> {
        Ok(TermStreamOffsets {
            doc: self.doc_ids.dump_blob(&self.doc_path.clone(), doc)?,
            tf: self.term_freqs.dump_blob(&self.tf_path.clone(), tf)?,
            pos: self.positions.dump_blob(&self.pos_path.clone(), pos)?,
            off: self.offsets.dump_blob(&self.off_path.clone(), off)?,
        })
    }

    pub fn flush(&mut self) -> Result<(), FlashError> {
        self.doc_ids.flush(&self.doc_path.clone())?;
        self.term_freqs.flush(&self.tf_path.clone())?;
        self.positions.flush(&self.pos_path.clone())?;
        self.offsets.flush(&self.off_path.clone())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term_entry::{DeltaMode, TermEntryBuilder};

    fn single_block_blob() -> TermEntryBlob {
        let mut builder = TermEntryBuilder::new(DeltaMode::None);
        for i in 0..130u32 {
            builder.add_posting(&[i]);
        }
        builder.finalize()
    }

    #[test]
    fn offsets_advance_across_successive_terms() {
        let dir = tempfile::tempdir().unwrap();
        let mut dumper = StreamDumper::create(dir.path().join("s.pack")).unwrap();
        let hint = dir.path().join("s.pack");

        let blob_a = single_block_blob();
        let offs_a = dumper.dump_blob(&hint, &blob_a).unwrap();
        assert_eq!(offs_a.pack_offs, vec![0]);
        assert_eq!(offs_a.vints_off, Some(blob_a.blocks[0].len() as u64));

        let blob_b = single_block_blob();
        let offs_b = dumper.dump_blob(&hint, &blob_b).unwrap();
        assert!(offs_b.pack_offs[0] > offs_a.pack_offs[0]);
    }

    #[test]
    fn file_offset_resolves_virtual_trailing_block() {
        let offsets = PackFileOffsets { pack_offs: vec![0, 100], vints_off: Some(200) };
        assert_eq!(offsets.file_offset(0), 0);
        assert_eq!(offsets.file_offset(1), 100);
        assert_eq!(offsets.file_offset(2), 200);
    }

    #[test]
    fn dump_term_writes_all_four_streams() {
        let dir = tempfile::tempdir().unwrap();
        let mut dumper = FileDumper::create(dir.path()).unwrap();
        let blob = single_block_blob();
        let offs = dumper.dump_term(&blob, &blob, &blob, &blob).unwrap();
        dumper.flush().unwrap();
        assert_eq!(offs.doc.pack_offs, vec![0]);
        assert_eq!(offs.tf.pack_offs, vec![0]);
        assert!(dir.path().join("doc_ids.pack").exists());
        assert!(dir.path().join("offsets.pack").exists());
    }
}
