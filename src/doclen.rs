//! Doc-length store.
//!
//! `doclen.bin` is a flat `u32` array indexed by doc-id giving each
//! document's token count. `meta.bin` holds `{n_docs: u32, avg_len: f64}`,
//! computed once at build time and fixed thereafter — the scorer's `L_avg`
//! comes straight from this file, never recomputed at query time.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{FlashError, QueryError};

pub struct DocLenWriter {
    lengths: Vec<u32>,
}

impl DocLenWriter {
    pub fn new() -> Self {
        Self { lengths: Vec::new() }
    }

    pub fn push(&mut self, length: u32) {
        self.lengths.push(length);
    }

    pub fn finalize(&self, dir: impl AsRef<Path>) -> Result<(), FlashError> {
        let dir = dir.as_ref();
        let doclen_path = dir.join("doclen.bin");
        let meta_path = dir.join("meta.bin");

        let mut doclen_file = OpenOptions::new().create(true).write(true).truncate(true).open(&doclen_path).map_err(|e| FlashError::io(&doclen_path, e))?;
        for &len in &self.lengths {
            doclen_file.write_u32::<LittleEndian>(len).map_err(|e| FlashError::io(&doclen_path, e))?;
        }
        doclen_file.sync_all().map_err(|e| FlashError::io(&doclen_path, e))?;

        let n_docs = self.lengths.len() as u32;
        let avg_len = if n_docs == 0 {
            0.0
        } else {
            self.lengths.iter().map(|&l| l as f64).sum::<f64>() / n_docs as f64
        };
        let mut meta_file = OpenOptions::new().create(true).write(true).truncate(true).open(&meta_path).map_err(|e| FlashError::io(&meta_path, e))?;
        meta_file.write_u32::<LittleEndian>(n_docs).map_err(|e| FlashError::io(&meta_path, e))?;
        meta_file.write_f64::<LittleEndian>(avg_len).map_err(|e| FlashError::io(&meta_path, e))?;
        meta_file.sync_all().map_err(|e| FlashError::io(&meta_path, e))
    }
}

impl Default for DocLenWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view loaded wholly into memory at open — doc-length arrays are
/// small enough that mmap buys nothing here, unlike the posting streams.
pub struct DocLenStore {
    lengths: Vec<u32>,
    avg_len: f64,
}

impl DocLenStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, QueryError> {
        let dir = dir.as_ref();

        let mut meta_file = File::open(dir.join("meta.bin"))?;
        let n_docs = meta_file.read_u32::<LittleEndian>()?;
        let avg_len = meta_file.read_f64::<LittleEndian>()?;

        let mut doclen_file = File::open(dir.join("doclen.bin"))?;
        let mut lengths = Vec::with_capacity(n_docs as usize);
        for _ in 0..n_docs {
            lengths.push(doclen_file.read_u32::<LittleEndian>()?);
        }
        Ok(Self { lengths, avg_len })
    }

    pub fn len_of(&self, doc_id: u32) -> u32 {
        self.lengths[doc_id as usize]
    }

    pub fn avg_len(&self) -> f64 {
        self.avg_len
    }

    pub fn n_docs(&self) -> u32 {
        self.lengths.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avg_len_matches_mean_of_pushed_lengths() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DocLenWriter::new();
        writer.push(2);
        writer.push(2);
        writer.push(4);
        writer.finalize(dir.path()).unwrap();

        let store = DocLenStore::open(dir.path()).unwrap();
        assert_eq!(store.n_docs(), 3);
        assert_eq!(store.len_of(0), 2);
        assert_eq!(store.len_of(2), 4);
        assert!((store.avg_len() - 8.0 / 3.0).abs() < 1e-9);
    }
}
