//! Document store.
//!
//! `store.fdt` holds document bodies compressed independently (so any one
//! can be decoded without touching its neighbors), concatenated in doc-id
//! order. `store.fdx` holds one fixed 12-byte `(u32 doc_id, u64 offset)`
//! entry per document in the same order; a document's compressed length is
//! the gap to the next entry's offset (or to end-of-file for the last
//! entry), so it does not need its own field.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use memmap2::Mmap;

use crate::error::{FlashError, QueryError};

const ENTRY_LEN: usize = 12;

pub struct DocStoreWriter {
    fdt: File,
    fdx: File,
    fdt_path: PathBuf,
    fdx_path: PathBuf,
    fdt_offset: u64,
}

impl DocStoreWriter {
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, FlashError> {
        let dir = dir.as_ref();
        let fdt_path = dir.join("store.fdt");
        let fdx_path = dir.join("store.fdx");
        let fdt = OpenOptions::new().create(true).write(true).truncate(true).open(&fdt_path).map_err(|e| FlashError::io(&fdt_path, e))?;
        let fdx = OpenOptions::new().create(true).write(true).truncate(true).open(&fdx_path).map_err(|e| FlashError::io(&fdx_path, e))?;
        Ok(Self { fdt, fdx, fdt_path, fdx_path, fdt_offset: 0 })
    }

    /// Append one document's body, compressing it independently of every
    /// other document. Documents must be added in ascending doc-id order.
    pub fn add(&mut self, doc_id: u32, body: &[u8]) -> Result<(), FlashError> {
        let compressed = zstd::encode_all(body, 0).map_err(|e| FlashError::io(&self.fdt_path, e))?;

        self.fdx.write_u32::<LittleEndian>(doc_id).map_err(|e| FlashError::io(&self.fdx_path, e))?;
        self.fdx.write_u64::<LittleEndian>(self.fdt_offset).map_err(|e| FlashError::io(&self.fdx_path, e))?;

        self.fdt.write_all(&compressed).map_err(|e| FlashError::io(&self.fdt_path, e))?;
        self.fdt_offset += compressed.len() as u64;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), FlashError> {
        self.fdt.sync_all().map_err(|e| FlashError::io(&self.fdt_path, e))?;
        self.fdx.sync_all().map_err(|e| FlashError::io(&self.fdx_path, e))
    }
}

/// Read-only, content-addressed document store backed by mmapped files.
pub struct DocStore {
    fdt: Mmap,
    /// `(doc_id, fdt_offset)` per document, in file order (== doc-id order).
    entries: Vec<(u32, u64)>,
}

impl DocStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, QueryError> {
        let dir = dir.as_ref();
        let fdt_file = File::open(dir.join("store.fdt"))?;
        let fdt = unsafe { Mmap::map(&fdt_file) }?;

        let fdx_bytes = std::fs::read(dir.join("store.fdx"))?;
        if fdx_bytes.len() % ENTRY_LEN != 0 {
            return Err(QueryError::Corrupted("store.fdx length is not a multiple of 12".into()));
        }
        let mut entries = Vec::with_capacity(fdx_bytes.len() / ENTRY_LEN);
        let mut cursor = &fdx_bytes[..];
        while !cursor.is_empty() {
            let doc_id = cursor.read_u32::<LittleEndian>()?;
            let offset = cursor.read_u64::<LittleEndian>()?;
            entries.push((doc_id, offset));
        }
        Ok(Self { fdt, entries })
    }

    pub fn has(&self, doc_id: u32) -> bool {
        (doc_id as usize) < self.entries.len()
    }

    pub fn get(&self, doc_id: u32) -> Result<Vec<u8>, QueryError> {
        let idx = doc_id as usize;
        let (_, start) = *self
            .entries
            .get(idx)
            .ok_or_else(|| QueryError::InvalidQuery(format!("doc_id {doc_id} out of range")))?;
        let end = self.entries.get(idx + 1).map(|(_, o)| *o).unwrap_or(self.fdt.len() as u64);
        let compressed = &self.fdt[start as usize..end as usize];
        zstd::decode_all(compressed).map_err(|e| QueryError::Corrupted(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_three_documents() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DocStoreWriter::create(dir.path()).unwrap();
        writer.add(0, b"hello world").unwrap();
        writer.add(1, b"hello wisconsin").unwrap();
        writer.add(2, b"hello world big world").unwrap();
        writer.flush().unwrap();

        let store = DocStore::open(dir.path()).unwrap();
        assert_eq!(store.len(), 3);
        assert!(store.has(2));
        assert!(!store.has(3));
        assert_eq!(store.get(0).unwrap(), b"hello world");
        assert_eq!(store.get(1).unwrap(), b"hello wisconsin");
        assert_eq!(store.get(2).unwrap(), b"hello world big world");
    }

    #[test]
    fn out_of_range_doc_id_is_a_query_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DocStoreWriter::create(dir.path()).unwrap();
        writer.add(0, b"only one doc").unwrap();
        writer.flush().unwrap();

        let store = DocStore::open(dir.path()).unwrap();
        assert!(store.get(5).is_err());
    }
}
