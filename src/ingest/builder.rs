//! Index builder.
//!
//! Consumes documents one at a time — tokenizing, appending to the doc
//! store and doc-length store immediately — while buffering each term's
//! postings in memory keyed by term text. `finalize` then walks terms in
//! sorted order, splitting each into packed blocks (or an inline list for
//! low-doc-freq terms) and writing the four stream files, the skip list,
//! and the term dictionary/index. This mirrors the chaining the C++
//! original's `FlashEngineDumper::AddDocument` does per document — doc
//! store, inverted index, and doc-length all updated together — but defers
//! the per-term stream split to a single finalize pass instead of writing
//! term entries as each document arrives, since a term's full posting list
//! isn't known until every document referencing it has been seen.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::config::Config;
use crate::docstore::DocStoreWriter;
use crate::doclen::DocLenWriter;
use crate::document::TokenizedDocument;
use crate::dumper::FileDumper;
use crate::error::FlashError;
use crate::skiplist::{self, StreamStart, TermPostingsHeader};
use crate::term_entry::{DeltaMode, TermEntryBuilder};
use crate::termdict::{self, inline, TermDictWriter, TermIndexWriter};
use crate::tokenizer;

#[derive(Default)]
struct TermAccumulator {
    doc_ids: Vec<u32>,
    positions: Vec<Vec<u32>>,
    offsets: Vec<Vec<(u32, u32)>>,
}

pub struct IndexBuilder<'a> {
    dir: PathBuf,
    config: &'a Config,
    doc_store: DocStoreWriter,
    doclen: DocLenWriter,
    terms: FxHashMap<String, TermAccumulator>,
    next_doc_id: u32,
}

impl<'a> IndexBuilder<'a> {
    pub fn create(dir: impl AsRef<Path>, config: &'a Config) -> Result<Self, FlashError> {
        let dir = dir.as_ref().to_path_buf();
        Ok(Self {
            doc_store: DocStoreWriter::create(&dir)?,
            doclen: DocLenWriter::new(),
            terms: FxHashMap::default(),
            next_doc_id: 0,
            dir,
            config,
        })
    }

    /// Tokenize `body` on whitespace and ingest it as the next document.
    /// Returns the assigned doc-id.
    pub fn add_document(&mut self, body: &str) -> Result<u32, FlashError> {
        let tokenized = tokenizer::tokenize(body);
        self.ingest(body, tokenized)
    }

    /// Ingest a document whose token/offset table was supplied externally
    /// (the line-doc format's optional pre-tokenized columns) rather than
    /// derived by whitespace splitting here.
    pub fn add_pretokenized(&mut self, body: &str, tokenized: TokenizedDocument) -> Result<u32, FlashError> {
        self.ingest(body, tokenized)
    }

    fn ingest(&mut self, body: &str, tokenized: TokenizedDocument) -> Result<u32, FlashError> {
        let doc_id = self.next_doc_id;
        self.next_doc_id += 1;

        self.doc_store.add(doc_id, body.as_bytes())?;
        self.doclen.push(tokenized.len() as u32);

        let mut per_doc: FxHashMap<&str, (Vec<u32>, Vec<(u32, u32)>)> = FxHashMap::default();
        for (pos, (term, &off)) in tokenized.tokens.iter().zip(tokenized.offsets.iter()).enumerate() {
            let entry = per_doc.entry(term.as_str()).or_default();
            entry.0.push(pos as u32);
            entry.1.push(off);
        }
        for (term, (positions, offsets)) in per_doc {
            let acc = self.terms.entry(term.to_string()).or_default();
            acc.doc_ids.push(doc_id);
            acc.positions.push(positions);
            acc.offsets.push(offsets);
        }

        Ok(doc_id)
    }

    pub fn doc_count(&self) -> u32 {
        self.next_doc_id
    }

    /// Split every term's buffered postings into its on-disk representation
    /// and write the remaining stores. Consumes the builder.
    pub fn finalize(mut self) -> Result<(), FlashError> {
        self.doc_store.flush()?;
        self.doclen.finalize(&self.dir)?;

        let mut dumper = FileDumper::create(&self.dir)?;
        let mut dict = TermDictWriter::create(self.dir.join("terms.tim"))?;
        let mut index = TermIndexWriter::create(self.dir.join("terms.tip"))?;

        let mut terms: Vec<(String, TermAccumulator)> = self.terms.drain().collect();
        terms.sort_by(|a, b| a.0.cmp(&b.0));

        for (term, acc) in terms {
            let doc_freq = acc.doc_ids.len() as u32;
            let entry_offset = if doc_freq < self.config.inline_posting_threshold {
                write_inline_entry(&mut dict, doc_freq, &acc)?
            } else {
                write_skip_list_entry(&mut dumper, &mut dict, doc_freq, &acc)?
            };
            index.append(&term, entry_offset)?;
        }

        dumper.flush()?;
        dict.flush()?;
        index.flush()?;
        Ok(())
    }
}

fn write_inline_entry(dict: &mut TermDictWriter, doc_freq: u32, acc: &TermAccumulator) -> Result<u64, FlashError> {
    let postings: Vec<inline::InlinePosting> = (0..acc.doc_ids.len())
        .map(|i| inline::InlinePosting {
            doc_id: acc.doc_ids[i],
            positions: acc.positions[i].clone(),
            offsets: acc.offsets[i].clone(),
        })
        .collect();
    let payload = inline::encode(&postings);
    dict.append_entry(termdict::KIND_INLINE, doc_freq, &payload)
}

fn write_skip_list_entry(dumper: &mut FileDumper, dict: &mut TermDictWriter, doc_freq: u32, acc: &TermAccumulator) -> Result<u64, FlashError> {
    let mut doc_b = TermEntryBuilder::new(DeltaMode::Continuous);
    let mut tf_b = TermEntryBuilder::new(DeltaMode::None);
    let mut pos_b = TermEntryBuilder::new(DeltaMode::PerPosting);
    let mut off_b = TermEntryBuilder::new(DeltaMode::PerPosting);

    for i in 0..acc.doc_ids.len() {
        doc_b.add_posting(&[acc.doc_ids[i]]);
        tf_b.add_posting(&[acc.positions[i].len() as u32]);
        pos_b.add_posting(&acc.positions[i]);
        let flat_off: Vec<u32> = acc.offsets[i].iter().flat_map(|&(s, e)| [s, e]).collect();
        off_b.add_posting(&flat_off);
    }

    let doc_blob = doc_b.finalize();
    let tf_blob = tf_b.finalize();
    let pos_blob = pos_b.finalize();
    let off_blob = off_b.finalize();

    let stream_offsets = dumper.dump_term(&doc_blob, &tf_blob, &pos_blob, &off_blob)?;
    let skip_entries = skiplist::build(
        &acc.doc_ids,
        &stream_offsets,
        &doc_blob.locations,
        &tf_blob.locations,
        &pos_blob.locations,
        &off_blob.locations,
    );

    let doc_start = StreamStart { offset: stream_offsets.doc.file_offset(0), n_packs: doc_blob.blocks.len() as u32 };
    let tf_start = StreamStart { offset: stream_offsets.tf.file_offset(0), n_packs: tf_blob.blocks.len() as u32 };
    let pos_start = StreamStart { offset: stream_offsets.pos.file_offset(0), n_packs: pos_blob.blocks.len() as u32 };
    let off_start = StreamStart { offset: stream_offsets.off.file_offset(0), n_packs: off_blob.blocks.len() as u32 };
    let payload = TermPostingsHeader::serialize(doc_start, tf_start, pos_start, off_start, &skip_entries);
    dict.append_entry(termdict::KIND_SKIP_LIST, doc_freq, &payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doclen::DocLenStore;
    use crate::docstore::DocStore;
    use crate::query::{QueryCoordinator, SearchQuery};
    use crate::reader::FlashReader;

    fn corpus() -> [&'static str; 3] {
        ["hello world", "hello wisconsin", "hello world big world"]
    }

    fn build_and_search(config: &Config) -> crate::query::SearchResult {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = IndexBuilder::create(dir.path(), config).unwrap();
        for body in corpus() {
            builder.add_document(body).unwrap();
        }
        builder.finalize().unwrap();

        let reader = FlashReader::open(dir.path()).unwrap();
        let doc_store = DocStore::open(dir.path()).unwrap();
        let doc_len = DocLenStore::open(dir.path()).unwrap();
        let coordinator = QueryCoordinator::new(&reader, &doc_store, &doc_len, config);

        coordinator
            .search(&SearchQuery {
                terms: vec!["wisconsin".to_string()],
                n_results: 10,
                return_snippets: true,
                n_snippet_passages: 1,
                is_phrase: false,
            })
            .unwrap()
    }

    #[test]
    fn inline_path_finds_unique_term() {
        let config = Config::default(); // threshold 128, corpus well under it
        let result = build_and_search(&config);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].doc_id, 1);
    }

    #[test]
    fn skip_list_path_finds_unique_term() {
        let mut config = Config::default();
        config.inline_posting_threshold = 0; // force every term through the skip-list path
        let result = build_and_search(&config);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].doc_id, 1);
    }

    #[test]
    fn doc_count_tracks_assigned_ids() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let mut builder = IndexBuilder::create(dir.path(), &config).unwrap();
        for body in corpus() {
            builder.add_document(body).unwrap();
        }
        assert_eq!(builder.doc_count(), 3);
    }
}
