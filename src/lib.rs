//! flashdex - a compact full-text search engine's persisted index layer
//!
//! Two storage modes share one set of scoring and highlighting primitives:
//! a persisted, mmap-backed inverted index (`reader`, `dumper`, `skiplist`,
//! `termdict`) built offline by `ingest`, and a live in-memory index
//! (`memindex`) for serving writes immediately. Both feed the same BM25
//! scorer and sentence highlighter.

pub mod buffer_pool;
pub mod config;
pub mod docstore;
pub mod doclen;
pub mod document;
pub mod dumper;
pub mod error;
pub mod highlight;
pub mod ingest;
pub mod memindex;
pub mod packed;
pub mod query;
pub mod reader;
pub mod scorer;
pub mod skiplist;
pub mod term_entry;
pub mod termdict;
pub mod threadpool;
pub mod tokenizer;
pub mod varint;

pub use config::Config;
pub use document::Document;
pub use docstore::DocStore;
pub use doclen::DocLenStore;
pub use error::{FlashError, QueryError};
pub use ingest::IndexBuilder;
pub use memindex::MemIndex;
pub use query::{QueryCoordinator, ResultEntry, SearchQuery, SearchResult};
pub use reader::FlashReader;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
