//! Document ingestion: the line-doc parser and the builder that turns a
//! stream of documents into a persisted index.

pub mod builder;
pub mod line_doc;

pub use builder::IndexBuilder;
pub use line_doc::{parse_line, LineDoc};
