//! Startup configuration.
//!
//! Replaces the compile-time macros of the C++ original (cache sizes, flash
//! paths, feature flags) with a plain record loaded once at startup and
//! passed by reference into the builder and the reader. No component reads
//! process-wide mutable state.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// BM25 parameters, ElasticSearch-compatible defaults (`k1 = 1.2`, `b = 0.75`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Term-dict entries with `doc_freq` below this threshold are stored
    /// inline (kind=1) instead of behind a skip list (kind=0).
    #[serde(default = "Config::default_inline_threshold")]
    pub inline_posting_threshold: u32,

    /// BM25 scoring parameters.
    #[serde(default)]
    pub bm25: Bm25Params,

    /// Default number of highlighted passages per snippet.
    #[serde(default = "Config::default_snippet_passages")]
    pub n_snippet_passages: usize,

    /// Number of scratch buffers kept warm in the buffer pool.
    #[serde(default = "Config::default_buffer_pool_capacity")]
    pub buffer_pool_capacity: usize,

    /// Fixed-size request thread pool width. Defaults to the host's CPU count.
    #[serde(default = "Config::default_thread_pool_size")]
    pub thread_pool_size: usize,

    /// Per-request deadline; scoring checks this between candidates.
    #[serde(default = "Config::default_query_deadline")]
    pub query_deadline: Duration,
}

impl Config {
    fn default_inline_threshold() -> u32 {
        128
    }

    fn default_snippet_passages() -> usize {
        3
    }

    fn default_buffer_pool_capacity() -> usize {
        64
    }

    fn default_thread_pool_size() -> usize {
        num_cpus::get().max(1)
    }

    fn default_query_deadline() -> Duration {
        Duration::from_millis(500)
    }

    /// Load configuration from a JSON file, filling in defaults for absent fields.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, crate::error::FlashError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| crate::error::FlashError::io(path, e))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| crate::error::FlashError::Invariant {
                component: "config",
                reason: e.to_string(),
            })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inline_posting_threshold: Self::default_inline_threshold(),
            bm25: Bm25Params::default(),
            n_snippet_passages: Self::default_snippet_passages(),
            buffer_pool_capacity: Self::default_buffer_pool_capacity(),
            thread_pool_size: Self::default_thread_pool_size(),
            query_deadline: Self::default_query_deadline(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.inline_posting_threshold, 128);
        assert_eq!(cfg.bm25.k1, 1.2);
        assert_eq!(cfg.bm25.b, 0.75);
        assert_eq!(cfg.n_snippet_passages, 3);
    }

    #[test]
    fn load_fills_defaults_for_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"n_snippet_passages": 5}"#).unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.n_snippet_passages, 5);
        assert_eq!(cfg.inline_posting_threshold, 128);
    }
}
