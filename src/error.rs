//! Error types for the risk engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `EngineError`.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors callers need to tell apart.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Training corpus has no records.
    #[error("Training corpus is empty")]
    EmptyCorpus,

    /// Training corpus lacks one of the two classes.
    #[error("Degenerate training corpus: {normal} normal / {attack} attack records")]
    DegenerateCorpus {
        /// Records labelled normal.
        normal: usize,
        /// Records labelled attack.
        attack: usize,
    },

    /// Corpus file could not be read or written.
    #[error("Corpus I/O error at {path}: {source}")]
    CorpusIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Corpus file is not a JSON array of transaction records.
    #[error("Corpus format error at {path}: {source}")]
    CorpusFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Shared stream state lock was poisoned by a panicking writer.
    #[error("Stream state lock poisoned")]
    StatePoisoned,
}
