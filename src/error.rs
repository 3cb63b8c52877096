//! Error types for index building, search and snapshots.

use crate::index::types::DocId;
use crate::utils::encoding::CodecError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for index operations
pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Debug, Error)]
pub enum IndexError {
    /// A manifest, document or config file could not be opened or read
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A snapshot could not be written or restored
    #[error("snapshot {}: {source}", .path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no document with id {0}")]
    UnknownDocument(DocId),

    /// A word, document or line counter ran past the range of its id type
    #[error("out of {0}")]
    Exhausted(&'static str),
}

impl IndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        IndexError::Io {
            path: path.into(),
            source,
        }
    }
}
