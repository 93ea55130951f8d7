//! Typed error enum for offline queue persistence.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueStoreError {
    #[error("queue file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but does not hold a valid queue.
    #[error("corrupt queue file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}
