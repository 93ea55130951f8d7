//! JSON file persistence for the offline queue.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::QueueStoreError;
use crate::offline_queue::PendingOperation;

#[derive(Debug, Clone)]
pub struct QueueStore {
    path: PathBuf,
}

impl QueueStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the queue. A missing file is an empty queue.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or holds invalid JSON.
    pub fn load(&self) -> Result<Vec<PendingOperation>, QueueStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw)
            .map_err(|source| QueueStoreError::Corrupt { path: self.path.clone(), source })
    }

    /// Write the queue atomically: temp file in the same directory, then rename.
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, ops: &[PendingOperation]) -> Result<(), QueueStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_vec_pretty(ops)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> QueueStoreError {
        QueueStoreError::Io { path: self.path.clone(), source }
    }
}
