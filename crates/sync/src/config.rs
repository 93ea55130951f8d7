//! Runtime settings for the sync engine.

use std::path::PathBuf;
use std::time::Duration;

use fitfind_core::constants::{
    BULK_BATCH_DELAY_MS, BULK_BATCH_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_PAGE_SIZE,
    DEFAULT_RETRY_BASE_MS, DEFAULT_UNDO_WINDOW_SECS, MAX_RETRY_DELAY_MS,
};
use fitfind_core::{env_duration_ms, env_duration_secs, env_non_empty, env_parse_with_default};

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Attempts per operation, and replays before a queued operation is dropped.
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    /// `None` disables undo for removals.
    pub undo_window: Option<Duration>,
    pub page_size: u32,
    pub bulk_batch_size: usize,
    pub bulk_batch_delay: Duration,
    /// Where the offline queue is persisted. `None` keeps it in memory.
    pub queue_path: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_MS),
            retry_max_delay: Duration::from_millis(MAX_RETRY_DELAY_MS),
            undo_window: Some(Duration::from_secs(DEFAULT_UNDO_WINDOW_SECS)),
            page_size: DEFAULT_PAGE_SIZE,
            bulk_batch_size: BULK_BATCH_SIZE,
            bulk_batch_delay: Duration::from_millis(BULK_BATCH_DELAY_MS),
            queue_path: None,
        }
    }
}

impl SyncConfig {
    /// Build the config from `FITFIND_*` environment variables.
    ///
    /// An undo window of `0` disables undo.
    #[must_use]
    pub fn from_env() -> Self {
        let undo_window = env_duration_secs("FITFIND_UNDO_WINDOW_SECS", DEFAULT_UNDO_WINDOW_SECS);
        Self {
            max_retries: env_parse_with_default("FITFIND_MAX_RETRIES", DEFAULT_MAX_RETRIES).max(1),
            retry_base_delay: env_duration_ms("FITFIND_RETRY_BASE_MS", DEFAULT_RETRY_BASE_MS),
            retry_max_delay: Duration::from_millis(MAX_RETRY_DELAY_MS),
            undo_window: (!undo_window.is_zero()).then_some(undo_window),
            page_size: env_parse_with_default("FITFIND_PAGE_SIZE", DEFAULT_PAGE_SIZE),
            bulk_batch_size: BULK_BATCH_SIZE,
            bulk_batch_delay: Duration::from_millis(BULK_BATCH_DELAY_MS),
            queue_path: env_non_empty("FITFIND_QUEUE_PATH")
                .map(PathBuf::from)
                .or_else(default_queue_path),
        }
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            base_delay: self.retry_base_delay,
            max_delay: self.retry_max_delay,
        }
    }
}

/// `<data_local_dir>/fitfind/offline-queue.json`
#[must_use]
pub fn default_queue_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("fitfind").join("offline-queue.json"))
}
