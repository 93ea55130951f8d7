//! Shared constants for fitfind.
//!
//! Centralizes the numbers the REST contract and the sync engine agree on.

/// Default number of items requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page the server will return; bigger limits are clamped.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default number of attempts for a retryable operation.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// First backoff delay in milliseconds. Doubles on every further attempt.
pub const DEFAULT_RETRY_BASE_MS: u64 = 1000;

/// Upper bound for a single backoff delay in milliseconds.
pub const MAX_RETRY_DELAY_MS: u64 = 10_000;

/// How long a removed item can be restored, in seconds.
pub const DEFAULT_UNDO_WINDOW_SECS: u64 = 10;

/// Number of ids deleted concurrently per bulk batch.
pub const BULK_BATCH_SIZE: usize = 5;

/// Pause between two bulk batches in milliseconds.
pub const BULK_BATCH_DELAY_MS: u64 = 100;

/// Name of the collection every user owns and cannot delete.
pub const DEFAULT_COLLECTION_NAME: &str = "My Favorites";

/// Maximum length of a collection name after trimming.
pub const MAX_COLLECTION_NAME_LEN: usize = 100;

/// Prefix for ids of locally created records not yet confirmed by the server.
pub const PENDING_ID_PREFIX: &str = "pending-";
