//! Time-bounded undo for removals.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::optimistic::Removal;

#[derive(Debug, Clone)]
pub struct UndoRecord<T> {
    pub removal: Removal<T>,
    pub removed_at: Instant,
    pub timestamp: DateTime<Utc>,
}

/// Undo records keyed by item identity, each valid for `window`.
#[derive(Debug, Clone)]
pub struct UndoBuffer<T> {
    window: Duration,
    records: HashMap<String, UndoRecord<T>>,
}

impl<T> UndoBuffer<T> {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window, records: HashMap::new() }
    }

    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Start the window for `id`. A previous record for the same id is replaced.
    pub fn push(&mut self, id: impl Into<String>, removal: Removal<T>) {
        let record = UndoRecord { removal, removed_at: Instant::now(), timestamp: Utc::now() };
        self.records.insert(id.into(), record);
    }

    fn is_live(&self, record: &UndoRecord<T>) -> bool {
        record.removed_at.elapsed() < self.window
    }

    /// Claim the record for `id` if its window is still open.
    ///
    /// An expired record is left in place for [`Self::take_expired`].
    pub fn take(&mut self, id: &str) -> Option<Removal<T>> {
        let live = self.records.get(id).is_some_and(|record| self.is_live(record));
        if !live {
            return None;
        }
        self.records.remove(id).map(|record| record.removal)
    }

    /// Remove the record for `id` regardless of its window.
    pub fn discard(&mut self, id: &str) -> Option<Removal<T>> {
        self.records.remove(id).map(|record| record.removal)
    }

    /// Remove the record for `id` only if its window has closed.
    pub fn take_if_expired(&mut self, id: &str) -> Option<Removal<T>> {
        let expired = self.records.get(id).is_some_and(|record| !self.is_live(record));
        if !expired {
            return None;
        }
        self.records.remove(id).map(|record| record.removal)
    }

    /// When the window for `id` closes.
    #[must_use]
    pub fn deadline(&self, id: &str) -> Option<Instant> {
        self.records.get(id).map(|record| record.removed_at + self.window)
    }

    /// Remove and return every record whose window has closed.
    pub fn take_expired(&mut self) -> Vec<(String, Removal<T>)> {
        let expired: Vec<String> = self
            .records
            .iter()
            .filter(|(_, record)| !self.is_live(record))
            .map(|(id, _)| id.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|id| self.records.remove(&id).map(|record| (id, record.removal)))
            .collect()
    }

    /// Remove and return every record, expired or not.
    pub fn drain(&mut self) -> Vec<(String, Removal<T>)> {
        self.records.drain().map(|(id, record)| (id, record.removal)).collect()
    }

    #[must_use]
    pub fn is_pending(&self, id: &str) -> bool {
        self.records.get(id).is_some_and(|record| self.is_live(record))
    }

    /// Time left on the window for `id`.
    #[must_use]
    pub fn remaining(&self, id: &str) -> Option<Duration> {
        let record = self.records.get(id)?;
        self.window.checked_sub(record.removed_at.elapsed()).filter(|d| !d.is_zero())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn removal(index: usize) -> Removal<&'static str> {
        Removal { item: "b", index }
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_within_window() {
        let mut buffer = UndoBuffer::new(Duration::from_secs(10));
        buffer.push("b", removal(1));
        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(buffer.is_pending("b"));
        assert_eq!(buffer.take("b"), Some(removal(1)));
        assert!(buffer.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_after_window_returns_none() {
        let mut buffer = UndoBuffer::new(Duration::from_secs(10));
        buffer.push("b", removal(1));
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(buffer.take("b").is_none());
        assert!(!buffer.is_pending("b"));
        assert_eq!(buffer.take_expired(), vec![("b".to_owned(), removal(1))]);
        assert!(buffer.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_if_expired_waits_for_deadline() {
        let mut buffer = UndoBuffer::new(Duration::from_secs(10));
        buffer.push("b", removal(2));
        let deadline = buffer.deadline("b").unwrap();
        assert!(buffer.take_if_expired("b").is_none());

        tokio::time::sleep_until(deadline).await;
        assert_eq!(buffer.take_if_expired("b"), Some(removal(2)));
        assert!(buffer.deadline("b").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_counts_down() {
        let mut buffer = UndoBuffer::new(Duration::from_secs(10));
        buffer.push("b", removal(0));
        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(buffer.remaining("b"), Some(Duration::from_secs(6)));
        assert!(buffer.take_expired().is_empty());
    }
}
