//! Batched concurrent deletion.

use std::future::Future;
use std::time::Duration;

use fitfind_core::FitFindError;
use futures_util::future::join_all;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkStatus {
    Complete,
    Failed,
    Partial,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub deleted_ids: Vec<String>,
    pub failed_ids: Vec<String>,
    /// Size of each batch, in order.
    pub batch_sizes: Vec<usize>,
}

impl BulkOutcome {
    #[must_use]
    pub fn status(&self) -> BulkStatus {
        match (self.deleted_ids.is_empty(), self.failed_ids.is_empty()) {
            (_, true) => BulkStatus::Complete,
            (true, false) => BulkStatus::Failed,
            (false, false) => BulkStatus::Partial,
        }
    }
}

/// Delete `ids` in batches of `batch_size`, each batch concurrently, pausing
/// `delay` between batches.
pub async fn bulk_delete<F, Fut>(
    ids: &[String],
    batch_size: usize,
    delay: Duration,
    delete: F,
) -> BulkOutcome
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<(), FitFindError>>,
{
    let mut outcome = BulkOutcome::default();
    let batches: Vec<&[String]> = ids.chunks(batch_size.max(1)).collect();
    let batch_count = batches.len();

    for (index, batch) in batches.into_iter().enumerate() {
        outcome.batch_sizes.push(batch.len());
        let results = join_all(batch.iter().map(|id| {
            let fut = delete(id.clone());
            async move { (id, fut.await) }
        }))
        .await;

        for (id, result) in results {
            match result {
                Ok(()) => outcome.deleted_ids.push(id.clone()),
                Err(err) => {
                    tracing::warn!(id = %id, error = %err, "bulk delete item failed");
                    outcome.failed_ids.push(id.clone());
                },
            }
        }

        if index + 1 < batch_count && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    tracing::info!(
        deleted = outcome.deleted_ids.len(),
        failed = outcome.failed_ids.len(),
        batches = batch_count,
        "bulk delete finished"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("h{i}")).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_seven_ids_run_in_two_batches() {
        let calls = AtomicUsize::new(0);
        let outcome = bulk_delete(&ids(7), 5, Duration::from_millis(100), |id| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if id == "h3" {
                    Err(FitFindError::from_status(500, "boom"))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert_eq!(outcome.batch_sizes, [5, 2]);
        assert_eq!(calls.load(Ordering::SeqCst), 7);
        assert_eq!(outcome.deleted_ids.len() + outcome.failed_ids.len(), 7);
        assert_eq!(outcome.failed_ids, ["h3"]);
        assert_eq!(outcome.status(), BulkStatus::Partial);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_only_between_batches() {
        let start = tokio::time::Instant::now();
        bulk_delete(&ids(10), 5, Duration::from_millis(100), |_| async { Ok(()) }).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_all_failures_is_failed() {
        let started = Mutex::new(Vec::new());
        let outcome = bulk_delete(&ids(3), 5, Duration::ZERO, |id| {
            started.lock().unwrap().push(id);
            async { Err(FitFindError::NotFound("gone".to_owned())) }
        })
        .await;
        assert_eq!(started.lock().unwrap().len(), 3);
        assert_eq!(outcome.status(), BulkStatus::Failed);
    }

    #[test]
    fn test_empty_is_complete() {
        assert_eq!(BulkOutcome::default().status(), BulkStatus::Complete);
    }
}
