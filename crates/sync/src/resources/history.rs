use fitfind_core::{FitFindError, HistoryEntry, Pagination, SearchSession};

use super::{EventSink, FetchStatus, ResourceCore};
use crate::bulk::{BulkOutcome, bulk_delete};
use crate::cancel::CancelScope;
use crate::context::SyncContext;
use crate::events::{ResourceKind, SyncEvent};
use crate::offline_queue::QueuedMutation;
use crate::outcome::OperationOutcome;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryFilters {
    /// Ask the server to embed each entry's search session.
    pub include_details: bool,
}

/// The user's search history.
///
/// Deletion is immediate on the server; undo within the window issues a
/// restore call.
pub struct HistoryResource {
    ctx: SyncContext,
    core: ResourceCore<HistoryEntry, HistoryFilters>,
}

impl HistoryResource {
    #[must_use]
    pub fn new(ctx: &SyncContext) -> Self {
        Self::with_filters(ctx, HistoryFilters::default())
    }

    #[must_use]
    pub fn with_filters(ctx: &SyncContext, filters: HistoryFilters) -> Self {
        let core = ResourceCore::new(ResourceKind::History, &ctx.config, ctx.events().clone());
        core.set_deps(&filters);
        Self { ctx: ctx.clone(), core }
    }

    #[must_use]
    pub fn filters(&self) -> HistoryFilters {
        self.core.with_state(|s| s.key.current().copied().unwrap_or_default())
    }

    /// Returns `true` when the filters changed and the list should be refetched.
    pub fn set_filters(&self, filters: HistoryFilters) -> bool {
        self.core.set_deps(&filters)
    }

    /// # Errors
    /// Returns the fetch error, which is also stored for display.
    pub async fn fetch(&self) -> Result<FetchStatus, FitFindError> {
        self.fetch_page(false).await
    }

    /// # Errors
    /// Returns the fetch error, which is also stored for display.
    pub async fn load_more(&self) -> Result<FetchStatus, FitFindError> {
        self.fetch_page(true).await
    }

    async fn fetch_page(&self, append: bool) -> Result<FetchStatus, FitFindError> {
        let include_details = self.filters().include_details;
        let api = &self.ctx.api;
        let resilience = &self.ctx.resilience;
        self.core
            .fetch(append, |page| async move {
                resilience
                    .execute("fetch history", || api.list_history(page, include_details))
                    .await
            })
            .await
    }

    /// Remove `id` now and delete it on the server.
    ///
    /// On success the removal stays undoable for the configured window.
    pub async fn delete(&self, id: &str) -> OperationOutcome<()> {
        let Some(removal) = self.core.with_state(|s| s.list.remove(id)) else {
            return OperationOutcome::Failed(FitFindError::NotFound(format!(
                "History entry {id} is not loaded"
            )));
        };

        let api = &self.ctx.api;
        let outcome = self
            .ctx
            .resilience
            .execute_or_queue(
                "delete history entry",
                QueuedMutation::DeleteHistoryEntry { id: id.to_owned() },
                || api.delete_history_entry(id),
            )
            .await;
        if self.core.is_closed() {
            return outcome;
        }

        match &outcome {
            OperationOutcome::Failed(err) => {
                self.core.with_state(|s| s.list.restore(removal));
                self.core.record_failure("delete", err);
            },
            OperationOutcome::Success(()) | OperationOutcome::Queued(_) => {
                self.core.clear_error();
                if outcome.is_success() {
                    self.core.publish(SyncEvent::ItemDeleted(self.core.item_event(id, None)));
                }
                self.core.push_undo(id, removal);
            },
        }
        outcome
    }

    /// Restore a deleted entry while its undo window is open.
    ///
    /// Returns `None` when there is nothing to undo for `id`.
    pub async fn undo_delete(&self, id: &str) -> Option<OperationOutcome<()>> {
        let removal = self.core.take_undo(id)?;
        self.core.with_state(|s| s.list.restore(removal));

        let api = &self.ctx.api;
        let outcome = self
            .ctx
            .resilience
            .execute_or_queue(
                "restore history entry",
                QueuedMutation::RestoreHistoryEntry { id: id.to_owned() },
                || api.restore_history_entry(id),
            )
            .await;
        if self.core.is_closed() {
            return Some(outcome);
        }

        match &outcome {
            OperationOutcome::Failed(err) => {
                self.core.with_state(|s| s.list.remove(id));
                self.core.record_failure("undo delete", err);
            },
            OperationOutcome::Success(()) => {
                self.core.clear_error();
                self.core.publish(SyncEvent::ItemRestored(self.core.item_event(id, None)));
            },
            OperationOutcome::Queued(_) => self.core.clear_error(),
        }
        Some(outcome)
    }

    #[must_use]
    pub fn can_undo(&self, id: &str) -> bool {
        self.core.can_undo(id)
    }

    /// Forget undo records whose window has closed. Returns how many expired.
    pub fn expire_undo(&self) -> usize {
        self.core.take_expired_undo().len()
    }

    /// Delete several entries in batches; failures go back to their places.
    pub async fn bulk_delete(&self, ids: &[String]) -> BulkOutcome {
        let removals = self.core.remove_many(ids);

        let api = &self.ctx.api;
        let resilience = &self.ctx.resilience;
        let config = &self.ctx.config;
        let outcome = bulk_delete(ids, config.bulk_batch_size, config.bulk_batch_delay, |id| {
            async move {
                resilience
                    .execute("bulk delete history entry", || api.delete_history_entry(&id))
                    .await
            }
        })
        .await;
        if self.core.is_closed() {
            return outcome;
        }

        self.core.restore_failed(&removals, &outcome.failed_ids, &outcome.deleted_ids);
        self.core.record_bulk_result("entries", outcome.failed_ids.len(), ids.len());
        for id in &outcome.deleted_ids {
            self.core.publish(SyncEvent::ItemDeleted(self.core.item_event(id, None)));
        }
        outcome
    }

    /// Full search session behind a history entry.
    ///
    /// # Errors
    /// Returns the API error after retries.
    pub async fn session_details(&self, session_id: &str) -> Result<SearchSession, FitFindError> {
        let api = &self.ctx.api;
        self.ctx
            .resilience
            .execute("fetch search session", || api.get_search_session(session_id))
            .await
    }

    #[must_use]
    pub fn items(&self) -> Vec<HistoryEntry> {
        self.core.items()
    }

    #[must_use]
    pub fn pagination(&self) -> Pagination {
        self.core.pagination()
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.core.error()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.core.is_loading()
    }

    #[must_use]
    pub fn needs_refresh(&self) -> bool {
        self.core.needs_refresh()
    }

    pub fn close(&self) {
        self.core.close();
    }
}

impl EventSink for HistoryResource {
    fn apply_event(&self, event: &SyncEvent) {
        match event {
            SyncEvent::ItemDeleted(item)
                if item.resource == ResourceKind::History && !self.core.is_own(item) =>
            {
                self.core.with_state(|s| s.list.remove(&item.id));
            },
            SyncEvent::ItemRestored(item)
                if item.resource == ResourceKind::History && !self.core.is_own(item) =>
            {
                self.core.mark_needs_refresh();
            },
            _ => {},
        }
    }

    fn scope(&self) -> &CancelScope {
        self.core.scope()
    }
}
