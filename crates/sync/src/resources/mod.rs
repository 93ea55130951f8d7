//! Resource controllers.
//!
//! Each resource owns one paginated list with its loading and error state,
//! and exposes CRUD actions that update the list optimistically. State sits
//! behind a `std::sync::Mutex` that is never held across an await; after
//! every await the resource checks its [`CancelScope`] and drops the result
//! once closed.

mod collection_items;
mod collections;
mod history;
mod save_item;
mod wishlist;

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fitfind_core::{FitFindError, Identified, Page, PageRequest, Pagination};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub use collection_items::CollectionItemsResource;
pub use collections::CollectionsResource;
pub use history::{HistoryFilters, HistoryResource};
pub use save_item::{CollectionPlacement, SaveItemAction, SaveRequest, SaveResult};
pub use wishlist::{WishlistFilters, WishlistResource, WishlistSort};

use crate::cancel::CancelScope;
use crate::config::SyncConfig;
use crate::events::{EventBus, ItemEvent, ResourceKind, SyncEvent};
use crate::optimistic::{OptimisticList, Removal};
use crate::stable_fetch::FetchKey;
use crate::undo::UndoBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Loaded { count: usize },
    /// Another fetch of this resource was already running.
    Skipped,
    /// The fetch dependencies changed while the request was out.
    Stale,
    /// The resource was closed; the response was discarded.
    Cancelled,
}

pub(crate) struct ResourceState<T, D> {
    pub(crate) list: OptimisticList<T>,
    pub(crate) loading: bool,
    pub(crate) error: Option<String>,
    /// Set when another resource changed data this list cannot rebuild locally.
    pub(crate) needs_refresh: bool,
    pub(crate) key: FetchKey<D>,
    pub(crate) undo: Option<UndoBuffer<T>>,
}

struct FetchTicket<'a>(&'a AtomicBool);

impl Drop for FetchTicket<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// State and bookkeeping shared by every resource.
pub(crate) struct ResourceCore<T, D> {
    kind: ResourceKind,
    state: Mutex<ResourceState<T, D>>,
    in_flight: AtomicBool,
    scope: CancelScope,
    page_size: u32,
    origin: Uuid,
    events: EventBus,
}

impl<T: Identified + Clone, D: PartialEq + Clone> ResourceCore<T, D> {
    pub(crate) fn new(kind: ResourceKind, config: &SyncConfig, events: EventBus) -> Self {
        let state = ResourceState {
            list: OptimisticList::new(config.page_size),
            loading: false,
            error: None,
            needs_refresh: false,
            key: FetchKey::new(),
            undo: config.undo_window.map(UndoBuffer::new),
        };
        Self {
            kind,
            state: Mutex::new(state),
            in_flight: AtomicBool::new(false),
            scope: CancelScope::new(),
            page_size: config.page_size,
            origin: Uuid::new_v4(),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ResourceState<T, D>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut ResourceState<T, D>) -> R) -> R {
        f(&mut self.lock())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.scope.is_cancelled()
    }

    pub(crate) const fn scope(&self) -> &CancelScope {
        &self.scope
    }

    /// Record new fetch dependencies. Returns `true` if they changed.
    pub(crate) fn set_deps(&self, deps: &D) -> bool {
        self.with_state(|s| s.key.update(deps))
    }

    fn try_begin_fetch(&self) -> Option<FetchTicket<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FetchTicket(&self.in_flight))
    }

    /// Fetch the first page (`append == false`) or the next one.
    ///
    /// The pagination offset only moves when the request succeeds.
    pub(crate) async fn fetch<F, Fut>(
        &self,
        append: bool,
        fetch: F,
    ) -> Result<FetchStatus, FitFindError>
    where
        F: FnOnce(PageRequest) -> Fut,
        Fut: Future<Output = Result<Page<T>, FitFindError>>,
    {
        if self.is_closed() {
            return Ok(FetchStatus::Cancelled);
        }
        let Some(_ticket) = self.try_begin_fetch() else {
            tracing::debug!(resource = self.kind.as_str(), "fetch already in flight, skipping");
            return Ok(FetchStatus::Skipped);
        };

        let prepared = self.with_state(|s| {
            let pagination = s.list.pagination();
            if append && !pagination.has_more {
                return None;
            }
            let offset = if append { pagination.next_offset() } else { 0 };
            s.loading = true;
            s.error = None;
            Some((PageRequest::new(self.page_size, offset), s.key.generation()))
        });
        let Some((request, generation)) = prepared else {
            return Ok(FetchStatus::Loaded { count: 0 });
        };

        tracing::debug!(
            resource = self.kind.as_str(),
            offset = request.offset,
            limit = request.limit,
            "fetching page"
        );
        let Ok(result) = self.scope.run(fetch(request)).await else {
            tracing::debug!(resource = self.kind.as_str(), "fetch cancelled");
            return Ok(FetchStatus::Cancelled);
        };
        if self.is_closed() {
            return Ok(FetchStatus::Cancelled);
        }

        self.with_state(|s| {
            s.loading = false;
            if s.key.generation() != generation {
                tracing::debug!(resource = self.kind.as_str(), "discarding stale page");
                return Ok(FetchStatus::Stale);
            }
            match result {
                Ok(page) => {
                    let count = if append {
                        s.list.append_page(page.items, page.pagination)
                    } else {
                        let count = page.items.len();
                        s.list.replace_page(page.items, page.pagination);
                        s.needs_refresh = false;
                        count
                    };
                    Ok(FetchStatus::Loaded { count })
                },
                Err(err) => {
                    tracing::warn!(resource = self.kind.as_str(), error = %err, "fetch failed");
                    s.error = Some(err.user_message());
                    Err(err)
                },
            }
        })
    }

    /// Store the user-facing message for a failed mutation.
    pub(crate) fn record_failure(&self, action: &str, err: &FitFindError) {
        tracing::warn!(
            resource = self.kind.as_str(),
            action,
            error = %err,
            "mutation failed, rolled back"
        );
        self.with_state(|s| s.error = Some(err.user_message()));
    }

    pub(crate) fn clear_error(&self) {
        self.with_state(|s| s.error = None);
    }

    pub(crate) fn undo_enabled(&self) -> bool {
        self.with_state(|s| s.undo.is_some())
    }

    /// Start the undo window for a removal. Does nothing when undo is disabled.
    pub(crate) fn push_undo(&self, id: &str, removal: Removal<T>) {
        self.with_state(|s| {
            if let Some(buffer) = s.undo.as_mut() {
                buffer.push(id, removal);
            }
        });
    }

    pub(crate) fn take_undo(&self, id: &str) -> Option<Removal<T>> {
        self.with_state(|s| s.undo.as_mut().and_then(|buffer| buffer.take(id)))
    }

    pub(crate) fn discard_undo(&self, id: &str) -> Option<Removal<T>> {
        self.with_state(|s| s.undo.as_mut().and_then(|buffer| buffer.discard(id)))
    }

    pub(crate) fn take_expired_undo(&self) -> Vec<(String, Removal<T>)> {
        self.with_state(|s| s.undo.as_mut().map(UndoBuffer::take_expired).unwrap_or_default())
    }

    pub(crate) fn drain_undo(&self) -> Vec<(String, Removal<T>)> {
        self.with_state(|s| s.undo.as_mut().map(UndoBuffer::drain).unwrap_or_default())
    }

    pub(crate) fn can_undo(&self, id: &str) -> bool {
        self.with_state(|s| s.undo.as_ref().is_some_and(|buffer| buffer.is_pending(id)))
    }

    /// Run `commit` on the removal held for `id` once its window closes.
    ///
    /// Nothing happens if the removal was undone or committed first, or if
    /// the resource is closed before the deadline.
    pub(crate) fn schedule_commit<F, Fut>(self: &Arc<Self>, id: &str, commit: F)
    where
        T: Send + 'static,
        D: Send + 'static,
        F: FnOnce(Removal<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Some(deadline) = self.with_state(|s| s.undo.as_ref().and_then(|b| b.deadline(id)))
        else {
            return;
        };
        let core = Arc::clone(self);
        let id = id.to_owned();
        tokio::spawn(async move {
            let scope = core.scope.clone();
            tokio::select! {
                biased;
                () = scope.cancelled() => return,
                () = tokio::time::sleep_until(deadline) => {},
            }
            let expired =
                core.with_state(|s| s.undo.as_mut().and_then(|buffer| buffer.take_if_expired(&id)));
            if let Some(removal) = expired {
                tracing::debug!(resource = core.kind.as_str(), id = %id, "undo window closed");
                commit(removal).await;
            }
        });
    }

    /// Take every loaded item in `ids` out of the list, keyed by identity.
    pub(crate) fn remove_many(&self, ids: &[String]) -> HashMap<String, Removal<T>> {
        self.with_state(|s| {
            let removals: HashMap<String, Removal<T>> = ids
                .iter()
                .filter_map(|id| {
                    let index = s.list.position(id)?;
                    let item = s.list.get(id)?.clone();
                    Some((id.clone(), Removal { item, index }))
                })
                .collect();
            for id in removals.keys() {
                s.list.remove(id);
            }
            removals
        })
    }

    /// Reinsert the `failed` part of a [`Self::remove_many`] batch.
    ///
    /// Indices were taken before anything was removed, so each one is
    /// shifted back past the `deleted` items that preceded it.
    pub(crate) fn restore_failed(
        &self,
        removals: &HashMap<String, Removal<T>>,
        failed: &[String],
        deleted: &[String],
    ) {
        let mut failed: Vec<&Removal<T>> = failed.iter().filter_map(|id| removals.get(id)).collect();
        failed.sort_by_key(|removal| removal.index);
        let deleted: Vec<usize> =
            deleted.iter().filter_map(|id| removals.get(id).map(|r| r.index)).collect();
        self.with_state(|s| {
            for removal in failed {
                let shift = deleted.iter().filter(|&&index| index < removal.index).count();
                s.list.restore(Removal { item: removal.item.clone(), index: removal.index - shift });
            }
        });
    }

    /// Error text after a bulk operation, cleared when nothing failed.
    pub(crate) fn record_bulk_result(&self, noun: &str, failed: usize, total: usize) {
        self.with_state(|s| {
            s.error = (failed > 0).then(|| format!("{failed} of {total} {noun} could not be deleted"));
        });
    }

    pub(crate) fn item_event(&self, id: &str, parent_id: Option<&str>) -> ItemEvent {
        ItemEvent {
            resource: self.kind,
            id: id.to_owned(),
            parent_id: parent_id.map(str::to_owned),
            origin: self.origin,
        }
    }

    pub(crate) fn publish(&self, event: SyncEvent) {
        self.events.publish(event);
    }

    /// Whether this resource published `event` itself.
    pub(crate) fn is_own(&self, event: &ItemEvent) -> bool {
        event.origin == self.origin
    }

    pub(crate) fn items(&self) -> Vec<T> {
        self.with_state(|s| s.list.items().to_vec())
    }

    pub(crate) fn pagination(&self) -> Pagination {
        self.with_state(|s| *s.list.pagination())
    }

    pub(crate) fn error(&self) -> Option<String> {
        self.with_state(|s| s.error.clone())
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.with_state(|s| s.loading)
    }

    pub(crate) fn needs_refresh(&self) -> bool {
        self.with_state(|s| s.needs_refresh)
    }

    pub(crate) fn mark_needs_refresh(&self) {
        self.with_state(|s| s.needs_refresh = true);
    }

    pub(crate) fn close(&self) {
        tracing::debug!(resource = self.kind.as_str(), "closing resource");
        self.scope.cancel();
    }

    /// Close, handing back every removal still held for undo.
    pub(crate) fn close_taking_held(&self) -> Vec<(String, Removal<T>)> {
        let held = self.drain_undo();
        self.close();
        held
    }
}

/// A resource that mirrors changes published by other resources.
pub trait EventSink: Send + Sync {
    fn apply_event(&self, event: &SyncEvent);

    /// Scope whose cancellation stops the listener.
    fn scope(&self) -> &CancelScope;
}

/// Feed events from `bus` into `sink` until its scope is cancelled.
pub fn spawn_event_listener<S: EventSink + 'static>(sink: Arc<S>, bus: &EventBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        let scope = sink.scope().clone();
        loop {
            let received = tokio::select! {
                biased;
                () = scope.cancelled() => break,
                received = rx.recv() => received,
            };
            match received {
                Ok(event) => sink.apply_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event listener lagged behind");
                },
                Err(RecvError::Closed) => break,
            }
        }
    })
}
