use std::sync::Arc;
use std::time::Duration;

use fitfind_core::{FitFindApi, FitFindError, NewWishlistItem};

use super::{MockApi, context, ids, server_error, wishlist_item};
use crate::{
    CancelScope, HistoryResource, OperationKind, OperationOutcome, QueuedMutation, ReplayReport,
    SyncEvent,
};

fn add(product_id: &str) -> QueuedMutation {
    QueuedMutation::AddToWishlist { item: NewWishlistItem::new(product_id) }
}

#[tokio::test]
async fn test_offline_mutation_is_queued() {
    let api = MockApi::new();
    let ctx = context(&api);
    let mut events = ctx.events().subscribe();
    ctx.resilience.set_online(false);

    let item = NewWishlistItem::new("p1");
    let outcome = ctx
        .resilience
        .execute_or_queue("add p1", add("p1"), || api.add_to_wishlist(&item))
        .await;

    let OperationOutcome::Queued(operation_id) = outcome else {
        panic!("expected queued outcome, got {outcome:?}");
    };
    assert_eq!(api.calls("add_to_wishlist"), 0);
    assert_eq!(ctx.queue().len(), 1);
    assert_eq!(events.recv().await.unwrap(), SyncEvent::Connectivity { online: false });
    assert_eq!(
        events.recv().await.unwrap(),
        SyncEvent::OperationQueued { operation_id, description: "add p1".to_owned() }
    );
}

#[tokio::test]
async fn test_terminal_error_is_not_queued() {
    let api = MockApi::new();
    api.fail("add_to_wishlist", FitFindError::Validation("bad".to_owned()));
    let ctx = context(&api);

    let item = NewWishlistItem::new("p1");
    let outcome = ctx
        .resilience
        .execute_or_queue("add p1", add("p1"), || api.add_to_wishlist(&item))
        .await;

    assert!(matches!(outcome, OperationOutcome::Failed(FitFindError::Validation(_))));
    assert!(ctx.queue().is_empty());
}

#[tokio::test]
async fn test_replay_runs_in_fifo_order() {
    let api = MockApi::new();
    let ctx = context(&api);
    ctx.resilience.set_online(false);
    for product_id in ["p1", "p2", "p3"] {
        ctx.resilience.enqueue(&format!("add {product_id}"), add(product_id));
    }
    ctx.resilience.set_online(true);

    let report = ctx.resilience.replay(api.as_ref()).await;

    assert_eq!(report, ReplayReport { replayed: 3, requeued: 0, dropped: 0 });
    // The mock prepends, so the newest add comes first.
    assert_eq!(api.wishlist_products(), ["p3", "p2", "p1"]);
    assert!(ctx.queue().is_empty());
}

#[tokio::test]
async fn test_replay_failure_keeps_operation_with_retry_count() {
    let api = MockApi::new();
    api.fail("add_to_wishlist", server_error());
    let ctx = context(&api);
    ctx.resilience.enqueue("add p1", add("p1"));
    ctx.resilience.enqueue("add p2", add("p2"));

    let report = ctx.resilience.replay(api.as_ref()).await;

    assert_eq!(report, ReplayReport { replayed: 1, requeued: 1, dropped: 0 });
    let queued = ctx.queue().snapshot();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].target_id, "p1");
    assert_eq!(queued[0].retry_count, 1);
}

#[tokio::test]
async fn test_exhausted_operation_is_dropped_and_published() {
    let api = MockApi::new();
    api.fail_times("add_to_wishlist", &server_error(), 3);
    let ctx = context(&api);
    let operation_id = ctx.resilience.enqueue("add p1", add("p1"));
    let mut events = ctx.events().subscribe();

    for _ in 0..2 {
        let report = ctx.resilience.replay(api.as_ref()).await;
        assert_eq!(report.requeued, 1);
    }
    let report = ctx.resilience.replay(api.as_ref()).await;

    assert_eq!(report.dropped, 1);
    assert!(ctx.queue().is_empty());
    let event = events.recv().await.unwrap();
    assert!(matches!(
        event,
        SyncEvent::OperationDropped { operation_id: id, .. } if id == operation_id
    ));
}

#[tokio::test]
async fn test_non_retryable_replay_error_drops_immediately() {
    let api = MockApi::new();
    api.fail("update_wishlist_item", FitFindError::Validation("bad".to_owned()));
    let ctx = context(&api);
    ctx.resilience.enqueue(
        "update",
        QueuedMutation::UpdateWishlistItem { id: "w1".to_owned(), updates: Default::default() },
    );

    let report = ctx.resilience.replay(api.as_ref()).await;

    assert_eq!(report.dropped, 1);
    assert!(ctx.queue().is_empty());
}

#[tokio::test]
async fn test_already_applied_counts_as_replayed() {
    let api = MockApi::new();
    api.seed_wishlist(vec![wishlist_item("p1", "Shirt", None, 1)]);
    let ctx = context(&api);
    ctx.resilience.enqueue("add p1", add("p1"));
    ctx.resilience
        .enqueue("remove p9", QueuedMutation::RemoveFromWishlist { product_id: "p9".to_owned() });

    let report = ctx.resilience.replay(api.as_ref()).await;

    assert_eq!(report, ReplayReport { replayed: 2, requeued: 0, dropped: 0 });
}

#[tokio::test]
async fn test_replay_stops_when_connection_drops() {
    let api = MockApi::new();
    api.fail("add_to_wishlist", FitFindError::Network("refused".to_owned()));
    let ctx = context(&api);
    ctx.resilience.enqueue("add p1", add("p1"));
    ctx.resilience.enqueue("add p2", add("p2"));

    let report = ctx.resilience.replay(api.as_ref()).await;

    assert_eq!(report.requeued, 1);
    assert!(!ctx.resilience.is_online());
    assert_eq!(api.calls("add_to_wishlist"), 1);
    let order: Vec<String> = ctx.queue().snapshot().into_iter().map(|op| op.target_id).collect();
    assert_eq!(order, ["p1", "p2"]);
}

#[tokio::test]
async fn test_reconnect_triggers_replay() {
    let api = MockApi::new();
    let ctx = context(&api);
    ctx.resilience.set_online(false);
    ctx.resilience.enqueue("add p1", add("p1"));

    let scope = CancelScope::new();
    let shared: Arc<dyn FitFindApi> = api.clone();
    let task = ctx.resilience.spawn_replay_on_reconnect(shared, scope.clone());
    ctx.resilience.set_online(true);

    for _ in 0..100 {
        if ctx.queue().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(ctx.queue().is_empty());
    assert_eq!(api.wishlist_products(), ["p1"]);

    scope.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn test_offline_delete_and_undo_replay_in_order() {
    let api = MockApi::new();
    api.seed_history(&["h1", "h2", "h3"]);
    let ctx = context(&api);
    let history = HistoryResource::new(&ctx);
    history.fetch().await.unwrap();
    ctx.resilience.set_online(false);

    assert!(history.delete("h2").await.is_queued());
    assert!(history.undo_delete("h2").await.unwrap().is_queued());
    assert_eq!(ids(&history.items()), ["h1", "h2", "h3"]);
    let kinds: Vec<OperationKind> = ctx.queue().snapshot().into_iter().map(|op| op.kind).collect();
    assert_eq!(kinds, [OperationKind::Remove, OperationKind::Add]);

    ctx.resilience.set_online(true);
    let report = ctx.resilience.replay(api.as_ref()).await;

    assert_eq!(report, ReplayReport { replayed: 2, requeued: 0, dropped: 0 });
    assert_eq!(api.calls("delete_history_entry"), 1);
    assert_eq!(api.calls("restore_history_entry"), 1);
    assert!(api.history_ids().contains(&"h2".to_owned()));
    assert!(ctx.queue().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_queue_keeps_operation_until_it_resolves() {
    let api = MockApi::new();
    api.set_delay(Duration::from_millis(200));
    let ctx = context(&api);
    ctx.resilience.enqueue("add p1", add("p1"));
    ctx.resilience.enqueue("add p2", add("p2"));

    let replay = {
        let ctx = ctx.clone();
        let api = Arc::clone(&api);
        tokio::spawn(async move { ctx.resilience.replay(api.as_ref()).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    let mid_replay: Vec<String> = ctx.queue().snapshot().into_iter().map(|op| op.target_id).collect();
    assert_eq!(mid_replay, ["p1", "p2"]);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let after_first: Vec<String> = ctx.queue().snapshot().into_iter().map(|op| op.target_id).collect();
    assert_eq!(after_first, ["p2"]);

    assert_eq!(replay.await.unwrap().replayed, 2);
    assert!(ctx.queue().is_empty());
}
