use fitfind_core::FitFindError;

use super::{MockApi, context, server_error, wishlist_item};
use crate::{CollectionPlacement, OperationOutcome, ResourceKind, SaveItemAction, SaveRequest, SyncEvent};

#[tokio::test]
async fn test_save_new_product() {
    let api = MockApi::new();
    let ctx = context(&api);
    let mut events = ctx.events().subscribe();

    let outcome = SaveItemAction::new(&ctx).save(SaveRequest::new("p1")).await;

    let OperationOutcome::Success(result) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert!(!result.already_saved);
    assert_eq!(result.collection, CollectionPlacement::NotRequested);
    assert_eq!(result.wishlist_item.unwrap().product_id, "p1");
    assert!(matches!(
        events.recv().await.unwrap(),
        SyncEvent::ItemAdded(e) if e.resource == ResourceKind::Wishlist
    ));
}

#[tokio::test]
async fn test_conflict_means_already_saved() {
    let api = MockApi::new();
    api.seed_wishlist(vec![wishlist_item("p1", "Linen shirt", Some(40.0), 1)]);
    let ctx = context(&api);

    let outcome = SaveItemAction::new(&ctx).save(SaveRequest::new("p1")).await;

    let OperationOutcome::Success(result) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert!(result.already_saved);
    assert_eq!(result.wishlist_item.unwrap().id, "w-p1");
    assert_eq!(api.wishlist_products(), ["p1"]);
}

#[tokio::test]
async fn test_already_saved_product_still_goes_into_collection() {
    let api = MockApi::new();
    api.seed_wishlist(vec![wishlist_item("p1", "Linen shirt", Some(40.0), 1)]);
    let ctx = context(&api);

    let request = SaveRequest::new("p1").into_collection("c1");
    let outcome = SaveItemAction::new(&ctx).save(request).await;

    let OperationOutcome::Success(result) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert!(result.already_saved);
    assert_eq!(result.collection, CollectionPlacement::Added);
    assert_eq!(api.collection_item_ids("c1"), ["w-p1"]);
}

#[tokio::test]
async fn test_item_already_in_collection() {
    let api = MockApi::new();
    api.seed_wishlist(vec![wishlist_item("p1", "Linen shirt", None, 1)]);
    api.seed_collection_items("c1", &["w-p1"]);
    let ctx = context(&api);

    let request = SaveRequest::new("p1").into_collection("c1");
    let outcome = SaveItemAction::new(&ctx).save(request).await;

    let OperationOutcome::Success(result) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(result.collection, CollectionPlacement::AlreadyPresent);
}

#[tokio::test]
async fn test_collection_failure_keeps_wishlist_save() {
    let api = MockApi::new();
    api.fail("add_collection_item", FitFindError::NotFound("Collection not found".to_owned()));
    let ctx = context(&api);

    let request = SaveRequest::new("p1").into_collection("missing");
    let outcome = SaveItemAction::new(&ctx).save(request).await;

    let OperationOutcome::Success(result) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert!(result.wishlist_item.is_some());
    assert!(matches!(result.collection, CollectionPlacement::Failed(FitFindError::NotFound(_))));
    assert_eq!(api.wishlist_products(), ["p1"]);
}

#[tokio::test]
async fn test_offline_save_is_queued_without_collection_step() {
    let api = MockApi::new();
    let ctx = context(&api);
    ctx.resilience.set_online(false);

    let request = SaveRequest::new("p1").into_collection("c1");
    let outcome = SaveItemAction::new(&ctx).save(request).await;

    assert!(outcome.is_queued());
    assert_eq!(ctx.queue().len(), 1);
    assert_eq!(api.calls("add_to_wishlist"), 0);
    assert_eq!(api.calls("add_collection_item"), 0);
}

#[tokio::test]
async fn test_server_failure_is_reported() {
    let api = MockApi::new();
    api.fail_times("add_to_wishlist", &server_error(), 3);
    let ctx = context(&api);

    let outcome = SaveItemAction::new(&ctx).save(SaveRequest::new("p1")).await;

    assert!(matches!(outcome, OperationOutcome::Failed(FitFindError::Http { status: 500, .. })));
    assert!(ctx.queue().is_empty());
}
