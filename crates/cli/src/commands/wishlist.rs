use anyhow::{Result, bail};
use fitfind_sync::{
    CollectionPlacement, FetchStatus, QueuedMutation, SaveItemAction, SaveRequest, SyncContext,
    WishlistFilters, WishlistResource, WishlistSort,
};
use serde_json::{Value, json};

use super::{outcome_json, print_json, queue_all};
use crate::WishlistCommands;

fn parse_sort(value: &str) -> Result<WishlistSort> {
    Ok(match value {
        "recent" => WishlistSort::Recent,
        "oldest" => WishlistSort::Oldest,
        "price-low" => WishlistSort::PriceLowHigh,
        "price-high" => WishlistSort::PriceHighLow,
        "title" => WishlistSort::Title,
        other => bail!("unknown sort order: {other}"),
    })
}

fn placement_json(placement: &CollectionPlacement) -> Value {
    match placement {
        CollectionPlacement::NotRequested => Value::Null,
        CollectionPlacement::Added => json!("added"),
        CollectionPlacement::AlreadyPresent => json!("already_present"),
        CollectionPlacement::Queued(operation_id) => json!({ "queued": operation_id }),
        CollectionPlacement::Failed(err) => json!({ "failed": err.user_message() }),
    }
}

/// Load pages until `product_id` is in the list or the wishlist runs out.
async fn load_until_saved(wishlist: &WishlistResource, product_id: &str) -> Result<()> {
    wishlist.fetch().await?;
    while !wishlist.is_saved(product_id) && wishlist.pagination().has_more {
        if wishlist.load_more().await? == (FetchStatus::Loaded { count: 0 }) {
            break;
        }
    }
    Ok(())
}

pub(crate) async fn run(ctx: &SyncContext, command: WishlistCommands) -> Result<()> {
    let wishlist = WishlistResource::new(ctx);
    match command {
        WishlistCommands::List { search, tag, sort, all } => {
            wishlist.set_filters(WishlistFilters { search, tag, sort: parse_sort(&sort)? });
            wishlist.fetch().await?;
            while all && wishlist.pagination().has_more {
                if wishlist.load_more().await? == (FetchStatus::Loaded { count: 0 }) {
                    break;
                }
            }
            let items = wishlist.visible_items();
            print_json(&json!({ "items": items, "pagination": wishlist.pagination() }))
        },
        WishlistCommands::Add { product_id, notes, tags, collection } => {
            let mut request = SaveRequest { notes, tags, ..SaveRequest::new(product_id) };
            if let Some(collection_id) = collection {
                request = request.into_collection(collection_id);
            }
            let outcome = SaveItemAction::new(ctx).save(request).await.map(|result| {
                json!({
                    "item": result.wishlist_item,
                    "already_saved": result.already_saved,
                    "collection": placement_json(&result.collection),
                })
            });
            print_json(&outcome_json("add to wishlist", outcome)?)
        },
        WishlistCommands::Remove { product_ids } => {
            if !ctx.resilience.is_online() {
                return queue_all(ctx, product_ids.iter().map(|product_id| {
                    let mutation =
                        QueuedMutation::RemoveFromWishlist { product_id: product_id.clone() };
                    (format!("remove {product_id} from wishlist"), mutation)
                }));
            }
            if let [product_id] = product_ids.as_slice() {
                load_until_saved(&wishlist, product_id).await?;
                let outcome = wishlist.remove(product_id).await;
                return print_json(&outcome_json("remove from wishlist", outcome)?);
            }
            wishlist.fetch().await?;
            let outcome = wishlist.bulk_remove(&product_ids).await;
            print_json(&json!({
                "status": format!("{:?}", outcome.status()).to_lowercase(),
                "deleted": outcome.deleted_ids,
                "failed": outcome.failed_ids,
            }))
        },
        WishlistCommands::Check { product_ids } => {
            print_json(&wishlist.check_status(&product_ids).await?)
        },
    }
}
