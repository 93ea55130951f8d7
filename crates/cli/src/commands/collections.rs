use anyhow::Result;
use fitfind_core::{CollectionUpdate, ItemPosition, NewCollection};
use fitfind_sync::{CollectionItemsResource, CollectionsResource, QueuedMutation, SyncContext};
use serde_json::json;

use super::{outcome_json, print_json, queue_all};
use crate::CollectionCommands;

pub(crate) async fn run(ctx: &SyncContext, command: CollectionCommands) -> Result<()> {
    let online = ctx.resilience.is_online();
    let collections = CollectionsResource::new(ctx);
    match command {
        CollectionCommands::List => {
            collections.fetch().await?;
            print_json(&json!({
                "collections": collections.items(),
                "pagination": collections.pagination(),
            }))
        },
        CollectionCommands::Create { name, description, private } => {
            let request = NewCollection { description, is_private: private, ..NewCollection::new(name) };
            print_json(&outcome_json("create collection", collections.create(request).await)?)
        },
        CollectionCommands::Rename { id, name } => {
            let updates = CollectionUpdate { name: Some(name), ..CollectionUpdate::default() };
            if !online {
                let mutation = QueuedMutation::UpdateCollection { id: id.clone(), updates };
                return queue_all(ctx, [(format!("rename collection {id}"), mutation)]);
            }
            collections.fetch().await?;
            print_json(&outcome_json("rename collection", collections.update(&id, updates).await)?)
        },
        CollectionCommands::Delete { id } => {
            if !online {
                let mutation = QueuedMutation::DeleteCollection { id: id.clone() };
                return queue_all(ctx, [(format!("delete collection {id}"), mutation)]);
            }
            collections.fetch().await?;
            print_json(&outcome_json("delete collection", collections.delete(&id).await)?)
        },
        CollectionCommands::Items { id } => {
            let items = CollectionItemsResource::new(ctx, id);
            items.fetch().await?;
            print_json(&json!({ "items": items.items(), "pagination": items.pagination() }))
        },
        CollectionCommands::AddItem { id, saved_item_id } => {
            let items = CollectionItemsResource::new(ctx, id);
            if online {
                items.fetch().await?;
            }
            print_json(&outcome_json("add item to collection", items.add(&saved_item_id, None).await)?)
        },
        CollectionCommands::RemoveItem { id, saved_item_id } => {
            if !online {
                let description = format!("remove {saved_item_id} from collection {id}");
                let mutation = QueuedMutation::RemoveCollectionItem { collection_id: id, saved_item_id };
                return queue_all(ctx, [(description, mutation)]);
            }
            let items = CollectionItemsResource::new(ctx, id);
            items.fetch().await?;
            print_json(&outcome_json("remove item from collection", items.remove(&saved_item_id).await)?)
        },
        CollectionCommands::Reorder { id, saved_item_ids } => {
            if !online {
                let positions = saved_item_ids
                    .iter()
                    .zip(1..)
                    .map(|(saved_item_id, position)| ItemPosition {
                        saved_item_id: saved_item_id.clone(),
                        position,
                    })
                    .collect();
                let description = format!("reorder collection {id}");
                let mutation = QueuedMutation::ReorderCollectionItems { collection_id: id, positions };
                return queue_all(ctx, [(description, mutation)]);
            }
            let items = CollectionItemsResource::new(ctx, id);
            items.fetch().await?;
            let outcome = items.reorder(&saved_item_ids).await.map(|()| items.items());
            print_json(&outcome_json("reorder collection", outcome)?)
        },
    }
}
