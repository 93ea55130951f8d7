use anyhow::Result;
use fitfind_sync::{HistoryFilters, HistoryResource, QueuedMutation, SyncContext};
use serde_json::json;

use super::{outcome_json, print_json, queue_all};
use crate::HistoryCommands;

pub(crate) async fn run(ctx: &SyncContext, command: HistoryCommands) -> Result<()> {
    match command {
        HistoryCommands::List { details } => {
            let history = HistoryResource::with_filters(ctx, HistoryFilters { include_details: details });
            history.fetch().await?;
            print_json(&json!({ "history": history.items(), "pagination": history.pagination() }))
        },
        HistoryCommands::Show { session_id } => {
            let history = HistoryResource::new(ctx);
            print_json(&history.session_details(&session_id).await?)
        },
        HistoryCommands::Delete { id } => {
            if !ctx.resilience.is_online() {
                let mutation = QueuedMutation::DeleteHistoryEntry { id: id.clone() };
                return queue_all(ctx, [(format!("delete history entry {id}"), mutation)]);
            }
            let history = HistoryResource::new(ctx);
            history.fetch().await?;
            print_json(&outcome_json("delete history entry", history.delete(&id).await)?)
        },
        HistoryCommands::Restore { id } => {
            let api = &ctx.api;
            let outcome = ctx
                .resilience
                .execute_or_queue(
                    "restore history entry",
                    QueuedMutation::RestoreHistoryEntry { id: id.clone() },
                    || api.restore_history_entry(&id),
                )
                .await;
            print_json(&outcome_json("restore history entry", outcome)?)
        },
        HistoryCommands::BulkDelete { ids } => {
            let history = HistoryResource::new(ctx);
            history.fetch().await?;
            let outcome = history.bulk_delete(&ids).await;
            print_json(&json!({
                "status": format!("{:?}", outcome.status()).to_lowercase(),
                "deleted": outcome.deleted_ids,
                "failed": outcome.failed_ids,
                "batches": outcome.batch_sizes,
            }))
        },
    }
}
