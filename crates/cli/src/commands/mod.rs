pub(crate) mod collections;
pub(crate) mod history;
pub(crate) mod queue;
pub(crate) mod upload;
pub(crate) mod wishlist;

use anyhow::{Context, Result};
use fitfind_sync::{OperationOutcome, QueuedMutation, SyncContext};
use serde::Serialize;
use serde_json::{Value, json};

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// JSON form of a mutation result. A failure becomes the command's error.
pub(crate) fn outcome_json<T: Serialize>(action: &str, outcome: OperationOutcome<T>) -> Result<Value> {
    match outcome {
        OperationOutcome::Success(value) => Ok(json!({ "status": "success", "result": value })),
        OperationOutcome::Queued(operation_id) => {
            Ok(json!({ "status": "queued", "operation_id": operation_id }))
        },
        OperationOutcome::Failed(err) => {
            let message = err.user_message();
            Err(err).context(format!("{action} failed: {message}"))
        },
    }
}

/// Queue mutations that need loaded state the CLI cannot fetch while offline.
pub(crate) fn queue_all(
    ctx: &SyncContext,
    mutations: impl IntoIterator<Item = (String, QueuedMutation)>,
) -> Result<()> {
    let queued: Vec<Value> = mutations
        .into_iter()
        .map(|(description, mutation)| {
            let operation_id = ctx.resilience.enqueue(&description, mutation);
            json!({ "operation_id": operation_id, "description": description })
        })
        .collect();
    print_json(&json!({ "status": "queued", "operations": queued }))
}
