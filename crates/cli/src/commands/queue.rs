use anyhow::{Result, bail};
use fitfind_sync::SyncContext;
use serde_json::json;

use super::print_json;
use crate::QueueCommands;

pub(crate) async fn run(ctx: &SyncContext, command: QueueCommands) -> Result<()> {
    let queue = ctx.queue();
    match command {
        QueueCommands::Show => print_json(&queue.snapshot()),
        QueueCommands::Sync => {
            if !ctx.resilience.is_online() {
                bail!("cannot sync while offline");
            }
            let report = ctx.resilience.replay(ctx.api.as_ref()).await;
            print_json(&json!({
                "replayed": report.replayed,
                "requeued": report.requeued,
                "dropped": report.dropped,
                "remaining": queue.len(),
            }))
        },
        QueueCommands::Clear => print_json(&json!({ "cleared": queue.clear() })),
    }
}
