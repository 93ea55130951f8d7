use std::path::Path;

use anyhow::{Context, Result};
use fitfind_core::RedoRequest;
use fitfind_sync::SyncContext;

use super::print_json;

pub(crate) async fn run(ctx: &SyncContext, image: &Path, feedback: Option<String>) -> Result<()> {
    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("failed to read {}", image.display()))?;
    let file_name = image
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload.jpg")
        .to_owned();
    tracing::info!(file = %file_name, size = bytes.len(), "uploading image");

    let api = &ctx.api;
    let result = ctx
        .resilience
        .execute("upload image", || api.upload_image(&file_name, bytes.clone()))
        .await?;

    let Some(feedback) = feedback else {
        return print_json(&result);
    };
    let request = RedoRequest {
        file_id: result.file_id.clone(),
        conversation_context: result.conversation_context.clone(),
        feedback: Some(feedback),
    };
    let refined =
        ctx.resilience.execute("refine search", || api.redo_search(&request)).await?;
    print_json(&refined)
}
