mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fitfind_client::ApiClient;
use fitfind_core::FitFindApi;
use fitfind_sync::{SyncConfig, SyncContext};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fitfind")]
#[command(about = "Manage your FitFind wishlist, collections and search history", long_about = None)]
struct Cli {
    /// Queue every change for later instead of sending it.
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Saved products
    Wishlist {
        #[command(subcommand)]
        command: WishlistCommands,
    },
    /// Named groups of saved products
    Collections {
        #[command(subcommand)]
        command: CollectionCommands,
    },
    /// Past image searches
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Search for products matching a photo
    Upload {
        image: PathBuf,
        /// Refine the search with feedback once results are in.
        #[arg(short, long)]
        feedback: Option<String>,
    },
    /// Operations waiting for a connection
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
}

#[derive(Subcommand)]
pub(crate) enum WishlistCommands {
    List {
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long)]
        tag: Option<String>,
        /// recent, oldest, price-low, price-high or title
        #[arg(long, default_value = "recent")]
        sort: String,
        /// Follow pagination until every item is loaded.
        #[arg(long)]
        all: bool,
    },
    Add {
        product_id: String,
        #[arg(short, long)]
        notes: Option<String>,
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Also put the item in this collection.
        #[arg(short, long)]
        collection: Option<String>,
    },
    Remove {
        #[arg(required = true)]
        product_ids: Vec<String>,
    },
    Check {
        #[arg(required = true)]
        product_ids: Vec<String>,
    },
}

#[derive(Subcommand)]
pub(crate) enum CollectionCommands {
    List,
    Create {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        private: bool,
    },
    Rename {
        id: String,
        name: String,
    },
    Delete {
        id: String,
    },
    Items {
        id: String,
    },
    AddItem {
        id: String,
        saved_item_id: String,
    },
    RemoveItem {
        id: String,
        saved_item_id: String,
    },
    /// Set the full item order, first to last.
    Reorder {
        id: String,
        #[arg(required = true)]
        saved_item_ids: Vec<String>,
    },
}

#[derive(Subcommand)]
pub(crate) enum HistoryCommands {
    List {
        /// Embed each entry's search session.
        #[arg(long)]
        details: bool,
    },
    Show {
        session_id: String,
    },
    Delete {
        id: String,
    },
    Restore {
        id: String,
    },
    BulkDelete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Subcommand)]
pub(crate) enum QueueCommands {
    Show,
    /// Replay queued operations now.
    Sync,
    Clear,
}

fn build_context(offline: bool) -> Result<SyncContext> {
    let api: Arc<dyn FitFindApi> = Arc::new(ApiClient::from_env()?);
    // A one-shot process cannot wait out an undo window.
    let config = SyncConfig { undo_window: None, ..SyncConfig::from_env() };
    if let Some(path) = &config.queue_path {
        tracing::debug!(path = %path.display(), "using offline queue file");
    }
    let ctx = SyncContext::new(api, config).context("could not open the offline queue")?;
    if offline {
        ctx.resilience.set_online(false);
    }
    let pending = ctx.queue().len();
    if pending > 0 && !offline {
        tracing::info!(pending, "queued operations waiting; run `fitfind queue sync` to send them");
    }
    Ok(ctx)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = build_context(cli.offline)?;

    match cli.command {
        Commands::Wishlist { command } => commands::wishlist::run(&ctx, command).await,
        Commands::Collections { command } => commands::collections::run(&ctx, command).await,
        Commands::History { command } => commands::history::run(&ctx, command).await,
        Commands::Upload { image, feedback } => {
            commands::upload::run(&ctx, &image, feedback).await
        },
        Commands::Queue { command } => commands::queue::run(&ctx, command).await,
    }
}
