//! Framereel Binary - Local deployment
//!
//! Animates every frame image of one owner through the video-generation
//! service, merges the clips and prints the outcome as JSON.
//! It wires up:
//! - HTTP provider adapter with data-URI frame inlining
//! - Filesystem object store and frame source
//! - In-memory session repository
//!
//! Environment Variables (see `AppConfig`):
//! - PROVIDER_URL / PROVIDER_API_KEY: video-generation service
//! - FRAMES_DIR / OWNER_ID: where the frames are
//! - STORAGE_DIR / PUBLIC_BASE_URL: where the merged video goes
//! - RUST_LOG: log filter (default `info`)

use framereel::adapters::{
    DataUriInliner, FsFrameSource, FsObjectStore, HttpVideoProvider, InMemorySessionRepository,
};
use framereel::application::{ClipOrchestrator, GenerationControl, MergeService, ReelService};
use framereel::config::AppConfig;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // `.env` first so RUST_LOG can come from it.
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();

    // 1. Adapters
    let provider = match HttpVideoProvider::new(config.provider_config()) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            error!(error = %e, "Failed to build provider client");
            std::process::exit(1);
        }
    };
    let store = FsObjectStore::new(&config.storage_dir, &config.public_base_url);
    let frames = FsFrameSource::new(&config.frames_dir);

    // 2. Application Services
    let orchestrator = ClipOrchestrator::new(provider, config.orchestrator_config())
        .with_preprocessor(Arc::new(DataUriInliner::default()));
    let service = ReelService::new(
        orchestrator,
        MergeService::new(store),
        InMemorySessionRepository::new(),
    );

    // 3. Progress and Ctrl-C
    let control = GenerationControl::default();
    let mut progress = control.subscribe();
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let p = progress.borrow_and_update().clone();
            info!(
                completed = p.completed,
                failed = p.failed,
                batch = p.current_batch,
                total_batches = p.total_batches,
                percent = p.percent,
                "Progress"
            );
        }
    });

    let cancel = control.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, no further batches will be dispatched");
            cancel.cancel();
        }
    });

    // 4. Run
    let outcome = match service
        .create_reel_for_owner(&frames, &config.owner_id, &config.reel_options(), control)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Reel failed");
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&outcome) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!(error = %e, "Failed to serialize outcome");
            std::process::exit(1);
        }
    }
}
