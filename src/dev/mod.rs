//! Development server support.
//!
//! # Data Flow
//! ```text
//! notify event
//!     → watcher.rs (classify: structure or content)
//!     → apply_changes
//!         Structure → rescan pages → new route table → new generation
//!         Content   → compiler invalidation → component and props caches dropped
//! ```
//!
//! # Design Decisions
//! - A failed rescan keeps the current route table
//! - Changes are applied one at a time, in arrival order

pub mod watcher;

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::config::PipelineConfig;
use crate::pipeline::DevPipeline;
use crate::routing::{scan_pages, RouteTable};

pub use watcher::{classify, SourceChange, SourceWatcher};

/// Rebuild the route table from disk.
pub fn rescan(config: &PipelineConfig) -> std::io::Result<RouteTable> {
    let entries = scan_pages(&config.pages, &config.site)?;
    Ok(RouteTable::from_entries(&entries, config.site.trailing_slash))
}

/// Apply one change to the pipeline.
pub fn apply_change(pipeline: &DevPipeline, config: &PipelineConfig, change: SourceChange) {
    match change {
        SourceChange::Structure => match rescan(config) {
            Ok(table) => {
                let routes = table.len();
                let generation = pipeline.set_routes(table);
                tracing::info!(generation, routes, "Route table rebuilt");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to rescan pages. Keeping current routes.");
            }
        },
        SourceChange::Content(path) => {
            pipeline.invalidate(&path);
            tracing::info!(path = %path.display(), "Source invalidated");
        }
    }
}

/// Drain `changes` into `pipeline` until shutdown or the watcher goes away.
pub async fn apply_changes(
    pipeline: Arc<DevPipeline>,
    config: Arc<PipelineConfig>,
    mut changes: mpsc::UnboundedReceiver<SourceChange>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            change = changes.recv() => match change {
                Some(change) => apply_change(&pipeline, &config, change),
                None => break,
            },
            _ = shutdown.recv() => break,
        }
    }
    tracing::debug!("Source change loop stopped");
}
