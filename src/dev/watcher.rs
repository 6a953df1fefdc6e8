//! Pages directory watcher.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::{EventKind, ModifyKind};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::routing::is_page_file;

/// What a filesystem event means for the dev pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceChange {
    /// A page appeared, vanished or moved; the route table must be rebuilt.
    Structure,
    /// A source changed in place. The path is relative to the working
    /// directory, in the same form the loader uses.
    Content(PathBuf),
}

/// Watches the pages directory and reports [`SourceChange`]s.
pub struct SourceWatcher {
    dir: PathBuf,
    extensions: Vec<String>,
    change_tx: mpsc::UnboundedSender<SourceChange>,
}

impl SourceWatcher {
    /// Returns the watcher and a receiver for changes.
    pub fn new(dir: &Path, extensions: Vec<String>) -> (Self, mpsc::UnboundedReceiver<SourceChange>) {
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        (
            Self {
                dir: dir.to_path_buf(),
                extensions,
                change_tx,
            },
            change_rx,
        )
    }

    /// Start watching. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.change_tx.clone();
        let dir = self.dir.clone();
        let watched = dir.canonicalize().unwrap_or_else(|_| dir.clone());
        let root = watched.clone();
        let extensions = self.extensions.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Some(change) = classify(&event, &root, &dir, &extensions) {
                        tracing::debug!(?change, "Source change detected");
                        let _ = tx.send(change);
                    }
                }
                Err(e) => tracing::error!(error = %e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(1)),
        )?;

        // Events carry paths under the watched root, so watch the canonical one.
        watcher.watch(&watched, RecursiveMode::Recursive)?;
        tracing::info!(dir = %self.dir.display(), "Source watcher started");
        Ok(watcher)
    }
}

/// Map a raw event on `watched` (the canonical pages directory) to a
/// change. Paths in `Content` are re-rooted on `dir`.
pub fn classify(event: &Event, watched: &Path, dir: &Path, extensions: &[String]) -> Option<SourceChange> {
    let relative: Vec<&Path> = event
        .paths
        .iter()
        .filter_map(|p| p.strip_prefix(watched).ok())
        .collect();
    if relative.is_empty() {
        return None;
    }

    let structural = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    );
    if structural {
        // A moved directory may carry pages without naming them.
        let touches_pages = relative
            .iter()
            .any(|p| is_page_file(p, extensions) || p.extension().is_none());
        return touches_pages.then_some(SourceChange::Structure);
    }

    match event.kind {
        EventKind::Modify(_) => Some(SourceChange::Content(dir.join(relative[0]))),
        _ => None,
    }
}
