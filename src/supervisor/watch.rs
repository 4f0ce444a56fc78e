//! Source tree watcher.

use std::path::{Component, Path, PathBuf};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// Watches source paths and reports changed files.
pub struct SourceWatcher {
    paths: Vec<PathBuf>,
    change_tx: mpsc::UnboundedSender<PathBuf>,
}

impl SourceWatcher {
    /// Returns the watcher and a receiver of changed paths.
    pub fn new(paths: Vec<PathBuf>) -> (Self, mpsc::UnboundedReceiver<PathBuf>) {
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        (Self { paths, change_tx }, change_rx)
    }

    /// Start watching. Changes stop being reported once the returned
    /// watcher is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.change_tx;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let kind = event.kind;
                    if !(kind.is_modify() || kind.is_create() || kind.is_remove()) {
                        return;
                    }
                    for path in event.paths.into_iter().filter(|p| !is_hidden(p)) {
                        let _ = tx.send(path);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default(),
        )?;

        for path in &self.paths {
            watcher.watch(path, RecursiveMode::Recursive)?;
        }

        tracing::info!(paths = ?self.paths, "Source watcher started");
        Ok(watcher)
    }
}

/// Editor swap files and VCS metadata live under dot-prefixed names.
fn is_hidden(path: &Path) -> bool {
    path.components().any(|c| match c {
        Component::Normal(name) => name.to_str().is_some_and(|n| n.starts_with('.')),
        _ => false,
    })
}
