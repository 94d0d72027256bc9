//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::routing::router::Dispatcher;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<Dispatcher>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for validated snapshots.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<Dispatcher>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        match load_config(&path) {
                            Ok(dispatcher) => {
                                tracing::debug!(methods = dispatcher.tree().method_count(), "Reloaded route tree validated");
                                let _ = tx.send(dispatcher);
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to reload config, keeping current route tree");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DOCS: &str = "[routes.\"/docs\"]\nrenderer = \"text\"\n\"@intro\" = {}\n";
    const DOCS_AND_FAQ: &str =
        "[routes.\"/docs\"]\nrenderer = \"text\"\n\"@intro\" = {}\n\"@faq\" = {}\n";

    #[tokio::test]
    async fn test_edit_sends_validated_snapshot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DOCS.as_bytes()).unwrap();
        file.flush().unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(file.path());
        let _handle = watcher.run().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        std::fs::write(file.path(), DOCS_AND_FAQ).unwrap();

        let reloaded = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                match updates.recv().await {
                    Some(dispatcher) if dispatcher.tree().method_count() == 2 => return dispatcher,
                    Some(_) => continue,
                    None => panic!("watcher dropped its sender"),
                }
            }
        })
        .await
        .expect("reload within timeout");

        assert!(reloaded.tree().root().area("docs").unwrap().method("faq").is_some());
    }
}
