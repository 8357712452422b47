//! File watcher for element folders
//!
//! Watches one element folder (non-recursively) and forwards the paths of
//! modified files as messages on a channel. A consumer thread drains the
//! channel and hands each path to the element's change handler, which takes
//! the element's cache lock before touching anything.
//!
//! Only content/attribute modifications are forwarded. Creation, deletion and
//! renames are left to explicit cache refreshes. Ordering is preserved per
//! path; nothing is promised across paths.

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use saymore_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Watches one folder for modified files
///
/// Dropping the watcher stops notification and closes the channel, which
/// ends the consumer thread.
pub struct ComponentFileWatcher {
    folder: PathBuf,
    _watcher: RecommendedWatcher,
}

impl ComponentFileWatcher {
    /// Start watching `folder`, calling `on_change` for every modified path
    ///
    /// `on_change` runs on a dedicated consumer thread, never on the caller's.
    pub fn start<F>(folder: &Path, on_change: F) -> Result<Self>
    where
        F: Fn(PathBuf) + Send + 'static,
    {
        let (change_tx, mut change_rx) = mpsc::unbounded_channel::<PathBuf>();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if !is_modification(&event.kind) {
                        return;
                    }
                    for path in event.paths {
                        if let Err(e) = change_tx.send(path) {
                            warn!("Failed to send file change event: {}", e);
                        }
                    }
                }
                Err(e) => error!("File watcher error: {}", e),
            }
        })
        .map_err(|e| Error::Watcher(e.to_string()))?;

        watcher
            .watch(folder, RecursiveMode::NonRecursive)
            .map_err(|e| Error::Watcher(format!("{}: {}", folder.display(), e)))?;

        let thread_folder = folder.to_path_buf();
        thread::Builder::new()
            .name("component-file-watcher".to_string())
            .spawn(move || {
                while let Some(path) = change_rx.blocking_recv() {
                    on_change(path);
                }
                debug!(folder = %thread_folder.display(), "File watcher consumer stopped");
            })
            .map_err(|e| Error::Watcher(format!("failed to spawn consumer: {}", e)))?;

        info!(folder = %folder.display(), "Started watching element folder");

        Ok(Self {
            folder: folder.to_path_buf(),
            _watcher: watcher,
        })
    }

    /// Folder being watched
    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

impl Drop for ComponentFileWatcher {
    fn drop(&mut self) {
        debug!(folder = %self.folder.display(), "Stopped watching element folder");
    }
}

/// Whether an event is a plain modification (not create/remove/rename)
pub fn is_modification(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Modify(modify) if !matches!(modify, ModifyKind::Name(_)))
}
