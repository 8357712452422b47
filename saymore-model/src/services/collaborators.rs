//! External collaborators of a project element
//!
//! The element core only *calls* these: deciding whether a file may be added,
//! moving a file to the recycle bin, pausing background work around bulk
//! copies, and reporting failures that must not stop an operation.

use crate::models::ComponentFile;
use chrono::Utc;
use saymore_common::config::append_to_path;
use saymore_common::events::{ElementEvent, EventBus};
use saymore_common::FileSettings;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Decides whether a file may become a component file
pub trait FileValidator: Send + Sync {
    fn is_valid_component_file(&self, path: &Path) -> bool;
}

/// Removes a component file (and its companions) from an element folder
pub trait RecycleBin: Send + Sync {
    /// Returns whether the file was removed
    fn move_to_recycle_bin(&self, file: &ComponentFile, ask_for_confirmation: bool) -> bool;
}

/// Process-wide pause/resume signal for background work
pub trait BackgroundProcesses: Send + Sync {
    fn suspend(&self);
    fn resume(&self, process_all_pending: bool);
}

/// Channel for failures that are reported but do not abort an operation
pub trait ErrorReporter: Send + Sync {
    fn report_non_fatal(&self, message: &str, path: Option<&Path>);
}

/// Bundle of collaborators handed to every element
#[derive(Clone)]
pub struct Collaborators {
    pub validator: Arc<dyn FileValidator>,
    pub recycle_bin: Arc<dyn RecycleBin>,
    pub background: Arc<dyn BackgroundProcesses>,
    pub errors: Arc<dyn ErrorReporter>,
    pub events: EventBus,
}

impl Collaborators {
    /// Default collaborators
    ///
    /// Deleted files go to `recycle_folder`; background and error signals are
    /// published on `events`.
    pub fn with_defaults(
        settings: Arc<FileSettings>,
        events: EventBus,
        recycle_folder: PathBuf,
    ) -> Self {
        Self {
            validator: Arc::new(DefaultFileValidator::new(settings.clone())),
            recycle_bin: Arc::new(FolderRecycleBin::new(recycle_folder, settings)),
            background: Arc::new(EventBusBackground::new(events.clone())),
            errors: Arc::new(TracingErrorReporter::new(events.clone())),
            events,
        }
    }
}

/// Accepts existing regular files that are not bookkeeping files
#[derive(Debug, Clone)]
pub struct DefaultFileValidator {
    settings: Arc<FileSettings>,
}

impl DefaultFileValidator {
    pub fn new(settings: Arc<FileSettings>) -> Self {
        Self { settings }
    }
}

impl FileValidator for DefaultFileValidator {
    fn is_valid_component_file(&self, path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let s = &self.settings;
        let rejected_suffixes = [
            s.metadata_file_extension.to_lowercase(),
            s.hidden_file_suffix.to_lowercase(),
            format!(".{}", s.session_extension.to_lowercase()),
            format!(".{}", s.person_extension.to_lowercase()),
        ];

        !name.is_empty()
            && !name.starts_with('.')
            && name != "thumbs.db"
            && !rejected_suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()))
    }
}

/// Confirmation prompt used before recycling a file
pub type ConfirmDelete = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Moves deleted files into a recycle folder
///
/// The file's sidecar metadata, annotation file, oral annotation file and
/// oral annotations folder travel with it.
#[derive(Clone)]
pub struct FolderRecycleBin {
    folder: PathBuf,
    settings: Arc<FileSettings>,
    confirm: Option<ConfirmDelete>,
}

impl FolderRecycleBin {
    pub fn new(folder: PathBuf, settings: Arc<FileSettings>) -> Self {
        Self {
            folder,
            settings,
            confirm: None,
        }
    }

    /// Ask `confirm` before deleting when the caller requests confirmation
    pub fn with_confirmation(mut self, confirm: ConfirmDelete) -> Self {
        self.confirm = Some(confirm);
        self
    }

    fn companions(&self, path: &Path) -> Vec<PathBuf> {
        vec![
            path.to_path_buf(),
            self.settings.metadata_path_for(path),
            self.settings.annotation_path_for(path),
            self.settings.oral_annotation_path_for(path),
            self.settings.oral_annotations_folder_for(path),
        ]
    }

    fn free_destination(&self, source: &Path) -> PathBuf {
        let name = source
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        let mut destination = self.folder.join(&name);
        let mut n = 1;
        while destination.exists() {
            destination = append_to_path(&self.folder.join(&name), &format!(" ({})", n));
            n += 1;
        }
        destination
    }
}

impl RecycleBin for FolderRecycleBin {
    fn move_to_recycle_bin(&self, file: &ComponentFile, ask_for_confirmation: bool) -> bool {
        let path = file.path();

        if ask_for_confirmation {
            if let Some(confirm) = &self.confirm {
                if !confirm(&path) {
                    debug!(path = %path.display(), "Delete cancelled by user");
                    return false;
                }
            }
        }

        if let Err(e) = std::fs::create_dir_all(&self.folder) {
            warn!(folder = %self.folder.display(), error = %e, "Cannot create recycle folder");
            return false;
        }

        for (i, companion) in self.companions(&path).iter().enumerate() {
            if !companion.exists() {
                continue;
            }
            let destination = self.free_destination(companion);
            if let Err(e) = std::fs::rename(companion, &destination) {
                warn!(
                    path = %companion.display(),
                    error = %e,
                    "Could not move file to recycle folder"
                );
                // Only the primary file failing means nothing was deleted
                if i == 0 {
                    return false;
                }
            }
        }

        info!(path = %path.display(), folder = %self.folder.display(), "Moved to recycle folder");
        true
    }
}

/// Background pause/resume published on the event bus
///
/// Keeps a nesting depth so overlapping bulk operations resume only once the
/// last one finishes.
#[derive(Debug)]
pub struct EventBusBackground {
    depth: AtomicUsize,
    events: EventBus,
}

impl EventBusBackground {
    pub fn new(events: EventBus) -> Self {
        Self {
            depth: AtomicUsize::new(0),
            events,
        }
    }

    /// Whether background work is currently paused
    pub fn is_suspended(&self) -> bool {
        self.depth.load(Ordering::SeqCst) > 0
    }
}

impl BackgroundProcesses for EventBusBackground {
    fn suspend(&self) {
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(depth, "Background processing suspended");
        self.events
            .emit_lossy(ElementEvent::BackgroundProcessingSuspended {
                depth,
                timestamp: Utc::now(),
            });
    }

    fn resume(&self, process_all_pending: bool) {
        let depth = self
            .depth
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| Some(d.saturating_sub(1)))
            .map(|previous| previous.saturating_sub(1))
            .unwrap_or(0);
        debug!(depth, process_all_pending, "Background processing resumed");
        self.events.emit_lossy(ElementEvent::BackgroundProcessingResumed {
            depth,
            process_pending: process_all_pending,
            timestamp: Utc::now(),
        });
    }
}

/// Logs non-fatal failures and publishes them as events
#[derive(Debug, Clone)]
pub struct TracingErrorReporter {
    events: EventBus,
}

impl TracingErrorReporter {
    pub fn new(events: EventBus) -> Self {
        Self { events }
    }
}

impl ErrorReporter for TracingErrorReporter {
    fn report_non_fatal(&self, message: &str, path: Option<&Path>) {
        match path {
            Some(p) => warn!(path = %p.display(), "{}", message),
            None => warn!("{}", message),
        }
        self.events.emit_lossy(ElementEvent::NonFatalError {
            message: message.to_string(),
            path: path.map(Path::to_path_buf),
            timestamp: Utc::now(),
        });
    }
}
