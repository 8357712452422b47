//! Component file cache
//!
//! The cache is built on first read by scanning the element folder, then kept
//! current by the folder watcher (content changes only). Membership changes
//! only through `add_component_files` or a refresh.

use super::{lock_ignoring_poison, ProjectElement};
use crate::models::ComponentFile;
use crate::services::file_watcher::ComponentFileWatcher;
use chrono::Utc;
use saymore_common::events::{ElementEvent, EventBus};
use saymore_common::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Cached component files of one element
///
/// The element's settings file always comes first; the rest are ordered by
/// path with each file's annotation and oral annotation right after it.
pub(crate) struct ComponentFileSet {
    files: Vec<Arc<ComponentFile>>,
}

impl ComponentFileSet {
    fn new(metadata_file: Arc<ComponentFile>) -> Self {
        Self {
            files: vec![metadata_file],
        }
    }

    /// Add a file followed by its linked annotation files
    fn push_with_companions(&mut self, file: Arc<ComponentFile>) {
        let annotation = file.annotation_file();
        let oral_annotation = file.oral_annotation_file();
        self.files.push(file);
        self.files.extend(annotation);
        self.files.extend(oral_annotation);
    }

    /// Entry tracking `path`, either as the file itself or as its sidecar
    fn find(&self, path: &Path) -> Option<&Arc<ComponentFile>> {
        self.files
            .iter()
            .find(|file| file.path() == path || file.metadata_path() == path)
    }

    fn snapshot(&self) -> Vec<Arc<ComponentFile>> {
        self.files.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.files.len()
    }
}

/// Re-parse the cached entry for `path`, if any
///
/// Runs on the watcher's consumer thread. Returns whether an entry matched.
fn apply_change(
    cache: &Mutex<Option<ComponentFileSet>>,
    path: &Path,
    element_id: &str,
    events: &EventBus,
) -> bool {
    let guard = lock_ignoring_poison(cache);
    let Some(file) = guard.as_ref().and_then(|set| set.find(path)).cloned() else {
        return false;
    };

    file.refresh();
    drop(guard);

    debug!(element = %element_id, path = %path.display(), "Component file changed on disk");
    events.emit_lossy(ElementEvent::ComponentFileChanged {
        id: element_id.to_string(),
        path: path.to_path_buf(),
        timestamp: Utc::now(),
    });
    true
}

impl ProjectElement {
    /// Snapshot of the element's component files, settings file first
    ///
    /// Scans the folder on first use (or after a refresh) and starts watching
    /// it for changes.
    pub fn get_component_files(&self) -> Result<Vec<Arc<ComponentFile>>> {
        let snapshot = {
            let mut cache = self.lock_cache();
            if let Some(set) = cache.as_ref() {
                return Ok(set.snapshot());
            }
            let set = self.scan_folder()?;
            let snapshot = set.snapshot();
            *cache = Some(set);
            snapshot
        };

        self.start_watching();
        Ok(snapshot)
    }

    fn scan_folder(&self) -> Result<ComponentFileSet> {
        let folder = self.folder_path();
        let element = self.element_ref();
        let mut set = ComponentFileSet::new(self.metadata_file.clone());

        for entry in WalkDir::new(&folder)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(std::io::Error::from)?;
            // Follows symlinks, so linked media counts as a file
            if !entry.path().is_file() {
                continue;
            }
            let path = entry.path();
            if !self.get_show_as_normal_component_file(path) {
                continue;
            }
            set.push_with_companions(Arc::new((self.factory)(&element, path)));
        }

        debug!(element = %self.id, files = set.len(), "Scanned element folder");
        Ok(set)
    }

    fn start_watching(&self) {
        let mut watcher = self.lock_watcher();
        if watcher.is_some() {
            return;
        }

        let cache = self.cache.clone();
        let events = self.collaborators.events.clone();
        let element_id = self.id.clone();
        match ComponentFileWatcher::start(&self.folder_path(), move |path: PathBuf| {
            apply_change(&cache, &path, &element_id, &events);
        }) {
            Ok(started) => *watcher = Some(started),
            Err(e) => warn!(
                element = %self.id,
                error = %e,
                "Could not watch element folder; external edits will not be picked up"
            ),
        }
    }

    /// Whether a file in the folder is shown as an ordinary component file
    ///
    /// Rejects the element's settings file, sidecar metadata, generated and
    /// annotation files, hidden files and `thumbs.db`.
    pub fn get_show_as_normal_component_file(&self, path: &Path) -> bool {
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().to_lowercase(),
            None => return false,
        };
        if name.starts_with('.') || name == "thumbs.db" {
            return false;
        }

        let s = &self.settings;
        let rejected_suffixes = [
            format!(".{}", self.extension()).to_lowercase(),
            s.metadata_file_extension.to_lowercase(),
            s.hidden_file_suffix.to_lowercase(),
            s.oral_annotation_generated_suffix.to_lowercase(),
        ];
        if rejected_suffixes
            .iter()
            .any(|suffix| name.ends_with(suffix.as_str()))
        {
            return false;
        }

        !s.is_annotation_file(path)
    }

    /// Re-parse the cached file at `path` as if the watcher had reported it
    ///
    /// Returns whether a cached entry matched. Cache membership never changes.
    pub fn apply_file_change(&self, path: &Path) -> bool {
        apply_change(&self.cache, path, &self.id, &self.collaborators.events)
    }

    /// Drop the cache and stop watching; the next read rescans
    pub fn refresh_component_files(&self) {
        // Watcher first so no callback sees a half-cleared cache
        let watcher = self.lock_watcher().take();
        drop(watcher);

        *self.lock_cache() = None;
        debug!(element = %self.id, "Component file cache cleared");
        self.collaborators
            .events
            .emit_lossy(ElementEvent::ComponentFilesRefreshed {
                id: self.id.clone(),
                timestamp: Utc::now(),
            });
    }

    /// Copy files into the element folder
    ///
    /// Invalid files and files whose name already exists in the folder are
    /// skipped. A copy that fails is reported and the rest continue.
    /// Returns whether any file was left to copy after filtering.
    pub fn add_component_files(&self, paths: &[PathBuf]) -> bool {
        let folder = self.folder_path();
        let to_copy = self.remove_invalid_files_from_prospective_files_to_add(paths);
        if to_copy.is_empty() {
            debug!(element = %self.id, "No files left to add");
            return false;
        }

        let collaborators = &self.collaborators;
        collaborators.background.suspend();

        let element = self.element_ref();
        for source in &to_copy {
            let Some(name) = source.file_name() else {
                continue;
            };
            let destination = folder.join(name);
            if let Err(e) = std::fs::copy(source, &destination) {
                collaborators.errors.report_non_fatal(
                    &format!("Could not copy {} into {}: {}", source.display(), self.id, e),
                    Some(source),
                );
                continue;
            }

            info!(element = %self.id, file = %destination.display(), "Added component file");
            let mut cache = self.lock_cache();
            if let Some(set) = cache.as_mut() {
                set.push_with_companions(Arc::new((self.factory)(&element, &destination)));
            }
        }

        collaborators.background.resume(true);
        true
    }

    /// Single-file form of [`ProjectElement::add_component_files`]
    pub fn add_component_file(&self, path: &Path) -> bool {
        self.add_component_files(&[path.to_path_buf()])
    }

    /// Paths that pass the validator and are not already in the folder
    pub fn remove_invalid_files_from_prospective_files_to_add(
        &self,
        paths: &[PathBuf],
    ) -> Vec<PathBuf> {
        let folder = self.folder_path();
        paths
            .iter()
            .filter(|path| self.collaborators.validator.is_valid_component_file(path))
            .filter(|path| match path.file_name() {
                Some(name) => !folder.join(name).exists(),
                None => false,
            })
            .cloned()
            .collect()
    }

    /// Send a component file to the recycle bin
    ///
    /// Returns whether the file was removed; on success the cache is cleared.
    pub fn delete_component_file(&self, file: &ComponentFile, ask_for_confirmation: bool) -> bool {
        if !self
            .collaborators
            .recycle_bin
            .move_to_recycle_bin(file, ask_for_confirmation)
        {
            return false;
        }
        self.refresh_component_files();
        true
    }

    /// Whether the folder watcher is running
    pub fn is_watching(&self) -> bool {
        self.lock_watcher().is_some()
    }
}
