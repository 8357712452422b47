//! Project elements (sessions and people)
//!
//! An element owns one folder `<parent>/<id>` holding its settings file
//! `<id>.<extension>` and any number of component files. The component file
//! set is discovered lazily, cached, and kept current by a folder watcher.
//!
//! # Layout
//! - `component_files`: cache build, refresh, add and delete
//! - `rename`: the id change state machine
//! - `stages`: completed workflow stage computation
//!
//! # Invariants
//! - `folder_path() == parent_folder_path().join(id())`, before and after
//!   any successful rename
//! - the settings file is always `folder_path()/<id>.<extension>`
//! - an element never exists without its folder and settings file

use crate::models::{
    ComponentFile, ComponentFileFactory, ComponentRole, ElementKind, ElementRef, FieldInstance,
};
use crate::services::file_watcher::ComponentFileWatcher;
use crate::services::{Collaborators, ElementContext};
use chrono::Utc;
use saymore_common::events::ElementEvent;
use saymore_common::{Error, FileSettings, Result};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

mod component_files;
mod rename;
mod stages;

pub use rename::{RenameFailure, RenameOutcome};
pub use stages::StageCompleteType;

pub(crate) use component_files::ComponentFileSet;

/// Called after a successful rename with (element, old id, new id)
pub type IdChangedCallback = Arc<dyn Fn(&ProjectElement, &str, &str) + Send + Sync>;

/// A session or person backed by a folder on disk
pub struct ProjectElement {
    kind: ElementKind,
    id: String,
    parent_folder_path: PathBuf,
    settings: Arc<FileSettings>,
    roles: Arc<Vec<ComponentRole>>,
    stage_overrides: HashMap<String, StageCompleteType>,
    metadata_file: Arc<ComponentFile>,
    factory: ComponentFileFactory,
    collaborators: Collaborators,
    /// `None` until first read, and again after every refresh
    cache: Arc<Mutex<Option<ComponentFileSet>>>,
    watcher: Mutex<Option<ComponentFileWatcher>>,
    id_changed: Option<IdChangedCallback>,
}

impl ProjectElement {
    /// Open an existing element or create a new one
    ///
    /// * `parent_folder` - e.g. `<project>/Sessions`; must already exist
    /// * `id` - element id; `None` picks the next free default name
    ///
    /// If `<parent>/<id>/<id>.<ext>` exists it is loaded, otherwise the folder
    /// is created and a fresh settings file saved immediately.
    pub fn open(
        kind: ElementKind,
        parent_folder: &Path,
        id: Option<&str>,
        context: &ElementContext,
    ) -> Result<Self> {
        if !parent_folder.is_dir() {
            return Err(Error::NotFound(format!(
                "Parent folder does not exist: {}",
                parent_folder.display()
            )));
        }

        let id = match id {
            Some(id) => id.trim().to_string(),
            None => Self::new_default_element_name(kind, parent_folder),
        };
        if id.is_empty() {
            return Err(Error::InvalidInput(kind.no_id_message().to_string()));
        }

        let settings = context.settings().clone();
        let roles = context.roles_for(kind);
        let stage_overrides = roles
            .iter()
            .map(|role| (role.id().to_string(), StageCompleteType::Auto))
            .collect();

        let settings_file_path = parent_folder
            .join(&id)
            .join(format!("{}.{}", id, kind.extension(&settings)));
        let metadata_file = Arc::new(ComponentFile::new_settings_file(
            &settings_file_path,
            kind.root_element_name(),
            settings.clone(),
            context.serializer().clone(),
        ));

        let mut element = Self {
            kind,
            id,
            parent_folder_path: parent_folder.to_path_buf(),
            settings,
            roles,
            stage_overrides,
            metadata_file,
            factory: context.factory(),
            collaborators: context.collaborators().clone(),
            cache: Arc::new(Mutex::new(None)),
            watcher: Mutex::new(None),
            id_changed: None,
        };

        if element.settings_file_path().exists() {
            element.load()?;
            debug!(kind = %kind, id = %element.id, "Loaded element");
        } else {
            std::fs::create_dir_all(element.folder_path())?;
            element.save()?;
            info!(kind = %kind, id = %element.id, folder = %element.folder_path().display(), "Created element");
            element
                .collaborators
                .events
                .emit_lossy(ElementEvent::ElementCreated {
                    kind: kind.to_string(),
                    id: element.id.clone(),
                    timestamp: Utc::now(),
                });
        }

        Ok(element)
    }

    /// First `"<prefix> NN"` (NN from 01) whose folder does not exist yet
    pub fn new_default_element_name(kind: ElementKind, parent_folder: &Path) -> String {
        let mut i = 1;
        loop {
            let name = format!("{} {:02}", kind.default_name_prefix(), i);
            if !parent_folder.join(&name).exists() {
                return name;
            }
            i += 1;
        }
    }

    /// Register the callback run after a successful rename
    pub fn set_id_changed_callback(&mut self, callback: IdChangedCallback) {
        self.id_changed = Some(callback);
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Snapshot of what component files know about this element
    pub fn element_ref(&self) -> ElementRef {
        ElementRef::new(self.kind, self.id.clone())
    }

    pub fn parent_folder_path(&self) -> &Path {
        &self.parent_folder_path
    }

    pub fn folder_path(&self) -> PathBuf {
        self.parent_folder_path.join(&self.id)
    }

    pub fn settings_file_path(&self) -> PathBuf {
        self.folder_path()
            .join(format!("{}.{}", self.id, self.extension()))
    }

    /// Settings file extension without the period
    pub fn extension(&self) -> &str {
        self.kind.extension(&self.settings)
    }

    /// The element's own settings file
    pub fn metadata_file(&self) -> &Arc<ComponentFile> {
        &self.metadata_file
    }

    /// Roles declared for this element's kind
    pub fn component_roles(&self) -> &[ComponentRole] {
        &self.roles
    }

    /// Persist settings (including stage overrides)
    pub fn save(&self) -> Result<()> {
        self.write_stage_overrides_to_fields();
        self.metadata_file.save_to(&self.settings_file_path())
    }

    /// Reload settings (including stage overrides) from disk
    pub fn load(&mut self) -> Result<()> {
        self.metadata_file.set_path(&self.settings_file_path());
        self.metadata_file.load_fields()?;
        self.read_stage_overrides_from_fields();
        Ok(())
    }

    /// `("id", id)` followed by every standard field of the settings file
    pub fn export_fields(&self) -> Vec<FieldInstance> {
        let mut fields = vec![FieldInstance::new("id", self.id.clone())];
        fields.extend(self.metadata_file.standard_fields());
        fields
    }

    /// Sum of every component file's duration
    ///
    /// Files without a (parsable) duration contribute nothing.
    pub fn total_media_duration(&self) -> Result<Duration> {
        Ok(self
            .get_component_files()?
            .iter()
            .filter_map(|file| file.duration())
            .sum())
    }

    fn lock_cache(&self) -> MutexGuard<'_, Option<ComponentFileSet>> {
        lock_ignoring_poison(&self.cache)
    }

    fn lock_watcher(&self) -> MutexGuard<'_, Option<ComponentFileWatcher>> {
        lock_ignoring_poison(&self.watcher)
    }
}

/// A poisoned lock only means another thread panicked mid-update; the cache
/// is rebuilt from disk on the next refresh, so keep going.
pub(crate) fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl fmt::Display for ProjectElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl fmt::Debug for ProjectElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectElement")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("folder", &self.folder_path())
            .field("overrides", &self.stage_overrides.iter().collect::<BTreeMap<_, _>>())
            .finish()
    }
}

impl Drop for ProjectElement {
    fn drop(&mut self) {
        // Stop notifications before the cache goes away
        self.lock_watcher().take();
    }
}
