//! Component files
//!
//! A component file is one file in an element's folder. Ordinary files keep
//! their field values in a sidecar metadata file next to them; the element's
//! own settings file (its "metadata file") stores its fields inline.
//!
//! Files are shared as `Arc<ComponentFile>` between the element cache and
//! callers. Parsed state sits behind an `RwLock` so the watcher can re-parse a
//! file in place while snapshots handed out earlier stay valid.

use crate::annotation;
use crate::models::{ComponentRole, ElementRef};
use crate::serializer::{FieldMap, FileSerializer};
use saymore_common::human_time::parse_duration_string;
use saymore_common::{FileSettings, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, warn};

/// Field ids with this prefix belong to the user-defined custom namespace
pub const CUSTOM_FIELD_PREFIX: &str = "custom_";

/// Field id prefix reserved for persisted stage overrides
pub const STAGE_FIELD_PREFIX: &str = "stage_";

/// Field holding a media file's duration (`H:MM:SS`)
pub const DURATION_FIELD: &str = "Duration";

/// Builds component files without the element knowing concrete file types
pub type ComponentFileFactory =
    Arc<dyn Fn(&ElementRef, &Path) -> ComponentFile + Send + Sync>;

/// What a tracked file is to its element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// The element's own settings file
    Settings,
    /// Media, documents, anything the user added
    Standard,
    /// ELAN annotation file belonging to a media file
    Annotation,
    /// Generated oral annotation audio belonging to a media file
    OralAnnotation,
}

/// A single (field id, value) pair
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldInstance {
    pub field_id: String,
    pub value: String,
}

impl FieldInstance {
    pub fn new(field_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            value: value.into(),
        }
    }

    /// Whether this field lives in the custom namespace
    pub fn is_custom(&self) -> bool {
        self.field_id.starts_with(CUSTOM_FIELD_PREFIX)
    }
}

#[derive(Debug, Default)]
struct FileState {
    path: PathBuf,
    fields: FieldMap,
    annotation: Option<Arc<ComponentFile>>,
    oral_annotation: Option<Arc<ComponentFile>>,
}

/// One tracked file
pub struct ComponentFile {
    kind: FileKind,
    root_element_name: String,
    settings: Arc<FileSettings>,
    serializer: Arc<dyn FileSerializer>,
    state: RwLock<FileState>,
}

impl ComponentFile {
    /// Build a standard component file and parse its metadata
    ///
    /// Loads the sidecar metadata if present and links any annotation or oral
    /// annotation file that exists next to it. A sidecar that cannot be read
    /// is logged and treated as empty.
    pub fn load(
        path: &Path,
        settings: Arc<FileSettings>,
        serializer: Arc<dyn FileSerializer>,
    ) -> Self {
        let file = Self::with_kind(FileKind::Standard, path, "MetaData", settings, serializer);
        file.refresh();
        file
    }

    /// Build the settings file for an element
    ///
    /// Nothing is read here; the element decides whether to `load` or `save`.
    pub fn new_settings_file(
        path: &Path,
        root_element_name: &str,
        settings: Arc<FileSettings>,
        serializer: Arc<dyn FileSerializer>,
    ) -> Self {
        Self::with_kind(FileKind::Settings, path, root_element_name, settings, serializer)
    }

    fn with_kind(
        kind: FileKind,
        path: &Path,
        root_element_name: &str,
        settings: Arc<FileSettings>,
        serializer: Arc<dyn FileSerializer>,
    ) -> Self {
        Self {
            kind,
            root_element_name: root_element_name.to_string(),
            settings,
            serializer,
            state: RwLock::new(FileState {
                path: path.to_path_buf(),
                ..Default::default()
            }),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, FileState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, FileState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// Absolute path of the tracked file
    pub fn path(&self) -> PathBuf {
        self.read_state().path.clone()
    }

    /// File name of the tracked file
    pub fn file_name(&self) -> String {
        self.read_state()
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Point the file at a new location (after its element was renamed)
    pub fn set_path(&self, path: &Path) {
        self.write_state().path = path.to_path_buf();
    }

    /// Where this file's fields are stored
    pub fn metadata_path(&self) -> PathBuf {
        let path = self.path();
        match self.kind {
            FileKind::Settings => path,
            _ => self.settings.metadata_path_for(&path),
        }
    }

    /// Value of one field
    pub fn field_value(&self, field_id: &str) -> Option<String> {
        self.read_state().fields.get(field_id).cloned()
    }

    /// Set (or with an empty value, remove) one field in memory
    pub fn set_field_value(&self, field_id: &str, value: &str) {
        let mut state = self.write_state();
        if value.is_empty() {
            state.fields.remove(field_id);
        } else {
            state.fields.insert(field_id.to_string(), value.to_string());
        }
    }

    /// All field values, sorted by id
    pub fn fields(&self) -> Vec<FieldInstance> {
        self.read_state()
            .fields
            .iter()
            .map(|(k, v)| FieldInstance::new(k.clone(), v.clone()))
            .collect()
    }

    /// Field values outside the custom and stage-override namespaces
    pub fn standard_fields(&self) -> Vec<FieldInstance> {
        self.fields()
            .into_iter()
            .filter(|f| !f.is_custom() && !f.field_id.starts_with(STAGE_FIELD_PREFIX))
            .collect()
    }

    /// Field values in the custom namespace
    pub fn custom_fields(&self) -> Vec<FieldInstance> {
        self.fields().into_iter().filter(|f| f.is_custom()).collect()
    }

    /// Replace in-memory fields with what is stored on disk
    ///
    /// A missing metadata file leaves the file with no fields.
    pub fn load_fields(&self) -> Result<()> {
        let metadata_path = self.metadata_path();
        let fields = if metadata_path.exists() {
            self.serializer.load(&metadata_path)?
        } else {
            FieldMap::new()
        };
        self.write_state().fields = fields;
        Ok(())
    }

    /// Write in-memory fields to the metadata location
    pub fn save(&self) -> Result<()> {
        let metadata_path = self.metadata_path();
        let fields = self.read_state().fields.clone();
        self.serializer
            .save(&metadata_path, &self.root_element_name, &fields)
    }

    /// Move to `path` and save there
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.set_path(path);
        self.save()
    }

    /// Re-parse this file from disk
    ///
    /// Reloads fields and re-links annotation and oral annotation files.
    /// Failures are logged; the file keeps whatever it could read.
    pub fn refresh(&self) {
        if let Err(e) = self.load_fields() {
            warn!(
                path = %self.metadata_path().display(),
                error = %e,
                "Could not read component file metadata"
            );
        }

        if self.kind != FileKind::Standard {
            return;
        }

        let path = self.path();
        let annotation_path = self.settings.annotation_path_for(&path);
        let oral_path = self.settings.oral_annotation_path_for(&path);

        let annotation = annotation_path
            .is_file()
            .then(|| self.linked(FileKind::Annotation, &annotation_path));
        let oral_annotation = oral_path
            .is_file()
            .then(|| self.linked(FileKind::OralAnnotation, &oral_path));

        let mut state = self.write_state();
        state.annotation = annotation;
        state.oral_annotation = oral_annotation;
        debug!(path = %path.display(), "Refreshed component file");
    }

    fn linked(&self, kind: FileKind, path: &Path) -> Arc<ComponentFile> {
        let file = Self::with_kind(
            kind,
            path,
            "MetaData",
            self.settings.clone(),
            self.serializer.clone(),
        );
        if let Err(e) = file.load_fields() {
            warn!(path = %path.display(), error = %e, "Could not read linked file metadata");
        }
        Arc::new(file)
    }

    /// Annotation file discovered for this file, if any
    pub fn annotation_file(&self) -> Option<Arc<ComponentFile>> {
        self.read_state().annotation.clone()
    }

    /// Generated oral annotation file discovered for this file, if any
    pub fn oral_annotation_file(&self) -> Option<Arc<ComponentFile>> {
        self.read_state().oral_annotation.clone()
    }

    /// Parsed `Duration` field
    pub fn duration(&self) -> Option<Duration> {
        let text = self.field_value(DURATION_FIELD)?;
        let parsed = parse_duration_string(&text);
        if parsed.is_none() {
            warn!(path = %self.path().display(), value = %text, "Unparsable duration");
        }
        parsed
    }

    /// Roles this file satisfies by its name
    pub fn assigned_roles(&self, element: &ElementRef, roles: &[ComponentRole]) -> Vec<ComponentRole> {
        if self.kind == FileKind::Settings {
            return Vec::new();
        }
        let path = self.path();
        roles
            .iter()
            .filter(|r| r.element_kind() == element.kind && r.is_match(&element.id, &path))
            .cloned()
            .collect()
    }

    /// Roles this file's annotation file satisfies by its content
    pub fn assigned_roles_from_annotation_file(
        &self,
        element: &ElementRef,
        roles: &[ComponentRole],
    ) -> Vec<ComponentRole> {
        let Some(annotation_file) = self.annotation_file() else {
            return Vec::new();
        };

        let summary = match annotation::summarize(&annotation_file.path()) {
            Ok(summary) => summary,
            Err(e) => {
                warn!(
                    path = %annotation_file.path().display(),
                    error = %e,
                    "Could not read annotation file"
                );
                return Vec::new();
            }
        };

        roles
            .iter()
            .filter(|r| r.element_kind() == element.kind && r.is_satisfied_by_annotation(&summary))
            .cloned()
            .collect()
    }
}

impl fmt::Debug for ComponentFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read_state();
        f.debug_struct("ComponentFile")
            .field("kind", &self.kind)
            .field("path", &state.path)
            .field("fields", &state.fields.len())
            .field("annotation", &state.annotation.as_ref().map(|a| a.path()))
            .finish()
    }
}
