//! Project folder
//!
//! A project is a root folder with one sub-folder per element kind:
//! `<root>/Sessions/<id>/<id>.session` and `<root>/People/<id>/<id>.person`.

use crate::models::{ElementKind, ProjectElement};
use crate::services::copy_files::CopyFilesJob;
use crate::services::{Collaborators, ElementContext};
use saymore_common::events::EventBus;
use saymore_common::{Error, FileSettings, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name of the folder (inside the project root) deleted files are moved to
pub const RECYCLE_FOLDER_NAME: &str = ".recycle";

/// An opened project
pub struct ProjectFolder {
    root: PathBuf,
    context: ElementContext,
}

impl ProjectFolder {
    /// Open (creating if needed) the project at `root`
    pub fn open(root: &Path, settings: Arc<FileSettings>, collaborators: Collaborators) -> Result<Self> {
        Self::with_context(root, ElementContext::new(settings, collaborators))
    }

    /// Open with default collaborators publishing on `events`
    pub fn open_with_defaults(root: &Path, settings: Arc<FileSettings>, events: EventBus) -> Result<Self> {
        let collaborators =
            Collaborators::with_defaults(settings.clone(), events, root.join(RECYCLE_FOLDER_NAME));
        Self::open(root, settings, collaborators)
    }

    /// Open with a fully specified element context
    pub fn with_context(root: &Path, context: ElementContext) -> Result<Self> {
        for kind in ElementKind::all() {
            std::fs::create_dir_all(root.join(kind.folder_name()))?;
        }
        info!(root = %root.display(), "Opened project");
        Ok(Self {
            root: root.to_path_buf(),
            context,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn context(&self) -> &ElementContext {
        &self.context
    }

    /// Folder holding elements of `kind`
    pub fn elements_folder(&self, kind: ElementKind) -> PathBuf {
        self.root.join(kind.folder_name())
    }

    /// Every element of `kind`, sorted by id
    ///
    /// Sub-folders without a matching settings file are skipped.
    pub fn elements(&self, kind: ElementKind) -> Result<Vec<ProjectElement>> {
        let parent = self.elements_folder(kind);
        let extension = kind.extension(self.context.settings());

        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&parent)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().into_owned();
            if entry.path().join(format!("{}.{}", id, extension)).is_file() {
                ids.push(id);
            } else {
                debug!(folder = %entry.path().display(), "Skipping folder without settings file");
            }
        }
        ids.sort();

        ids.iter()
            .map(|id| ProjectElement::open(kind, &parent, Some(id.as_str()), &self.context))
            .collect()
    }

    /// Look up one existing element
    pub fn element(&self, kind: ElementKind, id: &str) -> Result<ProjectElement> {
        let parent = self.elements_folder(kind);
        let settings_file = parent
            .join(id)
            .join(format!("{}.{}", id, kind.extension(self.context.settings())));
        if !settings_file.is_file() {
            return Err(Error::NotFound(format!("No {} named '{}'", kind, id)));
        }
        ProjectElement::open(kind, &parent, Some(id), &self.context)
    }

    /// Create a new element (with the next default name when `id` is `None`)
    pub fn create_element(&self, kind: ElementKind, id: Option<&str>) -> Result<ProjectElement> {
        let parent = self.elements_folder(kind);
        if let Some(id) = id {
            if parent.join(id.trim()).exists() {
                return Err(Error::InvalidInput(format!(
                    "There is already a {} named '{}'",
                    kind,
                    id.trim()
                )));
            }
        }
        ProjectElement::open(kind, &parent, id, &self.context)
    }

    /// One new session per file, named after the file stem, with the file
    /// copied in
    ///
    /// Files the validator rejects and stems that already name a session are
    /// skipped. Returns the sessions created.
    pub fn create_sessions_from_files(&self, paths: &[PathBuf]) -> Result<Vec<ProjectElement>> {
        let collaborators = self.context.collaborators();
        let mut sessions = Vec::new();
        let mut pairs = Vec::new();

        for path in paths {
            if !collaborators.validator.is_valid_component_file(path) {
                warn!(path = %path.display(), "Not a valid component file; skipped");
                continue;
            }
            let (Some(stem), Some(name)) = (path.file_stem(), path.file_name()) else {
                continue;
            };
            let id = stem.to_string_lossy().into_owned();
            if self.elements_folder(ElementKind::Session).join(&id).exists() {
                debug!(id = %id, "Session already exists; skipped");
                continue;
            }

            let session = self.create_element(ElementKind::Session, Some(id.as_str()))?;
            pairs.push((path.clone(), session.folder_path().join(name)));
            sessions.push(session);
        }

        if pairs.is_empty() {
            return Ok(sessions);
        }

        collaborators.background.suspend();
        let result = CopyFilesJob::new(pairs).and_then(|job| job.run());
        collaborators.background.resume(true);
        result?;

        for session in &sessions {
            session.refresh_component_files();
        }
        info!(count = sessions.len(), "Created sessions from files");
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project(temp_dir: &TempDir) -> ProjectFolder {
        ProjectFolder::open_with_defaults(
            &temp_dir.path().join("Project"),
            Arc::new(FileSettings::default()),
            EventBus::new(100),
        )
        .unwrap()
    }

    #[test]
    fn test_open_creates_kind_folders() {
        let temp_dir = TempDir::new().unwrap();
        let project = project(&temp_dir);
        assert!(project.root().join("Sessions").is_dir());
        assert!(project.root().join("People").is_dir());
    }

    #[test]
    fn test_elements_lists_only_real_elements() {
        let temp_dir = TempDir::new().unwrap();
        let project = project(&temp_dir);
        project.create_element(ElementKind::Session, Some("B")).unwrap();
        project.create_element(ElementKind::Session, Some("A")).unwrap();
        std::fs::create_dir(project.root().join("Sessions").join("stray")).unwrap();

        let ids: Vec<String> = project
            .elements(ElementKind::Session)
            .unwrap()
            .iter()
            .map(|e| e.id().to_string())
            .collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert!(project.elements(ElementKind::Person).unwrap().is_empty());
    }

    #[test]
    fn test_create_element_rejects_taken_id() {
        let temp_dir = TempDir::new().unwrap();
        let project = project(&temp_dir);
        project.create_element(ElementKind::Person, Some("Ann")).unwrap();
        assert!(project.create_element(ElementKind::Person, Some("Ann")).is_err());

        let unnamed = project.create_element(ElementKind::Person, None).unwrap();
        assert_eq!(unnamed.id(), "New Person 01");
        assert!(project.element(ElementKind::Person, "Ann").is_ok());
        assert!(project.element(ElementKind::Person, "Bob").is_err());
    }

    #[test]
    fn test_create_sessions_from_files() {
        let temp_dir = TempDir::new().unwrap();
        let project = project(&temp_dir);
        let media = temp_dir.path().join("Interview.wav");
        std::fs::write(&media, b"RIFF").unwrap();
        let ignored = temp_dir.path().join("notes.meta");
        std::fs::write(&ignored, b"").unwrap();

        let sessions = project
            .create_sessions_from_files(&[media.clone(), ignored])
            .unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id(), "Interview");
        assert!(sessions[0].folder_path().join("Interview.wav").is_file());

        // Second import of the same stem is skipped
        assert!(project.create_sessions_from_files(&[media]).unwrap().is_empty());
    }
}
