//! Element id changes
//!
//! Renaming an element renames its folder and every file in it whose name
//! starts with the old id. The sequence is not transactional: if a file
//! rename fails midway, files already renamed stay renamed and are listed in
//! the failure.

use super::ProjectElement;
use crate::annotation;
use chrono::Utc;
use saymore_common::config::append_to_path;
use saymore_common::error::error_chain_message;
use saymore_common::events::ElementEvent;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

const PROBE_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// A rename that went through (or had nothing to do)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// New id equals the current id
    Unchanged,
    Renamed {
        old_id: String,
        new_id: String,
        /// (old path, new path) for every file renamed inside the folder
        renamed_files: Vec<(PathBuf, PathBuf)>,
    },
}

/// Why a rename was refused or stopped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenameFailure {
    /// New id is empty after trimming
    #[error("{message}")]
    NoId { message: String },

    /// A sibling element already uses the new id
    #[error("{message}")]
    AlreadyExists { message: String },

    /// The folder could not be renamed within the probe timeout
    #[error("{message}")]
    FolderLocked { message: String },

    /// A filesystem operation failed partway through
    #[error("{message}")]
    Io {
        message: String,
        renamed_files: Vec<(PathBuf, PathBuf)>,
    },
}

impl RenameFailure {
    /// Text suitable for showing to the user
    pub fn message(&self) -> &str {
        match self {
            Self::NoId { message }
            | Self::AlreadyExists { message }
            | Self::FolderLocked { message }
            | Self::Io { message, .. } => message,
        }
    }

    /// Files renamed before the failure (only ever non-empty for `Io`)
    pub fn renamed_files(&self) -> &[(PathBuf, PathBuf)] {
        match self {
            Self::Io { renamed_files, .. } => renamed_files,
            _ => &[],
        }
    }
}

const FOLDER_LOCKED_MESSAGE: &str = "Something is holding onto that folder or a file in it, so it cannot be renamed. You can try restarting this program, or restarting the computer.";

impl ProjectElement {
    /// Save, then change the element's id to `new_id`
    ///
    /// On success the element, its folder and its files carry the new id, the
    /// cache is cleared, an `ElementIdChanged` event is published and the
    /// id-changed callback runs. On failure the id is unchanged.
    pub fn try_change_id_and_save(&mut self, new_id: &str) -> Result<RenameOutcome, RenameFailure> {
        if let Err(e) = self.save() {
            return Err(RenameFailure::Io {
                message: error_chain_message(&e),
                renamed_files: Vec::new(),
            });
        }

        let new_id = new_id.trim();
        if new_id == self.id {
            return Ok(RenameOutcome::Unchanged);
        }
        if new_id.is_empty() {
            return Err(RenameFailure::NoId {
                message: self.kind.no_id_message().to_string(),
            });
        }

        let old_id = self.id.clone();
        let old_folder = self.folder_path();
        let new_folder = self.parent_folder_path.join(new_id);
        if new_folder.exists() {
            return Err(RenameFailure::AlreadyExists {
                message: self.kind.already_exists_message(&old_id, new_id),
            });
        }

        if !can_perform_rename(&old_folder, self.settings.rename_probe_timeout()) {
            warn!(folder = %old_folder.display(), "Element folder is locked");
            return Err(RenameFailure::FolderLocked {
                message: FOLDER_LOCKED_MESSAGE.to_string(),
            });
        }

        let mut renamed_files = Vec::new();
        if let Err(e) = self.rename_files(&old_folder, &old_id, new_id, &mut renamed_files) {
            warn!(element = %old_id, error = %e, renamed = renamed_files.len(), "Rename stopped partway");
            return Err(RenameFailure::Io {
                message: error_chain_message(&e),
                renamed_files,
            });
        }

        if let Err(e) = std::fs::rename(&old_folder, &new_folder) {
            warn!(folder = %old_folder.display(), error = %e, "Could not rename element folder");
            return Err(RenameFailure::Io {
                message: error_chain_message(&e),
                renamed_files,
            });
        }

        self.id = new_id.to_string();
        self.metadata_file.set_path(&self.settings_file_path());
        if let Err(e) = self.save() {
            return Err(RenameFailure::Io {
                message: error_chain_message(&e),
                renamed_files,
            });
        }
        self.refresh_component_files();

        info!(kind = %self.kind, old_id = %old_id, new_id = %new_id, "Renamed element");
        self.collaborators
            .events
            .emit_lossy(ElementEvent::ElementIdChanged {
                kind: self.kind.to_string(),
                old_id: old_id.clone(),
                new_id: new_id.to_string(),
                timestamp: Utc::now(),
            });
        if let Some(callback) = self.id_changed.clone() {
            callback(self, &old_id, new_id);
        }

        Ok(RenameOutcome::Renamed {
            old_id,
            new_id: new_id.to_string(),
            renamed_files,
        })
    }

    /// Rename every file in `folder` whose name starts with `old_id`
    fn rename_files(
        &self,
        folder: &Path,
        old_id: &str,
        new_id: &str,
        renamed: &mut Vec<(PathBuf, PathBuf)>,
    ) -> std::io::Result<()> {
        let old_prefix = old_id.to_lowercase();

        let mut files = Vec::new();
        for entry in std::fs::read_dir(folder)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();

        for old_path in files {
            let Some(name) = old_path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            if !name.to_lowercase().starts_with(&old_prefix) {
                continue;
            }
            let new_name = name.replace(old_id, new_id);
            if new_name == name {
                continue;
            }

            let new_path = folder.join(&new_name);
            move_without_replacing(&old_path, &new_path)?;
            debug!(from = %old_path.display(), to = %new_path.display(), "Renamed file");
            renamed.push((old_path.clone(), new_path.clone()));

            if self.settings.is_annotation_file(&new_path) {
                if let Some(media_path) = self.settings.media_path_for_annotation(&new_path) {
                    annotation::change_media_file_name(&new_path, &media_path)
                        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
                }
            } else {
                let old_oral_folder = self.settings.oral_annotations_folder_for(&old_path);
                if old_oral_folder.is_dir() {
                    let new_oral_folder = self.settings.oral_annotations_folder_for(&new_path);
                    move_without_replacing(&old_oral_folder, &new_oral_folder)?;
                    renamed.push((old_oral_folder, new_oral_folder));
                }
            }
        }

        Ok(())
    }
}

/// Whether `folder` can be renamed right now
///
/// Renames the folder to `<folder>Renaming` and back, retrying until
/// `timeout` elapses.
pub(crate) fn can_perform_rename(folder: &Path, timeout: Duration) -> bool {
    let probe = append_to_path(folder, "Renaming");
    let start = Instant::now();

    loop {
        match std::fs::rename(folder, &probe) {
            Ok(()) => match std::fs::rename(&probe, folder) {
                Ok(()) => return true,
                Err(e) => {
                    warn!(folder = %probe.display(), error = %e, "Could not restore probed folder");
                }
            },
            Err(e) => debug!(folder = %folder.display(), error = %e, "Rename probe failed"),
        }

        if start.elapsed() >= timeout {
            restore_probe(folder, &probe);
            return false;
        }
        thread::sleep(PROBE_RETRY_INTERVAL);
        restore_probe(folder, &probe);
    }
}

/// Put a stranded probe folder back in place
fn restore_probe(folder: &Path, probe: &Path) {
    if probe.exists() && !folder.exists() {
        if let Err(e) = std::fs::rename(probe, folder) {
            warn!(folder = %probe.display(), error = %e, "Probe folder left in place");
        }
    }
}

/// Rename `from` to `to`, failing if anything (even a dangling link) is
/// already at `to`
fn move_without_replacing(from: &Path, to: &Path) -> std::io::Result<()> {
    if std::fs::symlink_metadata(to).is_ok() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} already exists", to.display()),
        ));
    }
    std::fs::rename(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_probe_leaves_folder_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let folder = temp_dir.path().join("S01");
        std::fs::create_dir(&folder).unwrap();

        assert!(can_perform_rename(&folder, Duration::from_millis(200)));
        assert!(folder.is_dir());
        assert!(!temp_dir.path().join("S01Renaming").exists());
    }

    #[test]
    fn test_probe_gives_up_on_missing_folder() {
        let temp_dir = TempDir::new().unwrap();
        let folder = temp_dir.path().join("missing");

        let start = Instant::now();
        assert!(!can_perform_rename(&folder, Duration::from_millis(250)));
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[test]
    fn test_move_refuses_existing_destination() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("S01_a.wav");
        let to = temp_dir.path().join("S02_a.wav");
        std::fs::write(&from, b"from S01").unwrap();
        std::fs::write(&to, b"user data").unwrap();

        let err = move_without_replacing(&from, &to).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(&to).unwrap(), b"user data");
        assert!(from.exists());

        let other = temp_dir.path().join("S03_a.wav");
        move_without_replacing(&from, &other).unwrap();
        assert!(other.exists() && !from.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_move_refuses_dangling_link() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("S01_a.wav");
        let to = temp_dir.path().join("S02_a.wav");
        std::fs::write(&from, b"").unwrap();
        std::os::unix::fs::symlink(temp_dir.path().join("gone"), &to).unwrap();

        assert!(move_without_replacing(&from, &to).is_err());
        assert!(from.exists());
    }

    #[test]
    fn test_restore_probe_puts_folder_back() {
        let temp_dir = TempDir::new().unwrap();
        let folder = temp_dir.path().join("S01");
        let probe = temp_dir.path().join("S01Renaming");
        std::fs::create_dir(&probe).unwrap();

        restore_probe(&folder, &probe);
        assert!(folder.is_dir());
        assert!(!probe.exists());
    }

    #[test]
    fn test_failure_messages() {
        let failure = RenameFailure::Io {
            message: "disk full".to_string(),
            renamed_files: vec![(PathBuf::from("a"), PathBuf::from("b"))],
        };
        assert_eq!(failure.message(), "disk full");
        assert_eq!(failure.renamed_files().len(), 1);
        assert_eq!(failure.to_string(), "disk full");

        let failure = RenameFailure::NoId {
            message: "You must specify a name.".to_string(),
        };
        assert!(failure.renamed_files().is_empty());
    }
}
