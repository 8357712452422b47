//! Validation of a new folder (project or element) before it is created

use std::path::{Path, PathBuf};

/// Characters never allowed in a folder name
const INVALID_FILE_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Characters never allowed anywhere in a base path
const INVALID_PATH_CHARS: &[char] = &['"', '<', '>', '|'];

/// Outcome of [`validate_new_folder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathValidation {
    Valid {
        path: PathBuf,
        /// At most the last three components of `path`, for display
        display_path: String,
    },
    Invalid(InvalidFolderReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidFolderReason {
    EmptyBase,
    EmptyName,
    InvalidBaseCharacters,
    InvalidNameCharacters,
    AlreadyExists,
}

impl PathValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

fn has_invalid_char(text: &str, invalid: &[char]) -> bool {
    text.chars().any(|c| c.is_control() || invalid.contains(&c))
}

/// Check that `name` can be created as a new folder inside `base`
pub fn validate_new_folder(base: &str, name: &str) -> PathValidation {
    use InvalidFolderReason::*;

    if base.trim().is_empty() {
        return PathValidation::Invalid(EmptyBase);
    }
    if name.trim().is_empty() {
        return PathValidation::Invalid(EmptyName);
    }
    if has_invalid_char(base, INVALID_PATH_CHARS) {
        return PathValidation::Invalid(InvalidBaseCharacters);
    }
    if has_invalid_char(name, INVALID_FILE_NAME_CHARS) {
        return PathValidation::Invalid(InvalidNameCharacters);
    }

    let path = Path::new(base).join(name);
    if path.exists() {
        return PathValidation::Invalid(AlreadyExists);
    }

    let components: Vec<_> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .filter(|c| c != "/" && c != "\\")
        .collect();
    let display_path = components[components.len().saturating_sub(3)..]
        .iter()
        .collect::<PathBuf>()
        .display()
        .to_string();

    PathValidation::Valid { path, display_path }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_blank_parts_rejected() {
        assert_eq!(
            validate_new_folder("  ", "Project"),
            PathValidation::Invalid(InvalidFolderReason::EmptyBase)
        );
        assert_eq!(
            validate_new_folder("/tmp", ""),
            PathValidation::Invalid(InvalidFolderReason::EmptyName)
        );
    }

    #[test]
    fn test_invalid_characters_rejected() {
        assert_eq!(
            validate_new_folder("/tmp", "a:b"),
            PathValidation::Invalid(InvalidFolderReason::InvalidNameCharacters)
        );
        assert_eq!(
            validate_new_folder("/tmp", "a/b"),
            PathValidation::Invalid(InvalidFolderReason::InvalidNameCharacters)
        );
        assert_eq!(
            validate_new_folder("/tmp/a|b", "c"),
            PathValidation::Invalid(InvalidFolderReason::InvalidBaseCharacters)
        );
    }

    #[test]
    fn test_existing_folder_rejected() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("Taken")).unwrap();
        let base = temp_dir.path().to_string_lossy().into_owned();

        assert_eq!(
            validate_new_folder(&base, "Taken"),
            PathValidation::Invalid(InvalidFolderReason::AlreadyExists)
        );
        assert!(validate_new_folder(&base, "Fresh").is_valid());
    }

    #[test]
    fn test_display_path_keeps_last_three_components() {
        match validate_new_folder("/nonexistent/deep/base/folder", "Project") {
            PathValidation::Valid { path, display_path } => {
                assert_eq!(path, PathBuf::from("/nonexistent/deep/base/folder/Project"));
                assert_eq!(display_path, "base/folder/Project");
            }
            other => panic!("expected valid, got {:?}", other),
        }
        match validate_new_folder("/data", "Project") {
            PathValidation::Valid { display_path, .. } => assert_eq!(display_path, "data/Project"),
            other => panic!("expected valid, got {:?}", other),
        }
    }
}
