//! Configuration loading and project folder resolution
//!
//! The file-naming conventions that used to live in a process-wide settings
//! object are carried in [`FileSettings`], which is handed to every element and
//! component file at construction.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable overriding the project folder
pub const PROJECT_FOLDER_ENV: &str = "SAYMORE_PROJECT";

/// Environment variable overriding the config file location
pub const CONFIG_FILE_ENV: &str = "SAYMORE_CONFIG";

/// File naming conventions shared by all project elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    /// Suffix of the sidecar file holding a component file's fields
    pub metadata_file_extension: String,
    /// Extension of annotation files (ELAN)
    pub annotation_file_extension: String,
    /// Marker placed between the media file name and the annotation extension
    pub annotation_file_marker: String,
    /// Suffix of the folder holding oral annotation segments for a media file
    pub oral_annotations_folder_suffix: String,
    /// Suffix of the generated oral annotation audio file
    pub oral_annotation_generated_suffix: String,
    /// Suffix of hidden presentation files that are never shown
    pub hidden_file_suffix: String,
    /// Settings file extension for sessions (no period)
    pub session_extension: String,
    /// Settings file extension for people (no period)
    pub person_extension: String,
    /// How long the rename probe keeps retrying, in milliseconds
    pub rename_probe_timeout_ms: u64,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            metadata_file_extension: ".meta".to_string(),
            annotation_file_extension: ".eaf".to_string(),
            annotation_file_marker: ".annotations".to_string(),
            oral_annotations_folder_suffix: "_Annotations".to_string(),
            oral_annotation_generated_suffix: ".oralAnnotations.wav".to_string(),
            hidden_file_suffix: ".pfsx".to_string(),
            session_extension: "session".to_string(),
            person_extension: "person".to_string(),
            rename_probe_timeout_ms: 5000,
        }
    }
}

impl FileSettings {
    /// Full suffix identifying an annotation file, e.g. `.annotations.eaf`
    pub fn annotation_file_suffix(&self) -> String {
        format!("{}{}", self.annotation_file_marker, self.annotation_file_extension)
    }

    /// Annotation file that belongs to `media_path`
    pub fn annotation_path_for(&self, media_path: &Path) -> PathBuf {
        append_to_path(media_path, &self.annotation_file_suffix())
    }

    /// Generated oral annotation file that belongs to `media_path`
    pub fn oral_annotation_path_for(&self, media_path: &Path) -> PathBuf {
        append_to_path(media_path, &self.oral_annotation_generated_suffix)
    }

    /// Oral annotations segment folder that belongs to `media_path`
    pub fn oral_annotations_folder_for(&self, media_path: &Path) -> PathBuf {
        append_to_path(media_path, &self.oral_annotations_folder_suffix)
    }

    /// Sidecar metadata file that belongs to `path`
    pub fn metadata_path_for(&self, path: &Path) -> PathBuf {
        append_to_path(path, &self.metadata_file_extension)
    }

    /// Whether `path` names an annotation file (case-insensitive)
    pub fn is_annotation_file(&self, path: &Path) -> bool {
        let name = file_name_lowercase(path);
        name.ends_with(&self.annotation_file_suffix().to_lowercase())
    }

    /// Media file an annotation file refers to by name
    ///
    /// Returns `None` when `annotation_path` does not carry the annotation suffix.
    pub fn media_path_for_annotation(&self, annotation_path: &Path) -> Option<PathBuf> {
        let name = annotation_path.file_name()?.to_string_lossy().into_owned();
        let suffix = self.annotation_file_suffix();
        if name.len() <= suffix.len() || !name.to_lowercase().ends_with(&suffix.to_lowercase()) {
            return None;
        }
        let media_name = &name[..name.len() - suffix.len()];
        Some(annotation_path.with_file_name(media_name))
    }

    /// Rename probe window
    pub fn rename_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.rename_probe_timeout_ms)
    }
}

/// Append a raw suffix to the final component of a path
pub fn append_to_path(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}

fn file_name_lowercase(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Contents of `config.toml`
///
/// Every section is optional; missing keys fall back to compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Project folder containing `Sessions/` and `People/`
    pub project_folder: Option<PathBuf>,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// File naming conventions
    pub files: FileSettings,
}

impl TomlConfig {
    /// Parse config from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load config from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load config from the default location, falling back to defaults
    ///
    /// A missing or unreadable file is never fatal: a warning is logged and
    /// compiled defaults are used.
    pub fn load_or_default() -> Self {
        let Some(path) = config_file_path() else {
            debug!("No config file location available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => {
                debug!(path = %path.display(), "Loaded config file");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
                Self::default()
            }
        }
    }
}

/// Location of the config file
///
/// `SAYMORE_CONFIG` wins; otherwise `<config dir>/saymore/config.toml`.
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("saymore").join("config.toml"))
}

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    /// Default project folder
    pub project_folder: PathBuf,
    /// Default log level
    pub log_level: String,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was built for
    pub fn for_current_platform() -> Self {
        let base = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            project_folder: base.join("SayMore"),
            log_level: "info".to_string(),
        }
    }
}

/// Project folder resolution, in priority order:
/// 1. Command-line argument
/// 2. `SAYMORE_PROJECT` environment variable
/// 3. `project_folder` in the TOML config
/// 4. Compiled default (`<Documents>/SayMore`)
#[derive(Debug, Clone, Default)]
pub struct ProjectFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_config: Option<TomlConfig>,
}

impl ProjectFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a folder given on the command line
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Use an already loaded config instead of reading the default file
    pub fn with_config(mut self, config: TomlConfig) -> Self {
        self.toml_config = Some(config);
        self
    }

    /// Resolve the project folder
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            debug!(path = %path.display(), "Project folder from command line");
            return path.clone();
        }

        if let Ok(path) = std::env::var(PROJECT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                debug!(path = %path, "Project folder from environment");
                return PathBuf::from(path);
            }
        }

        let config = match &self.toml_config {
            Some(config) => config.clone(),
            None => TomlConfig::load_or_default(),
        };
        if let Some(path) = config.project_folder {
            debug!(path = %path.display(), "Project folder from config file");
            return path;
        }

        CompiledDefaults::for_current_platform().project_folder
    }
}
