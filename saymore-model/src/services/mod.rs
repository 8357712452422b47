//! Services used by project elements
//!
//! - Collaborators (validation, recycling, background pause, error reporting)
//! - Element construction context
//! - Folder watching
//! - Copying with progress
//! - Project folder and new-folder validation

pub mod collaborators;
pub mod copy_files;
pub mod element_context;
pub mod file_watcher;
pub mod path_validator;
pub mod project_folder;

pub use collaborators::{
    BackgroundProcesses, Collaborators, DefaultFileValidator, ErrorReporter, EventBusBackground,
    FileValidator, FolderRecycleBin, RecycleBin, TracingErrorReporter,
};
pub use copy_files::{CopyFilesJob, CopyProgress, CopyState};
pub use element_context::{default_component_file_factory, ElementContext};
pub use file_watcher::ComponentFileWatcher;
pub use path_validator::{validate_new_folder, InvalidFolderReason, PathValidation};
pub use project_folder::ProjectFolder;
