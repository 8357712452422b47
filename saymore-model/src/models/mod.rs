//! Data models for the element store
//!
//! - Element kinds and their naming rules
//! - Component files and the element settings file
//! - Workflow roles (stages)
//! - The project element itself

pub mod component_file;
pub mod component_role;
pub mod element_kind;
pub mod project_element;

pub use component_file::{ComponentFile, ComponentFileFactory, FieldInstance, FileKind};
pub use component_role::{person_roles, session_roles, ComponentRole};
pub use element_kind::{ElementKind, ElementRef};
pub use project_element::{
    IdChangedCallback, ProjectElement, RenameFailure, RenameOutcome, StageCompleteType,
};
