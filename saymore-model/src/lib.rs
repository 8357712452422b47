//! saymore-model library interface
//!
//! Project elements (sessions and people) backed by one folder each, the
//! component files found in those folders, workflow roles, and the services
//! that copy, watch, validate and recycle files on their behalf.

pub mod annotation;
pub mod models;
pub mod serializer;
pub mod services;

pub use crate::models::{
    ComponentFile, ComponentRole, ElementKind, ElementRef, FieldInstance, FileKind,
    ProjectElement, RenameFailure, RenameOutcome, StageCompleteType,
};
pub use crate::services::{Collaborators, ElementContext, ProjectFolder};
