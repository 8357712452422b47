//! Everything an element needs from its surroundings
//!
//! Replaces process-wide settings lookups: file naming conventions, the
//! serializer, the component file factory, role definitions and the
//! collaborators are all passed in explicitly.

use crate::models::{
    person_roles, session_roles, ComponentFile, ComponentFileFactory, ComponentRole, ElementKind,
    ElementRef,
};
use crate::serializer::{FileSerializer, TomlFileSerializer};
use crate::services::Collaborators;
use saymore_common::FileSettings;
use std::path::Path;
use std::sync::Arc;

/// Construction context shared by all elements of a project
#[derive(Clone)]
pub struct ElementContext {
    settings: Arc<FileSettings>,
    serializer: Arc<dyn FileSerializer>,
    factory: Option<ComponentFileFactory>,
    collaborators: Collaborators,
    session_roles: Arc<Vec<ComponentRole>>,
    person_roles: Arc<Vec<ComponentRole>>,
}

impl ElementContext {
    /// Context with the TOML serializer, default roles and default factory
    pub fn new(settings: Arc<FileSettings>, collaborators: Collaborators) -> Self {
        Self {
            settings,
            serializer: Arc::new(TomlFileSerializer),
            factory: None,
            collaborators,
            session_roles: Arc::new(session_roles()),
            person_roles: Arc::new(person_roles()),
        }
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn FileSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn with_factory(mut self, factory: ComponentFileFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Replace the role definitions for one kind
    pub fn with_roles(mut self, kind: ElementKind, roles: Vec<ComponentRole>) -> Self {
        match kind {
            ElementKind::Session => self.session_roles = Arc::new(roles),
            ElementKind::Person => self.person_roles = Arc::new(roles),
        }
        self
    }

    pub fn settings(&self) -> &Arc<FileSettings> {
        &self.settings
    }

    pub fn serializer(&self) -> &Arc<dyn FileSerializer> {
        &self.serializer
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Roles shared by every element of `kind`
    pub fn roles_for(&self, kind: ElementKind) -> Arc<Vec<ComponentRole>> {
        match kind {
            ElementKind::Session => self.session_roles.clone(),
            ElementKind::Person => self.person_roles.clone(),
        }
    }

    /// The component file factory (default: [`ComponentFile::load`])
    pub fn factory(&self) -> ComponentFileFactory {
        match &self.factory {
            Some(factory) => factory.clone(),
            None => default_component_file_factory(self.settings.clone(), self.serializer.clone()),
        }
    }
}

/// Factory building standard component files with sidecar metadata
pub fn default_component_file_factory(
    settings: Arc<FileSettings>,
    serializer: Arc<dyn FileSerializer>,
) -> ComponentFileFactory {
    Arc::new(move |_element: &ElementRef, path: &Path| {
        ComponentFile::load(path, settings.clone(), serializer.clone())
    })
}
