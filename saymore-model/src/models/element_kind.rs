//! Element kinds
//!
//! A project holds two kinds of elements: recording sessions and the people
//! who took part in them. The kind fixes the settings file extension, the
//! parent folder name, default naming and the user-facing failure messages.

use saymore_common::FileSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of project element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementKind {
    Session,
    Person,
}

impl ElementKind {
    /// Root element name written into the settings file
    pub fn root_element_name(&self) -> &'static str {
        match self {
            ElementKind::Session => "Session",
            ElementKind::Person => "Person",
        }
    }

    /// Settings file extension without the period
    pub fn extension<'a>(&self, settings: &'a FileSettings) -> &'a str {
        match self {
            ElementKind::Session => &settings.session_extension,
            ElementKind::Person => &settings.person_extension,
        }
    }

    /// Name of the project sub-folder holding elements of this kind
    pub fn folder_name(&self) -> &'static str {
        match self {
            ElementKind::Session => "Sessions",
            ElementKind::Person => "People",
        }
    }

    /// Prefix used when an element is created without an id
    pub fn default_name_prefix(&self) -> &'static str {
        match self {
            ElementKind::Session => "New Session",
            ElementKind::Person => "New Person",
        }
    }

    /// Message shown when a rename is attempted with an empty id
    pub fn no_id_message(&self) -> &'static str {
        match self {
            ElementKind::Session => "You must specify a session id.",
            ElementKind::Person => "You must specify a name.",
        }
    }

    /// Message shown when a rename target is already taken
    pub fn already_exists_message(&self, old_id: &str, new_id: &str) -> String {
        let noun = match self {
            ElementKind::Session => "session",
            ElementKind::Person => "person",
        };
        format!(
            "Could not rename from {} to {} because there is already a {} by that name.",
            old_id, new_id, noun
        )
    }

    /// All kinds, sessions first
    pub fn all() -> [ElementKind; 2] {
        [ElementKind::Session, ElementKind::Person]
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root_element_name())
    }
}

impl FromStr for ElementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "session" | "sessions" => Ok(ElementKind::Session),
            "person" | "people" => Ok(ElementKind::Person),
            other => Err(format!("unknown element kind: {}", other)),
        }
    }
}

/// What a component file knows about the element that owns it
///
/// A snapshot, not a handle: the file never owns or outlives-checks its element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub kind: ElementKind,
    pub id: String,
}

impl ElementRef {
    pub fn new(kind: ElementKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}
