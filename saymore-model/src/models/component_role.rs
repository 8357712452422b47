//! Component roles (workflow stages)
//!
//! A role is a named stage such as "Source" or "Transcription". A file
//! satisfies a role when its name matches the role's pattern for the owning
//! element; some roles can also be satisfied by the content of a file's
//! annotation file.

use crate::annotation::AnnotationSummary;
use crate::models::ElementKind;
use regex::RegexBuilder;
use std::path::Path;
use tracing::warn;

/// Placeholder in role patterns replaced by the (escaped) element id
pub const ELEMENT_ID_PLACEHOLDER: &str = "$ElementId$";

/// Annotation tier whose content can satisfy a role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationTier {
    Transcription,
    FreeTranslation,
}

/// Immutable workflow stage definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRole {
    id: String,
    name: String,
    element_kind: ElementKind,
    file_name_pattern: String,
    annotation_tier: Option<AnnotationTier>,
}

impl ComponentRole {
    /// Define a role
    ///
    /// `file_name_pattern` is a case-insensitive regular expression matched
    /// against the file name; `$ElementId$` stands for the owning element's id.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        element_kind: ElementKind,
        file_name_pattern: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            element_kind,
            file_name_pattern: file_name_pattern.into(),
            annotation_tier: None,
        }
    }

    /// Let annotation content in `tier` satisfy this role
    pub fn satisfied_by_annotation_tier(mut self, tier: AnnotationTier) -> Self {
        self.annotation_tier = Some(tier);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element_kind(&self) -> ElementKind {
        self.element_kind
    }

    pub fn annotation_tier(&self) -> Option<AnnotationTier> {
        self.annotation_tier
    }

    /// Whether the file at `path` fills this role for element `element_id`
    pub fn is_match(&self, element_id: &str, path: &Path) -> bool {
        let Some(file_name) = path.file_name() else {
            return false;
        };

        let pattern = self
            .file_name_pattern
            .replace(ELEMENT_ID_PLACEHOLDER, &regex::escape(element_id));

        match RegexBuilder::new(&pattern).case_insensitive(true).build() {
            Ok(re) => re.is_match(&file_name.to_string_lossy()),
            Err(e) => {
                warn!(role = %self.id, pattern = %pattern, error = %e, "Invalid role pattern");
                false
            }
        }
    }

    /// Whether annotation content satisfies this role
    pub fn is_satisfied_by_annotation(&self, summary: &AnnotationSummary) -> bool {
        match self.annotation_tier {
            Some(AnnotationTier::Transcription) => summary.has_transcription,
            Some(AnnotationTier::FreeTranslation) => summary.has_free_translation,
            None => false,
        }
    }
}

/// Stages every session moves through
pub fn session_roles() -> Vec<ComponentRole> {
    let kind = ElementKind::Session;
    vec![
        ComponentRole::new("source", "Source", kind, r"^$ElementId$_Source\."),
        ComponentRole::new("consent", "Consent", kind, r"^$ElementId$_Consent\."),
        ComponentRole::new("carefulSpeech", "Careful Speech", kind, r"^$ElementId$_Careful\."),
        ComponentRole::new(
            "oralTranslation",
            "Oral Translation",
            kind,
            r"^$ElementId$_OralTranslation\.",
        ),
        ComponentRole::new(
            "transcription",
            "Transcription",
            kind,
            r"^$ElementId$_Transcription\.",
        )
        .satisfied_by_annotation_tier(AnnotationTier::Transcription),
        ComponentRole::new(
            "transcriptionN",
            "Written Translation",
            kind,
            r"^$ElementId$_Translation\.",
        )
        .satisfied_by_annotation_tier(AnnotationTier::FreeTranslation),
    ]
}

/// Stages for a person record
pub fn person_roles() -> Vec<ComponentRole> {
    vec![ComponentRole::new(
        "consent",
        "Informed Consent",
        ElementKind::Person,
        r"^$ElementId$_Consent\.",
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(id: &str) -> ComponentRole {
        session_roles().into_iter().find(|r| r.id() == id).unwrap()
    }

    #[test]
    fn test_source_role_matches_element_prefixed_file() {
        let source = role("source");
        assert!(source.is_match("S01", Path::new("/p/S01/S01_Source.wav")));
        assert!(source.is_match("S01", Path::new("/p/S01/s01_source.WAV")));
        assert!(!source.is_match("S01", Path::new("/p/S01/S02_Source.wav")));
        assert!(!source.is_match("S01", Path::new("/p/S01/S01_Consent.pdf")));
    }

    #[test]
    fn test_element_id_is_escaped() {
        let source = role("source");
        // "." in the id must not act as a wildcard
        assert!(source.is_match("a.b", Path::new("a.b_Source.mp3")));
        assert!(!source.is_match("a.b", Path::new("axb_Source.mp3")));
    }

    #[test]
    fn test_annotation_satisfaction() {
        let summary = AnnotationSummary {
            has_transcription: true,
            has_free_translation: false,
        };
        assert!(role("transcription").is_satisfied_by_annotation(&summary));
        assert!(!role("transcriptionN").is_satisfied_by_annotation(&summary));
        assert!(!role("source").is_satisfied_by_annotation(&summary));
    }

    #[test]
    fn test_person_roles() {
        let roles = person_roles();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].element_kind(), ElementKind::Person);
        assert!(roles[0].is_match("Ann", Path::new("Ann_Consent.jpg")));
    }
}
