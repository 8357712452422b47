//! ELAN annotation file helper
//!
//! Annotation files (`<media>.annotations.eaf`) are ELAN XML documents. The
//! element store only needs three things from them: which media file they
//! point at, rewriting that pointer after a rename, and whether the
//! transcription / free translation tiers contain any text.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use saymore_common::Result;
use std::path::Path;
use tracing::debug;

/// Tier holding the transcription of each segment
pub const TRANSCRIPTION_TIER_ID: &str = "Transcription";

/// Tier holding the free translation of each segment
pub const FREE_TRANSLATION_TIER_ID: &str = "Phrase Free Translation";

// Attribute values may be single or double quoted
static MEDIA_URL_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(MEDIA_URL|RELATIVE_MEDIA_URL)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

static TIER_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<TIER\b([^>]*?)(?:/>|>(.*?)</TIER>)"#).unwrap());

static TIER_ID_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bTIER_ID\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

static ANNOTATION_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<ANNOTATION_VALUE>(.*?)</ANNOTATION_VALUE>"#).unwrap());

/// What an annotation file contributes to workflow stages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationSummary {
    /// Transcription tier has at least one non-empty value
    pub has_transcription: bool,
    /// Free translation tier has at least one non-empty value
    pub has_free_translation: bool,
}

/// Read-side view of one annotation file
#[derive(Debug, Clone)]
pub struct AnnotationFile {
    content: String,
}

impl AnnotationFile {
    /// Load an annotation file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self { content })
    }

    /// Wrap already loaded document text
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Media file name referenced by the document
    ///
    /// Prefers `RELATIVE_MEDIA_URL`; strips any `file://` scheme and directories.
    pub fn media_file_name(&self) -> Option<String> {
        let mut absolute = None;
        let mut relative = None;
        for caps in MEDIA_URL_ATTR.captures_iter(&self.content) {
            let value = quoted_value(&caps, 2);
            if &caps[1] == "RELATIVE_MEDIA_URL" {
                relative.get_or_insert(value);
            } else {
                absolute.get_or_insert(value);
            }
        }

        let url = relative.or(absolute)?;
        let unescaped = unescape_xml(&url);
        let name = unescaped
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .to_string();
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }

    /// Which stage-relevant tiers contain text
    pub fn summary(&self) -> AnnotationSummary {
        let mut summary = AnnotationSummary::default();

        for tier in TIER_BLOCK.captures_iter(&self.content) {
            let Some(tier_id) = TIER_ID_ATTR
                .captures(&tier[1])
                .map(|c| unescape_xml(&quoted_value(&c, 1)))
            else {
                continue;
            };
            let body = tier.get(2).map(|m| m.as_str()).unwrap_or_default();
            let has_text = ANNOTATION_VALUE
                .captures_iter(body)
                .any(|v| !v[1].trim().is_empty());

            if !has_text {
                continue;
            }
            if tier_id.eq_ignore_ascii_case(TRANSCRIPTION_TIER_ID) {
                summary.has_transcription = true;
            } else if tier_id.eq_ignore_ascii_case(FREE_TRANSLATION_TIER_ID) {
                summary.has_free_translation = true;
            }
        }

        summary
    }

    /// Point every media reference at `media_file_name`
    ///
    /// Returns whether any reference was rewritten.
    fn set_media_file_name(&mut self, media_file_name: &str) -> bool {
        if !MEDIA_URL_ATTR.is_match(&self.content) {
            return false;
        }
        let escaped = escape_xml_attr(media_file_name);
        self.content = MEDIA_URL_ATTR
            .replace_all(&self.content, |caps: &Captures| {
                format!("{}=\"{}\"", &caps[1], escaped)
            })
            .into_owned();
        true
    }

    /// Document text
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Rewrite the media reference of the annotation file at `annotation_path`
/// so it names `new_media_path`'s file name.
///
/// Returns `Ok(false)` when the document has no media reference.
pub fn change_media_file_name(annotation_path: &Path, new_media_path: &Path) -> Result<bool> {
    let mut document = AnnotationFile::load(annotation_path)?;
    let media_name = new_media_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if !document.set_media_file_name(&media_name) {
        debug!(path = %annotation_path.display(), "Annotation file has no media reference");
        return Ok(false);
    }

    std::fs::write(annotation_path, document.content())?;
    debug!(
        path = %annotation_path.display(),
        media = %media_name,
        "Updated annotation media reference"
    );
    Ok(true)
}

/// Summarize the annotation file at `path`
pub fn summarize(path: &Path) -> Result<AnnotationSummary> {
    Ok(AnnotationFile::load(path)?.summary())
}

/// Value of whichever quoting alternative matched, starting at group `first`
fn quoted_value(caps: &Captures, first: usize) -> String {
    caps.get(first)
        .or_else(|| caps.get(first + 1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn escape_xml_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn unescape_xml(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
