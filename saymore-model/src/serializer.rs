//! Settings and sidecar metadata serialization
//!
//! The element store never interprets metadata bytes itself; it goes through
//! a [`FileSerializer`]. The default stores a TOML document:
//!
//! ```toml
//! root_element = "Session"
//!
//! [fields]
//! title = "Frog story"
//! custom_dialect = "Northern"
//! ```

use saymore_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Field id → value
pub type FieldMap = BTreeMap<String, String>;

/// Load/save strategy for settings and sidecar metadata files
pub trait FileSerializer: Send + Sync {
    /// Read all field values stored at `path`
    fn load(&self, path: &Path) -> Result<FieldMap>;

    /// Persist `fields` at `path`, tagged with `root_element_name`
    fn save(&self, path: &Path, root_element_name: &str, fields: &FieldMap) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MetadataDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root_element: Option<String>,
    #[serde(default)]
    fields: FieldMap,
}

/// TOML-backed serializer
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlFileSerializer;

impl FileSerializer for TomlFileSerializer {
    fn load(&self, path: &Path) -> Result<FieldMap> {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(FieldMap::new());
        }
        let document: MetadataDocument = toml::from_str(&content).map_err(|e| {
            Error::Serialization(format!("{}: {}", path.display(), e))
        })?;
        Ok(document.fields)
    }

    fn save(&self, path: &Path, root_element_name: &str, fields: &FieldMap) -> Result<()> {
        let document = MetadataDocument {
            root_element: Some(root_element_name.to_string()),
            fields: fields.clone(),
        };
        let content = toml::to_string_pretty(&document)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load_preserves_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("S01.session");

        let mut fields = FieldMap::new();
        fields.insert("title".to_string(), "Frog \"story\"".to_string());
        fields.insert("custom_dialect".to_string(), "Northern".to_string());

        TomlFileSerializer.save(&path, "Session", &fields).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("root_element = \"Session\""));

        assert_eq!(TomlFileSerializer.load(&path).unwrap(), fields);
    }

    #[test]
    fn test_empty_file_loads_as_no_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.wav.meta");
        std::fs::write(&path, "").unwrap();
        assert!(TomlFileSerializer.load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.wav.meta");
        std::fs::write(&path, "<xml>not toml</xml>").unwrap();
        assert!(matches!(
            TomlFileSerializer.load(&path),
            Err(Error::Serialization(_))
        ));
    }
}
