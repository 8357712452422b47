//! Shared fixtures for saymore-model integration tests

#![allow(dead_code)]

use saymore_common::{EventBus, FileSettings};
use saymore_model::services::{Collaborators, ElementContext};
use saymore_model::{ElementKind, ProjectElement};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// A temporary project with `Sessions/` and `People/` folders
pub struct TestProject {
    pub temp_dir: TempDir,
    pub events: EventBus,
    pub context: ElementContext,
}

impl TestProject {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        for kind in ElementKind::all() {
            std::fs::create_dir_all(temp_dir.path().join(kind.folder_name())).unwrap();
        }

        let settings = Arc::new(FileSettings::default());
        let events = EventBus::new(1000);
        let collaborators = Collaborators::with_defaults(
            settings.clone(),
            events.clone(),
            temp_dir.path().join("Recycle"),
        );
        let context = ElementContext::new(settings, collaborators);

        Self {
            temp_dir,
            events,
            context,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn parent(&self, kind: ElementKind) -> PathBuf {
        self.root().join(kind.folder_name())
    }

    /// Open (creating if needed) an element
    pub fn element(&self, kind: ElementKind, id: &str) -> ProjectElement {
        ProjectElement::open(kind, &self.parent(kind), Some(id), &self.context).unwrap()
    }

    pub fn session(&self, id: &str) -> ProjectElement {
        self.element(ElementKind::Session, id)
    }

    /// A file outside the project, ready to be added
    pub fn outside_file(&self, name: &str, content: &[u8]) -> PathBuf {
        let folder = self.root().join("incoming");
        std::fs::create_dir_all(&folder).unwrap();
        let path = folder.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}

/// File names in `folder`, sorted
pub fn file_names(folder: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(folder)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    condition()
}

/// Minimal ELAN document referencing `media_name`
pub fn annotation_document(media_name: &str, transcription: &str, translation: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ANNOTATION_DOCUMENT>
  <HEADER TIME_UNITS="milliseconds">
    <MEDIA_DESCRIPTOR MEDIA_URL="file:///data/{media}" RELATIVE_MEDIA_URL="./{media}"/>
  </HEADER>
  <TIER TIER_ID="Transcription">
    <ANNOTATION><ALIGNABLE_ANNOTATION ANNOTATION_ID="a1"><ANNOTATION_VALUE>{t}</ANNOTATION_VALUE></ALIGNABLE_ANNOTATION></ANNOTATION>
  </TIER>
  <TIER TIER_ID="Phrase Free Translation">
    <ANNOTATION><REF_ANNOTATION ANNOTATION_ID="a2"><ANNOTATION_VALUE>{f}</ANNOTATION_VALUE></REF_ANNOTATION></ANNOTATION>
  </TIER>
</ANNOTATION_DOCUMENT>
"#,
        media = media_name,
        t = transcription,
        f = translation
    )
}
