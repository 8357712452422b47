//! Project element lifecycle and component file cache

mod helpers;

use helpers::{file_names, TestProject};
use saymore_common::ElementEvent;
use saymore_model::{ElementKind, FileKind, ProjectElement};
use std::time::Duration;

#[test]
fn test_new_element_creates_folder_and_settings_file() {
    let project = TestProject::new();
    let element = project.session("S01");

    assert_eq!(element.folder_path(), project.parent(ElementKind::Session).join("S01"));
    assert_eq!(element.folder_path(), element.parent_folder_path().join(element.id()));
    assert!(element.settings_file_path().is_file());
    assert_eq!(file_names(&element.folder_path()), vec!["S01.session"]);
}

#[test]
fn test_new_element_publishes_created_event() {
    let project = TestProject::new();
    let mut rx = project.events.subscribe();
    let _element = project.element(ElementKind::Person, "Ann");

    match rx.try_recv().unwrap() {
        ElementEvent::ElementCreated { kind, id, .. } => {
            assert_eq!(kind, "Person");
            assert_eq!(id, "Ann");
        }
        other => panic!("unexpected event {:?}", other),
    }

    // Reopening loads instead of creating
    let _again = project.element(ElementKind::Person, "Ann");
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_default_names_count_up() {
    let project = TestProject::new();
    let parent = project.parent(ElementKind::Session);

    let first = ProjectElement::open(ElementKind::Session, &parent, None, &project.context).unwrap();
    let second = ProjectElement::open(ElementKind::Session, &parent, None, &project.context).unwrap();
    assert_eq!(first.id(), "New Session 01");
    assert_eq!(second.id(), "New Session 02");
}

#[test]
fn test_open_requires_parent_folder() {
    let project = TestProject::new();
    let missing = project.root().join("Nowhere");
    assert!(ProjectElement::open(ElementKind::Session, &missing, Some("S01"), &project.context).is_err());
}

#[test]
fn test_component_files_always_include_settings_file() {
    let project = TestProject::new();
    let element = project.session("S01");

    let files = element.get_component_files().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].kind(), FileKind::Settings);
    assert_eq!(files[0].path(), element.settings_file_path());
}

#[test]
fn test_scan_skips_bookkeeping_files_and_links_annotations() {
    let project = TestProject::new();
    let element = project.session("S01");
    let folder = element.folder_path();

    for name in [
        "S01_Source.wav",
        "S01_Source.wav.meta",
        "S01_Source.wav.annotations.eaf",
        "S01_Source.wav.oralAnnotations.wav",
        "Thumbs.db",
        ".DS_Store",
        "layout.pfsx",
        "photo.JPG",
    ] {
        std::fs::write(folder.join(name), b"").unwrap();
    }

    let files = element.get_component_files().unwrap();
    let kinds: Vec<(FileKind, String)> = files.iter().map(|f| (f.kind(), f.file_name())).collect();
    assert_eq!(
        kinds,
        vec![
            (FileKind::Settings, "S01.session".to_string()),
            (FileKind::Standard, "S01_Source.wav".to_string()),
            (FileKind::Annotation, "S01_Source.wav.annotations.eaf".to_string()),
            (FileKind::OralAnnotation, "S01_Source.wav.oralAnnotations.wav".to_string()),
            (FileKind::Standard, "photo.JPG".to_string()),
        ]
    );
}

#[test]
fn test_cache_persists_until_refresh() {
    let project = TestProject::new();
    let element = project.session("S01");
    assert_eq!(element.get_component_files().unwrap().len(), 1);

    // Added out of band: not visible until a refresh
    std::fs::write(element.folder_path().join("notes.txt"), b"hi").unwrap();
    assert_eq!(element.get_component_files().unwrap().len(), 1);

    let mut rx = project.events.subscribe();
    element.refresh_component_files();
    assert!(matches!(
        rx.try_recv().unwrap(),
        ElementEvent::ComponentFilesRefreshed { .. }
    ));

    let files = element.get_component_files().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[1].file_name(), "notes.txt");
}

#[cfg(unix)]
#[test]
fn test_scan_includes_symlinked_media() {
    let project = TestProject::new();
    let element = project.session("S01");
    let media = project.root().join("elsewhere.wav");
    std::fs::write(&media, b"RIFF").unwrap();
    std::os::unix::fs::symlink(&media, element.folder_path().join("linked.wav")).unwrap();

    let files = element.get_component_files().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[1].file_name(), "linked.wav");
}

#[test]
fn test_add_skips_collisions_silently() {
    let project = TestProject::new();
    let element = project.session("S01");
    std::fs::write(element.folder_path().join("existing.wav"), b"old").unwrap();
    let collision = project.outside_file("existing.wav", b"new");
    let fresh = project.outside_file("fresh.wav", b"fresh");
    element.get_component_files().unwrap();

    let mut rx = project.events.subscribe();
    assert!(element.add_component_files(&[collision, fresh]));

    assert_eq!(std::fs::read(element.folder_path().join("existing.wav")).unwrap(), b"old");
    assert_eq!(std::fs::read(element.folder_path().join("fresh.wav")).unwrap(), b"fresh");

    // Cache updated in place
    let names: Vec<String> = element
        .get_component_files()
        .unwrap()
        .iter()
        .map(|f| f.file_name())
        .collect();
    assert!(names.contains(&"fresh.wav".to_string()));

    // Background work paused around the copy, no failure reported
    let mut saw_suspend = false;
    let mut saw_resume = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            ElementEvent::BackgroundProcessingSuspended { .. } => saw_suspend = true,
            ElementEvent::BackgroundProcessingResumed { .. } => saw_resume = true,
            ElementEvent::NonFatalError { message, .. } => panic!("unexpected failure: {}", message),
            _ => {}
        }
    }
    assert!(saw_suspend && saw_resume);
}

#[test]
fn test_add_returns_false_when_nothing_passes() {
    let project = TestProject::new();
    let element = project.session("S01");
    let sidecar = project.outside_file("clip.wav.meta", b"");
    let missing = project.root().join("missing.wav");

    assert!(!element.add_component_files(&[sidecar, missing]));
    assert_eq!(file_names(&element.folder_path()), vec!["S01.session"]);
}

#[test]
fn test_add_single_file() {
    let project = TestProject::new();
    let element = project.session("S01");
    let consent = project.outside_file("S01_Consent.pdf", b"%PDF");

    assert!(element.add_component_file(&consent));
    assert!(!element.add_component_file(&consent), "second add collides");
}

#[test]
fn test_delete_moves_to_recycle_and_clears_cache() {
    let project = TestProject::new();
    let element = project.session("S01");
    std::fs::write(element.folder_path().join("clip.wav"), b"x").unwrap();
    std::fs::write(element.folder_path().join("clip.wav.meta"), "").unwrap();

    let files = element.get_component_files().unwrap();
    let clip = files.iter().find(|f| f.file_name() == "clip.wav").unwrap();
    assert!(element.delete_component_file(clip, false));

    assert_eq!(file_names(&element.folder_path()), vec!["S01.session"]);
    assert!(project.root().join("Recycle").join("clip.wav").exists());
    assert!(project.root().join("Recycle").join("clip.wav.meta").exists());
    assert_eq!(element.get_component_files().unwrap().len(), 1);
}

#[test]
fn test_show_as_normal_filter() {
    let project = TestProject::new();
    let element = project.session("S01");
    let folder = element.folder_path();

    assert!(element.get_show_as_normal_component_file(&folder.join("S01_Source.wav")));
    assert!(!element.get_show_as_normal_component_file(&folder.join("S01.SESSION")));
    assert!(!element.get_show_as_normal_component_file(&folder.join("a.wav.Meta")));
    assert!(!element.get_show_as_normal_component_file(&folder.join("a.wav.annotations.eaf")));
    assert!(!element.get_show_as_normal_component_file(&folder.join("a.wav.oralAnnotations.wav")));
    assert!(!element.get_show_as_normal_component_file(&folder.join("thumbs.db")));
}

#[test]
fn test_export_fields_and_persistence() {
    let project = TestProject::new();
    let element = project.session("S01");
    element.metadata_file().set_field_value("title", "Market day");
    element.metadata_file().set_field_value("custom_village", "Kinda");
    element.save().unwrap();

    let reopened = project.session("S01");
    let exported = reopened.export_fields();
    assert_eq!(exported[0].field_id, "id");
    assert_eq!(exported[0].value, "S01");
    assert!(exported.iter().any(|f| f.field_id == "title" && f.value == "Market day"));
    assert!(exported.iter().all(|f| !f.is_custom()));
}

#[test]
fn test_total_media_duration_skips_unparsable() {
    let project = TestProject::new();
    let element = project.session("S01");
    let folder = element.folder_path();
    for (name, duration) in [("a.wav", "0:01:30"), ("b.wav", "0:00:45.5"), ("c.wav", "soon")] {
        std::fs::write(folder.join(name), b"").unwrap();
        std::fs::write(
            folder.join(format!("{}.meta", name)),
            format!("root_element = \"MetaData\"\n\n[fields]\nDuration = \"{}\"\n", duration),
        )
        .unwrap();
    }

    assert_eq!(
        element.total_media_duration().unwrap(),
        Duration::from_millis(135_500)
    );
}
