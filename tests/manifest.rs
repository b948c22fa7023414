use std::fs;

use assert_matches::assert_matches;

use steam_appmanifest::domain::GameRecord;
use steam_appmanifest::error::AppManifestError;
use steam_appmanifest::manifest::{render_manifest, write_manifests};

fn selected(id: &str, name: &str) -> GameRecord {
    let mut record = GameRecord::new(id.parse().unwrap(), name);
    record.selected = true;
    record
}

#[test]
fn writes_one_file_per_record() {
    let temp = tempfile::tempdir().unwrap();
    let records = vec![selected("10", "Counter-Strike"), selected("20", "Team Fortress Classic")];

    let report = write_manifests(temp.path(), &records).unwrap();
    assert_eq!(report.written, 2);
    assert!(report.failures.is_empty());

    let mut names: Vec<String> = fs::read_dir(temp.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["appmanifest_10.acf", "appmanifest_20.acf"]);

    let content = fs::read_to_string(temp.path().join("appmanifest_20.acf")).unwrap();
    assert_eq!(content, render_manifest(&records[1]));
    assert!(content.contains("\"AppID\"        \"20\""));
    assert!(content.contains("\"installdir\"    \"Team Fortress Classic\""));
}

#[test]
fn missing_library_dir_writes_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("steamapps");

    let err = write_manifests(&missing, &[selected("10", "Counter-Strike")]).unwrap_err();
    assert_matches!(err, AppManifestError::InvalidLibraryPath(path) if path == missing);
    assert!(!missing.exists());
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn file_path_is_not_a_library_dir() {
    let temp = tempfile::tempdir().unwrap();
    let file = temp.path().join("steamapps");
    fs::write(&file, b"not a dir").unwrap();

    let err = write_manifests(&file, &[selected("10", "Counter-Strike")]).unwrap_err();
    assert_matches!(err, AppManifestError::InvalidLibraryPath(_));
}

#[test]
fn existing_manifest_is_replaced() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("appmanifest_70.acf");
    fs::write(&path, "stale").unwrap();

    let record = selected("70", "Half-Life");
    let report = write_manifests(temp.path(), std::slice::from_ref(&record)).unwrap();
    assert_eq!(report.written, 1);
    assert_eq!(fs::read_to_string(&path).unwrap(), render_manifest(&record));
}

#[test]
fn one_bad_record_does_not_stop_the_batch() {
    let temp = tempfile::tempdir().unwrap();
    let records = vec![
        selected("missing/70", "Half-Life"),
        selected("220", "Half-Life 2"),
    ];

    let report = write_manifests(temp.path(), &records).unwrap();
    assert_eq!(report.written, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].app_id.as_str(), "missing/70");
    assert_eq!(report.failures[0].name, "Half-Life");
    assert!(temp.path().join("appmanifest_220.acf").exists());

    // no temporary files are left behind
    let leftovers = fs::read_dir(temp.path())
        .unwrap()
        .filter(|entry| {
            let name = entry.as_ref().unwrap().file_name();
            name.to_string_lossy().ends_with(".tmp")
        })
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn empty_selection_is_a_successful_no_op() {
    let temp = tempfile::tempdir().unwrap();
    let report = write_manifests(temp.path(), &[]).unwrap();
    assert_eq!(report.written, 0);
    assert!(report.is_complete());
}
