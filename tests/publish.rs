// tests/publish.rs

//! Release and document publishing flows.

mod common;

use common::{MockTransport, login, rows};
use ctflink::config::UploadSection;
use ctflink::{DocumentPublisher, Error, FileOutcome, ReleasePublisher, SilentProgress};
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn silent(_: &std::path::Path) -> Box<dyn ctflink::ProgressTracker> {
    Box::new(SilentProgress::new())
}

fn files(dir: &TempDir, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| {
            let path = dir.path().join(name);
            fs::write(&path, name.as_bytes()).unwrap();
            path
        })
        .collect()
}

fn script_release(mock: &MockTransport) {
    mock.reply("getProjectList", rows(&[("proj1", "Demo")]));
    mock.reply("getPackageList", rows(&[("pkg1", "builds")]));
    mock.reply("getReleaseList", rows(&[("rel1", "1.0")]));
    mock.reply(
        "getFrsFileList",
        json!([{"id": "frs1", "title": "app.tar.gz"}]),
    );
    mock.on("uploadFile", |args| Ok(json!(format!("file-{}", args[1].as_str().unwrap_or_default()))));
    mock.on("createFrsFile", |args| Ok(json!({"id": format!("frs-{}", args[2].as_str().unwrap_or_default()), "title": args[2]})));
    mock.reply("deleteFrsFile", Value::Null);
}

#[test]
fn test_publish_release_skips_existing() {
    let mock = MockTransport::new();
    let session = login(&mock);
    script_release(&mock);
    let dir = TempDir::new().unwrap();
    let paths = files(&dir, &["app.tar.gz", "app.zip"]);

    let report = ReleasePublisher::new(&session, &UploadSection::default())
        .with_progress(silent)
        .publish("Demo", "builds", "1.0", &paths)
        .unwrap();

    assert_eq!(report.target_id, "rel1");
    assert_eq!(report.uploaded(), 1);
    assert_eq!(report.skipped(), 1);
    assert!(matches!(report.files[0].outcome, FileOutcome::Skipped { .. }));
    assert_eq!(
        report.files[1].outcome,
        FileOutcome::Uploaded {
            id: "frs-app.zip".to_string()
        }
    );

    assert_eq!(mock.count("deleteFrsFile"), 0);
    let creates = mock.calls_to("createFrsFile");
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].args[1], json!("rel1"));
    assert_eq!(creates[0].args[3], json!("application/zip"));
    assert_eq!(creates[0].args[4], json!("file-app.zip"));
}

#[test]
fn test_publish_release_overwrites() {
    let mock = MockTransport::new();
    let session = login(&mock);
    script_release(&mock);
    let dir = TempDir::new().unwrap();
    let paths = files(&dir, &["app.tar.gz"]);

    let report = ReleasePublisher::new(&session, &UploadSection::default())
        .overwrite(true)
        .with_progress(silent)
        .publish("Demo", "builds", "1.0", &paths)
        .unwrap();

    assert_eq!(report.uploaded(), 1);
    assert_eq!(mock.calls_to("deleteFrsFile")[0].args[1], json!("frs1"));
    assert_eq!(mock.count("createFrsFile"), 1);
}

#[test]
fn test_publish_release_creates_release() {
    let mock = MockTransport::new();
    let session = login(&mock);
    script_release(&mock);
    mock.on("createRelease", |args| Ok(json!({"id": "rel2", "title": args[2]})));
    mock.reply("getFrsFileList", json!([]));
    let dir = TempDir::new().unwrap();
    let paths = files(&dir, &["app.tar.gz"]);

    let report = ReleasePublisher::new(&session, &UploadSection::default())
        .with_progress(silent)
        .publish("Demo", "builds", "2.0", &paths)
        .unwrap();

    assert_eq!(report.target_id, "rel2");
    assert_eq!(mock.count("createRelease"), 1);
    assert_eq!(report.uploaded(), 1);
}

#[test]
fn test_publish_release_unknown_package() {
    let mock = MockTransport::new();
    let session = login(&mock);
    script_release(&mock);

    let err = ReleasePublisher::new(&session, &UploadSection::default())
        .publish("Demo", "nightly", "1.0", &[])
        .unwrap_err();

    assert!(matches!(err, Error::TargetNotFound { ref kind, .. } if kind == "package"));
    assert_eq!(mock.count("getReleaseList"), 0);
}

#[test]
fn test_publish_release_continues_after_file_failure() {
    let mock = MockTransport::new();
    let session = login(&mock);
    script_release(&mock);
    mock.reply("getFrsFileList", json!([]));
    let dir = TempDir::new().unwrap();
    let mut paths = vec![dir.path().join("missing.tar.gz")];
    paths.extend(files(&dir, &["app.zip"]));

    let report = ReleasePublisher::new(&session, &UploadSection::default())
        .with_progress(silent)
        .publish("Demo", "builds", "1.0", &paths)
        .unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(report.uploaded(), 1);
    assert!(matches!(report.files[0].outcome, FileOutcome::Failed { .. }));
}

#[test]
fn test_publish_documents() {
    let mock = MockTransport::new();
    let session = login(&mock);
    mock.reply("getProjectList", rows(&[("proj1", "Demo")]));
    mock.on("getDocumentFolderList", |args| {
        Ok(match args[1].as_str() {
            Some("proj1") => rows(&[("docf1", "Root Folder")]),
            _ => json!([]),
        })
    });
    mock.on("createDocumentFolder", |args| Ok(json!({"id": "docf2", "title": args[2]})));
    mock.reply(
        "getDocumentList",
        json!([{"id": "doc1", "title": "build.log"}]),
    );
    mock.on("uploadFile", |args| Ok(json!(format!("file-{}", args[1].as_str().unwrap_or_default()))));
    mock.reply("updateDocument", Value::Null);
    mock.on("createDocument", |args| Ok(json!({"id": "doc2", "title": args[2]})));

    let dir = TempDir::new().unwrap();
    let paths = files(&dir, &["build.log", "report.html"]);

    let report = DocumentPublisher::new(&session, &UploadSection::default())
        .description("Nightly output")
        .with_progress(silent)
        .publish("Demo", "Root Folder/nightly", &paths)
        .unwrap();

    assert_eq!(report.target_id, "docf2");
    assert_eq!(report.uploaded(), 2);

    let updates = mock.calls_to("updateDocument");
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].args[1..], [json!("doc1"), json!("file-build.log")]);

    let creates = mock.calls_to("createDocument");
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].args[1], json!("docf2"));
    assert_eq!(creates[0].args[2], json!("report.html"));
    assert_eq!(creates[0].args[3], json!("Nightly output"));
    assert_eq!(creates[0].args[8], json!("text/html"));
}

#[test]
fn test_publish_aborts_when_session_expires() {
    let mock = MockTransport::new();
    let session = login(&mock);
    script_release(&mock);
    mock.reply("getFrsFileList", json!([]));
    mock.fail(
        "uploadFile",
        ctflink::TransportError::fault(ctflink::transport::FAULT_INVALID_SESSION, "expired"),
    );
    let dir = TempDir::new().unwrap();
    let paths = files(&dir, &["a.zip", "b.zip"]);

    let result = ReleasePublisher::new(&session, &UploadSection::default())
        .with_progress(silent)
        .publish("Demo", "builds", "1.0", &paths);

    // The second file finds the session gone before touching the server
    assert!(matches!(result, Err(Error::SessionInvalid(_))));
    assert!(!session.is_active());
    assert_eq!(mock.count("uploadFile"), 1);
}
