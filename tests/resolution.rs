// tests/resolution.rs

//! Title-to-id resolution against a scripted transport.

mod common;

use common::{MockTransport, TOKEN, login, rows, timeout};
use ctflink::transport::{FAULT_INVALID_SESSION, FAULT_NO_SUCH_OBJECT};
use ctflink::{Documents, Error, FileReleases, Projects, Resolver, Roles, TitleResolver, TransportError, Trackers};
use serde_json::{Value, json};

#[test]
fn test_empty_title_makes_no_remote_call() {
    let mock = MockTransport::new();
    let session = login(&mock);
    mock.reply("getPackageList", rows(&[("pkg1", "")]));

    let frs = FileReleases::new(&session);
    assert_eq!(frs.find_package_id("proj1", "").unwrap(), None);
    assert_eq!(frs.find_release_id("pkg1", "").unwrap(), None);
    assert_eq!(frs.find_release_id_in_project("proj1", "").unwrap(), None);
    assert_eq!(Projects::new(&session).find_project_id("").unwrap(), None);
    assert_eq!(Trackers::new(&session).find_tracker_id("proj1", "").unwrap(), None);
    assert_eq!(Trackers::new(&session).find_latest_artifact("tracker1", "").unwrap(), None);
    assert_eq!(Roles::new(&session).find_role_id("proj1", "").unwrap(), None);
    assert_eq!(Documents::new(&session).find_document_id("docf1", "").unwrap(), None);

    assert!(mock.calls().is_empty());
}

#[test]
fn test_latest_artifact_ties_keep_server_order() {
    let mock = MockTransport::new();
    let session = login(&mock);
    mock.reply(
        "getArtifactList",
        json!([
            {"id": "artf1", "title": "Build failure", "submittedDate": "2026-01-01T10:00:00Z"},
            {"id": "artf2", "title": "Build failure", "submittedDate": "2026-03-01T10:00:00Z"},
            {"id": "artf3", "title": "Build failure", "submittedDate": "2026-03-01T10:00:00Z"},
            {"id": "artf4", "title": "Build failure"}
        ]),
    );

    let trackers = Trackers::new(&session);
    for _ in 0..3 {
        let latest = trackers.find_latest_artifact("tracker1", "Build failure").unwrap().unwrap();
        assert_eq!(latest.id, "artf2");
    }
    assert_eq!(mock.count("getArtifactList"), 3);
}

#[test]
fn test_first_match_in_server_order() {
    let mock = MockTransport::new();
    let session = login(&mock);
    mock.reply(
        "getPackageList",
        rows(&[("pkg1", "tools"), ("pkg2", "nightly"), ("pkg3", "nightly")]),
    );

    let frs = FileReleases::new(&session);
    for _ in 0..3 {
        assert_eq!(frs.find_package_id("proj1", "nightly").unwrap().as_deref(), Some("pkg2"));
    }
}

#[test]
fn test_listing_carries_token_and_scope() {
    let mock = MockTransport::new();
    let session = login(&mock);
    mock.reply("getTrackerList", rows(&[("tracker1", "Defects")]));

    Trackers::new(&session).find_tracker_id("proj1", "Defects").unwrap();

    let calls = mock.calls_to("getTrackerList");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].service, "TrackerApp");
    assert_eq!(calls[0].args, vec![json!(TOKEN), json!("proj1")]);
}

#[test]
fn test_project_listing_is_server_wide() {
    let mock = MockTransport::new();
    let session = login(&mock);
    mock.reply("getProjectList", rows(&[("proj1", "Demo")]));

    let project = Projects::new(&session).find_project("Demo").unwrap().unwrap();
    assert_eq!(project.id, "proj1");
    assert_eq!(mock.calls_to("getProjectList")[0].args, vec![json!(TOKEN)]);
}

#[test]
fn test_timeout_is_not_not_found() {
    let mock = MockTransport::new();
    let session = login(&mock);

    mock.fail("getPackageList", timeout("FrsApp"));
    let err = FileReleases::new(&session).find_package_id("proj1", "nightly").unwrap_err();
    assert!(matches!(err, Error::RemoteLookup { ref operation, .. } if operation == "getPackageList"));
    assert!(err.to_string().contains("timed out"));

    mock.reply("getPackageList", json!([]));
    assert_eq!(FileReleases::new(&session).find_package_id("proj1", "nightly").unwrap(), None);

    mock.reply("getPackageList", Value::Null);
    assert_eq!(FileReleases::new(&session).find_package_id("proj1", "nightly").unwrap(), None);
}

#[test]
fn test_unexpected_reply_is_lookup_error() {
    let mock = MockTransport::new();
    let session = login(&mock);
    mock.reply("getRoleList", json!({"not": "a list"}));

    let err = Roles::new(&session).find_role_id("proj1", "Builder").unwrap_err();
    assert!(matches!(err, Error::RemoteLookup { .. }));
}

#[test]
fn test_release_search_without_package_stops_at_first_hit() {
    let mock = MockTransport::new();
    let session = login(&mock);
    mock.reply(
        "getPackageList",
        rows(&[("pkg1", "tools"), ("pkg2", "nightly"), ("pkg3", "stable")]),
    );
    mock.on("getReleaseList", |args| {
        Ok(match args[1].as_str() {
            Some("pkg1") => rows(&[("rel1", "0.9")]),
            Some("pkg2") => rows(&[("rel2", "1.0"), ("rel3", "1.0")]),
            _ => rows(&[("rel4", "1.0")]),
        })
    });

    let release = FileReleases::new(&session)
        .find_release_in_project("proj1", "1.0")
        .unwrap()
        .unwrap();

    assert_eq!(release.id, "rel2");
    assert_eq!(release.parent_id, "pkg2");
    assert_eq!(mock.count("getPackageList"), 1);
    assert_eq!(mock.count("getReleaseList"), 2);
}

#[test]
fn test_release_search_without_package_can_miss() {
    let mock = MockTransport::new();
    let session = login(&mock);
    mock.reply("getPackageList", rows(&[("pkg1", "tools"), ("pkg2", "nightly")]));
    mock.reply("getReleaseList", rows(&[("rel1", "0.9")]));

    let found = FileReleases::new(&session).find_release_id_in_project("proj1", "1.0").unwrap();
    assert_eq!(found, None);
    assert_eq!(mock.count("getReleaseList"), 2);
}

#[test]
fn test_resolver_trait_object() {
    let mock = MockTransport::new();
    let session = login(&mock);
    mock.reply("getRoleList", rows(&[("role1", "Builder")]));

    let resolver: &dyn Resolver = &TitleResolver::ROLE;
    assert_eq!(resolver.kind(), "role");
    assert_eq!(resolver.resolve_id(&session, "proj1", "Builder").unwrap().as_deref(), Some("role1"));
    assert_eq!(resolver.resolve_id(&session, "proj1", "builder").unwrap(), None);
}

#[test]
fn test_invalid_session_fault_revokes_session() {
    let mock = MockTransport::new();
    let session = login(&mock);
    mock.fail(
        "getTrackerList",
        TransportError::fault(FAULT_INVALID_SESSION, "session expired"),
    );

    let err = Trackers::new(&session).find_tracker_id("proj1", "Defects").unwrap_err();
    assert!(matches!(err, Error::SessionInvalid(_)));
    assert!(!session.is_active());

    mock.clear_calls();
    let err = FileReleases::new(&session).find_package_id("proj1", "nightly").unwrap_err();
    assert!(err.requires_login());
    assert!(mock.calls().is_empty());
}

#[test]
fn test_missing_user_is_none() {
    let mock = MockTransport::new();
    let session = login(&mock);
    mock.on("getUserData", |args| match args[1].as_str() {
        Some("alice") => Ok(json!({"username": "alice", "fullName": "Alice Example"})),
        _ => Err(TransportError::fault(FAULT_NO_SUCH_OBJECT, "no such user")),
    });

    let projects = Projects::new(&session);
    assert!(projects.is_username_valid("alice").unwrap());
    assert!(!projects.is_username_valid("mallory").unwrap());
    assert_eq!(projects.user("alice").unwrap().unwrap().full_name, "Alice Example");
}

#[test]
fn test_project_membership() {
    let mock = MockTransport::new();
    let session = login(&mock);
    mock.reply(
        "getProjectMemberList",
        json!([{"username": "alice"}, {"username": "bob"}]),
    );

    let projects = Projects::new(&session);
    assert!(projects.has_member("proj1", "bob").unwrap());
    assert!(!projects.has_member("proj1", "carol").unwrap());
    assert!(!projects.has_member("proj1", "").unwrap());
    assert_eq!(mock.count("getProjectMemberList"), 2);
}
