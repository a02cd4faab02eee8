//! Build Activity Tests
//!
//! Build-record queries through the archive mock.

use chrono::{Duration, Utc};
use ppa_steward::builds::DEFAULT_WINDOW_MINUTES;
use ppa_steward::catalog::{BuildState, ChannelRef};
use ppa_steward::commands;
use ppa_steward::mock::MockArchive;
use ppa_steward::{query_builds, BuildQuery, EngineError};

fn reference() -> ChannelRef {
    ChannelRef::new("tuxinvader", "lts-mainline")
}

/// Builds created 10, 100 and 1000 minutes ago, plus an unrelated package
fn seeded() -> MockArchive {
    let archive = MockArchive::new();
    let channel = archive.add_channel("~tuxinvader", "lts-mainline");
    let now = Utc::now();
    for (minutes, version, state) in [
        (1000, "5.19.10", BuildState::Built),
        (100, "5.19.11", BuildState::FailedToBuild),
        (10, "5.19.12", BuildState::Building),
    ] {
        archive.add_build(
            &channel,
            "linux-generic-5.19",
            version,
            now - Duration::minutes(minutes),
            state,
        );
    }
    archive.add_build(
        &channel,
        "linux-tools-5.19",
        "5.19.12",
        now - Duration::minutes(5),
        BuildState::Built,
    );
    archive
}

#[test]
fn test_default_window_keeps_recent_builds() {
    let archive = seeded();
    let builds = query_builds(&archive, &reference(), "linux-generic-5.19", &BuildQuery::default())
        .unwrap();
    assert_eq!(DEFAULT_WINDOW_MINUTES, 168);
    let versions: Vec<&str> = builds.iter().map(|b| b.source_version.as_str()).collect();
    assert_eq!(versions, ["5.19.11", "5.19.12"]);
}

#[test]
fn test_version_filter() {
    let archive = seeded();
    let query = BuildQuery {
        version: Some("5.19.11".into()),
        ..BuildQuery::default()
    };
    let builds = query_builds(&archive, &reference(), "linux-generic-5.19", &query).unwrap();
    assert_eq!(builds.len(), 1);
    assert_eq!(builds[0].state, BuildState::FailedToBuild);
}

#[test]
fn test_wildcard_version_is_unset() {
    let archive = seeded();
    let query = BuildQuery {
        version: Some("*".into()),
        window_minutes: 2000,
        ..BuildQuery::default()
    };
    let builds = query_builds(&archive, &reference(), "linux-generic-5.19", &query).unwrap();
    assert_eq!(builds.len(), 3);
}

#[test]
fn test_build_id_ignores_window() {
    let archive = seeded();
    let oldest = query_builds(
        &archive,
        &reference(),
        "linux-generic-5.19",
        &BuildQuery {
            window_minutes: 2000,
            ..BuildQuery::default()
        },
    )
    .unwrap()
    .remove(0);
    let numeric = oldest.id.rsplit('/').next().unwrap().to_string();

    let query = BuildQuery {
        build_id: Some(numeric),
        window_minutes: 1,
        ..BuildQuery::default()
    };
    let builds = query_builds(&archive, &reference(), "linux-generic-5.19", &query).unwrap();
    assert_eq!(builds, vec![oldest]);
}

#[test]
fn test_unknown_build_id_is_empty() {
    let archive = seeded();
    let query = BuildQuery {
        build_id: Some("99999".into()),
        ..BuildQuery::default()
    };
    assert!(query_builds(&archive, &reference(), "linux-generic-5.19", &query)
        .unwrap()
        .is_empty());
}

#[test]
fn test_unknown_channel_fails() {
    let archive = seeded();
    let err = query_builds(
        &archive,
        &ChannelRef::new("tuxinvader", "nope"),
        "linux-generic-5.19",
        &BuildQuery::default(),
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::Lookup(_)));
}

#[test]
fn test_build_records_report() {
    let archive = seeded();
    let report = commands::build_records(
        &archive,
        &reference(),
        "linux-tools-5.19",
        &BuildQuery::default(),
    );
    assert!(!report.failed);
    assert!(!report.changed);
    assert_eq!(report.data["count"], 1);
    assert_eq!(report.data["builds"][0]["source_name"], "linux-tools-5.19");
}
