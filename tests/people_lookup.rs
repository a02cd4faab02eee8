//! People Lookup Tests
//!
//! Person and team search through the archive mock.

use ppa_steward::archive::ArchiveOp;
use ppa_steward::commands;
use ppa_steward::mock::{FailureConfig, MockArchive};
use ppa_steward::{user_info, EngineError};

fn seeded() -> MockArchive {
    let archive = MockArchive::new();
    archive.add_person("tuxinvader", "Mark Boddington");
    archive.add_person("tuxinvader-ci", "Tux CI Bot");
    archive.add_person("kernel-team", "Kernel Team");
    archive
}

#[test]
fn test_exact_account_singled_out() {
    let archive = seeded();
    let lookup = user_info(&archive, "tuxinvader").unwrap();
    assert_eq!(lookup.people.len(), 2);
    let details = lookup.details.unwrap();
    assert_eq!(details.name, "tuxinvader");
    assert_eq!(details.display_name, "Mark Boddington");
}

#[test]
fn test_tilde_prefix_is_stripped() {
    let archive = seeded();
    let lookup = user_info(&archive, "~kernel-team").unwrap();
    assert_eq!(lookup.user, "kernel-team");
    assert!(lookup.details.is_some());
}

#[test]
fn test_report_for_unknown_user_is_empty_not_failed() {
    let archive = seeded();
    let report = commands::user_info(&archive, "nobody-here");
    assert!(!report.failed);
    assert!(!report.changed);
    assert_eq!(report.command, "user-info");
    assert_eq!(report.data["count"], 0);
    assert!(report.data["details"].is_null());
}

#[test]
fn test_report_lists_matches() {
    let archive = seeded();
    let report = commands::user_info(&archive, "tuxinvader");
    assert_eq!(report.data["user"], "tuxinvader");
    assert_eq!(report.data["count"], 2);
    assert_eq!(report.data["details"]["display_name"], "Mark Boddington");
    assert_eq!(report.data["people"][1]["name"], "tuxinvader-ci");
}

#[test]
fn test_search_failure_fails_report() {
    let archive = seeded();
    archive.inject_failure(ArchiveOp::FindPeople, FailureConfig::http(503, "unavailable"));

    let err = user_info(&archive, "tuxinvader").unwrap_err();
    assert!(matches!(err, EngineError::Archive(_)));

    let report = commands::user_info(&archive, "tuxinvader");
    assert!(report.failed);
    assert_eq!(report.error_kind.as_deref(), Some("archive"));
    assert!(report.msg.unwrap().contains("503"));
}

#[test]
fn test_blank_name_is_invalid_input() {
    let archive = seeded();
    let report = commands::user_info(&archive, "   ");
    assert!(report.failed);
    assert_eq!(report.error_kind.as_deref(), Some("invalid_input"));
    assert_eq!(archive.call_count(ArchiveOp::FindPeople), 0);
}
