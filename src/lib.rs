//! PPA Steward - retention and reconciliation for source-package archives
//!
//! This crate keeps hosted package channels (PPAs) in a declared state:
//! it prunes old publications down to a retention cap, reconciles a named
//! package to present or absent (triggering an upload when needed), filters
//! build activity, manages the channels themselves and looks up the
//! people that own them.

pub mod archive;
pub mod builds;
pub mod channel;
pub mod commands;
pub mod config;
pub mod error;
pub mod mock;
pub mod people;
pub mod reconcile;
pub mod report;
pub mod retention;
pub mod upload;

pub use archive::{Archive, ArchiveOp, Credentials, LaunchpadArchive, Session};
pub use builds::{filter_builds, query_builds, BuildQuery};
pub use channel::{ensure_channel, EnsureChannelOutcome, EnsureChannelRequest};
pub use error::EngineError;
pub use people::{user_info, UserLookup};
pub use reconcile::{Intent, ReconcileRequest, ReconciliationEngine, ReconciliationResult};
pub use report::CommandReport;
pub use retention::{FailureThreshold, OrderBy, Pruner, RetentionDecision, RetentionPolicy};
pub use upload::{ChangesFile, DputUploader, RecordingUploader, Uploader};

pub use ppa_catalog as catalog;
pub use ppa_version as version;

/// Archive name of a project or person (`~name`).
pub fn project_name(raw: &str) -> String {
    format!("~{}", raw.trim().trim_start_matches('~'))
}
