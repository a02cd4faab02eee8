//! Channel retention
//!
//! - `policy`: pure keep/prune decision over a list of publications
//! - `prune`: applies a decision to an archive with per-item failure handling

mod policy;
mod prune;

pub use policy::{decide_with, OrderBy, RetentionDecision, RetentionPolicy};
pub use prune::{
    request_deletions, DeletionFailure, DeletionReport, FailureThreshold, Pruner,
    RetentionOutcome,
};
