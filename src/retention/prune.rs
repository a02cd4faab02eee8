//! Retention enforcement against a live archive.
//!
//! Lists a channel's live publications, applies a [`RetentionPolicy`] and
//! requests deletion of the pruned set one by one. A failed deletion is
//! recorded and the loop moves on.

use std::fmt;
use std::str::FromStr;

use ppa_catalog::{Channel, Publication, PublicationStatus};
use serde::{Deserialize, Serialize};

use crate::archive::Archive;
use crate::error::EngineError;

use super::policy::{RetentionDecision, RetentionPolicy};

/// A deletion request the archive refused.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeletionFailure {
    pub id: String,
    pub name: String,
    pub version: String,
    pub message: String,
}

/// When partial deletion failure fails the whole operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureThreshold {
    /// Any failed deletion fails the operation
    Any,
    /// Only fail when every attempted deletion failed
    #[default]
    All,
}

impl FailureThreshold {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureThreshold::Any => "any",
            FailureThreshold::All => "all",
        }
    }
}

impl fmt::Display for FailureThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureThreshold {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(FailureThreshold::Any),
            "all" => Ok(FailureThreshold::All),
            _ => Err(EngineError::invalid_input(format!(
                "unknown failure threshold '{s}' (expected 'any' or 'all')"
            ))),
        }
    }
}

/// Result of sequential deletion requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeletionReport {
    /// Accepted (or, in dry-run, would-be) deletions in request order
    pub deleted: Vec<Publication>,
    /// Refused deletions (non-fatal)
    pub failures: Vec<DeletionFailure>,
    pub dry_run: bool,
}

impl DeletionReport {
    /// True when the archive accepted at least one real deletion
    pub fn changed(&self) -> bool {
        !self.dry_run && !self.deleted.is_empty()
    }

    pub fn is_failure(&self, threshold: FailureThreshold) -> bool {
        if self.failures.is_empty() {
            return false;
        }
        match threshold {
            FailureThreshold::Any => true,
            FailureThreshold::All => self.deleted.is_empty(),
        }
    }
}

/// Request deletion of each publication in order, continuing past failures.
pub fn request_deletions(
    archive: &dyn Archive,
    publications: &[Publication],
    dry_run: bool,
) -> DeletionReport {
    let mut report = DeletionReport {
        dry_run,
        ..DeletionReport::default()
    };

    for publication in publications {
        if dry_run {
            tracing::info!(
                name = %publication.name,
                version = %publication.version,
                "DRY-RUN: would request deletion"
            );
            report.deleted.push(publication.clone());
            continue;
        }

        match archive.request_deletion(publication) {
            Ok(()) => {
                tracing::info!(
                    name = %publication.name,
                    version = %publication.version,
                    "deletion requested"
                );
                report.deleted.push(publication.clone());
            }
            Err(e) => {
                tracing::warn!(
                    name = %publication.name,
                    version = %publication.version,
                    error = %e,
                    "deletion request failed"
                );
                report.failures.push(DeletionFailure {
                    id: publication.id.clone(),
                    name: publication.name.clone(),
                    version: publication.version.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    report
}

/// Result of one pruning pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionOutcome {
    pub decision: RetentionDecision,
    pub deletions: DeletionReport,
}

impl RetentionOutcome {
    pub fn changed(&self) -> bool {
        self.deletions.changed()
    }

    pub fn is_failure(&self, threshold: FailureThreshold) -> bool {
        self.deletions.is_failure(threshold)
    }
}

/// Applies a retention policy to one channel.
pub struct Pruner<'a> {
    archive: &'a dyn Archive,
    policy: RetentionPolicy,
}

impl<'a> Pruner<'a> {
    pub fn new(archive: &'a dyn Archive, policy: RetentionPolicy) -> Self {
        Self { archive, policy }
    }

    /// Resolve the channel, then prune it.
    pub fn run_for(&self, project: &str, channel: &str) -> Result<RetentionOutcome, EngineError> {
        let channel = self.archive.lookup_channel(project, channel)?;
        self.run(&channel)
    }

    /// Prune a channel down to the policy cap.
    ///
    /// Listing failures are fatal. Individual deletion failures are
    /// collected on the outcome.
    pub fn run(&self, channel: &Channel) -> Result<RetentionOutcome, EngineError> {
        let publications =
            self.archive
                .list_publications(channel, None, Some(PublicationStatus::Published))?;
        tracing::debug!(
            channel = %channel.reference,
            live = publications.len(),
            cap = self.policy.max_sources,
            "evaluating retention"
        );

        let decision = self.policy.decide(&publications);
        if decision.is_noop() {
            return Ok(RetentionOutcome {
                decision,
                deletions: DeletionReport {
                    dry_run: self.policy.dry_run,
                    ..DeletionReport::default()
                },
            });
        }

        let deletions = request_deletions(self.archive, &decision.pruned, self.policy.dry_run);
        Ok(RetentionOutcome {
            decision,
            deletions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveOp;
    use crate::mock::{FailureConfig, MockArchive};
    use chrono::{TimeZone, Utc};
    use ppa_catalog::ArchiveError;

    fn seeded(count: u32) -> (MockArchive, Channel, Vec<Publication>) {
        let archive = MockArchive::new();
        let channel = archive.add_channel("~tuxinvader", "lts-mainline");
        let pubs = (1..=count)
            .map(|d| {
                archive.publish(
                    &channel,
                    "linux",
                    &format!("5.19.{d}"),
                    Utc.with_ymd_and_hms(2022, 9, d, 0, 0, 0).unwrap(),
                )
            })
            .collect();
        (archive, channel, pubs)
    }

    #[test]
    fn test_threshold_parse() {
        assert_eq!("ANY".parse::<FailureThreshold>().unwrap(), FailureThreshold::Any);
        assert_eq!(FailureThreshold::default(), FailureThreshold::All);
        assert!("some".parse::<FailureThreshold>().is_err());
    }

    #[test]
    fn test_prune_deletes_oldest() {
        let (archive, channel, pubs) = seeded(4);
        let outcome = Pruner::new(&archive, RetentionPolicy::keep_last_n(2))
            .run(&channel)
            .unwrap();

        assert!(outcome.changed());
        assert_eq!(archive.deletion_requests(), vec![pubs[0].id.clone(), pubs[1].id.clone()]);
        assert_eq!(outcome.decision.kept.len(), 2);
    }

    #[test]
    fn test_noop_issues_no_requests() {
        let (archive, channel, _) = seeded(2);
        let outcome = Pruner::new(&archive, RetentionPolicy::keep_last_n(2))
            .run(&channel)
            .unwrap();
        assert!(!outcome.changed());
        assert_eq!(archive.call_count(ArchiveOp::RequestDeletion), 0);
    }

    #[test]
    fn test_dry_run_does_not_mutate() {
        let (archive, channel, _) = seeded(3);
        let outcome = Pruner::new(&archive, RetentionPolicy::keep_last_n(1).with_dry_run())
            .run(&channel)
            .unwrap();
        assert_eq!(outcome.deletions.deleted.len(), 2);
        assert!(!outcome.changed());
        assert!(archive.deletion_requests().is_empty());
    }

    #[test]
    fn test_partial_failure_continues() {
        let (archive, channel, pubs) = seeded(4);
        archive.fail_deletion_of(&pubs[0].id, FailureConfig::http(500, "boom"));

        let outcome = Pruner::new(&archive, RetentionPolicy::keep_last_n(1))
            .run(&channel)
            .unwrap();

        assert_eq!(outcome.deletions.failures.len(), 1);
        assert_eq!(outcome.deletions.failures[0].id, pubs[0].id);
        assert_eq!(outcome.deletions.deleted.len(), 2);
        assert!(outcome.is_failure(FailureThreshold::Any));
        assert!(!outcome.is_failure(FailureThreshold::All));
    }

    #[test]
    fn test_all_failed_is_failure() {
        let (archive, channel, _) = seeded(3);
        archive.inject_failure(ArchiveOp::RequestDeletion, FailureConfig::transport("down"));

        let outcome = Pruner::new(&archive, RetentionPolicy::keep_last_n(1))
            .run(&channel)
            .unwrap();
        assert_eq!(outcome.deletions.failures.len(), 2);
        assert!(outcome.is_failure(FailureThreshold::All));
        assert!(!outcome.changed());
    }

    #[test]
    fn test_listing_failure_is_fatal() {
        let (archive, channel, _) = seeded(3);
        archive.inject_failure(ArchiveOp::ListPublications, FailureConfig::http(503, "x"));
        let err = Pruner::new(&archive, RetentionPolicy::keep_last_n(1))
            .run(&channel)
            .unwrap_err();
        assert!(matches!(err, EngineError::Archive(_)));
    }

    #[test]
    fn test_oversized_listing_deletes_nothing() {
        let (archive, channel, _) = seeded(3);
        archive.inject_failure(
            ArchiveOp::ListPublications,
            FailureConfig {
                error: ArchiveError::CollectionTooLarge {
                    operation: "list_publications".into(),
                    pages: 200,
                },
                fail_count: None,
            },
        );
        let err = Pruner::new(&archive, RetentionPolicy::keep_last_n(1))
            .run(&channel)
            .unwrap_err();
        assert!(err.to_string().contains("exceeded 200 pages"));
        assert_eq!(archive.call_count(ArchiveOp::RequestDeletion), 0);
    }

    #[test]
    fn test_run_for_unknown_channel() {
        let (archive, _, _) = seeded(1);
        let err = Pruner::new(&archive, RetentionPolicy::default())
            .run_for("~tuxinvader", "missing")
            .unwrap_err();
        assert!(matches!(err, EngineError::Lookup(_)));
    }
}
