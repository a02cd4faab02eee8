//! Present/absent reconciliation for one named source package.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use ppa_catalog::{ChannelRef, Publication, PublicationStatus, ANY_VERSION};
use ppa_version::{MatchMode, MatchSpec};
use serde::{Deserialize, Serialize};

use crate::archive::Archive;
use crate::error::EngineError;
use crate::retention::{request_deletions, DeletionFailure, FailureThreshold};

use super::state::{ReconcileState, StateTrail};

/// Desired end state of the named package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Present,
    Absent,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Present => "present",
            Intent::Absent => "absent",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "present" => Ok(Intent::Present),
            "absent" => Ok(Intent::Absent),
            _ => Err(EngineError::invalid_input(format!(
                "unknown ensure value '{s}' (expected 'present' or 'absent')"
            ))),
        }
    }
}

/// One reconciliation call.
#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    pub channel: ChannelRef,
    /// Package name, or the pattern for non-exact match modes
    pub name: String,
    /// Exact version, or `*` for any
    pub version: String,
    pub match_mode: MatchMode,
    pub intent: Intent,
    /// Source `.changes` file to publish when the package is missing
    pub upload_manifest: Option<PathBuf>,
    pub dry_run: bool,
}

impl ReconcileRequest {
    pub fn new(channel: ChannelRef, name: impl Into<String>, intent: Intent) -> Self {
        Self {
            channel,
            name: name.into(),
            version: ANY_VERSION.to_string(),
            match_mode: MatchMode::Exact,
            intent,
            upload_manifest: None,
            dry_run: false,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn with_upload_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.upload_manifest = Some(path.into());
        self
    }

    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn match_spec(&self) -> MatchSpec {
        MatchSpec::new(self.name.clone(), self.match_mode)
    }
}

/// Request to publish a source upload into a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadDirective {
    pub channel: ChannelRef,
    pub manifest: PathBuf,
}

/// Everything a reconciliation call accumulated.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconciliationResult {
    /// Matching publications (present) or targeted ones (absent)
    pub affected: Vec<Publication>,
    pub messages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadDirective>,
    /// Deletions the archive accepted during this call
    pub deletions_requested: usize,
    /// Refused deletions (non-fatal)
    pub failures: Vec<DeletionFailure>,
    pub states: Vec<ReconcileState>,
}

impl ReconciliationResult {
    /// True when a mutation was issued or an upload is pending
    pub fn changed(&self) -> bool {
        self.deletions_requested > 0 || self.upload.is_some()
    }

    pub fn is_failure(&self, threshold: FailureThreshold) -> bool {
        if self.failures.is_empty() {
            return false;
        }
        match threshold {
            FailureThreshold::Any => true,
            FailureThreshold::All => self.deletions_requested == 0,
        }
    }
}

/// A fatal error together with the progress made before it.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ReconcileFailure {
    pub error: EngineError,
    pub partial: ReconciliationResult,
}

/// Drives reconciliation against an archive.
pub struct ReconciliationEngine<'a> {
    archive: &'a dyn Archive,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(archive: &'a dyn Archive) -> Self {
        Self { archive }
    }

    pub fn reconcile(
        &self,
        request: &ReconcileRequest,
    ) -> Result<ReconciliationResult, ReconcileFailure> {
        let mut trail = StateTrail::new();
        let mut result = ReconciliationResult::default();

        match self.drive(request, &mut trail, &mut result) {
            Ok(()) => {
                result.states = trail.history().to_vec();
                Ok(result)
            }
            Err(error) => {
                trail.abort();
                result.states = trail.history().to_vec();
                Err(ReconcileFailure {
                    error,
                    partial: result,
                })
            }
        }
    }

    fn drive(
        &self,
        request: &ReconcileRequest,
        trail: &mut StateTrail,
        result: &mut ReconciliationResult,
    ) -> Result<(), EngineError> {
        // Bad patterns fail up front, before any archive traffic
        let matcher = request.match_spec().compile()?;

        let owner = format!("~{}", request.channel.owner);
        let channel = self.archive.lookup_channel(&owner, &request.channel.name)?;
        let name_filter = match request.match_mode {
            MatchMode::Exact => Some(request.name.as_str()),
            _ => None,
        };
        let candidates = self.archive.list_publications(&channel, name_filter, None)?;
        tracing::debug!(
            channel = %request.channel,
            candidates = candidates.len(),
            "listed candidates"
        );

        trail.transition(ReconcileState::Evaluating)?;
        let mut to_delete = Vec::new();

        for candidate in candidates {
            if !matcher.is_match(&candidate.name) {
                continue;
            }
            if !candidate.version_matches(&request.version) {
                result.messages.push(format!(
                    "{} {} left unchanged: version does not match {}",
                    candidate.name, candidate.version, request.version
                ));
                continue;
            }

            match request.intent {
                Intent::Absent if candidate.status.is_removed() => {
                    result.messages.push(format!(
                        "{} {} already {}",
                        candidate.name, candidate.version, candidate.status
                    ));
                    result.affected.push(candidate);
                }
                Intent::Absent => to_delete.push(candidate),
                Intent::Present if candidate.status == PublicationStatus::Published => {
                    result.affected.push(candidate);
                }
                Intent::Present => {
                    tracing::debug!(
                        name = %candidate.name,
                        version = %candidate.version,
                        status = %candidate.status,
                        "ignoring non-published candidate"
                    );
                }
            }
        }

        match request.intent {
            Intent::Absent if to_delete.is_empty() => {
                trail.transition(ReconcileState::NoAction)?;
            }
            Intent::Absent => {
                trail.transition(ReconcileState::Deleting)?;
                let report = request_deletions(self.archive, &to_delete, request.dry_run);
                for publication in &report.deleted {
                    result.messages.push(if request.dry_run {
                        format!("Would delete {} {}", publication.name, publication.version)
                    } else {
                        format!("Deletion requested for {} {}", publication.name, publication.version)
                    });
                }
                for failure in &report.failures {
                    result.messages.push(format!(
                        "Failed to delete {} {}: {}",
                        failure.name, failure.version, failure.message
                    ));
                }
                if !request.dry_run {
                    result.deletions_requested = report.deleted.len();
                }
                result.affected.extend(report.deleted);
                result.failures = report.failures;
            }
            Intent::Present if !result.affected.is_empty() => {
                trail.transition(ReconcileState::NoAction)?;
            }
            Intent::Present => match &request.upload_manifest {
                Some(manifest) => {
                    trail.transition(ReconcileState::AwaitingUpload)?;
                    result
                        .messages
                        .push("No matching sources. Upload required".to_string());
                    result.upload = Some(UploadDirective {
                        channel: request.channel.clone(),
                        manifest: manifest.clone(),
                    });
                }
                None => {
                    return Err(EngineError::MissingArtifact {
                        channel: request.channel.clone(),
                        name: request.name.clone(),
                        version: request.version.clone(),
                    });
                }
            },
        }

        trail.transition(ReconcileState::Done)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveOp;
    use crate::mock::{FailureConfig, MockArchive};
    use chrono::{TimeZone, Utc};

    fn setup() -> (MockArchive, ChannelRef) {
        let archive = MockArchive::new();
        let channel = archive.add_channel("~tuxinvader", "lts-mainline");
        let when = Utc.with_ymd_and_hms(2022, 9, 27, 0, 0, 0).unwrap();
        archive.publish(&channel, "linux-generic-5.19", "5.19.11", when);
        archive.publish(&channel, "linux-generic-5.19", "5.19.12", when);
        archive.publish(&channel, "linux-headers-5.19", "5.19.12", when);
        (archive, channel.reference)
    }

    #[test]
    fn test_intent_parse() {
        assert_eq!("Present".parse::<Intent>().unwrap(), Intent::Present);
        assert_eq!("ABSENT".parse::<Intent>().unwrap(), Intent::Absent);
        assert!(matches!(
            "latest".parse::<Intent>(),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_present_finds_match_without_mutation() {
        let (archive, channel) = setup();
        let request = ReconcileRequest::new(channel, "linux-generic-5.19", Intent::Present)
            .with_version("5.19.12");

        let result = ReconciliationEngine::new(&archive).reconcile(&request).unwrap();
        assert_eq!(result.affected.len(), 1);
        assert!(!result.changed());
        assert_eq!(archive.call_count(ArchiveOp::RequestDeletion), 0);
        assert_eq!(
            result.states,
            vec![
                ReconcileState::Querying,
                ReconcileState::Evaluating,
                ReconcileState::NoAction,
                ReconcileState::Done
            ]
        );
    }

    #[test]
    fn test_version_mismatch_is_informational() {
        let (archive, channel) = setup();
        let request = ReconcileRequest::new(channel, "linux-headers-5.19", Intent::Absent)
            .with_version("5.19.11");

        let result = ReconciliationEngine::new(&archive).reconcile(&request).unwrap();
        assert!(result.affected.is_empty());
        assert_eq!(result.messages.len(), 1);
        assert!(result.messages[0].contains("version does not match"));
        assert!(archive.deletion_requests().is_empty());
    }

    #[test]
    fn test_starts_with_selects_by_prefix() {
        let (archive, channel) = setup();
        let request = ReconcileRequest::new(channel, "linux-", Intent::Absent)
            .with_version("5.19.12")
            .with_match_mode(MatchMode::StartsWith);

        let result = ReconciliationEngine::new(&archive).reconcile(&request).unwrap();
        assert_eq!(result.deletions_requested, 2);
        assert_eq!(archive.deletion_requests().len(), 2);
    }

    #[test]
    fn test_invalid_regex_fails_before_queries() {
        let (archive, channel) = setup();
        let request = ReconcileRequest::new(channel, "linux-(", Intent::Absent)
            .with_match_mode(MatchMode::RegexOrLiteral);

        let failure = ReconciliationEngine::new(&archive)
            .reconcile(&request)
            .unwrap_err();
        assert!(matches!(failure.error, EngineError::InvalidInput(_)));
        assert_eq!(archive.call_count(ArchiveOp::LookupProject), 0);
        assert_eq!(failure.partial.states.last(), Some(&ReconcileState::Done));
    }

    #[test]
    fn test_dry_run_absent_reports_without_deleting() {
        let (archive, channel) = setup();
        let request =
            ReconcileRequest::new(channel, "linux-generic-5.19", Intent::Absent).with_dry_run();

        let result = ReconciliationEngine::new(&archive).reconcile(&request).unwrap();
        assert_eq!(result.affected.len(), 2);
        assert_eq!(result.deletions_requested, 0);
        assert!(!result.changed());
        assert!(archive.deletion_requests().is_empty());
    }

    #[test]
    fn test_listing_failure_returns_partial() {
        let (archive, channel) = setup();
        archive.inject_failure(ArchiveOp::ListPublications, FailureConfig::transport("reset"));
        let request = ReconcileRequest::new(channel, "linux-generic-5.19", Intent::Absent);

        let failure = ReconciliationEngine::new(&archive)
            .reconcile(&request)
            .unwrap_err();
        assert!(matches!(failure.error, EngineError::Archive(_)));
        assert!(failure.partial.affected.is_empty());
        assert_eq!(
            failure.partial.states,
            vec![ReconcileState::Querying, ReconcileState::Done]
        );
    }

    #[test]
    fn test_failure_threshold_on_result() {
        let mut result = ReconciliationResult::default();
        assert!(!result.is_failure(FailureThreshold::Any));
        result.failures.push(DeletionFailure {
            id: "x".into(),
            name: "n".into(),
            version: "v".into(),
            message: "m".into(),
        });
        assert!(result.is_failure(FailureThreshold::All));
        result.deletions_requested = 1;
        assert!(!result.is_failure(FailureThreshold::All));
        assert!(result.is_failure(FailureThreshold::Any));
    }
}
