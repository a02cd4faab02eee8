//! Failure Injection for Mock Archive
//!
//! Per-call and per-publication failures for exercising error paths.

use std::collections::HashMap;

use ppa_catalog::ArchiveError;

use crate::archive::ArchiveOp;

/// Failure configuration for an archive call
#[derive(Debug, Clone)]
pub struct FailureConfig {
    /// Error to return
    pub error: ArchiveError,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    /// Fail with an HTTP error from the service
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self {
            error: ArchiveError::Http {
                operation: String::new(),
                status,
                body: body.into(),
            },
            fail_count: None,
        }
    }

    /// Fail before reaching the service
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            error: ArchiveError::Transport(message.into()),
            fail_count: None,
        }
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }

    /// Error to hand back for a given call, with the operation filled in
    fn error_for(&self, op: ArchiveOp) -> ArchiveError {
        match &self.error {
            ArchiveError::Http { status, body, .. } => ArchiveError::Http {
                operation: op.to_string(),
                status: *status,
                body: body.clone(),
            },
            other => other.clone(),
        }
    }
}

/// Failure injector for the mock archive
#[derive(Debug, Default)]
pub struct FailureInjector {
    /// Per-operation failure configs
    configs: HashMap<ArchiveOp, FailureConfig>,
    /// Call counts per operation (for fail_count tracking)
    call_counts: HashMap<ArchiveOp, u32>,
    /// Deletion failures keyed by publication id
    deletions: HashMap<String, FailureConfig>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure for an operation
    pub fn inject(&mut self, op: ArchiveOp, config: FailureConfig) {
        self.configs.insert(op, config);
        self.call_counts.insert(op, 0);
    }

    /// Fail deletion requests for one publication only
    pub fn inject_deletion(&mut self, publication_id: impl Into<String>, config: FailureConfig) {
        self.deletions.insert(publication_id.into(), config);
    }

    /// Returns the error to raise for this call, if any
    pub fn check(&mut self, op: ArchiveOp) -> Option<ArchiveError> {
        let config = self.configs.get(&op)?;
        let count = self.call_counts.entry(op).or_insert(0);
        *count += 1;

        if let Some(limit) = config.fail_count {
            if *count > limit {
                return None;
            }
        }
        Some(config.error_for(op))
    }

    /// Returns the error to raise for deleting this publication, if any
    pub fn check_deletion(&mut self, publication_id: &str) -> Option<ArchiveError> {
        let config = self.deletions.get_mut(publication_id)?;
        if let Some(remaining) = config.fail_count {
            if remaining == 0 {
                return None;
            }
            config.fail_count = Some(remaining - 1);
        }
        Some(config.error_for(ArchiveOp::RequestDeletion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_injector_basic() {
        let mut injector = FailureInjector::new();
        assert!(injector.check(ArchiveOp::ListPublications).is_none());

        injector.inject(ArchiveOp::ListPublications, FailureConfig::http(503, "down"));
        match injector.check(ArchiveOp::ListPublications) {
            Some(ArchiveError::Http { operation, status, .. }) => {
                assert_eq!(operation, "list_publications");
                assert_eq!(status, 503);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_injector_fail_count() {
        let mut injector = FailureInjector::new();
        injector.inject(
            ArchiveOp::RequestDeletion,
            FailureConfig::transport("reset").with_fail_count(2),
        );

        assert!(injector.check(ArchiveOp::RequestDeletion).is_some());
        assert!(injector.check(ArchiveOp::RequestDeletion).is_some());
        assert!(injector.check(ArchiveOp::RequestDeletion).is_none());
    }

    #[test]
    fn test_deletion_failure_is_per_publication() {
        let mut injector = FailureInjector::new();
        injector.inject_deletion("pub/2", FailureConfig::http(500, "boom").with_fail_count(1));

        assert!(injector.check_deletion("pub/1").is_none());
        assert!(injector.check_deletion("pub/2").is_some());
        assert!(injector.check_deletion("pub/2").is_none());
    }
}
