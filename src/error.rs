//! Engine error taxonomy.
//!
//! Fatal errors only. Per-item deletion failures are not errors at this
//! level: they are collected on the result and the loop continues.

use std::path::PathBuf;

use ppa_catalog::{ArchiveError, ChannelRef};

use crate::archive::SessionError;
use crate::upload::UploadError;

/// Fatal failure of an engine operation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Unknown intent, order-by, match mode, status or scheme; bad pattern
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Project or channel does not exist
    #[error("{0}")]
    Lookup(ArchiveError),

    /// Asked to ensure presence with nothing to upload
    #[error(
        "The source package {name} {version} is not present on {channel} and no source .changes file was supplied to upload"
    )]
    MissingArtifact {
        channel: ChannelRef,
        name: String,
        version: String,
    },

    /// Unrecoverable collaborator failure
    #[error("Archive error: {0}")]
    Archive(ArchiveError),

    #[error("Upload of {manifest} failed: {source}")]
    Upload {
        manifest: PathBuf,
        #[source]
        source: UploadError,
    },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

impl EngineError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        EngineError::InvalidInput(message.into())
    }

    /// Short machine-readable kind, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidInput(_) => "invalid_input",
            EngineError::Lookup(_) => "lookup",
            EngineError::MissingArtifact { .. } => "missing_artifact",
            EngineError::Archive(_) => "archive",
            EngineError::Upload { .. } => "upload",
            EngineError::Session(_) => "session",
            EngineError::InvalidTransition { .. } => "internal",
        }
    }
}

impl From<ArchiveError> for EngineError {
    fn from(e: ArchiveError) -> Self {
        if e.is_lookup() {
            EngineError::Lookup(e)
        } else {
            EngineError::Archive(e)
        }
    }
}

impl From<ppa_version::MatchError> for EngineError {
    fn from(e: ppa_version::MatchError) -> Self {
        EngineError::InvalidInput(e.to_string())
    }
}

impl From<ppa_version::UnknownScheme> for EngineError {
    fn from(e: ppa_version::UnknownScheme) -> Self {
        EngineError::InvalidInput(e.to_string())
    }
}

impl From<ppa_catalog::ParseError> for EngineError {
    fn from(e: ppa_catalog::ParseError) -> Self {
        EngineError::InvalidInput(e.to_string())
    }
}
