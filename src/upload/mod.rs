//! Source uploads
//!
//! The archive accepts new source packages through a separate upload
//! channel. An [`Uploader`] takes a `.changes` manifest and a target
//! channel and returns the files it transferred.

mod changes;

pub use changes::{ChangesEntry, ChangesError, ChangesFile};

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use ppa_catalog::ChannelRef;
use serde::Serialize;

use crate::error::EngineError;
use crate::reconcile::UploadDirective;

/// Files transferred by one upload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub target: String,
    pub count: usize,
    pub uploads: Vec<String>,
}

impl UploadReport {
    fn from_changes(target: String, changes: &ChangesFile) -> Self {
        let uploads: Vec<String> = changes
            .files()
            .iter()
            .map(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| p.display().to_string())
            })
            .collect();
        Self {
            target,
            count: uploads.len(),
            uploads,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Changes(#[from] ChangesError),

    #[error("Failed to run upload tool '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload tool '{command}' exited with {status}: {stderr}")]
    Tool {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Upload rejected: {0}")]
    Rejected(String),
}

/// Transfers a source upload to a channel.
pub trait Uploader: Send + Sync {
    fn upload(&self, manifest: &Path, channel: &ChannelRef) -> Result<UploadReport, UploadError>;
}

/// Carry out an upload directive
pub fn perform_upload(
    uploader: &dyn Uploader,
    directive: &UploadDirective,
) -> Result<UploadReport, EngineError> {
    uploader
        .upload(&directive.manifest, &directive.channel)
        .map_err(|source| EngineError::Upload {
            manifest: directive.manifest.clone(),
            source,
        })
}

/// Uploads by running `dput` (or a compatible tool).
#[derive(Debug, Clone)]
pub struct DputUploader {
    command: String,
    args: Vec<String>,
}

impl DputUploader {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    fn build_command(&self, manifest: &Path, channel: &ChannelRef) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args).arg(channel.upload_target()).arg(manifest);
        cmd
    }
}

impl Default for DputUploader {
    fn default() -> Self {
        Self::new("dput")
    }
}

impl Uploader for DputUploader {
    fn upload(&self, manifest: &Path, channel: &ChannelRef) -> Result<UploadReport, UploadError> {
        let changes = ChangesFile::load(manifest)?;
        changes.verify()?;

        tracing::info!(
            command = %self.command,
            target = %channel.upload_target(),
            manifest = %manifest.display(),
            files = changes.entries.len() + 1,
            "uploading"
        );
        let output = self
            .build_command(manifest, channel)
            .output()
            .map_err(|source| UploadError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(UploadError::Tool {
                command: self.command.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(UploadReport::from_changes(channel.upload_target(), &changes))
    }
}

/// Records uploads instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingUploader {
    uploads: Mutex<Vec<(PathBuf, ChannelRef)>>,
    reject_with: Option<String>,
}

impl RecordingUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every upload fails with this message
    pub fn rejecting(message: impl Into<String>) -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            reject_with: Some(message.into()),
        }
    }

    pub fn uploads(&self) -> Vec<(PathBuf, ChannelRef)> {
        self.uploads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Uploader for RecordingUploader {
    fn upload(&self, manifest: &Path, channel: &ChannelRef) -> Result<UploadReport, UploadError> {
        if let Some(message) = &self.reject_with {
            return Err(UploadError::Rejected(message.clone()));
        }
        let changes = ChangesFile::load(manifest)?;
        changes.verify()?;
        self.uploads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((manifest.to_path_buf(), channel.clone()));
        Ok(UploadReport::from_changes(channel.upload_target(), &changes))
    }
}
