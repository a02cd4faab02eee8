//! Build records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome state of a build attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    NeedsBuilding,
    Building,
    GatheringOutput,
    Uploading,
    Built,
    FailedToBuild,
    DependencyWait,
    ChrootProblem,
    SupersededSource,
    FailedToUpload,
    Cancelling,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl BuildState {
    /// Parse the archive's human-readable build state label.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Needs building" => BuildState::NeedsBuilding,
            "Currently building" => BuildState::Building,
            "Gathering build output" => BuildState::GatheringOutput,
            "Uploading build" => BuildState::Uploading,
            "Successfully built" => BuildState::Built,
            "Failed to build" => BuildState::FailedToBuild,
            "Dependency wait" => BuildState::DependencyWait,
            "Chroot problem" => BuildState::ChrootProblem,
            "Build for superseded Source" => BuildState::SupersededSource,
            "Failed to upload" => BuildState::FailedToUpload,
            "Cancelling build" => BuildState::Cancelling,
            "Cancelled build" => BuildState::Cancelled,
            _ => BuildState::Unknown,
        }
    }

    /// Returns true if no further state change is expected
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BuildState::Built
                | BuildState::FailedToBuild
                | BuildState::DependencyWait
                | BuildState::ChrootProblem
                | BuildState::SupersededSource
                | BuildState::FailedToUpload
                | BuildState::Cancelled
        )
    }
}

/// One build attempt for a source publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    /// Opaque identifier; ends with the numeric build id
    pub id: String,
    pub source_name: String,
    pub source_version: String,
    pub created_at: DateTime<Utc>,
    pub state: BuildState,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub arch_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl BuildRecord {
    pub fn new(
        id: impl Into<String>,
        source_name: impl Into<String>,
        source_version: impl Into<String>,
        created_at: DateTime<Utc>,
        state: BuildState,
    ) -> Self {
        Self {
            id: id.into(),
            source_name: source_name.into(),
            source_version: source_version.into(),
            created_at,
            state,
            title: String::new(),
            arch_tag: String::new(),
            finished_at: None,
        }
    }
}
