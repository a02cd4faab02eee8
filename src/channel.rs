//! Channel management and catalog inspection.

use ppa_catalog::{
    ArchiveError, Channel, ChannelUpdate, Project, Publication, PublicationStatus,
};
use serde::Serialize;

use crate::archive::Archive;
use crate::error::EngineError;
use crate::reconcile::Intent;

/// A channel and its live publications
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelDetails {
    #[serde(flatten)]
    pub channel: Channel,
    pub sources: Vec<Publication>,
}

/// A project and every channel it owns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectDetails {
    #[serde(flatten)]
    pub project: Project,
    pub channels: Vec<Channel>,
}

/// Desired state of one channel.
#[derive(Debug, Clone)]
pub struct EnsureChannelRequest {
    pub project: String,
    pub name: String,
    pub intent: Intent,
    pub display_name: String,
    pub description: String,
    pub dry_run: bool,
}

impl EnsureChannelRequest {
    /// Request with the default display name and description for `name`
    pub fn new(project: impl Into<String>, name: impl Into<String>, intent: Intent) -> Self {
        let name = name.into();
        Self {
            project: project.into(),
            display_name: name.clone(),
            description: default_description(&name),
            name,
            intent,
            dry_run: false,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

pub fn default_description(name: &str) -> String {
    format!("A PPA Hosting packages related to {name}")
}

/// What `ensure_channel` did (or would do in dry-run)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelAction {
    Created,
    Updated,
    Deleted,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsureChannelOutcome {
    pub action: ChannelAction,
    pub changed: bool,
    /// Channel state after the call, when it still exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ChannelDetails>,
}

/// Create, update or delete a channel so it matches the request.
pub fn ensure_channel(
    archive: &dyn Archive,
    request: &EnsureChannelRequest,
) -> Result<EnsureChannelOutcome, EngineError> {
    let project = archive.lookup_project(&request.project)?;
    let existing = find_channel(archive, &project, &request.name)?;

    let action = match (existing, request.intent) {
        (Some(channel), Intent::Absent) => {
            if !channel.is_active() {
                ChannelAction::Unchanged
            } else {
                if !request.dry_run {
                    archive.delete_channel(&channel)?;
                }
                tracing::info!(channel = %channel.reference, dry_run = request.dry_run, "PPA deleted");
                ChannelAction::Deleted
            }
        }
        (Some(channel), Intent::Present) => {
            if !channel.is_active() {
                return Err(EngineError::invalid_input(format!(
                    "PPA {} is {:?} and cannot be updated",
                    channel.reference, channel.status
                )));
            }
            let update = diff(&channel, request);
            if update.is_empty() {
                ChannelAction::Unchanged
            } else {
                if !request.dry_run {
                    archive.update_channel(&channel, &update)?;
                }
                tracing::info!(channel = %channel.reference, dry_run = request.dry_run, "PPA updated");
                ChannelAction::Updated
            }
        }
        (None, Intent::Present) => {
            if !request.dry_run {
                archive.create_channel(
                    &project,
                    &request.name,
                    &request.display_name,
                    &request.description,
                )?;
            }
            tracing::info!(
                project = %request.project,
                name = %request.name,
                dry_run = request.dry_run,
                "PPA created"
            );
            ChannelAction::Created
        }
        (None, Intent::Absent) => ChannelAction::Unchanged,
    };

    let changed = !request.dry_run && action != ChannelAction::Unchanged;
    let details = match find_channel(archive, &project, &request.name)? {
        Some(channel) if channel.is_active() => Some(channel_details(archive, channel)?),
        Some(channel) => Some(ChannelDetails {
            channel,
            sources: Vec::new(),
        }),
        None => None,
    };

    Ok(EnsureChannelOutcome {
        action,
        changed,
        details,
    })
}

/// Describe a channel and its live publications.
pub fn channel_info(
    archive: &dyn Archive,
    project: &str,
    name: &str,
) -> Result<ChannelDetails, EngineError> {
    let channel = archive.lookup_channel(project, name)?;
    channel_details(archive, channel)
}

/// Describe a project and its channels.
pub fn project_info(archive: &dyn Archive, project: &str) -> Result<ProjectDetails, EngineError> {
    let project = archive.lookup_project(project)?;
    let channels = archive.list_channels(&project)?;
    Ok(ProjectDetails { project, channels })
}

fn channel_details(archive: &dyn Archive, channel: Channel) -> Result<ChannelDetails, EngineError> {
    let sources = archive.list_publications(&channel, None, Some(PublicationStatus::Published))?;
    Ok(ChannelDetails { channel, sources })
}

fn find_channel(
    archive: &dyn Archive,
    project: &Project,
    name: &str,
) -> Result<Option<Channel>, EngineError> {
    match archive.lookup_channel(&project.name, name) {
        Ok(channel) => Ok(Some(channel)),
        Err(ArchiveError::ChannelNotFound { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn diff(channel: &Channel, request: &EnsureChannelRequest) -> ChannelUpdate {
    ChannelUpdate {
        display_name: (channel.display_name != request.display_name)
            .then(|| request.display_name.clone()),
        description: (channel.description.as_deref() != Some(request.description.as_str()))
            .then(|| request.description.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockArchive;

    #[test]
    fn test_default_description() {
        let request = EnsureChannelRequest::new("~t", "jammy-mainline", Intent::Present);
        assert_eq!(request.display_name, "jammy-mainline");
        assert_eq!(
            request.description,
            "A PPA Hosting packages related to jammy-mainline"
        );
    }

    #[test]
    fn test_diff_only_changed_fields() {
        let archive = MockArchive::new();
        let project = archive.add_project("~t");
        let channel = archive
            .create_channel(&project, "c", "c", &default_description("c"))
            .unwrap();

        let same = EnsureChannelRequest::new("~t", "c", Intent::Present);
        assert!(diff(&channel, &same).is_empty());

        let renamed = same.with_display_name("Shiny");
        let update = diff(&channel, &renamed);
        assert_eq!(update.display_name.as_deref(), Some("Shiny"));
        assert!(update.description.is_none());
    }

    #[test]
    fn test_unknown_project_is_lookup_error() {
        let archive = MockArchive::new();
        let request = EnsureChannelRequest::new("~ghost", "c", Intent::Present);
        assert!(matches!(
            ensure_channel(&archive, &request),
            Err(EngineError::Lookup(_))
        ));
    }
}
