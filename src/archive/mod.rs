//! Archive Collaborator
//!
//! Abstracts the package archive service for testability. Provides:
//! - Archive trait: catalog queries and mutation requests
//! - LaunchpadArchive: the Launchpad REST API over HTTPS
//! - Session: anonymous or credentialed access
//!
//! The in-memory `MockArchive` lives in `crate::mock`.

mod launchpad;
mod session;

pub use launchpad::LaunchpadArchive;
pub use session::{Credentials, Session, SessionError, ACCESS_SECRET_ENV, ACCESS_TOKEN_ENV};

use std::fmt;

use ppa_catalog::{
    ArchiveError, BuildRecord, Channel, ChannelUpdate, Person, Project, Publication,
    PublicationStatus,
};

/// Catalog queries and mutation requests against a package archive.
///
/// Mutations are requests: the archive may apply them asynchronously, so a
/// publication whose deletion was accepted can still read as `Published`
/// on the next query.
pub trait Archive: Send + Sync {
    /// Resolve a project (or person) by name
    fn lookup_project(&self, name: &str) -> Result<Project, ArchiveError>;

    /// Search people and teams by name, display name or email
    fn find_people(&self, text: &str) -> Result<Vec<Person>, ArchiveError>;

    /// List every channel owned by a project
    fn list_channels(&self, project: &Project) -> Result<Vec<Channel>, ArchiveError>;

    /// Resolve a channel by project and channel name
    fn lookup_channel(&self, project: &str, name: &str) -> Result<Channel, ArchiveError> {
        let owner = self.lookup_project(project)?;
        self.list_channels(&owner)?
            .into_iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| ArchiveError::ChannelNotFound {
                project: project.to_string(),
                name: name.to_string(),
            })
    }

    /// List source publications, optionally narrowed by exact name and status
    fn list_publications(
        &self,
        channel: &Channel,
        name: Option<&str>,
        status: Option<PublicationStatus>,
    ) -> Result<Vec<Publication>, ArchiveError>;

    /// List build records, optionally narrowed by exact source name
    fn list_build_records(
        &self,
        channel: &Channel,
        source_name: Option<&str>,
    ) -> Result<Vec<BuildRecord>, ArchiveError>;

    /// Ask the archive to delete a publication
    fn request_deletion(&self, publication: &Publication) -> Result<(), ArchiveError>;

    /// Create a channel and return it
    fn create_channel(
        &self,
        project: &Project,
        name: &str,
        display_name: &str,
        description: &str,
    ) -> Result<Channel, ArchiveError>;

    /// Apply display name and description changes
    fn update_channel(&self, channel: &Channel, update: &ChannelUpdate) -> Result<(), ArchiveError>;

    /// Ask the archive to delete a whole channel
    fn delete_channel(&self, channel: &Channel) -> Result<(), ArchiveError>;
}

/// Archive call kinds, used for logging and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveOp {
    LookupProject,
    FindPeople,
    ListChannels,
    ListPublications,
    ListBuildRecords,
    RequestDeletion,
    CreateChannel,
    UpdateChannel,
    DeleteChannel,
}

impl ArchiveOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveOp::LookupProject => "lookup_project",
            ArchiveOp::FindPeople => "find_people",
            ArchiveOp::ListChannels => "list_channels",
            ArchiveOp::ListPublications => "list_publications",
            ArchiveOp::ListBuildRecords => "list_build_records",
            ArchiveOp::RequestDeletion => "request_deletion",
            ArchiveOp::CreateChannel => "create_channel",
            ArchiveOp::UpdateChannel => "update_channel",
            ArchiveOp::DeleteChannel => "delete_channel",
        }
    }
}

impl fmt::Display for ArchiveOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
