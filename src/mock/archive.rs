//! Mock Archive Implementation
//!
//! Configurable in-process archive for tests and dry experiments.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use ppa_catalog::{
    ArchiveError, BuildRecord, BuildState, Channel, ChannelStatus, ChannelUpdate, Person,
    Project, Publication, PublicationStatus,
};

use crate::archive::{Archive, ArchiveOp};

use super::failure::{FailureConfig, FailureInjector};
use super::state::MockState;

/// In-memory archive with failure injection.
///
/// Cloning shares the underlying catalog.
#[derive(Clone, Default)]
pub struct MockArchive {
    state: Arc<Mutex<MockState>>,
    failures: Arc<Mutex<FailureInjector>>,
    calls: Arc<Mutex<HashMap<ArchiveOp, u32>>>,
}

impl MockArchive {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn failures(&self) -> MutexGuard<'_, FailureInjector> {
        self.failures.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enter(&self, op: ArchiveOp) -> Result<(), ArchiveError> {
        *self
            .calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(op)
            .or_insert(0) += 1;
        match self.failures().check(op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    // === Public API for test configuration ===

    pub fn add_project(&self, name: &str) -> Project {
        self.state().ensure_project(name)
    }

    /// Register a person account; `name` is given without the `~`
    pub fn add_person(&self, name: &str, display_name: &str) -> Person {
        self.state().insert_person(name, display_name)
    }

    /// Add an active channel, creating its project on first use
    pub fn add_channel(&self, project: &str, name: &str) -> Channel {
        let mut state = self.state();
        let owner = state.ensure_project(project);
        state.insert_channel(&owner, name, name, None)
    }

    /// Add a `Published` publication and return it
    pub fn publish(
        &self,
        channel: &Channel,
        name: &str,
        version: &str,
        date_published: DateTime<Utc>,
    ) -> Publication {
        self.add_publication(
            channel,
            Publication::new("", name, version, PublicationStatus::Published)
                .with_date_published(date_published),
        )
    }

    /// Add a publication as given; an empty id is replaced with a generated one
    pub fn add_publication(&self, channel: &Channel, mut publication: Publication) -> Publication {
        let mut state = self.state();
        if publication.id.is_empty() {
            let serial = state.next_serial();
            publication.id = format!("{}/+sourcepub/{serial}", channel.id);
        }
        state
            .publications
            .entry(channel.id.clone())
            .or_default()
            .push(publication.clone());
        publication
    }

    /// Add a build record with a generated `+build/<n>` id
    pub fn add_build(
        &self,
        channel: &Channel,
        source_name: &str,
        source_version: &str,
        created_at: DateTime<Utc>,
        state: BuildState,
    ) -> BuildRecord {
        let mut guard = self.state();
        let serial = guard.next_serial();
        let record = BuildRecord::new(
            format!("{}/+build/{serial}", channel.id),
            source_name,
            source_version,
            created_at,
            state,
        );
        guard
            .builds
            .entry(channel.id.clone())
            .or_default()
            .push(record.clone());
        record
    }

    /// Current publications of a channel, any status
    pub fn publications(&self, channel: &Channel) -> Vec<Publication> {
        self.state()
            .publications
            .get(&channel.id)
            .cloned()
            .unwrap_or_default()
    }

    /// Current state of every channel owned by `project`
    pub fn channels(&self, project: &str) -> Vec<Channel> {
        self.state()
            .channels
            .iter()
            .filter(|c| c.reference.owner == project.trim_start_matches('~'))
            .cloned()
            .collect()
    }

    /// Publication ids whose deletion was accepted, in request order
    pub fn deletion_requests(&self) -> Vec<String> {
        self.state().deletion_requests.clone()
    }

    /// Number of calls made for an operation, failed ones included
    pub fn call_count(&self, op: ArchiveOp) -> u32 {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    /// Accept deletions without changing status until `settle_deletions`
    pub fn defer_deletions(&self, defer: bool) {
        self.state().defer_deletions = defer;
    }

    /// Apply accepted deletions that were deferred
    pub fn settle_deletions(&self) {
        let mut state = self.state();
        let pending = std::mem::take(&mut state.pending_deletions);
        for id in pending {
            if let Some(p) = state.publication_mut(&id) {
                p.status = PublicationStatus::Deleted;
            }
        }
    }

    pub fn inject_failure(&self, op: ArchiveOp, config: FailureConfig) {
        self.failures().inject(op, config);
    }

    /// Fail deletion requests for a single publication
    pub fn fail_deletion_of(&self, publication_id: &str, config: FailureConfig) {
        self.failures().inject_deletion(publication_id, config);
    }
}

impl Archive for MockArchive {
    fn lookup_project(&self, name: &str) -> Result<Project, ArchiveError> {
        self.enter(ArchiveOp::LookupProject)?;
        self.state()
            .project(name)
            .cloned()
            .ok_or_else(|| ArchiveError::ProjectNotFound(name.to_string()))
    }

    fn find_people(&self, text: &str) -> Result<Vec<Person>, ArchiveError> {
        self.enter(ArchiveOp::FindPeople)?;
        Ok(self
            .state()
            .people
            .iter()
            .filter(|p| p.matches_text(text))
            .cloned()
            .collect())
    }

    fn list_channels(&self, project: &Project) -> Result<Vec<Channel>, ArchiveError> {
        self.enter(ArchiveOp::ListChannels)?;
        let owner = project.name.trim_start_matches('~');
        Ok(self
            .state()
            .channels
            .iter()
            .filter(|c| c.reference.owner == owner)
            .cloned()
            .collect())
    }

    fn list_publications(
        &self,
        channel: &Channel,
        name: Option<&str>,
        status: Option<PublicationStatus>,
    ) -> Result<Vec<Publication>, ArchiveError> {
        self.enter(ArchiveOp::ListPublications)?;
        let state = self.state();
        let pubs = state.publications.get(&channel.id).map(Vec::as_slice).unwrap_or(&[]);
        Ok(pubs
            .iter()
            .filter(|p| name.map_or(true, |n| p.name == n))
            .filter(|p| status.map_or(true, |s| p.status == s))
            .cloned()
            .collect())
    }

    fn list_build_records(
        &self,
        channel: &Channel,
        source_name: Option<&str>,
    ) -> Result<Vec<BuildRecord>, ArchiveError> {
        self.enter(ArchiveOp::ListBuildRecords)?;
        let state = self.state();
        let builds = state.builds.get(&channel.id).map(Vec::as_slice).unwrap_or(&[]);
        Ok(builds
            .iter()
            .filter(|b| source_name.map_or(true, |n| b.source_name == n))
            .cloned()
            .collect())
    }

    fn request_deletion(&self, publication: &Publication) -> Result<(), ArchiveError> {
        self.enter(ArchiveOp::RequestDeletion)?;
        if let Some(err) = self.failures().check_deletion(&publication.id) {
            return Err(err);
        }

        let mut state = self.state();
        let defer = state.defer_deletions;
        match state.publication_mut(&publication.id) {
            Some(p) => {
                if !defer {
                    p.status = PublicationStatus::Deleted;
                }
            }
            None => {
                return Err(ArchiveError::Rejected {
                    operation: ArchiveOp::RequestDeletion.to_string(),
                    message: format!("no publication at {}", publication.id),
                })
            }
        }
        if defer {
            state.pending_deletions.push(publication.id.clone());
        }
        state.deletion_requests.push(publication.id.clone());
        Ok(())
    }

    fn create_channel(
        &self,
        project: &Project,
        name: &str,
        display_name: &str,
        description: &str,
    ) -> Result<Channel, ArchiveError> {
        self.enter(ArchiveOp::CreateChannel)?;
        let mut state = self.state();
        let owner = project.name.trim_start_matches('~');
        if state
            .channels
            .iter()
            .any(|c| c.reference.owner == owner && c.name() == name)
        {
            return Err(ArchiveError::Rejected {
                operation: ArchiveOp::CreateChannel.to_string(),
                message: format!("PPA '{name}' already exists"),
            });
        }
        Ok(state.insert_channel(project, name, display_name, Some(description.to_string())))
    }

    fn update_channel(&self, channel: &Channel, update: &ChannelUpdate) -> Result<(), ArchiveError> {
        self.enter(ArchiveOp::UpdateChannel)?;
        let mut state = self.state();
        let stored = state
            .channel_mut(&channel.id)
            .ok_or_else(|| ArchiveError::ChannelNotFound {
                project: channel.reference.owner.clone(),
                name: channel.name().to_string(),
            })?;
        if let Some(display_name) = &update.display_name {
            stored.display_name = display_name.clone();
        }
        if let Some(description) = &update.description {
            stored.description = Some(description.clone());
        }
        Ok(())
    }

    fn delete_channel(&self, channel: &Channel) -> Result<(), ArchiveError> {
        self.enter(ArchiveOp::DeleteChannel)?;
        let mut state = self.state();
        let stored = state
            .channel_mut(&channel.id)
            .ok_or_else(|| ArchiveError::ChannelNotFound {
                project: channel.reference.owner.clone(),
                name: channel.name().to_string(),
            })?;
        stored.status = ChannelStatus::Deleted;
        Ok(())
    }
}
