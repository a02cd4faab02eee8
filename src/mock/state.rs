//! Mock Archive State
//!
//! In-memory catalog of projects, channels, publications and builds.

use std::collections::HashMap;

use ppa_catalog::{
    BuildRecord, Channel, ChannelRef, ChannelStatus, Person, Project, Publication,
};

/// Base of every identifier the mock hands out
pub const MOCK_ROOT: &str = "https://archive.mock/devel";

/// Mutable mock catalog
#[derive(Debug, Default)]
pub struct MockState {
    pub people: Vec<Person>,
    pub projects: Vec<Project>,
    pub channels: Vec<Channel>,
    /// Publications per channel id, in insertion order
    pub publications: HashMap<String, Vec<Publication>>,
    /// Build records per channel id
    pub builds: HashMap<String, Vec<BuildRecord>>,
    /// Publication ids whose deletion was accepted, in request order
    pub deletion_requests: Vec<String>,
    /// Accepted deletions not yet reflected in publication status
    pub pending_deletions: Vec<String>,
    /// Leave statuses untouched until `settle_deletions`
    pub defer_deletions: bool,
    next_serial: u64,
}

impl MockState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_serial(&mut self) -> u64 {
        self.next_serial += 1;
        self.next_serial
    }

    pub fn project(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.name == name)
    }

    pub fn ensure_project(&mut self, name: &str) -> Project {
        if let Some(p) = self.project(name) {
            return p.clone();
        }
        let project = Project {
            id: format!("{MOCK_ROOT}/{name}"),
            name: name.to_string(),
            display_name: name.trim_start_matches('~').to_string(),
        };
        self.projects.push(project.clone());
        project
    }

    pub fn insert_person(&mut self, name: &str, display_name: &str) -> Person {
        let person = Person::new(format!("{MOCK_ROOT}/~{name}"), name, display_name);
        self.people.push(person.clone());
        person
    }

    pub fn channel_mut(&mut self, id: &str) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| c.id == id)
    }

    pub fn insert_channel(
        &mut self,
        project: &Project,
        name: &str,
        display_name: &str,
        description: Option<String>,
    ) -> Channel {
        let channel = Channel {
            id: format!("{}/+archive/ubuntu/{name}", project.id),
            reference: ChannelRef::new(&project.name, name),
            display_name: display_name.to_string(),
            description,
            status: ChannelStatus::Active,
        };
        self.channels.push(channel.clone());
        channel
    }

    pub fn publication_mut(&mut self, id: &str) -> Option<&mut Publication> {
        self.publications
            .values_mut()
            .flat_map(|pubs| pubs.iter_mut())
            .find(|p| p.id == id)
    }
}
