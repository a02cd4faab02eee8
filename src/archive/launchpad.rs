//! Launchpad REST adapter.
//!
//! Talks to the `devel` web service with blocking HTTPS requests. Wire
//! shapes stay private to this module and are mapped into catalog types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use ppa_catalog::{
    ArchiveError, BuildRecord, BuildState, Channel, ChannelRef, ChannelStatus, ChannelUpdate,
    Person, Project, Publication, PublicationStatus,
};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::AUTHORIZATION;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{Archive, Session};

/// Hard stop for collection paging
const MAX_PAGES: usize = 200;

/// Archive backed by the Launchpad web service.
pub struct LaunchpadArchive {
    client: Client,
    service_root: String,
    /// OAuth realm: origin of the service root
    realm: String,
    session: Session,
}

impl LaunchpadArchive {
    pub fn new(
        service_root: &str,
        timeout: Duration,
        session: Session,
    ) -> Result<Self, ArchiveError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}/{}", session.consumer(), env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ArchiveError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            service_root: service_root.trim_end_matches('/').to_string(),
            realm: oauth_realm(service_root)?,
            session,
        })
    }

    pub fn service_root(&self) -> &str {
        &self.service_root
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    fn send(&self, operation: &str, req: RequestBuilder) -> Result<Response, ArchiveError> {
        let req = match self.session.authorization_header(&self.realm) {
            Some(header) => req.header(AUTHORIZATION, header),
            None => req,
        };
        tracing::debug!(operation, "archive request");

        let response = req
            .send()
            .map_err(|e| ArchiveError::Transport(format!("{operation}: {e}")))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            Err(ArchiveError::Http {
                operation: operation.to_string(),
                status: status.as_u16(),
                body,
            })
        }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ArchiveError> {
        let response = self.send(operation, self.client.get(url).query(query))?;
        let text = response
            .text()
            .map_err(|e| ArchiveError::Transport(format!("{operation}: {e}")))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Fetch every page of a collection
    fn get_collection<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, ArchiveError> {
        let first: WireCollection<T> = self.get_json(operation, url, query)?;
        // Continuation links already carry the query string
        collect_pages(operation, first, MAX_PAGES, |link| {
            self.get_json(operation, link, &[])
        })
    }

    fn post_op(&self, operation: &str, url: &str, form: &[(&str, &str)]) -> Result<(), ArchiveError> {
        self.send(operation, self.client.post(url).form(form))?;
        Ok(())
    }
}

impl Archive for LaunchpadArchive {
    fn lookup_project(&self, name: &str) -> Result<Project, ArchiveError> {
        let url = format!("{}/{}", self.service_root, name);
        match self.get_json::<WirePerson>("lookup_project", &url, &[]) {
            Ok(person) => Ok(Project {
                id: person.self_link,
                name: name.to_string(),
                display_name: person.display_name,
            }),
            Err(ArchiveError::Http { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Err(ArchiveError::ProjectNotFound(name.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    fn find_people(&self, text: &str) -> Result<Vec<Person>, ArchiveError> {
        let url = format!("{}/people", self.service_root);
        let people: Vec<WirePerson> =
            self.get_collection("find_people", &url, &[("ws.op", "find"), ("text", text)])?;
        Ok(people.into_iter().map(Person::from).collect())
    }

    fn list_channels(&self, project: &Project) -> Result<Vec<Channel>, ArchiveError> {
        let url = format!("{}/ppas", project.id);
        let ppas: Vec<WireArchive> = self.get_collection("list_channels", &url, &[])?;
        Ok(ppas
            .into_iter()
            .map(|ppa| ppa.into_channel(&project.name))
            .collect())
    }

    fn list_publications(
        &self,
        channel: &Channel,
        name: Option<&str>,
        status: Option<PublicationStatus>,
    ) -> Result<Vec<Publication>, ArchiveError> {
        let mut query = vec![("ws.op", "getPublishedSources")];
        if let Some(name) = name {
            query.push(("source_name", name));
            query.push(("exact_match", "true"));
        }
        if let Some(status) = status {
            query.push(("status", status.as_str()));
        }

        let sources: Vec<WireSourcePublication> =
            self.get_collection("list_publications", &channel.id, &query)?;
        Ok(sources.into_iter().map(Publication::from).collect())
    }

    fn list_build_records(
        &self,
        channel: &Channel,
        source_name: Option<&str>,
    ) -> Result<Vec<BuildRecord>, ArchiveError> {
        let mut query = vec![("ws.op", "getBuildRecords")];
        if let Some(name) = source_name {
            query.push(("source_name", name));
        }

        let builds: Vec<WireBuild> = self.get_collection("list_build_records", &channel.id, &query)?;
        Ok(builds.into_iter().map(BuildRecord::from).collect())
    }

    fn request_deletion(&self, publication: &Publication) -> Result<(), ArchiveError> {
        self.post_op(
            "request_deletion",
            &publication.id,
            &[("ws.op", "requestDeletion")],
        )
    }

    fn create_channel(
        &self,
        project: &Project,
        name: &str,
        display_name: &str,
        description: &str,
    ) -> Result<Channel, ArchiveError> {
        self.post_op(
            "create_channel",
            &project.id,
            &[
                ("ws.op", "createPPA"),
                ("name", name),
                ("displayname", display_name),
                ("description", description),
            ],
        )?;
        // createPPA answers with a redirect to the new archive, not its body
        self.list_channels(project)?
            .into_iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| ArchiveError::Rejected {
                operation: "create_channel".to_string(),
                message: format!("PPA '{name}' was not listed after creation"),
            })
    }

    fn update_channel(&self, channel: &Channel, update: &ChannelUpdate) -> Result<(), ArchiveError> {
        if update.is_empty() {
            return Ok(());
        }
        let patch = WireArchivePatch {
            displayname: update.display_name.as_deref(),
            description: update.description.as_deref(),
        };
        self.send(
            "update_channel",
            self.client.patch(&channel.id).json(&patch),
        )?;
        Ok(())
    }

    fn delete_channel(&self, channel: &Channel) -> Result<(), ArchiveError> {
        self.send("delete_channel", self.client.delete(&channel.id))?;
        Ok(())
    }
}

/// `https://api.launchpad.net/devel` signs as `https://api.launchpad.net/`
fn oauth_realm(service_root: &str) -> Result<String, ArchiveError> {
    let url = Url::parse(service_root)
        .map_err(|e| ArchiveError::Transport(format!("Invalid service root '{service_root}': {e}")))?;
    if !url.has_host() {
        return Err(ArchiveError::Transport(format!(
            "Invalid service root '{service_root}': no host"
        )));
    }
    Ok(format!("{}/", url.origin().ascii_serialization()))
}

/// Concatenate a collection and its continuation pages.
///
/// Callers make deletion decisions on the whole listing, so running past
/// `max_pages` is an error rather than a truncated result.
fn collect_pages<T, F>(
    operation: &str,
    first: WireCollection<T>,
    max_pages: usize,
    mut fetch: F,
) -> Result<Vec<T>, ArchiveError>
where
    F: FnMut(&str) -> Result<WireCollection<T>, ArchiveError>,
{
    let mut entries = first.entries;
    let mut next = first.next_collection_link;
    let mut pages = 1;

    while let Some(link) = next {
        if pages >= max_pages {
            tracing::error!(operation, pages, "collection paging limit reached");
            return Err(ArchiveError::CollectionTooLarge {
                operation: operation.to_string(),
                pages,
            });
        }
        let page = fetch(&link)?;
        entries.extend(page.entries);
        next = page.next_collection_link;
        pages += 1;
    }

    Ok(entries)
}

// === Wire shapes ===

#[derive(Debug, Deserialize)]
struct WireCollection<T> {
    #[serde(default = "Vec::new")]
    entries: Vec<T>,
    #[serde(default)]
    next_collection_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePerson {
    self_link: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    is_team: bool,
    #[serde(default)]
    karma: i64,
    #[serde(default)]
    date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    web_link: Option<String>,
}

impl From<WirePerson> for Person {
    fn from(w: WirePerson) -> Self {
        Person {
            id: w.self_link,
            name: w.name,
            display_name: w.display_name,
            is_team: w.is_team,
            karma: w.karma,
            date_created: w.date_created,
            description: w.description.filter(|d| !d.is_empty()),
            web_link: w.web_link,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireArchive {
    self_link: String,
    name: String,
    #[serde(default)]
    displayname: String,
    #[serde(default)]
    description: Option<String>,
    status: ChannelStatus,
}

impl WireArchive {
    fn into_channel(self, project: &str) -> Channel {
        Channel {
            id: self.self_link,
            reference: ChannelRef::new(project, self.name),
            display_name: self.displayname,
            description: self.description,
            status: self.status,
        }
    }
}

#[derive(Debug, Serialize)]
struct WireArchivePatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    displayname: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct WireSourcePublication {
    self_link: String,
    source_package_name: String,
    source_package_version: String,
    #[serde(default)]
    date_published: Option<DateTime<Utc>>,
    #[serde(default)]
    date_created: Option<DateTime<Utc>>,
    status: PublicationStatus,
    #[serde(default)]
    display_name: Option<String>,
}

impl From<WireSourcePublication> for Publication {
    fn from(w: WireSourcePublication) -> Self {
        Publication {
            id: w.self_link,
            name: w.source_package_name,
            version: w.source_package_version,
            date_published: w.date_published,
            date_created: w.date_created,
            status: w.status,
            display_name: w.display_name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireBuild {
    self_link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    arch_tag: String,
    buildstate: String,
    datecreated: DateTime<Utc>,
    #[serde(default)]
    datebuilt: Option<DateTime<Utc>>,
    #[serde(default)]
    source_package_name: Option<String>,
    #[serde(default)]
    source_package_version: Option<String>,
}

impl From<WireBuild> for BuildRecord {
    fn from(w: WireBuild) -> Self {
        BuildRecord {
            id: w.self_link,
            source_name: w.source_package_name.unwrap_or_default(),
            source_version: w.source_package_version.unwrap_or_default(),
            created_at: w.datecreated,
            state: BuildState::from_label(&w.buildstate),
            title: w.title,
            arch_tag: w.arch_tag,
            finished_at: w.datebuilt,
        }
    }
}
