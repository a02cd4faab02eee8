//! Source package publications.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Lifecycle status of a publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PublicationStatus {
    /// Accepted, not yet published
    Pending,
    /// Live in the channel
    Published,
    /// Replaced by a newer version
    Superseded,
    /// Deletion requested
    Deleted,
    /// Removed from disk after deletion or supersession
    Obsolete,
}

impl PublicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublicationStatus::Pending => "Pending",
            PublicationStatus::Published => "Published",
            PublicationStatus::Superseded => "Superseded",
            PublicationStatus::Deleted => "Deleted",
            PublicationStatus::Obsolete => "Obsolete",
        }
    }

    /// Counts against a channel's retention cap
    pub fn is_live(&self) -> bool {
        matches!(self, PublicationStatus::Published)
    }

    /// A deletion has already been accepted for this publication
    pub fn is_removed(&self) -> bool {
        matches!(self, PublicationStatus::Deleted | PublicationStatus::Obsolete)
    }
}

impl fmt::Display for PublicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublicationStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(PublicationStatus::Pending),
            "published" => Ok(PublicationStatus::Published),
            "superseded" => Ok(PublicationStatus::Superseded),
            "deleted" => Ok(PublicationStatus::Deleted),
            "obsolete" => Ok(PublicationStatus::Obsolete),
            _ => Err(ParseError::UnknownStatus(s.to_string())),
        }
    }
}

/// One published instance of a source package version in a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    /// Stable identifier used to address mutations
    pub id: String,
    /// Source package name
    pub name: String,
    /// Raw version string
    pub version: String,
    /// Publish time (absent while pending)
    #[serde(default)]
    pub date_published: Option<DateTime<Utc>>,
    /// Creation time of the publication record
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    pub status: PublicationStatus,
    /// Human-readable label, e.g. "linux-generic-5.19 5.19.11 in focal"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Publication {
    /// Create a publication record with only the required fields set
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        status: PublicationStatus,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            date_published: None,
            date_created: None,
            status,
            display_name: None,
        }
    }

    pub fn with_date_published(mut self, date: DateTime<Utc>) -> Self {
        self.date_published = Some(date);
        if self.date_created.is_none() {
            self.date_created = Some(date);
        }
        self
    }

    /// True when `version` is the wildcard or equals this publication's version
    pub fn version_matches(&self, version: &str) -> bool {
        version == crate::ANY_VERSION || self.version == version
    }
}
