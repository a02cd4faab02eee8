//! Projects and channels (PPAs).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Owner-qualified channel reference, written `~owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelRef {
    /// Owning project or person, without the leading `~`
    pub owner: String,
    pub name: String,
}

impl ChannelRef {
    pub fn new(owner: impl AsRef<str>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.as_ref().trim_start_matches('~').to_string(),
            name: name.into(),
        }
    }

    /// Target spelling understood by upload tools (`ppa:owner/name`)
    pub fn upload_target(&self) -> String {
        format!("ppa:{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "~{}/{}", self.owner, self.name)
    }
}

impl FromStr for ChannelRef {
    type Err = ParseError;

    /// Accepts `~owner/name`, `owner/name` and `ppa:owner/name`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix("ppa:").unwrap_or(trimmed);
        match body.split_once('/') {
            Some((owner, name))
                if !owner.trim_start_matches('~').is_empty()
                    && !name.is_empty()
                    && !name.contains('/') =>
            {
                Ok(ChannelRef::new(owner, name))
            }
            _ => Err(ParseError::InvalidChannelRef(s.to_string())),
        }
    }
}

/// Lifecycle status of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelStatus {
    Active,
    Deleting,
    Deleted,
}

/// A named package repository belonging to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Stable identifier used to address mutations
    pub id: String,
    pub reference: ChannelRef,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: ChannelStatus,
}

impl Channel {
    pub fn name(&self) -> &str {
        &self.reference.name
    }

    pub fn is_active(&self) -> bool {
        self.status == ChannelStatus::Active
    }
}

/// Mutable channel fields; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ChannelUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.description.is_none()
    }
}

/// A project (or person/team) owning channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_ref_parse_forms() {
        let expected = ChannelRef::new("tuxinvader", "lts-mainline");
        assert_eq!("~tuxinvader/lts-mainline".parse::<ChannelRef>(), Ok(expected.clone()));
        assert_eq!("tuxinvader/lts-mainline".parse::<ChannelRef>(), Ok(expected.clone()));
        assert_eq!("ppa:tuxinvader/lts-mainline".parse::<ChannelRef>(), Ok(expected));
    }

    #[test]
    fn test_channel_ref_rejects_malformed() {
        assert!("lts-mainline".parse::<ChannelRef>().is_err());
        assert!("~/x".parse::<ChannelRef>().is_err());
        assert!("~a/b/c".parse::<ChannelRef>().is_err());
        assert!("~a/".parse::<ChannelRef>().is_err());
    }

    #[test]
    fn test_channel_ref_display_and_target() {
        let r = ChannelRef::new("~tuxinvader", "jammy-mainline");
        assert_eq!(r.to_string(), "~tuxinvader/jammy-mainline");
        assert_eq!(r.upload_target(), "ppa:tuxinvader/jammy-mainline");
    }

    #[test]
    fn test_channel_update_is_empty() {
        assert!(ChannelUpdate::default().is_empty());
        let update = ChannelUpdate {
            description: Some("d".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
