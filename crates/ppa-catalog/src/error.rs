//! Error types for archive collaborators.

/// Errors returned by an archive catalog or mutation call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArchiveError {
    #[error("Project '{0}' not found")]
    ProjectNotFound(String),

    #[error("PPA '{name}' not found in project '{project}'")]
    ChannelNotFound { project: String, name: String },

    #[error("Archive rejected {operation}: {message}")]
    Rejected { operation: String, message: String },

    #[error("Archive returned HTTP {status} for {operation}: {body}")]
    Http {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Archive transport error: {0}")]
    Transport(String),

    #[error("Unexpected archive response: {0}")]
    Decode(String),

    /// A listing ran past the paging limit; a partial listing is never returned
    #[error("Archive listing for {operation} exceeded {pages} pages")]
    CollectionTooLarge { operation: String, pages: usize },
}

impl ArchiveError {
    /// Lookup failures name a missing project or channel
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            ArchiveError::ProjectNotFound(_) | ArchiveError::ChannelNotFound { .. }
        )
    }
}

impl From<serde_json::Error> for ArchiveError {
    fn from(e: serde_json::Error) -> Self {
        ArchiveError::Decode(e.to_string())
    }
}

/// Errors parsing catalog values from user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown publication status '{0}'")]
    UnknownStatus(String),

    #[error("invalid PPA reference '{0}' (expected ~owner/name)")]
    InvalidChannelRef(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_errors() {
        assert!(ArchiveError::ProjectNotFound("~x".into()).is_lookup());
        assert!(ArchiveError::ChannelNotFound {
            project: "~x".into(),
            name: "y".into()
        }
        .is_lookup());
        assert!(!ArchiveError::Transport("reset".into()).is_lookup());
    }

    #[test]
    fn test_lookup_message_names_entity() {
        let err = ArchiveError::ChannelNotFound {
            project: "~tuxinvader".into(),
            name: "lts-mainline".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("lts-mainline"));
        assert!(msg.contains("~tuxinvader"));
    }
}
