//! Archive catalog model.
//!
//! Types owned by the remote archive service: people, projects, channels,
//! source publications and build records. The retention and reconciliation engine
//! only reads these and asks the archive to mutate them.

pub mod build;
pub mod channel;
pub mod error;
pub mod person;
pub mod publication;

pub use build::{BuildRecord, BuildState};
pub use channel::{Channel, ChannelRef, ChannelStatus, ChannelUpdate, Project};
pub use error::{ArchiveError, ParseError};
pub use person::Person;
pub use publication::{Publication, PublicationStatus};

/// Version wildcard meaning "any version".
pub const ANY_VERSION: &str = "*";
