//! Mock Archive
//!
//! In-process archive for exercising the engines without network access.
//!
//! # Capabilities
//!
//! - Seed projects, channels, publications and build records
//! - Deletion requests applied immediately or deferred until settled
//! - Per-operation and per-publication failure injection
//! - Call counting per operation

mod archive;
mod failure;
mod state;

pub use archive::MockArchive;
pub use failure::{FailureConfig, FailureInjector};
pub use state::{MockState, MOCK_ROOT};
