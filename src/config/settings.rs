//! Typed view of the merged configuration.

use std::fmt;
use std::time::Duration;

use ppa_version::SchemeKind;
use serde::Deserialize;

use crate::archive::{Credentials, SessionError};
use crate::retention::{FailureThreshold, OrderBy, RetentionPolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub archive: ArchiveSettings,
    pub retention: RetentionSettings,
    pub builds: BuildSettings,
    pub upload: UploadSettings,
    #[serde(default)]
    pub credentials: CredentialSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveSettings {
    pub service_root: String,
    pub consumer: String,
    pub timeout_seconds: u64,
}

impl ArchiveSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetentionSettings {
    pub max_sources: usize,
    pub order_by: OrderBy,
    pub version_scheme: SchemeKind,
    pub failure_threshold: FailureThreshold,
}

impl RetentionSettings {
    pub fn policy(&self) -> RetentionPolicy {
        RetentionPolicy::keep_last_n(self.max_sources)
            .ordered_by(self.order_by)
            .with_scheme(self.version_scheme)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildSettings {
    pub time_frame_minutes: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Clone, Default, Deserialize)]
pub struct CredentialSettings {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
}

impl CredentialSettings {
    pub fn resolve(&self) -> Result<Option<Credentials>, SessionError> {
        Credentials::from_parts(self.token.clone(), self.secret.clone())
    }
}

impl fmt::Debug for CredentialSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSettings")
            .field("token", &self.token)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
