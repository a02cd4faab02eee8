//! Build activity filtering.

use chrono::{DateTime, Duration, Utc};
use ppa_catalog::{BuildRecord, ChannelRef};
use serde::{Deserialize, Serialize};

use crate::archive::Archive;
use crate::error::EngineError;

/// Default recency window: one week
pub const DEFAULT_WINDOW_MINUTES: u32 = 168;

/// Which build records to return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildQuery {
    /// Identifier suffix; selects a single record and ignores the other filters
    pub build_id: Option<String>,
    /// Exact source version
    pub version: Option<String>,
    pub window_minutes: u32,
}

impl Default for BuildQuery {
    fn default() -> Self {
        Self {
            build_id: None,
            version: None,
            window_minutes: DEFAULT_WINDOW_MINUTES,
        }
    }
}

/// Filter build records.
///
/// With `build_id`, returns the first record whose identifier ends with it.
/// Otherwise keeps records matching `version` (when set) created no more
/// than `window_minutes` before `now`.
pub fn filter_builds(
    records: &[BuildRecord],
    build_id: Option<&str>,
    version: Option<&str>,
    window_minutes: u32,
    now: DateTime<Utc>,
) -> Vec<BuildRecord> {
    if let Some(id) = build_id {
        return records
            .iter()
            .find(|r| r.id.ends_with(id))
            .cloned()
            .into_iter()
            .collect();
    }

    let window = Duration::minutes(i64::from(window_minutes));
    records
        .iter()
        .filter(|r| version.map_or(true, |v| r.source_version == v))
        .filter(|r| now.signed_duration_since(r.created_at) <= window)
        .cloned()
        .collect()
}

/// Build activity of one source package in one channel.
pub fn query_builds(
    archive: &dyn Archive,
    channel: &ChannelRef,
    source_name: &str,
    query: &BuildQuery,
) -> Result<Vec<BuildRecord>, EngineError> {
    let owner = format!("~{}", channel.owner);
    let resolved = archive.lookup_channel(&owner, &channel.name)?;
    let records = archive.list_build_records(&resolved, Some(source_name))?;
    let now = Utc::now();

    let version = query.version.as_deref().filter(|v| *v != ppa_catalog::ANY_VERSION);
    let builds = filter_builds(
        &records,
        query.build_id.as_deref(),
        version,
        query.window_minutes,
        now,
    );
    tracing::debug!(
        channel = %channel,
        source_name,
        scanned = records.len(),
        returned = builds.len(),
        "filtered build records"
    );
    Ok(builds)
}
