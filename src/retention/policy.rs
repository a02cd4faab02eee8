//! Retention policy: which live publications to keep under a cap.
//!
//! Pure decision logic. Nothing here talks to an archive.

use std::fmt;
use std::str::FromStr;

use ppa_catalog::Publication;
use ppa_version::{DebianScheme, NormalizedScheme, SchemeKind, VersionScheme};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Sort key used to pick the oldest publications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderBy {
    /// Publish time; a missing time sorts oldest
    #[default]
    Date,
    /// Version key under the configured scheme
    Version,
}

impl OrderBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderBy::Date => "date",
            OrderBy::Version => "version",
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderBy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "date" => Ok(OrderBy::Date),
            "version" => Ok(OrderBy::Version),
            _ => Err(EngineError::invalid_input(format!(
                "unknown order_by '{s}' (expected 'date' or 'version')"
            ))),
        }
    }
}

/// Retention policy for one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Maximum number of live publications to keep
    pub max_sources: usize,
    #[serde(default)]
    pub order_by: OrderBy,
    #[serde(default)]
    pub version_scheme: SchemeKind,
    /// Log but don't delete
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_sources: 2,
            order_by: OrderBy::Date,
            version_scheme: SchemeKind::Normalized,
            dry_run: false,
        }
    }
}

impl RetentionPolicy {
    /// Keep the newest `count` live publications by publish date.
    pub fn keep_last_n(count: usize) -> Self {
        Self {
            max_sources: count,
            ..Self::default()
        }
    }

    pub fn ordered_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn with_scheme(mut self, scheme: SchemeKind) -> Self {
        self.version_scheme = scheme;
        self
    }

    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Partition publications under this policy.
    pub fn decide(&self, publications: &[Publication]) -> RetentionDecision {
        match self.version_scheme {
            SchemeKind::Normalized => {
                decide_with(publications, self.max_sources, self.order_by, &NormalizedScheme)
            }
            SchemeKind::Debian => {
                decide_with(publications, self.max_sources, self.order_by, &DebianScheme)
            }
        }
    }
}

/// Outcome of a retention decision.
///
/// `kept` and `pruned` are disjoint and together hold every live input.
/// When pruning is needed both are in ascending order-key order and
/// `pruned` is exactly the deletion order. Otherwise `kept` is the input
/// order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetentionDecision {
    pub kept: Vec<Publication>,
    pub pruned: Vec<Publication>,
    /// Non-live publications, never counted or pruned
    pub skipped: Vec<Publication>,
}

impl RetentionDecision {
    pub fn is_noop(&self) -> bool {
        self.pruned.is_empty()
    }
}

/// Decide which live publications to prune so at most `cap` remain.
///
/// The oldest `live - cap` publications under `order_by` are pruned. Ties
/// keep their input order.
pub fn decide_with<S: VersionScheme>(
    publications: &[Publication],
    cap: usize,
    order_by: OrderBy,
    scheme: &S,
) -> RetentionDecision {
    let (live, skipped): (Vec<&Publication>, Vec<&Publication>) =
        publications.iter().partition(|p| p.status.is_live());
    let skipped: Vec<Publication> = skipped.into_iter().cloned().collect();

    if live.len() <= cap {
        return RetentionDecision {
            kept: live.into_iter().cloned().collect(),
            pruned: Vec::new(),
            skipped,
        };
    }

    let ordered: Vec<&Publication> = match order_by {
        OrderBy::Date => {
            let mut ordered = live;
            ordered.sort_by(|a, b| a.date_published.cmp(&b.date_published));
            ordered
        }
        OrderBy::Version => {
            let mut keyed: Vec<(S::Key, &Publication)> =
                live.into_iter().map(|p| (scheme.key(&p.version), p)).collect();
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            keyed.into_iter().map(|(_, p)| p).collect()
        }
    };

    let excess = ordered.len() - cap;
    let (pruned, kept) = ordered.split_at(excess);
    RetentionDecision {
        kept: kept.iter().map(|p| (*p).clone()).collect(),
        pruned: pruned.iter().map(|p| (*p).clone()).collect(),
        skipped,
    }
}
