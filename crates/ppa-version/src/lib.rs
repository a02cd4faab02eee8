//! Version ordering and name matching for archive publications.
//!
//! Two pure building blocks used by retention and reconciliation:
//! - [`VersionScheme`] turns raw version strings into ordered keys. The
//!   default [`NormalizedScheme`] focuses on the numeric backbone of a
//!   version; [`DebianScheme`] follows Debian policy ordering.
//! - [`MatchSpec`] decides whether a package name is selected by an
//!   exact/prefix/suffix/substring/regex rule.

mod debian;
mod matcher;
mod normalized;

pub use debian::{DebianScheme, DebianVersion};
pub use matcher::{matches, MatchError, MatchMode, MatchSpec, NameMatcher};
pub use normalized::{NormalizedScheme, VersionKey};

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A strategy for ordering version strings.
///
/// Implementations must be total: every input produces a key, and equal
/// inputs produce equal keys.
pub trait VersionScheme {
    /// Comparable key derived from a raw version string.
    type Key: Ord;

    /// Derive the ordering key for `raw`.
    fn key(&self, raw: &str) -> Self::Key;

    /// Compare two raw version strings under this scheme.
    fn compare(&self, a: &str, b: &str) -> Ordering {
        self.key(a).cmp(&self.key(b))
    }
}

/// Selectable version schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemeKind {
    /// Separator flattening + distro-token suppression, numeric compare.
    #[default]
    Normalized,
    /// Debian policy ordering (epoch, upstream, revision).
    Debian,
}

impl SchemeKind {
    /// Returns the configuration spelling of this scheme
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemeKind::Normalized => "normalized",
            SchemeKind::Debian => "debian",
        }
    }
}

impl fmt::Display for SchemeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemeKind {
    type Err = UnknownScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normalized" => Ok(SchemeKind::Normalized),
            "debian" => Ok(SchemeKind::Debian),
            _ => Err(UnknownScheme(s.to_string())),
        }
    }
}

/// Returned when a version scheme name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown version scheme '{0}' (expected 'normalized' or 'debian')")]
pub struct UnknownScheme(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_kind_parse() {
        assert_eq!("normalized".parse::<SchemeKind>(), Ok(SchemeKind::Normalized));
        assert_eq!("Debian".parse::<SchemeKind>(), Ok(SchemeKind::Debian));
        assert!("semver".parse::<SchemeKind>().is_err());
    }

    #[test]
    fn test_schemes_disagree_on_tilde() {
        // Normalized drops the non-numeric tail, Debian sorts '~' first.
        assert_eq!(NormalizedScheme.compare("1.0~rc1", "1.0"), Ordering::Equal);
        assert_eq!(DebianScheme.compare("1.0~rc1", "1.0"), Ordering::Less);
    }
}
