//! Heuristic version keys.
//!
//! Real archive versions mix epochs, upstream versions, distro revisions and
//! build stamps (`5.19.11-051911.202209251059`, `5.19.11ubuntu2`,
//! `1:2.3+dfsg-1`). The key keeps only the leading numeric backbone:
//!
//! 1. `-`, `:`, `~`, `+` become `.`
//! 2. `ubuntu`, `dfsg`, `build` (any case) become `0`
//! 3. the leading run of digits and dots is kept
//! 4. that run is split on `.` into integers

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::VersionScheme;

/// Distribution suffix tokens that collapse to the lowest-weight segment.
const DISTRO_TOKENS: &[&str] = &["ubuntu", "dfsg", "build"];

/// Ordered numeric key derived from a version string.
///
/// Missing trailing segments compare as zero, so `1.2` and `1.2.0` are
/// equal while `1.2.1` is greater than both. A version with no leading
/// digits yields the empty key, which sorts below every key that has a
/// non-zero segment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionKey {
    segments: Vec<u64>,
}

impl VersionKey {
    /// Parse a raw version string. Never fails.
    pub fn parse(raw: &str) -> Self {
        let flattened: String = raw
            .chars()
            .map(|c| if matches!(c, '-' | ':' | '~' | '+') { '.' } else { c })
            .collect();
        let normalized = suppress_distro_tokens(&flattened);

        let run: &str = match normalized.find(|c: char| !(c.is_ascii_digit() || c == '.')) {
            Some(end) => &normalized[..end],
            None => &normalized,
        };

        if !run.bytes().any(|b| b.is_ascii_digit()) {
            return Self::default();
        }

        let segments = run
            .split('.')
            .map(|segment| {
                if segment.is_empty() {
                    0
                } else {
                    // Only digits remain here, so the sole failure is overflow.
                    segment.parse::<u64>().unwrap_or(u64::MAX)
                }
            })
            .collect();

        Self { segments }
    }

    /// Numeric segments in order
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    /// True when the version had no leading numeric run
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

fn suppress_distro_tokens(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    'scan: while i < bytes.len() {
        for token in DISTRO_TOKENS {
            let end = i + token.len();
            if end <= bytes.len() && bytes[i..end].eq_ignore_ascii_case(token.as_bytes()) {
                out.push('0');
                i = end;
                continue 'scan;
            }
        }
        match input[i..].chars().next() {
            Some(ch) => {
                out.push(ch);
                i += ch.len_utf8();
            }
            None => break,
        }
    }

    out
}

impl Ord for VersionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for idx in 0..len {
            let a = self.segments.get(idx).copied().unwrap_or(0);
            let b = other.segments.get(idx).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for VersionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionKey {}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(|s| s.to_string()).collect();
        write!(f, "({})", parts.join(","))
    }
}

/// The default heuristic scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedScheme;

impl VersionScheme for NormalizedScheme {
    type Key = VersionKey;

    fn key(&self, raw: &str) -> VersionKey {
        VersionKey::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainline_kernel_version_is_numeric() {
        let key = VersionKey::parse("5.19.11-051911.202209251059");
        assert_eq!(key.segments(), &[5, 19, 11, 51911, 202209251059]);
    }

    #[test]
    fn test_ubuntu_suffix_collapses_to_zero() {
        let key = VersionKey::parse("5.19.11ubuntu2");
        assert!(!key.is_empty());
        assert_eq!(key.segments(), &[5, 19, 1102]);
    }

    #[test]
    fn test_distro_tokens_are_case_insensitive() {
        assert_eq!(
            VersionKey::parse("2.0+DFSG-1").segments(),
            VersionKey::parse("2.0+dfsg-1").segments()
        );
        assert_eq!(VersionKey::parse("1.0build3").segments(), &[1, 3]);
    }

    #[test]
    fn test_numeric_not_lexical_ordering() {
        assert!(VersionKey::parse("5.19.9") < VersionKey::parse("5.19.11"));
        assert!(VersionKey::parse("6.0") > VersionKey::parse("5.19.11"));
    }

    #[test]
    fn test_trailing_zero_padding() {
        assert_eq!(VersionKey::parse("1.2"), VersionKey::parse("1.2.0"));
        assert!(VersionKey::parse("1.2") < VersionKey::parse("1.2.1"));
    }

    #[test]
    fn test_epoch_and_revision_flattened() {
        assert_eq!(VersionKey::parse("1:2.3-4").segments(), &[1, 2, 3, 4]);
        assert_eq!(VersionKey::parse("1.0~rc1").segments(), &[1, 0, 0]);
    }

    #[test]
    fn test_no_leading_digits_is_empty_and_lowest() {
        let key = VersionKey::parse("git-snapshot");
        assert!(key.is_empty());
        assert!(key < VersionKey::parse("0.1"));
        assert!(VersionKey::parse("").is_empty());
        assert!(VersionKey::parse("-").is_empty());
    }

    #[test]
    fn test_empty_segments_and_overflow() {
        assert_eq!(VersionKey::parse("1..2").segments(), &[1, 0, 2]);
        assert_eq!(VersionKey::parse("1.").segments(), &[1, 0]);
        assert_eq!(
            VersionKey::parse("99999999999999999999999").segments(),
            &[u64::MAX]
        );
    }

    #[test]
    fn test_parse_is_deterministic() {
        for raw in ["5.19.11ubuntu2", "", "1:2~b", "ünïcode-1.0", "build"] {
            assert_eq!(VersionKey::parse(raw), VersionKey::parse(raw));
            assert_eq!(VersionKey::parse(raw).segments(), VersionKey::parse(raw).segments());
        }
    }

    #[test]
    fn test_non_ascii_input_does_not_panic() {
        let key = VersionKey::parse("ü1.0");
        assert!(key.is_empty());
        assert_eq!(VersionKey::parse("1.0ü").segments(), &[1, 0]);
    }

    #[test]
    fn test_display() {
        assert_eq!(VersionKey::parse("1.2.3").to_string(), "(1,2,3)");
    }
}
