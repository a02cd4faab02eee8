//! Package-name matching.
//!
//! Prefix, suffix and substring modes treat the pattern as a literal. Only
//! the regex mode interprets metacharacters, as an unanchored search.

use std::fmt;
use std::str::FromStr;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// How a [`MatchSpec`] pattern is applied to a candidate name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Case-sensitive equality.
    #[default]
    Exact,
    /// Candidate begins with the pattern.
    StartsWith,
    /// Candidate ends with the pattern.
    EndsWith,
    /// Candidate contains the pattern.
    Contains,
    /// Pattern is a regular expression searched anywhere in the candidate.
    #[serde(rename = "regex")]
    RegexOrLiteral,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Exact => "exact",
            MatchMode::StartsWith => "starts_with",
            MatchMode::EndsWith => "ends_with",
            MatchMode::Contains => "contains",
            MatchMode::RegexOrLiteral => "regex",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchMode {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(MatchMode::Exact),
            "starts_with" => Ok(MatchMode::StartsWith),
            "ends_with" => Ok(MatchMode::EndsWith),
            "contains" => Ok(MatchMode::Contains),
            "regex" => Ok(MatchMode::RegexOrLiteral),
            _ => Err(MatchError::UnknownMode(s.to_string())),
        }
    }
}

/// Errors raised while interpreting a match specification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    #[error("unknown match mode '{0}' (expected exact, starts_with, ends_with, contains or regex)")]
    UnknownMode(String),

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// A name-matching rule supplied per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSpec {
    pub pattern: String,
    #[serde(default)]
    pub mode: MatchMode,
}

impl MatchSpec {
    pub fn new(pattern: impl Into<String>, mode: MatchMode) -> Self {
        Self {
            pattern: pattern.into(),
            mode,
        }
    }

    pub fn exact(pattern: impl Into<String>) -> Self {
        Self::new(pattern, MatchMode::Exact)
    }

    /// Compile into a reusable matcher, surfacing bad regex patterns.
    pub fn compile(&self) -> Result<NameMatcher, MatchError> {
        let pattern = self.pattern.clone();
        Ok(match self.mode {
            MatchMode::Exact => NameMatcher::Exact(pattern),
            MatchMode::StartsWith => NameMatcher::StartsWith(pattern),
            MatchMode::EndsWith => NameMatcher::EndsWith(pattern),
            MatchMode::Contains => NameMatcher::Contains(pattern),
            MatchMode::RegexOrLiteral => {
                let regex = Regex::new(&pattern).map_err(|e| MatchError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
                NameMatcher::Regex(regex)
            }
        })
    }

    /// Whether `candidate` is selected by this spec.
    ///
    /// Total: a regex that does not compile selects nothing.
    pub fn matches(&self, candidate: &str) -> bool {
        matches(candidate, self)
    }
}

impl fmt::Display for MatchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.mode, self.pattern)
    }
}

/// A compiled [`MatchSpec`].
#[derive(Debug, Clone)]
pub enum NameMatcher {
    Exact(String),
    StartsWith(String),
    EndsWith(String),
    Contains(String),
    Regex(Regex),
}

impl NameMatcher {
    pub fn is_match(&self, candidate: &str) -> bool {
        match self {
            NameMatcher::Exact(p) => candidate == p,
            NameMatcher::StartsWith(p) => candidate.starts_with(p.as_str()),
            NameMatcher::EndsWith(p) => candidate.ends_with(p.as_str()),
            NameMatcher::Contains(p) => candidate.contains(p.as_str()),
            NameMatcher::Regex(re) => re.is_match(candidate),
        }
    }
}

/// Evaluate `spec` against `candidate`.
pub fn matches(candidate: &str, spec: &MatchSpec) -> bool {
    match spec.compile() {
        Ok(matcher) => matcher.is_match(candidate),
        Err(e) => {
            tracing::warn!(candidate, error = %e, "pattern does not compile; treating as no match");
            false
        }
    }
}
