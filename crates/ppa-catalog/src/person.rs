//! People and teams registered with the archive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A person or team account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    /// Account name, without the leading `~`
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub is_team: bool,
    #[serde(default)]
    pub karma: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_link: Option<String>,
}

impl Person {
    pub fn new(id: impl Into<String>, name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            display_name: display_name.into(),
            is_team: false,
            karma: 0,
            date_created: None,
            description: None,
            web_link: None,
        }
    }

    pub fn as_team(mut self) -> Self {
        self.is_team = true;
        self
    }

    pub fn with_karma(mut self, karma: i64) -> Self {
        self.karma = karma;
        self
    }

    /// Case-insensitive match of `text` against the name or display name
    pub fn matches_text(&self, text: &str) -> bool {
        let needle = text.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.display_name.to_lowercase().contains(&needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_text_ignores_case() {
        let person = Person::new("p/1", "tuxinvader", "Mark Boddington");
        assert!(person.matches_text("TuxInv"));
        assert!(person.matches_text("boddington"));
        assert!(!person.matches_text("someone"));
    }

    #[test]
    fn test_optional_fields_skipped() {
        let json = serde_json::to_value(Person::new("p/1", "t", "T")).unwrap();
        assert!(json.get("description").is_none());
        assert_eq!(json["is_team"], false);
    }
}
