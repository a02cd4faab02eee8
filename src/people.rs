//! Person and team lookup.

use ppa_catalog::Person;
use serde::Serialize;

use crate::archive::Archive;
use crate::error::EngineError;

/// Accounts found for a name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserLookup {
    pub user: String,
    /// The account named exactly `user`, if the search returned it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Person>,
    /// Every account the search returned, in archive order
    pub people: Vec<Person>,
}

/// Search people and teams by name.
///
/// The archive search is fuzzy, so an account whose name equals `name`
/// is picked out as `details`. No match is not an error.
pub fn user_info(archive: &dyn Archive, name: &str) -> Result<UserLookup, EngineError> {
    let user = name.trim().trim_start_matches('~');
    if user.is_empty() {
        return Err(EngineError::invalid_input("user name must not be empty"));
    }

    let people = archive.find_people(user)?;
    let details = people.iter().find(|p| p.name == user).cloned();
    tracing::debug!(user, found = people.len(), exact = details.is_some(), "people search");

    Ok(UserLookup {
        user: user.to_string(),
        details,
        people,
    })
}
