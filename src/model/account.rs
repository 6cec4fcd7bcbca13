//! Accounts, members and account naming

use serde::Serialize;

use super::person::Person;

/// A cluster account owned by a principal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    /// Username of the owning principal
    pub owner: String,
    members: Vec<String>,
}

impl Account {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            members: Vec::new(),
        }
    }

    /// Member usernames in the order they were added
    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn has_member(&self, username: &str) -> bool {
        self.members.iter().any(|m| m == username)
    }

    /// Add a member; returns false if already present
    pub fn add_member(&mut self, username: &str) -> bool {
        if self.has_member(username) {
            return false;
        }
        self.members.push(username.to_string());
        true
    }

    pub fn remove_member(&mut self, username: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != username);
        self.members.len() != before
    }
}

/// A person known to the run, keyed by username
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub username: String,
    pub display_name: String,
    pub division: Option<String>,
    pub default_account: Option<String>,
    /// False for placeholders created by override directives
    pub directory_backed: bool,
}

impl Member {
    pub fn from_person(person: &Person, default_account: Option<String>) -> Self {
        Self {
            username: person.username.clone(),
            display_name: person.display_name.clone(),
            division: person.division.clone(),
            default_account,
            directory_backed: true,
        }
    }

    pub fn placeholder(username: &str) -> Self {
        Self {
            username: username.to_string(),
            display_name: String::new(),
            division: None,
            default_account: None,
            directory_backed: false,
        }
    }
}

/// Derive an account name from a `"Last, First"` display name.
///
/// Only the first word of each part is used, so titles and middle names drop
/// out: `"Goofus MD, A. Galant"` becomes `goofus_a`. Returns `None` when the
/// display name does not have that shape.
pub fn derive_account_name(display_name: &str) -> Option<String> {
    let (last, first) = display_name.split_once(", ")?;
    let last = last.split_whitespace().next()?.to_lowercase();
    let initial: String = first
        .split_whitespace()
        .next()?
        .chars()
        .next()?
        .to_lowercase()
        .collect();

    let name = format!("{}_{}", last, initial).replace('\'', "");
    Some(name)
}

/// Default account name for a principal, falling back to the username
pub fn default_account_name(person: &Person) -> String {
    derive_account_name(&person.display_name).unwrap_or_else(|| person.username.to_lowercase())
}
