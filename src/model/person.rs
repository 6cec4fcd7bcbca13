//! Directory people and principal classification

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A person record drawn from the directory
///
/// `reports` holds raw directory ids; they are resolved into people by the
/// descent collector, which drops ids that do not name a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Stable directory key (e.g. distinguished name)
    pub id: String,
    /// Short login name; empty means the record is unresolved
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub title: String,
    /// Directory id of this person's manager
    #[serde(default)]
    pub manager: Option<String>,
    /// Directory ids of direct reports, in directory order
    #[serde(default)]
    pub reports: Vec<String>,
    #[serde(default)]
    pub division: Option<String>,
}

impl Person {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            display_name: String::new(),
            title: String::new(),
            manager: None,
            reports: Vec::new(),
            division: None,
        }
    }

    pub fn has_reports(&self) -> bool {
        !self.reports.is_empty()
    }

    /// A person without a username cannot appear in output
    pub fn is_resolved(&self) -> bool {
        !self.username.is_empty()
    }
}

/// The configured set of qualifying leadership titles
///
/// Principal status is always re-evaluated from the current title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleSet {
    titles: BTreeSet<String>,
}

impl TitleSet {
    pub fn new<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            titles: titles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn qualifies(&self, title: &str) -> bool {
        self.titles.contains(title)
    }

    pub fn is_principal(&self, person: &Person) -> bool {
        self.qualifies(&person.title)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.titles.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}
