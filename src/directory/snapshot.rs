//! Directory snapshot backend
//!
//! Serves lookups from a YAML export of the directory:
//!
//! ```yaml
//! entries:
//!   - id: "CN=Doe\\, Jane,OU=Faculty,DC=example,DC=org"
//!     username: jdoe
//!     display_name: "Doe, Jane"
//!     title: Professor
//!     direct_reports: ["CN=Roe\\, Rick,OU=Staff,DC=example,DC=org"]
//!     division: Basic Sciences
//!   - id: "CN=Lab Printer,OU=Resources,DC=example,DC=org"
//!     kind: resource
//! ```

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use super::traits::Directory;
use crate::error::DirectoryError;
use crate::model::{Person, TitleSet};

/// Kind of directory entry; only people take part in resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    #[default]
    Person,
    Resource,
}

/// One exported directory entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectoryEntry {
    pub id: String,
    #[serde(default)]
    pub kind: EntryKind,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub manager: Option<String>,
    #[serde(default)]
    pub direct_reports: Vec<String>,
    #[serde(default)]
    pub division: Option<String>,
}

impl DirectoryEntry {
    /// A non-person entry such as a shared mailbox
    pub fn resource(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: EntryKind::Resource,
            username: String::new(),
            display_name: String::new(),
            title: String::new(),
            manager: None,
            direct_reports: Vec::new(),
            division: None,
        }
    }

    pub fn to_person(&self) -> Option<Person> {
        if self.kind != EntryKind::Person {
            return None;
        }
        Some(Person {
            id: self.id.clone(),
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            title: self.title.clone(),
            manager: self.manager.clone(),
            reports: self.direct_reports.clone(),
            division: self.division.clone(),
        })
    }
}

impl From<Person> for DirectoryEntry {
    fn from(person: Person) -> Self {
        Self {
            id: person.id,
            kind: EntryKind::Person,
            username: person.username,
            display_name: person.display_name,
            title: person.title,
            manager: person.manager,
            direct_reports: person.reports,
            division: person.division,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    entries: Vec<DirectoryEntry>,
}

/// In-memory directory built from a snapshot export
#[derive(Debug, Clone, Default)]
pub struct SnapshotDirectory {
    entries: Vec<DirectoryEntry>,
    by_id: HashMap<String, usize>,
}

impl SnapshotDirectory {
    /// Build from entries; when an id repeats, the first entry is kept
    pub fn new(entries: Vec<DirectoryEntry>) -> Self {
        let mut kept = Vec::with_capacity(entries.len());
        let mut by_id = HashMap::with_capacity(entries.len());
        for entry in entries {
            if by_id.contains_key(&entry.id) {
                tracing::warn!(id = %entry.id, "Duplicate directory id in snapshot, keeping first entry");
                continue;
            }
            by_id.insert(entry.id.clone(), kept.len());
            kept.push(entry);
        }
        Self {
            entries: kept,
            by_id,
        }
    }

    pub fn from_people(people: impl IntoIterator<Item = Person>) -> Self {
        Self::new(people.into_iter().map(DirectoryEntry::from).collect())
    }

    /// Load a snapshot from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DirectoryError::Snapshot {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let file: SnapshotFile =
            serde_yaml::from_str(&content).map_err(|e| DirectoryError::Snapshot {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        tracing::info!(path = %path.display(), entries = file.entries.len(), "Loaded directory snapshot");
        Ok(Self::new(file.entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn people(&self) -> impl Iterator<Item = Person> + '_ {
        self.entries.iter().filter_map(DirectoryEntry::to_person)
    }
}

#[async_trait]
impl Directory for SnapshotDirectory {
    async fn lookup_by_id(&self, id: &str) -> Result<Option<Person>, DirectoryError> {
        Ok(self
            .by_id
            .get(id)
            .and_then(|&pos| self.entries[pos].to_person()))
    }

    async fn lookup_by_username(&self, username: &str) -> Result<Vec<Person>, DirectoryError> {
        Ok(self.people().filter(|p| p.username == username).collect())
    }

    async fn search_principals(&self, titles: &TitleSet) -> Result<Vec<Person>, DirectoryError> {
        Ok(self.people().filter(|p| titles.is_principal(p)).collect())
    }
}
