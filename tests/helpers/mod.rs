//! Shared fixtures for integration tests
//!
//! Builds in-memory directories from a terse person description so each
//! test reads like the org chart it exercises.

#![allow(dead_code)]

use std::sync::Arc;

use org_accounts::directory::DirectoryEntry;
use org_accounts::{HierarchyEngine, Person, SnapshotDirectory, TitleSet};

pub const PRINCIPAL_TITLE: &str = "Professor";

/// Fluent builder for a snapshot directory
#[derive(Default)]
pub struct OrgChart {
    entries: Vec<DirectoryEntry>,
}

impl OrgChart {
    pub fn new() -> Self {
        Self::default()
    }

    /// A principal; the id doubles as the username
    pub fn principal(self, id: &str, display_name: &str, reports: &[&str]) -> Self {
        self.person(id, display_name, PRINCIPAL_TITLE, None, reports)
    }

    pub fn staff(self, id: &str, manager: &str, reports: &[&str]) -> Self {
        let display = format!("{}, Staff", id);
        self.person(id, &display, "Staff", Some(manager), reports)
    }

    pub fn person(
        mut self,
        id: &str,
        display_name: &str,
        title: &str,
        manager: Option<&str>,
        reports: &[&str],
    ) -> Self {
        let mut person = Person::new(id, id);
        person.display_name = display_name.to_string();
        person.title = title.to_string();
        person.manager = manager.map(str::to_string);
        person.reports = reports.iter().map(|r| r.to_string()).collect();
        person.division = Some("Research".to_string());
        self.entries.push(person.into());
        self
    }

    /// A non-person entry such as a shared mailbox
    pub fn resource(mut self, id: &str) -> Self {
        self.entries.push(DirectoryEntry::resource(id));
        self
    }

    pub fn directory(self) -> SnapshotDirectory {
        SnapshotDirectory::new(self.entries)
    }

    pub fn engine(self) -> HierarchyEngine {
        HierarchyEngine::new(Arc::new(self.directory()), TitleSet::new([PRINCIPAL_TITLE]))
    }
}

/// pi1 (Professor) -> s1 -> s2
///
/// The principal's display name has no "Last, First" form, so its account
/// is named after the username: `pi1`.
pub fn three_person_lab() -> OrgChart {
    OrgChart::new()
        .principal("pi1", "Paula Investigator", &["s1"])
        .staff("s1", "pi1", &["s2"])
        .staff("s2", "s1", &[])
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
