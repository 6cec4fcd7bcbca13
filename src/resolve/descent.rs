//! Descent collection: gather a principal's subordinates
//!
//! Walks `reports` breadth-first from a principal. Reports of non-principal
//! managers are spliced into the frontier so multi-level teams flatten into
//! one membership list; a nested principal is collected but its own reports
//! are left to that principal's account.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, warn};

use crate::directory::Directory;
use crate::error::DirectoryError;
use crate::model::{Person, TitleSet};

/// A report id whose lookup failed recoverably
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedLookup {
    pub id: String,
    pub message: String,
}

/// Result of collecting one principal's subtree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subtree {
    /// Collected subordinates in traversal order, each username once
    pub members: Vec<Person>,
    /// Report ids that did not resolve to a usable person
    pub skipped: Vec<String>,
    /// Report ids whose lookup timed out
    pub failed: Vec<FailedLookup>,
    /// Usernames of nested principals whose branches were not descended
    pub pruned: Vec<String>,
}

impl Subtree {
    pub fn usernames(&self) -> Vec<String> {
        self.members.iter().map(|p| p.username.clone()).collect()
    }
}

pub struct DescentCollector<'a, D: Directory + ?Sized> {
    directory: &'a D,
    titles: &'a TitleSet,
}

impl<'a, D: Directory + ?Sized> DescentCollector<'a, D> {
    pub fn new(directory: &'a D, titles: &'a TitleSet) -> Self {
        Self { directory, titles }
    }

    /// Collect every transitively reachable non-principal subordinate of
    /// `principal`, plus the nested principals directly under it.
    ///
    /// A timed-out report lookup is recorded in [`Subtree::failed`] and the
    /// walk continues; any other directory error ends the walk.
    pub async fn collect_subtree(&self, principal: &Person) -> Result<Subtree, DirectoryError> {
        debug!(username = %principal.username, "Getting reports for principal");

        let mut subtree = Subtree::default();
        let mut frontier: VecDeque<String> = principal.reports.iter().cloned().collect();
        let mut visited: HashSet<String> = HashSet::from([principal.id.clone()]);
        let mut collected: HashSet<String> = HashSet::new();

        while let Some(id) = frontier.pop_front() {
            if !visited.insert(id.clone()) {
                debug!(id = %id, "Report already visited");
                continue;
            }

            let report = match self.directory.lookup_by_id(&id).await {
                Ok(Some(report)) => report,
                Ok(None) => {
                    debug!(id = %id, "Report is a non-person entry");
                    subtree.skipped.push(id);
                    continue;
                }
                Err(e) if !e.is_recoverable() => return Err(e),
                Err(e) => {
                    warn!(id = %id, principal = %principal.username, error = %e, "Report lookup failed");
                    subtree.failed.push(FailedLookup {
                        id,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            if !report.is_resolved() {
                debug!(id = %id, "Report has no username");
                subtree.skipped.push(id);
            } else if report.username != principal.username
                && collected.insert(report.username.clone())
            {
                subtree.members.push(report.clone());
            }

            if !report.has_reports() {
                continue;
            }
            if self.titles.is_principal(&report) {
                debug!(username = %report.username, title = %report.title, "Report is a principal, skipping its reports");
                subtree.pruned.push(report.username);
            } else {
                debug!(
                    username = %report.username,
                    principal = %principal.username,
                    count = report.reports.len(),
                    "Adding report's reports to principal"
                );
                frontier.extend(report.reports);
            }
        }

        debug!(
            username = %principal.username,
            members = subtree.members.len(),
            skipped = subtree.skipped.len(),
            "Done with principal"
        );
        Ok(subtree)
    }
}
