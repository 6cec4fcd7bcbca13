//! Ascent resolution: find a subject's sponsoring principal
//!
//! Climbs manager links from a subject until a person with a qualifying
//! title is found. The climb is bounded by a hop limit and by a visited set,
//! so broken or cyclic manager chains always terminate with an
//! [`UnresolvedReason`] instead of looping.

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use crate::directory::Directory;
use crate::error::DirectoryError;
use crate::model::{Person, TitleSet};

/// Why no principal could be found from directory data alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// A manager reference was absent or did not name a person
    MissingManagerLink,
    /// `max_hops` managers were visited without finding a principal
    HopLimitExceeded,
    /// A manager id repeated during the climb
    CycleDetected,
    /// The subject itself could not be found
    NotFound,
    /// More than one directory entry matched the subject
    Ambiguous { matches: usize },
    /// A single lookup timed out
    LookupFailed { id: String, message: String },
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::MissingManagerLink => write!(f, "missing manager link"),
            UnresolvedReason::HopLimitExceeded => write!(f, "hop limit exceeded"),
            UnresolvedReason::CycleDetected => write!(f, "cycle detected"),
            UnresolvedReason::NotFound => write!(f, "no directory entry found"),
            UnresolvedReason::Ambiguous { matches } => {
                write!(f, "ambiguous directory match ({} entries)", matches)
            }
            UnresolvedReason::LookupFailed { id, message } => {
                write!(f, "lookup of {} failed: {}", id, message)
            }
        }
    }
}

/// Outcome of ascent resolution for one subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sponsorship {
    Resolved(Person),
    Unresolved(UnresolvedReason),
}

impl Sponsorship {
    pub fn principal(&self) -> Option<&Person> {
        match self {
            Sponsorship::Resolved(person) => Some(person),
            Sponsorship::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Sponsorship::Resolved(_))
    }
}

/// Resolves subjects to principals by climbing manager links
pub struct AscentResolver<'a, D: Directory + ?Sized> {
    directory: &'a D,
    titles: &'a TitleSet,
    max_hops: usize,
}

impl<'a, D: Directory + ?Sized> AscentResolver<'a, D> {
    pub fn new(directory: &'a D, titles: &'a TitleSet, max_hops: usize) -> Self {
        Self {
            directory,
            titles,
            max_hops,
        }
    }

    /// Find the principal sponsoring `person`.
    ///
    /// A person with a qualifying title sponsors itself. Otherwise at most
    /// `max_hops` managers are fetched; the first with a qualifying title
    /// is returned. Only a timed-out manager lookup degrades to
    /// [`UnresolvedReason::LookupFailed`]; other directory errors are returned.
    pub async fn resolve_sponsor(&self, person: &Person) -> Result<Sponsorship, DirectoryError> {
        if self.titles.is_principal(person) {
            debug!(username = %person.username, "Subject holds a principal title");
            return Ok(Sponsorship::Resolved(person.clone()));
        }

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(person.id.clone());

        let mut next = person.manager.clone();

        for hop in 1..=self.max_hops {
            let Some(manager_id) = next.take() else {
                return Ok(Sponsorship::Unresolved(UnresolvedReason::MissingManagerLink));
            };

            if !visited.insert(manager_id.clone()) {
                debug!(username = %person.username, manager = %manager_id, "Manager chain loops");
                return Ok(Sponsorship::Unresolved(UnresolvedReason::CycleDetected));
            }

            let manager = match self.directory.lookup_by_id(&manager_id).await {
                Ok(Some(manager)) => manager,
                Ok(None) => {
                    debug!(username = %person.username, manager = %manager_id, "Manager is not a person");
                    return Ok(Sponsorship::Unresolved(UnresolvedReason::MissingManagerLink));
                }
                Err(e) if !e.is_recoverable() => return Err(e),
                Err(e) => {
                    return Ok(Sponsorship::Unresolved(UnresolvedReason::LookupFailed {
                        id: manager_id,
                        message: e.to_string(),
                    }));
                }
            };

            if self.titles.is_principal(&manager) {
                debug!(
                    username = %person.username,
                    principal = %manager.username,
                    title = %manager.title,
                    hop,
                    "Found principal"
                );
                return Ok(Sponsorship::Resolved(manager));
            }

            next = manager.manager;
        }

        Ok(Sponsorship::Unresolved(UnresolvedReason::HopLimitExceeded))
    }
}
