//! Orchestrating passes
//!
//! The engine runs one batch computation per invocation:
//!
//! 1. principal search (fatal on failure)
//! 2. descent collection per principal, bounded concurrency, results kept in
//!    principal order
//! 3. a single coordinating pass that builds the provisional structure
//! 4. override merge
//!
//! Only step 2 runs concurrently. All mutation of the account and people
//! maps happens in step 3 and 4 on one task, so output order never depends
//! on lookup timing.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::directory::Directory;
use crate::error::{DirectoryError, EngineError, Result};
use crate::model::{
    default_account_name, Account, AccountHierarchy, IdentityMap, Member, Person, TitleSet,
};
use crate::overrides::{DirectiveSet, MergeReport};
use crate::resolve::{AscentResolver, DescentCollector, Sponsorship, Subtree, UnresolvedReason};

const DEFAULT_MAX_HOPS: usize = 10;
const DEFAULT_MAX_CONCURRENT: usize = 8;

/// A principal with its assigned account name and collected subordinates
#[derive(Debug, Clone)]
pub struct ResolvedPrincipal {
    pub principal: Person,
    pub account: String,
    pub subtree: Subtree,
}

/// A requested subject that ascent resolution could not place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedSubject {
    pub username: String,
    pub reason: UnresolvedReason,
}

/// Result of the single-subject lookup path
#[derive(Debug, Clone, Default)]
pub struct LookupOutcome {
    /// One entry per requested username, in request order
    pub identities: IdentityMap,
    pub unresolved: Vec<UnresolvedSubject>,
    pub merge: MergeReport,
}

impl LookupOutcome {
    /// Requested usernames whose final account list is empty
    pub fn empty_subjects(&self) -> Vec<String> {
        self.identities
            .entries()
            .filter(|e| e.accounts.is_empty())
            .map(|e| e.username.clone())
            .collect()
    }

    /// Fail when any requested subject is still without accounts
    pub fn ensure_resolved(&self) -> Result<()> {
        let usernames = self.empty_subjects();
        if usernames.is_empty() {
            Ok(())
        } else {
            Err(EngineError::UnresolvedSubjects { usernames })
        }
    }
}

/// Split comma-separated username lists, ignoring spaces and repeats
pub fn parse_subject_list<S: AsRef<str>>(inputs: &[S]) -> Vec<String> {
    let mut usernames: Vec<String> = Vec::new();
    for input in inputs {
        for part in input.as_ref().split(',') {
            let username: String = part.chars().filter(|c| !c.is_whitespace()).collect();
            if !username.is_empty() && !usernames.contains(&username) {
                usernames.push(username);
            }
        }
    }
    usernames
}

/// Resolves the directory into account structures
pub struct HierarchyEngine {
    directory: Arc<dyn Directory>,
    titles: TitleSet,
    max_hops: usize,
    max_concurrent: usize,
}

impl HierarchyEngine {
    pub fn new(directory: Arc<dyn Directory>, titles: TitleSet) -> Self {
        Self {
            directory,
            titles,
            max_hops: DEFAULT_MAX_HOPS,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    pub fn from_config(directory: Arc<dyn Directory>, config: &EngineConfig) -> Self {
        Self::new(directory, config.title_set())
            .with_max_hops(config.max_hops)
            .with_max_concurrent(config.resolution.max_concurrent)
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops.max(1);
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn titles(&self) -> &TitleSet {
        &self.titles
    }

    /// Search principals, name their accounts and collect every subtree.
    ///
    /// Fails when the principal search fails, or when a report lookup fails
    /// with anything other than a timeout.
    pub async fn resolve_principals(&self) -> Result<Vec<ResolvedPrincipal>> {
        let found = self
            .directory
            .search_principals(&self.titles)
            .await
            .map_err(EngineError::PrincipalSearch)?;
        info!(count = found.len(), "Found principals");

        let named = assign_account_names(found);

        let collector = DescentCollector::new(self.directory.as_ref(), &self.titles);
        let subtrees: Vec<Subtree> = stream::iter(named.iter())
            .map(|(principal, _)| collector.collect_subtree(principal))
            .buffered(self.max_concurrent)
            .try_collect()
            .await?;

        let resolved: Vec<ResolvedPrincipal> = named
            .into_iter()
            .zip(subtrees)
            .map(|((principal, account), subtree)| ResolvedPrincipal {
                principal,
                account,
                subtree,
            })
            .collect();

        let failed: usize = resolved.iter().map(|r| r.subtree.failed.len()).sum();
        if failed > 0 {
            warn!(failed, "Some report lookups timed out and were skipped");
        }
        Ok(resolved)
    }

    /// Account-hierarchy variant: one account per principal, then overrides
    pub async fn build_account_hierarchy(
        &self,
        directives: &DirectiveSet,
    ) -> Result<(AccountHierarchy, MergeReport)> {
        let resolved = self.resolve_principals().await?;
        let mut hierarchy = provisional_hierarchy(&resolved);
        info!(
            accounts = hierarchy.account_count(),
            "Built provisional account hierarchy"
        );

        let report = hierarchy.apply_overrides(directives);
        Ok((hierarchy, report))
    }

    /// Identity-map variant: one entry per subject, then overrides
    pub async fn build_identity_map(
        &self,
        directives: &DirectiveSet,
    ) -> Result<(IdentityMap, MergeReport)> {
        let resolved = self.resolve_principals().await?;
        let mut map = provisional_identity_map(&resolved);
        info!(subjects = map.len(), "Built provisional identity map");

        let report = map.apply_overrides(directives);
        Ok((map, report))
    }

    /// Single-subject lookup path.
    ///
    /// Every requested username gets an entry, empty when neither the
    /// directory nor an override places it. Only subject directives naming
    /// a requested username are applied. A directory error other than a
    /// timeout fails the whole lookup.
    pub async fn lookup_subjects(
        &self,
        usernames: &[String],
        directives: &DirectiveSet,
    ) -> Result<LookupOutcome> {
        let sponsorships: Vec<Sponsorship> = stream::iter(usernames)
            .map(|username| self.sponsor_of(username))
            .buffered(self.max_concurrent)
            .try_collect()
            .await?;

        let mut outcome = LookupOutcome::default();
        for (username, sponsorship) in usernames.iter().zip(sponsorships) {
            outcome.identities.entry_mut(username);
            match sponsorship {
                Sponsorship::Resolved(principal) => {
                    let account = default_account_name(&principal);
                    debug!(username = %username, account = %account, "Subject resolved");
                    outcome.identities.grant(username, &account);
                }
                Sponsorship::Unresolved(reason) => {
                    warn!(username = %username, reason = %reason, "Subject unresolved");
                    outcome.unresolved.push(UnresolvedSubject {
                        username: username.clone(),
                        reason,
                    });
                }
            }
        }

        outcome.merge = outcome
            .identities
            .apply_overrides(&directives.for_subjects(usernames));
        Ok(outcome)
    }

    async fn sponsor_of(
        &self,
        username: &str,
    ) -> std::result::Result<Sponsorship, DirectoryError> {
        let matches = match self.directory.lookup_by_username(username).await {
            Ok(matches) => matches,
            Err(e) if !e.is_recoverable() => return Err(e),
            Err(e) => {
                return Ok(Sponsorship::Unresolved(UnresolvedReason::LookupFailed {
                    id: username.to_string(),
                    message: e.to_string(),
                }))
            }
        };

        let subject = match matches.as_slice() {
            [] => return Ok(Sponsorship::Unresolved(UnresolvedReason::NotFound)),
            [subject] => subject,
            _ => {
                warn!(username, matches = matches.len(), "Multiple directory entries match subject");
                return Ok(Sponsorship::Unresolved(UnresolvedReason::Ambiguous {
                    matches: matches.len(),
                }));
            }
        };

        AscentResolver::new(self.directory.as_ref(), &self.titles, self.max_hops)
            .resolve_sponsor(subject)
            .await
    }
}

/// Give each principal an account name, in directory order.
///
/// A derived name that is already taken falls back to the principal's
/// username; if that is taken too the principal is dropped.
fn assign_account_names(principals: Vec<Person>) -> Vec<(Person, String)> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut owners: HashSet<String> = HashSet::new();
    let mut named = Vec::with_capacity(principals.len());

    for principal in principals {
        if !principal.is_resolved() {
            warn!(id = %principal.id, "Principal has no username, skipping");
            continue;
        }
        if !owners.insert(principal.username.clone()) {
            warn!(username = %principal.username, "Duplicate principal username, skipping");
            continue;
        }

        let derived = default_account_name(&principal);
        let account = if taken.insert(derived.clone()) {
            derived
        } else {
            let fallback = principal.username.to_lowercase();
            if !taken.insert(fallback.clone()) {
                error!(
                    username = %principal.username,
                    account = %derived,
                    "Account name collision, principal skipped"
                );
                continue;
            }
            warn!(
                username = %principal.username,
                account = %derived,
                fallback = %fallback,
                "Account name collision, using username"
            );
            fallback
        };
        named.push((principal, account));
    }
    named
}

fn provisional_hierarchy(resolved: &[ResolvedPrincipal]) -> AccountHierarchy {
    let mut hierarchy = AccountHierarchy::new();

    for r in resolved {
        hierarchy.insert_account(Account::new(&r.account, &r.principal.username));
        hierarchy
            .insert_person_if_absent(Member::from_person(&r.principal, Some(r.account.clone())));
    }

    for r in resolved {
        for member in &r.subtree.members {
            if let Some(account) = hierarchy.account_mut(&r.account) {
                account.add_member(&member.username);
            }
            let placed = Member::from_person(member, Some(r.account.clone()));
            if hierarchy.insert_person_if_absent(placed) {
                debug!(username = %member.username, account = %r.account, "Default account assigned");
            }
        }
    }
    hierarchy
}

fn provisional_identity_map(resolved: &[ResolvedPrincipal]) -> IdentityMap {
    let mut map = IdentityMap::new();

    for r in resolved {
        map.grant(&r.principal.username, &r.account);
    }
    for r in resolved {
        for member in &r.subtree.members {
            map.grant(&member.username, &r.account);
        }
    }
    map
}
