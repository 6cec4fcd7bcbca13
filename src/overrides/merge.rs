//! Override merge engine
//!
//! Directives are applied in two phases, each in file order: account
//! directives first, then subject directives. `"all"` in an account list
//! expands to the accounts known at the moment the directive is applied.

use std::fmt;

use tracing::{debug, error, info, warn};

use super::directive::{DirectiveSet, MergeMode};
use crate::model::{Account, AccountHierarchy, IdentityMap, Member};

/// Account-list keyword granting every known account
pub const ALL_ACCOUNTS: &str = "all";

pub fn is_all(entry: &str) -> bool {
    entry.eq_ignore_ascii_case(ALL_ACCOUNTS)
}

/// A recoverable problem met while applying directives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeIssue {
    /// Account directive names an owner that is not a known person
    UnknownOwner { account: String, owner: String },
    /// Subject directive names someone outside the directory data; a
    /// placeholder was created
    UnknownSubject { username: String },
    /// Account list entry names an account that does not exist
    UnknownAccount { username: String, account: String },
    /// `adef` names an account that does not exist
    UnknownDefaultAccount { username: String, account: String },
    /// `mode` was not recognised; replace was used
    UnknownMode { username: String, mode: String },
}

impl fmt::Display for MergeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeIssue::UnknownOwner { account, owner } => {
                write!(f, "account {} names unknown owner {}", account, owner)
            }
            MergeIssue::UnknownSubject { username } => {
                write!(f, "{} is not in the directory, added as placeholder", username)
            }
            MergeIssue::UnknownAccount { username, account } => {
                write!(f, "{} cannot join nonexistent account {}", username, account)
            }
            MergeIssue::UnknownDefaultAccount { username, account } => {
                write!(f, "{} cannot default to nonexistent account {}", username, account)
            }
            MergeIssue::UnknownMode { username, mode } => {
                write!(f, "unrecognized mode '{}' for {}, using replace", mode, username)
            }
        }
    }
}

/// What a merge pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub accounts_created: usize,
    pub subjects_applied: usize,
    pub issues: Vec<MergeIssue>,
}

impl MergeReport {
    fn record(&mut self, issue: MergeIssue) {
        match &issue {
            MergeIssue::UnknownSubject { .. } => warn!(issue = %issue, "Override"),
            _ => error!(issue = %issue, "Override"),
        }
        self.issues.push(issue);
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Combine `entries` into `target`: replace clears it first, append keeps
/// it. Entries already present are not repeated.
pub fn merge_list(target: &mut Vec<String>, entries: &[String], mode: MergeMode) {
    if mode == MergeMode::Replace {
        target.clear();
    }
    for entry in entries {
        if !target.contains(entry) {
            target.push(entry.clone());
        }
    }
}

/// Expand `"all"` against `known`, keeping order and dropping duplicates
pub fn expand_all(entries: &[String], known: &[String]) -> Vec<String> {
    let mut expanded: Vec<String> = Vec::new();
    for entry in entries {
        let names: &[String] = if is_all(entry) {
            known
        } else {
            std::slice::from_ref(entry)
        };
        for name in names {
            if !expanded.contains(name) {
                expanded.push(name.clone());
            }
        }
    }
    expanded
}

impl AccountHierarchy {
    /// Apply override directives to the account hierarchy
    pub fn apply_overrides(&mut self, directives: &DirectiveSet) -> MergeReport {
        let mut report = MergeReport::default();

        debug!("Processing account overrides");
        for directive in directives.account_directives() {
            if self.person(&directive.owner).is_none() {
                report.record(MergeIssue::UnknownOwner {
                    account: directive.account.clone(),
                    owner: directive.owner.clone(),
                });
                continue;
            }
            let account = Account::new(&directive.account, &directive.owner);
            if self.insert_account(account).is_some() {
                info!(account = %directive.account, owner = %directive.owner, "Rebound existing account to new owner");
            } else {
                debug!(account = %directive.account, owner = %directive.owner, "Created account");
            }
            report.accounts_created += 1;
        }

        debug!("Processing user overrides");
        for directive in directives.subject_directives() {
            let username = directive.username.as_str();

            if let Some(mode) = &directive.unrecognized_mode {
                report.record(MergeIssue::UnknownMode {
                    username: username.to_string(),
                    mode: mode.clone(),
                });
            }

            if self.insert_person_if_absent(Member::placeholder(username)) {
                report.record(MergeIssue::UnknownSubject {
                    username: username.to_string(),
                });
            }

            if let Some(alist) = &directive.alist {
                if alist.iter().any(|a| is_all(a)) {
                    info!(username, "Subject is allowed access to all accounts");
                }

                let mut wanted = Vec::new();
                for account in expand_all(alist, &self.account_names()) {
                    if self.has_account(&account) {
                        wanted.push(account);
                    } else {
                        report.record(MergeIssue::UnknownAccount {
                            username: username.to_string(),
                            account,
                        });
                    }
                }

                let mut memberships = self.memberships(username);
                merge_list(&mut memberships, &wanted, directive.mode);

                for account in self.accounts_mut() {
                    if memberships.contains(&account.name) {
                        if account.add_member(username) {
                            debug!(username, account = %account.name, "Added to account");
                        }
                    } else if account.remove_member(username) {
                        debug!(username, account = %account.name, "Removed from account");
                    }
                }
            }

            if let Some(adef) = &directive.adef {
                if self.has_account(adef) {
                    if let Some(member) = self.person_mut(username) {
                        member.default_account = Some(adef.clone());
                    }
                } else {
                    report.record(MergeIssue::UnknownDefaultAccount {
                        username: username.to_string(),
                        account: adef.clone(),
                    });
                }
            }

            report.subjects_applied += 1;
        }

        info!(
            accounts = report.accounts_created,
            subjects = report.subjects_applied,
            issues = report.issues.len(),
            "Applied overrides"
        );
        report
    }
}

impl IdentityMap {
    /// Apply override directives to the identity map.
    ///
    /// Account names are not validated here: listing an account makes it
    /// known, and `adef` is taken as given.
    pub fn apply_overrides(&mut self, directives: &DirectiveSet) -> MergeReport {
        let mut report = MergeReport::default();

        for directive in directives.account_directives() {
            if !self.contains(&directive.owner) {
                report.record(MergeIssue::UnknownOwner {
                    account: directive.account.clone(),
                    owner: directive.owner.clone(),
                });
                continue;
            }
            self.add_known_account(&directive.account);
            report.accounts_created += 1;
        }

        for directive in directives.subject_directives() {
            let username = directive.username.as_str();

            if let Some(mode) = &directive.unrecognized_mode {
                report.record(MergeIssue::UnknownMode {
                    username: username.to_string(),
                    mode: mode.clone(),
                });
            }

            if !self.contains(username) {
                report.record(MergeIssue::UnknownSubject {
                    username: username.to_string(),
                });
            }

            let expanded = directive
                .alist
                .as_ref()
                .map(|alist| expand_all(alist, self.known_accounts()));

            let entry = self.entry_mut(username);
            if let Some(expanded) = &expanded {
                merge_list(&mut entry.accounts, expanded, directive.mode);
            }
            if let Some(adef) = &directive.adef {
                entry.default_account = Some(adef.clone());
            }

            for account in expanded.iter().flatten() {
                self.add_known_account(account);
            }
            report.subjects_applied += 1;
        }

        info!(
            subjects = report.subjects_applied,
            issues = report.issues.len(),
            "Applied identity overrides"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overrides::directive::{AccountDirective, Directive, SubjectDirective};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Accounts x (owner ox) and y (owner oy); u belongs to x
    fn hierarchy() -> AccountHierarchy {
        let mut h = AccountHierarchy::new();
        for owner in ["ox", "oy", "u"] {
            h.insert_person_if_absent(Member::placeholder(owner));
        }
        let mut x = Account::new("x", "ox");
        x.add_member("u");
        h.insert_account(x);
        h.insert_account(Account::new("y", "oy"));
        h
    }

    fn subjects(directives: Vec<SubjectDirective>) -> DirectiveSet {
        DirectiveSet::new(directives.into_iter().map(Directive::Subject).collect())
    }

    #[test]
    fn test_merge_list_modes() {
        let mut replaced = strings(&["a", "b"]);
        merge_list(&mut replaced, &strings(&["c", "d"]), MergeMode::Replace);
        assert_eq!(replaced, strings(&["c", "d"]));

        let mut appended = strings(&["a", "b"]);
        merge_list(&mut appended, &strings(&["c", "d", "a"]), MergeMode::Append);
        assert_eq!(appended, strings(&["a", "b", "c", "d"]));
    }

    #[test]
    fn test_expand_all_is_case_insensitive() {
        let known = strings(&["x", "y"]);
        assert_eq!(expand_all(&strings(&["ALL"]), &known), known);
        assert_eq!(
            expand_all(&strings(&["z", "all", "x"]), &known),
            strings(&["z", "x", "y"])
        );
    }

    #[test]
    fn test_replace_moves_subject() {
        let mut h = hierarchy();
        let report = h.apply_overrides(&subjects(vec![
            SubjectDirective::new("u").with_alist(["y"])
        ]));
        assert!(report.is_clean());
        assert_eq!(h.memberships("u"), strings(&["y"]));
        assert!(!h.account("x").map(|a| a.has_member("u")).unwrap_or(true));
    }

    #[test]
    fn test_append_keeps_existing() {
        let mut h = hierarchy();
        h.apply_overrides(&subjects(vec![SubjectDirective::new("u")
            .with_alist(["y"])
            .with_mode(MergeMode::Append)]));
        assert_eq!(h.memberships("u"), strings(&["x", "y"]));
    }

    #[test]
    fn test_all_is_expanded_at_apply_time() {
        let mut h = hierarchy();
        h.apply_overrides(&subjects(vec![SubjectDirective::new("u").with_alist(["all"])]));
        assert_eq!(h.memberships("u"), strings(&["x", "y"]));

        // An account created afterwards does not pick up u.
        h.insert_person_if_absent(Member::placeholder("oz"));
        h.apply_overrides(&DirectiveSet::new(vec![Directive::Account(AccountDirective {
            account: "z".to_string(),
            owner: "oz".to_string(),
        })]));
        assert_eq!(h.memberships("u"), strings(&["x", "y"]));
    }

    #[test]
    fn test_account_directives_run_before_subjects() {
        let mut h = hierarchy();
        let set = DirectiveSet::new(vec![
            Directive::Subject(SubjectDirective::new("u").with_alist(["core"])),
            Directive::Account(AccountDirective {
                account: "core".to_string(),
                owner: "oy".to_string(),
            }),
        ]);
        let report = h.apply_overrides(&set);
        assert!(report.is_clean());
        assert_eq!(h.memberships("u"), strings(&["core"]));
        assert_eq!(h.account("core").map(|a| a.owner.as_str()), Some("oy"));
    }

    #[test]
    fn test_unknown_owner_is_rejected() {
        let mut h = hierarchy();
        let report = h.apply_overrides(&DirectiveSet::new(vec![Directive::Account(
            AccountDirective {
                account: "core".to_string(),
                owner: "nobody".to_string(),
            },
        )]));
        assert!(!h.has_account("core"));
        assert_eq!(report.issues.len(), 1);
    }

    #[test]
    fn test_default_must_name_existing_account() {
        let mut h = hierarchy();
        let report = h.apply_overrides(&subjects(vec![
            SubjectDirective::new("u").with_adef("nope"),
            SubjectDirective::new("ox").with_adef("y"),
        ]));
        assert_eq!(
            report.issues,
            vec![MergeIssue::UnknownDefaultAccount {
                username: "u".to_string(),
                account: "nope".to_string(),
            }]
        );
        assert_eq!(h.person("u").and_then(|m| m.default_account.clone()), None);
        assert_eq!(
            h.person("ox").and_then(|m| m.default_account.clone()),
            Some("y".to_string())
        );
        // No alist: memberships untouched.
        assert_eq!(h.memberships("u"), strings(&["x"]));
    }

    #[test]
    fn test_unknown_subject_becomes_placeholder() {
        let mut h = hierarchy();
        let report = h.apply_overrides(&subjects(vec![
            SubjectDirective::new("visitor").with_alist(["x", "ghost"])
        ]));
        let member = h.person("visitor").cloned();
        assert_eq!(member.map(|m| m.directory_backed), Some(false));
        assert_eq!(h.memberships("visitor"), strings(&["x"]));
        assert_eq!(report.issues.len(), 2);
    }

    #[test]
    fn test_apply_is_deterministic() {
        let set = subjects(vec![
            SubjectDirective::new("u").with_alist(["all"]),
            SubjectDirective::new("ox")
                .with_alist(["y"])
                .with_mode(MergeMode::Append),
        ]);
        let mut first = hierarchy();
        let mut second = hierarchy();
        first.apply_overrides(&set);
        second.apply_overrides(&set);
        assert_eq!(first, second);
    }

    #[test]
    fn test_identity_map_overrides() {
        let mut map = IdentityMap::new();
        map.grant("s1", "doe_j");
        map.grant("s2", "roe_r");

        let report = map.apply_overrides(&subjects(vec![
            SubjectDirective::new("s1")
                .with_alist(["extra"])
                .with_mode(MergeMode::Append),
            SubjectDirective::new("s2").with_alist(["all"]).with_adef("made_up"),
            SubjectDirective::new("guest").with_alist(["doe_j"]),
        ]));

        assert_eq!(
            map.entry("s1").map(|e| e.accounts.clone()),
            Some(strings(&["doe_j", "extra"]))
        );
        assert_eq!(
            map.entry("s2").map(|e| e.accounts.clone()),
            Some(strings(&["doe_j", "roe_r", "extra"]))
        );
        assert_eq!(
            map.entry("s2").and_then(|e| e.default_account.clone()),
            Some("made_up".to_string())
        );
        assert_eq!(
            map.entry("guest").map(|e| e.accounts.clone()),
            Some(strings(&["doe_j"]))
        );
        assert_eq!(
            report.issues,
            vec![MergeIssue::UnknownSubject {
                username: "guest".to_string()
            }]
        );
    }
}
