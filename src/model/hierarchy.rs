//! Resolved structures produced by the engine passes
//!
//! [`AccountHierarchy`] is the account-hierarchy variant (one account per
//! principal, with members). [`IdentityMap`] is the identity-mapping variant
//! (one entry per subject, with its account list).

use serde::Serialize;

use super::account::{Account, Member};
use super::ordered::OrderedMap;

/// Accounts and the people they reference, both in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountHierarchy {
    accounts: OrderedMap<Account>,
    people: OrderedMap<Member>,
}

impl AccountHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn account(&self, name: &str) -> Option<&Account> {
        self.accounts.get(name)
    }

    pub fn account_mut(&mut self, name: &str) -> Option<&mut Account> {
        self.accounts.get_mut(name)
    }

    pub fn has_account(&self, name: &str) -> bool {
        self.accounts.contains_key(name)
    }

    pub fn account_names(&self) -> Vec<String> {
        self.accounts.keys().map(str::to_string).collect()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Insert an account, replacing any account of the same name in place
    pub fn insert_account(&mut self, account: Account) -> Option<Account> {
        self.accounts.insert(account.name.clone(), account)
    }

    pub fn accounts_mut(&mut self) -> impl Iterator<Item = &mut Account> {
        self.accounts.values_mut()
    }

    pub fn people(&self) -> impl Iterator<Item = &Member> {
        self.people.values()
    }

    pub fn person(&self, username: &str) -> Option<&Member> {
        self.people.get(username)
    }

    pub fn person_mut(&mut self, username: &str) -> Option<&mut Member> {
        self.people.get_mut(username)
    }

    /// Record a person unless the username is already known; the first
    /// record (and its default account) wins.
    pub fn insert_person_if_absent(&mut self, member: Member) -> bool {
        if self.people.contains_key(&member.username) {
            return false;
        }
        self.people.insert(member.username.clone(), member);
        true
    }

    /// Names of the accounts `username` is a member of, in account order
    pub fn memberships(&self, username: &str) -> Vec<String> {
        self.accounts
            .values()
            .filter(|a| a.has_member(username))
            .map(|a| a.name.clone())
            .collect()
    }

    /// Default account for a person: the explicit one, else the first
    /// account it belongs to, else an account it owns.
    pub fn effective_default(&self, username: &str) -> Option<String> {
        if let Some(default) = self
            .people
            .get(username)
            .and_then(|m| m.default_account.clone())
        {
            return Some(default);
        }
        self.accounts
            .values()
            .find(|a| a.has_member(username))
            .or_else(|| self.accounts.values().find(|a| a.owner == username))
            .map(|a| a.name.clone())
    }
}

/// One subject in the identity-mapping variant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdentityEntry {
    pub username: String,
    pub accounts: Vec<String>,
    pub default_account: Option<String>,
}

/// Per-subject account lists plus the accounts known to the run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityMap {
    entries: OrderedMap<IdentityEntry>,
    known_accounts: Vec<String>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> impl Iterator<Item = &IdentityEntry> {
        self.entries.values()
    }

    pub fn entry(&self, username: &str) -> Option<&IdentityEntry> {
        self.entries.get(username)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get or create the entry for `username` (created with no accounts)
    pub fn entry_mut(&mut self, username: &str) -> &mut IdentityEntry {
        self.entries.get_or_insert_with(username, || IdentityEntry {
            username: username.to_string(),
            ..Default::default()
        })
    }

    pub fn contains(&self, username: &str) -> bool {
        self.entries.contains_key(username)
    }

    pub fn known_accounts(&self) -> &[String] {
        &self.known_accounts
    }

    pub fn add_known_account(&mut self, name: &str) {
        if !self.known_accounts.iter().any(|a| a == name) {
            self.known_accounts.push(name.to_string());
        }
    }

    /// Grant `username` access to `account`; the first grant becomes the default
    pub fn grant(&mut self, username: &str, account: &str) {
        self.add_known_account(account);
        let entry = self.entry_mut(username);
        if !entry.accounts.iter().any(|a| a == account) {
            entry.accounts.push(account.to_string());
        }
        if entry.default_account.is_none() {
            entry.default_account = Some(account.to_string());
        }
    }
}
