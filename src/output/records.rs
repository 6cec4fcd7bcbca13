//! Produced-output records
//!
//! These are the formatting contract: renderers read only these records and
//! never the engine structures, so every output format carries the same
//! content in the same order.

use std::collections::HashSet;

use serde::Serialize;

use crate::model::{AccountHierarchy, IdentityMap};

/// One account in the account-hierarchy variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountRecord {
    pub account_name: String,
    pub owner_username: String,
    pub owner_display_name: String,
    pub owner_division: Option<String>,
    /// Member usernames in membership order
    pub members: Vec<String>,
}

/// One person referenced by the account-hierarchy variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberRecord {
    pub username: String,
    pub default_account: Option<String>,
}

/// One subject in the identity-mapping variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityRecord {
    pub username: String,
    pub accounts: Vec<String>,
    pub default_account: Option<String>,
}

/// Account and member records of a finished account hierarchy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HierarchyRecords {
    pub accounts: Vec<AccountRecord>,
    pub members: Vec<MemberRecord>,
}

impl HierarchyRecords {
    /// Accounts in account order; members are every owner and member, in
    /// the order they became known to the run. People that belong to no
    /// account (an override placeholder whose list ended up empty) are left
    /// out.
    pub fn from_hierarchy(hierarchy: &AccountHierarchy) -> Self {
        let accounts: Vec<AccountRecord> = hierarchy
            .accounts()
            .map(|account| {
                let owner = hierarchy.person(&account.owner);
                AccountRecord {
                    account_name: account.name.clone(),
                    owner_username: account.owner.clone(),
                    owner_display_name: owner.map(|o| o.display_name.clone()).unwrap_or_default(),
                    owner_division: owner.and_then(|o| o.division.clone()),
                    members: account.members().to_vec(),
                }
            })
            .collect();

        let mut records = HierarchyRecords {
            accounts,
            members: Vec::new(),
        };
        records.members = hierarchy
            .people()
            .filter(|p| records.references(&p.username))
            .map(|p| MemberRecord {
                username: p.username.clone(),
                default_account: hierarchy.effective_default(&p.username),
            })
            .collect();
        records
    }

    fn references(&self, username: &str) -> bool {
        self.accounts
            .iter()
            .any(|a| a.owner_username == username || a.members.iter().any(|m| m == username))
    }

    pub fn member(&self, username: &str) -> Option<&MemberRecord> {
        self.members.iter().find(|m| m.username == username)
    }

    pub fn account(&self, name: &str) -> Option<&AccountRecord> {
        self.accounts.iter().find(|a| a.account_name == name)
    }

    /// Keep only accounts matching `keep`, dropping members no remaining
    /// account references
    pub fn retain_accounts(&mut self, keep: impl FnMut(&AccountRecord) -> bool) {
        self.accounts.retain(keep);
        let referenced: HashSet<String> = self
            .accounts
            .iter()
            .flat_map(|a| std::iter::once(&a.owner_username).chain(a.members.iter()))
            .cloned()
            .collect();
        self.members.retain(|m| referenced.contains(&m.username));
    }
}

/// Identity records in subject order
pub fn identity_records(map: &IdentityMap) -> Vec<IdentityRecord> {
    map.entries()
        .map(|entry| IdentityRecord {
            username: entry.username.clone(),
            accounts: entry.accounts.clone(),
            default_account: entry
                .default_account
                .clone()
                .or_else(|| entry.accounts.first().cloned()),
        })
        .collect()
}
