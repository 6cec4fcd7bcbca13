//! Data model: people, principals, accounts and the resolved structures

pub mod account;
pub mod hierarchy;
pub mod ordered;
pub mod person;

pub use account::{default_account_name, derive_account_name, Account, Member};
pub use hierarchy::{AccountHierarchy, IdentityEntry, IdentityMap};
pub use ordered::OrderedMap;
pub use person::{Person, TitleSet};
