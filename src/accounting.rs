//! Accounting-system existence checks
//!
//! Asks the cluster accounting database whether an account or user is
//! already present, by shelling out to `sacctmgr`.

use std::fmt;

use async_trait::async_trait;
use tracing::debug;

use crate::error::AccountingError;

/// Kind of accounting entity to check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Account,
    User,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Account => "account",
            EntityKind::User => "user",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait AccountingCheck: Send + Sync {
    /// Whether `name` exists as `kind` in the accounting system
    async fn exists(&self, kind: EntityKind, name: &str) -> Result<bool, AccountingError>;
}

/// `sacctmgr`-backed existence check
#[derive(Debug, Clone)]
pub struct Sacctmgr {
    program: String,
}

impl Default for Sacctmgr {
    fn default() -> Self {
        Self::new("sacctmgr")
    }
}

impl Sacctmgr {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn args(kind: EntityKind, name: &str) -> Vec<String> {
        ["--parsable", "--immediate", "--quiet", "--noheader", "show", kind.as_str(), name]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

/// True when any `|`-separated row of parsable output starts with `name`
pub fn listing_contains(stdout: &str, name: &str) -> bool {
    stdout
        .lines()
        .filter_map(|line| line.split('|').next())
        .any(|first| first.trim() == name)
}

#[async_trait]
impl AccountingCheck for Sacctmgr {
    async fn exists(&self, kind: EntityKind, name: &str) -> Result<bool, AccountingError> {
        let args = Self::args(kind, name);
        let output = tokio::process::Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|source| AccountingError::Spawn {
                command: self.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(AccountingError::CheckFailed {
                kind: kind.to_string(),
                name: name.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: stderr.lines().last().unwrap_or("unknown error").to_string(),
            });
        }

        let found = listing_contains(&stdout, name);
        debug!(kind = %kind, name, found, "Accounting existence check");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_matches_first_field_only() {
        let stdout = "doe_j|Doe, Jane|genomics|\nroe_r|Roe, Rick|doe_j|\n";
        assert!(listing_contains(stdout, "doe_j"));
        assert!(listing_contains(stdout, "roe_r"));
        assert!(!listing_contains(stdout, "genomics"));
        assert!(!listing_contains("", "doe_j"));
    }

    #[test]
    fn test_command_line() {
        assert_eq!(
            Sacctmgr::args(EntityKind::User, "s1"),
            vec!["--parsable", "--immediate", "--quiet", "--noheader", "show", "user", "s1"]
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let check = Sacctmgr::new("/nonexistent/sacctmgr");
        let err = check.exists(EntityKind::Account, "x").await.unwrap_err();
        assert!(matches!(err, AccountingError::Spawn { .. }));
    }
}
