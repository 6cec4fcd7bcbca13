//! Error handling for the hierarchy engine
//!
//! Fatal conditions are `Result` errors built with thiserror. Recoverable
//! per-entry problems (unresolved subjects, unknown override targets,
//! non-person report entries) are plain values collected into reports,
//! see [`crate::resolve::UnresolvedReason`] and [`crate::overrides::MergeIssue`].

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level error for a run
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Principal search failed: {0}")]
    PrincipalSearch(#[source] DirectoryError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Override error: {0}")]
    Overrides(#[from] OverrideError),

    #[error("Accounting check error: {0}")]
    Accounting(#[from] AccountingError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("{} subject(s) remain unresolved after overrides: {}", .usernames.len(), .usernames.join(", "))]
    UnresolvedSubjects { usernames: Vec<String> },
}

/// Errors raised by a directory collaborator
#[derive(Error, Debug, Clone)]
pub enum DirectoryError {
    #[error("Bind to directory failed: invalid credentials")]
    Authentication,

    #[error("Search base '{base}' not found on server")]
    SearchBaseNotFound { base: String },

    #[error("Referral for search base '{base}' required but referrals are disabled")]
    ReferralRequired { base: String },

    #[error("Directory server error: {message}")]
    Server { message: String },

    #[error("Directory lookup for '{key}' timed out after {timeout:?}")]
    Timeout { key: String, timeout: Duration },

    #[error("Failed to load directory snapshot {path}: {message}")]
    Snapshot { path: PathBuf, message: String },
}

impl DirectoryError {
    /// Whether a failure of a single-entry lookup may be skipped for that entry.
    ///
    /// Only timeouts qualify. Authentication, referral and server errors end
    /// the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DirectoryError::Timeout { .. })
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to open configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration syntax: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Override source errors (malformed individual records are not errors)
#[derive(Error, Debug)]
pub enum OverrideError {
    #[error("Unable to read override source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Override source is not valid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Accounting-system existence check errors
#[derive(Error, Debug)]
pub enum AccountingError {
    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Existence check for {kind} '{name}' failed (exit {code}): {stderr}")]
    CheckFailed {
        kind: String,
        name: String,
        code: i32,
        stderr: String,
    },
}

/// Serialization failure in the structured output formats
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("JSON rendering failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML rendering failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
