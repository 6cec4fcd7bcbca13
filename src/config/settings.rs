//! Run configuration parsing
//!
//! Loads the engine configuration from YAML. JSON configuration files are
//! accepted as well, since every JSON document is valid YAML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::model::TitleSet;

/// Root configuration structure for a run
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Titles that make a person a principal (account owner)
    pub principal_titles: Vec<String>,
    /// Maximum number of manager hops during ascent resolution
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub overrides: Option<OverridesConfig>,
    #[serde(default)]
    pub resolution: ResolutionConfig,
    #[serde(default)]
    pub slurm: SlurmConfig,
}

fn default_max_hops() -> usize {
    10
}

/// Directory snapshot location
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    pub snapshot_path: PathBuf,
}

/// Override source location
#[derive(Debug, Clone, Deserialize)]
pub struct OverridesConfig {
    pub path: PathBuf,
    /// When true an unreadable override source aborts the run
    #[serde(default)]
    pub required: bool,
}

/// Bounded concurrency and per-call timeout for directory lookups
#[derive(Debug, Clone, Deserialize)]
pub struct ResolutionConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_lookup_timeout_secs")]
    pub lookup_timeout_secs: u64,
}

fn default_max_concurrent() -> usize {
    8
}

fn default_lookup_timeout_secs() -> u64 {
    60
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            lookup_timeout_secs: default_lookup_timeout_secs(),
        }
    }
}

impl ResolutionConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }
}

/// A fixed `User -` line in the Slurm load file
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SlurmUserLine {
    pub name: String,
    pub default_account: String,
    /// Raw attribute suffix, e.g. `Fairshare=1`
    #[serde(default)]
    pub attributes: Option<String>,
}

/// A fixed top-level `Account -` line in the Slurm load file
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SlurmAccountLine {
    pub name: String,
    pub description: String,
    pub organization: String,
    #[serde(default)]
    pub attributes: Option<String>,
}

/// Slurm load-file rendering options
#[derive(Debug, Clone, Deserialize)]
pub struct SlurmConfig {
    #[serde(default = "default_cluster")]
    pub cluster: String,
    #[serde(default = "default_root_user")]
    pub root_user: SlurmUserLine,
    #[serde(default)]
    pub top_level_accounts: Vec<SlurmAccountLine>,
    /// Attribute suffix appended to every generated account line
    #[serde(default = "default_account_attributes")]
    pub account_attributes: String,
    /// Attribute suffix appended to every generated user line
    #[serde(default = "default_user_attributes")]
    pub user_attributes: String,
    /// Users added under every generated account
    #[serde(default)]
    pub static_users: Vec<SlurmUserLine>,
}

fn default_cluster() -> String {
    "cluster".to_string()
}

fn default_root_user() -> SlurmUserLine {
    SlurmUserLine {
        name: "root".to_string(),
        default_account: "root".to_string(),
        attributes: Some("AdminLevel='Administrator':Fairshare=1".to_string()),
    }
}

fn default_account_attributes() -> String {
    "Fairshare=10".to_string()
}

fn default_user_attributes() -> String {
    "Fairshare=2147483647".to_string()
}

impl Default for SlurmConfig {
    fn default() -> Self {
        Self {
            cluster: default_cluster(),
            root_user: default_root_user(),
            top_level_accounts: Vec::new(),
            account_attributes: default_account_attributes(),
            user_attributes: default_user_attributes(),
            static_users: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML (or JSON) file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.principal_titles.is_empty() {
            return Err(ConfigError::Invalid(
                "principal_titles must name at least one title".to_string(),
            ));
        }
        if self.max_hops == 0 {
            return Err(ConfigError::Invalid("max_hops must be at least 1".to_string()));
        }
        if self.resolution.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "resolution.max_concurrent must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn title_set(&self) -> TitleSet {
        TitleSet::new(self.principal_titles.iter().cloned())
    }
}
