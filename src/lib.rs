//! org-accounts - cluster accounts from an organizational directory
//!
//! Every employee's reporting chain is resolved to a sponsoring principal (a
//! person holding a qualifying title), every principal's subordinates are
//! collected into that principal's account, and administrator override
//! directives are merged on top.
//!
//! ## Flow
//! Directory -> principal search -> descent per principal -> provisional
//! structure -> override merge -> output records -> renderer
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use org_accounts::{DirectiveSet, HierarchyEngine, SnapshotDirectory, TitleSet};
//! use org_accounts::output::{slurm, HierarchyRecords};
//! use org_accounts::config::SlurmConfig;
//!
//! # async fn run() -> org_accounts::Result<()> {
//! let directory = SnapshotDirectory::from_file("directory.yaml")?;
//! let engine = HierarchyEngine::new(Arc::new(directory), TitleSet::new(["Professor"]));
//! let overrides = DirectiveSet::from_file("overrides.yaml")?;
//!
//! let (hierarchy, _report) = engine.build_account_hierarchy(&overrides).await?;
//! let records = HierarchyRecords::from_hierarchy(&hierarchy);
//! print!("{}", slurm::render(&records, &SlurmConfig::default()));
//! # Ok(())
//! # }
//! ```

pub mod accounting;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod model;
pub mod output;
pub mod overrides;
pub mod resolve;

pub use config::EngineConfig;
pub use directory::{CachedDirectory, Directory, SnapshotDirectory};
pub use engine::{parse_subject_list, HierarchyEngine, LookupOutcome};
pub use error::{EngineError, Result};
pub use model::{AccountHierarchy, IdentityMap, Person, TitleSet};
pub use overrides::{DirectiveSet, MergeMode, MergeReport};
pub use resolve::{Sponsorship, UnresolvedReason};
