//! org_accounts command line interface
//!
//! # Usage
//!
//! ```bash
//! # Slurm load file for every account
//! org_accounts --config accounts.yaml hierarchy > load.cfg
//!
//! # Only accounts not yet in the accounting database
//! org_accounts hierarchy --new-only
//!
//! # Identity map lines
//! org_accounts identities --format mwm
//!
//! # Accounts for particular users
//! org_accounts lookup "alice, bob" carol --strict
//!
//! # Does an account exist?
//! org_accounts check account doe_j
//! ```

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use org_accounts::accounting::{AccountingCheck, EntityKind, Sacctmgr};
use org_accounts::config::EngineConfig;
use org_accounts::output::{self, identity, identity_records, slurm, HierarchyRecords};
use org_accounts::{
    parse_subject_list, CachedDirectory, DirectiveSet, HierarchyEngine, SnapshotDirectory,
};

/// Default configuration path
const DEFAULT_CONFIG_PATH: &str = "config/org_accounts.yaml";

#[derive(Parser)]
#[command(name = "org_accounts")]
#[command(version)]
#[command(about = "Derive cluster accounts from the organizational directory")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (YAML or JSON)
    #[arg(
        long,
        short,
        global = true,
        env = "ORG_ACCOUNTS_CONFIG",
        default_value = DEFAULT_CONFIG_PATH
    )]
    config: PathBuf,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    debug: bool,

    /// Also append logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Account hierarchy for the accounting system
    Hierarchy {
        #[arg(long, short, value_enum, default_value = "slurm")]
        format: HierarchyFormat,

        /// Omit accounts that already exist in the accounting database
        #[arg(long)]
        new_only: bool,
    },

    /// Account list for every subject
    Identities {
        #[arg(long, short, value_enum, default_value = "mwm")]
        format: IdentityFormat,
    },

    /// Account list for the given usernames
    Lookup {
        /// Usernames, separately or comma-separated
        #[arg(required = true)]
        usernames: Vec<String>,

        #[arg(long, short, value_enum, default_value = "json")]
        format: IdentityFormat,

        /// Fail when any username ends up without accounts
        #[arg(long)]
        strict: bool,
    },

    /// Check whether an account or user exists in the accounting database
    Check {
        #[arg(value_enum)]
        kind: CheckKind,
        name: String,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HierarchyFormat {
    Slurm,
    Json,
    Yaml,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum IdentityFormat {
    Mwm,
    Json,
    Yaml,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CheckKind {
    Account,
    User,
}

impl From<CheckKind> for EntityKind {
    fn from(kind: CheckKind) -> Self {
        match kind {
            CheckKind::Account => EntityKind::Account,
            CheckKind::User => EntityKind::User,
        }
    }
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.debug, cli.log_file.as_deref()) {
        eprintln!("{}: {:#}", "error".red().bold(), e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Run failed");
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let default_filter = if debug {
        "org_accounts=debug"
    } else {
        "org_accounts=info"
    };
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("unable to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(filter()),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter()),
        )
        .with(file_layer)
        .try_init()
        .context("failed to install log subscriber")?;
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let started = Instant::now();
    tracing::info!(
        start = %chrono::Utc::now().to_rfc3339(),
        config = %cli.config.display(),
        "Starting run"
    );

    let config = EngineConfig::from_file(&cli.config)
        .with_context(|| format!("loading configuration {}", cli.config.display()))?;

    let (text, records) = match cli.command {
        Commands::Check { kind, name } => {
            let kind = EntityKind::from(kind);
            let exists = Sacctmgr::default().exists(kind, &name).await?;
            if exists {
                println!("{} {} {} exists", "OK".green(), kind, name);
            } else {
                println!("{} {} {} does not exist", "MISSING".yellow(), kind, name);
            }
            return Ok(());
        }
        Commands::Hierarchy { format, new_only } => {
            let engine = build_engine(&config)?;
            let directives = load_overrides(&config)?;
            let (hierarchy, _) = engine.build_account_hierarchy(&directives).await?;
            let mut records = HierarchyRecords::from_hierarchy(&hierarchy);

            if new_only {
                let existing = existing_accounts(&records).await?;
                records.retain_accounts(|a| !existing.contains(&a.account_name));
            }

            let text = match format {
                HierarchyFormat::Slurm => slurm::render(&records, &config.slurm),
                HierarchyFormat::Json => output::to_json(&records)?,
                HierarchyFormat::Yaml => output::to_yaml(&records)?,
            };
            (text, records.accounts.len())
        }
        Commands::Identities { format } => {
            let engine = build_engine(&config)?;
            let directives = load_overrides(&config)?;
            let (map, _) = engine.build_identity_map(&directives).await?;
            let records = identity_records(&map);
            (render_identities(&records, format)?, records.len())
        }
        Commands::Lookup {
            usernames,
            format,
            strict,
        } => {
            let usernames = parse_subject_list(&usernames);
            let engine = build_engine(&config)?;
            let directives = load_overrides(&config)?;
            let outcome = engine.lookup_subjects(&usernames, &directives).await?;
            if strict {
                outcome.ensure_resolved()?;
            }
            let records = identity_records(&outcome.identities);
            (render_identities(&records, format)?, records.len())
        }
    };

    print!("{}", text);
    tracing::info!(
        records,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Wrote records"
    );
    Ok(())
}

fn build_engine(config: &EngineConfig) -> Result<HierarchyEngine> {
    let snapshot = SnapshotDirectory::from_file(&config.directory.snapshot_path)?;
    let directory = CachedDirectory::new(snapshot, config.resolution.lookup_timeout());
    Ok(HierarchyEngine::from_config(Arc::new(directory), config))
}

/// Override directives; an unreadable source is fatal only when required
fn load_overrides(config: &EngineConfig) -> Result<DirectiveSet> {
    let Some(overrides) = &config.overrides else {
        return Ok(DirectiveSet::default());
    };
    match DirectiveSet::from_file(&overrides.path) {
        Ok(set) => Ok(set),
        Err(e) if !overrides.required => {
            tracing::warn!(path = %overrides.path.display(), error = %e, "Overrides unavailable, continuing without them");
            Ok(DirectiveSet::default())
        }
        Err(e) => Err(e).context("override source is required"),
    }
}

async fn existing_accounts(records: &HierarchyRecords) -> Result<Vec<String>> {
    let check = Sacctmgr::default();
    let mut existing = Vec::new();
    for account in &records.accounts {
        if check
            .exists(EntityKind::Account, &account.account_name)
            .await
            .with_context(|| format!("checking account {}", account.account_name))?
        {
            tracing::debug!(account = %account.account_name, "Account already exists");
            existing.push(account.account_name.clone());
        }
    }
    Ok(existing)
}

fn render_identities(
    records: &[output::IdentityRecord],
    format: IdentityFormat,
) -> Result<String> {
    Ok(match format {
        IdentityFormat::Mwm => identity::render(records),
        IdentityFormat::Json => output::to_json(records)?,
        IdentityFormat::Yaml => output::to_yaml(records)?,
    })
}
