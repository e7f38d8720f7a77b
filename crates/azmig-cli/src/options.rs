//! Parsed command line options

use crate::cli::DEFAULT_BACKUP_DIR;
use anyhow::{anyhow, Result};
use azmig_core::MigrationConfig;
use azmig_resource::ResourceIdentifier;
use clap::ArgMatches;
use std::path::PathBuf;

/// Subcommand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Dry run
    Plan,
    /// Execute the plan
    Migrate,
}

/// What to migrate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// One identifier from the command line
    ResourceId(ResourceIdentifier),
    /// Newline-delimited identifier file
    BatchFile(PathBuf),
}

/// Everything a run needs, independent of clap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Subcommand
    pub mode: Mode,
    /// Resources to migrate
    pub target: Target,
    /// Provider inventory
    pub inventory: PathBuf,
    /// Orchestrator settings
    pub config: MigrationConfig,
    /// Print JSON instead of a table
    pub json: bool,
    /// JSON report destination
    pub report: Option<PathBuf>,
    /// Snapshot directory
    pub backup_dir: PathBuf,
    /// Audit log destination
    pub audit_log: Option<PathBuf>,
}

impl RunOptions {
    /// Read options from parsed arguments
    ///
    /// # Errors
    /// Fails on an unknown subcommand or a missing target
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let (mode, args) = match matches.subcommand() {
            Some(("plan", args)) => (Mode::Plan, args),
            Some(("migrate", args)) => (Mode::Migrate, args),
            Some((other, _)) => return Err(anyhow!("unknown command: {other}")),
            None => return Err(anyhow!("no command given")),
        };
        let migrate = mode == Mode::Migrate;

        let target = if let Some(id) = args.get_one::<ResourceIdentifier>("resource-id") {
            Target::ResourceId(id.clone())
        } else if let Some(path) = args.get_one::<PathBuf>("batch-file") {
            Target::BatchFile(path.clone())
        } else {
            return Err(anyhow!("either --resource-id or --batch-file is required"));
        };

        let inventory = args
            .get_one::<PathBuf>("inventory")
            .cloned()
            .ok_or_else(|| anyhow!("--inventory is required"))?;

        let mut config = MigrationConfig::new()
            .with_dry_run(!migrate)
            .with_continue_on_error(args.get_flag("continue-on-error"))
            .with_skip_dependency_check(args.get_flag("skip-dependency-check"));

        if migrate {
            config = config
                .with_force(args.get_flag("force"))
                .with_restart_vms(!args.get_flag("no-restart"));
            if let Some(ms) = args.get_one::<u64>("pacing-ms") {
                config = config.with_pacing_delay_ms(*ms);
            }
            if let Some(ms) = args.get_one::<u64>("retry-backoff-ms") {
                config = config.with_snapshot_retry_backoff_ms(*ms);
            }
        }

        let backup_dir = if migrate {
            args.get_one::<PathBuf>("backup-dir").cloned()
        } else {
            None
        }
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR));

        Ok(Self {
            mode,
            target,
            inventory,
            config,
            json: args.get_flag("json"),
            report: args.get_one::<PathBuf>("report").cloned(),
            backup_dir,
            audit_log: if migrate {
                args.get_one::<PathBuf>("audit-log").cloned()
            } else {
                None
            },
        })
    }
}
