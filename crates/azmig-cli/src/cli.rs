//! Command line definition

use azmig_resource::ResourceIdentifier;
use clap::{value_parser, Arg, ArgAction, ArgGroup, Command};
use std::path::PathBuf;

/// Default directory for backup snapshots
pub const DEFAULT_BACKUP_DIR: &str = "./migration-backups";

fn target_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("resource-id")
            .long("resource-id")
            .value_name("ID")
            .value_parser(value_parser!(ResourceIdentifier))
            .help("Single resource identifier"),
    )
    .arg(
        Arg::new("batch-file")
            .long("batch-file")
            .value_name("PATH")
            .value_parser(value_parser!(PathBuf))
            .help("File with one resource identifier per line ('#' starts a comment)"),
    )
    .group(
        ArgGroup::new("target")
            .args(["resource-id", "batch-file"])
            .required(true),
    )
    .arg(
        Arg::new("inventory")
            .long("inventory")
            .value_name("PATH")
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help("JSON inventory backing the provider"),
    )
    .arg(
        Arg::new("continue-on-error")
            .long("continue-on-error")
            .action(ArgAction::SetTrue)
            .help("Keep going after a failed resource"),
    )
    .arg(
        Arg::new("skip-dependency-check")
            .long("skip-dependency-check")
            .action(ArgAction::SetTrue)
            .help("Do not look for Basic load balancers referencing a public IP (operator risk)"),
    )
    .arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print the report as JSON"),
    )
    .arg(
        Arg::new("report")
            .long("report")
            .value_name("PATH")
            .value_parser(value_parser!(PathBuf))
            .help("Also write the JSON report to a file"),
    )
}

/// Build the `azmig` command
#[must_use]
pub fn command() -> Command {
    Command::new("azmig")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Dependency-aware migration of retiring Azure SKUs")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Raise log verbosity (-v debug, -vv trace)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(target_args(
            Command::new("plan").about("Classify and order resources without changing anything"),
        ))
        .subcommand(
            target_args(Command::new("migrate").about("Back up and migrate resources in plan order"))
                .arg(
                    Arg::new("force")
                        .long("force")
                        .action(ArgAction::SetTrue)
                        .help("Do not ask for confirmation"),
                )
                .arg(
                    Arg::new("backup-dir")
                        .long("backup-dir")
                        .value_name("DIR")
                        .default_value(DEFAULT_BACKUP_DIR)
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory for pre-migration snapshots"),
                )
                .arg(
                    Arg::new("pacing-ms")
                        .long("pacing-ms")
                        .default_value("2000")
                        .value_parser(value_parser!(u64))
                        .help("Pause between successive migrations"),
                )
                .arg(
                    Arg::new("retry-backoff-ms")
                        .long("retry-backoff-ms")
                        .default_value("30000")
                        .value_parser(value_parser!(u64))
                        .help("Back-off before retrying a snapshot-limit failure"),
                )
                .arg(
                    Arg::new("no-restart")
                        .long("no-restart")
                        .action(ArgAction::SetTrue)
                        .help("Leave converted VMs deallocated"),
                )
                .arg(
                    Arg::new("audit-log")
                        .long("audit-log")
                        .value_name("PATH")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write the hash-chained event log as JSON lines"),
                ),
        )
}
