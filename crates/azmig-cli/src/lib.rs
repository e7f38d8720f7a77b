//! azmig command line front end
//!
//! A thin wrapper over `azmig-core`: parse flags, load the inventory, run the
//! orchestrator, print the report. The binary lives in `main.rs`.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cli;
pub mod options;
pub mod prompt;
pub mod run;

pub use cli::command;
pub use options::{Mode, RunOptions, Target};
pub use prompt::StdinConfirmation;
pub use run::{execute, render};

/// Exit code for usage errors and fatal pipeline errors
pub const EXIT_FATAL: i32 = 2;
