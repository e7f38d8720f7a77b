//! azmig Core - retiring-SKU migration orchestrator
//!
//! Takes a batch of resource identifiers and:
//! - Classifies each resource (does it still use a retiring SKU or disk type?)
//! - Orders the batch so dependencies migrate first
//! - Stores a backup snapshot before any mutating call
//! - Runs each migration through a validate / execute / verify strategy
//! - Reports one result per resource
//!
//! # Example
//!
//! ```rust,ignore
//! use azmig_core::{FileBackupStore, MigrationConfig, Orchestrator};
//! use azmig_resource::InMemoryProvider;
//! use std::sync::Arc;
//!
//! # async fn example(inventory: &str, batch: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Arc::new(InMemoryProvider::from_inventory_json(inventory)?);
//! let backups = Arc::new(FileBackupStore::new("./migration-backups"));
//!
//! let orchestrator = Orchestrator::new(provider, backups)
//!     .with_config(MigrationConfig::new().with_dry_run(true));
//!
//! let report = orchestrator.run_batch(batch).await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod assessment;
pub mod backup;
pub mod batch;
pub mod classifier;
pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod planner;
pub mod report;
pub mod state_machine;

pub use assessment::{Classification, MigrationAssessment};
pub use backup::{BackupRecorder, BackupReference, BackupSnapshot, FileBackupStore};
pub use batch::{BatchInput, RejectedInput, RejectionStage};
pub use classifier::Classifier;
pub use config::MigrationConfig;
pub use control::{AutoConfirm, Confirmation, ConfirmationRequest, StopSignal};
pub use error::{
    AuditError, BackupError, ClassificationError, FailureKind, MigrationError, PlanError,
    TransitionError,
};
pub use events::{
    verify_chain, AuditEntry, AuditLog, MigrationEvent, MigrationLogger, TeeLogger, TracingLogger,
};
pub use orchestrator::Orchestrator;
pub use planner::{EdgeKind, MigrationPlan, PlanEntry, PlannedEdge};
pub use report::{BatchReport, MigrationResult, ReportCounts};
pub use state_machine::{allowed_transitions, validate_transition, MigrationState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
