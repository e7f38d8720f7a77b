//! Migration results and the batch report
//!
//! Every plan entry yields exactly one [`MigrationResult`]. The
//! [`BatchReport`] is the terminal artifact of a run: JSON for tooling, a
//! plain text table for people, and the process exit code.

use crate::backup::BackupReference;
use crate::batch::RejectedInput;
use crate::error::FailureKind;
use crate::planner::PlannedEdge;
use crate::state_machine::MigrationState;
use azmig_resource::{MigrationType, ResourceIdentifier};
use azmig_strategy::VerificationOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter, Write as _};
use uuid::Uuid;

/// Outcome for one plan entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Resource
    pub resource: ResourceIdentifier,
    /// Migration type
    pub migration_type: MigrationType,
    /// Final state
    pub state: MigrationState,
    /// Migrated and verified
    pub success: bool,
    /// No migration needed
    pub skipped: bool,
    /// Failure category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Error message for failures, reason for skips and pending entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Pre-migration snapshot, when one was taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<BackupReference>,
    /// Post-condition checks, when verification ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationOutcome>,
    /// Assessment warnings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Dependencies outside the batch that must already be clean
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_dependencies: Vec<ResourceIdentifier>,
    /// First transition out of Pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Arrival in a terminal state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl MigrationResult {
    /// Result for an entry that has not been attempted
    #[must_use]
    pub fn pending(resource: ResourceIdentifier, migration_type: MigrationType) -> Self {
        Self {
            resource,
            migration_type,
            state: MigrationState::Pending,
            success: false,
            skipped: false,
            failure: None,
            message: None,
            backup: None,
            verification: None,
            warnings: Vec::new(),
            external_dependencies: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Failed and needs a human to inspect the already-mutated resource
    #[must_use]
    pub fn needs_manual_verification(&self) -> bool {
        self.failure.is_some_and(FailureKind::needs_manual_verification)
    }
}

/// Aggregate counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCounts {
    /// All entries
    pub total: usize,
    /// Succeeded
    pub succeeded: usize,
    /// Skipped
    pub skipped: usize,
    /// Failed
    pub failed: usize,
    /// Never attempted
    pub pending: usize,
}

/// Terminal artifact of one orchestrator run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Run id
    pub run_id: Uuid,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run end
    pub finished_at: DateTime<Utc>,
    /// Plan-only run
    pub dry_run: bool,
    /// One result per plan entry, in plan order
    pub results: Vec<MigrationResult>,
    /// Input lines left out of the plan
    #[serde(default)]
    pub rejected: Vec<RejectedInput>,
    /// Dependency edges of the plan
    #[serde(default)]
    pub edges: Vec<PlannedEdge>,
    /// Why remaining entries were not attempted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halt_reason: Option<String>,
}

impl BatchReport {
    /// Aggregate counts
    #[must_use]
    pub fn counts(&self) -> ReportCounts {
        self.results.iter().fold(
            ReportCounts {
                total: self.results.len(),
                ..ReportCounts::default()
            },
            |mut counts, r| {
                match r.state {
                    MigrationState::Succeeded => counts.succeeded += 1,
                    MigrationState::Skipped => counts.skipped += 1,
                    MigrationState::Failed => counts.failed += 1,
                    _ => counts.pending += 1,
                }
                counts
            },
        )
    }

    /// Result for a resource
    #[must_use]
    pub fn result(&self, id: &ResourceIdentifier) -> Option<&MigrationResult> {
        self.results.iter().find(|r| &r.resource == id)
    }

    /// Backups taken during the run
    pub fn backups(&self) -> impl Iterator<Item = &BackupReference> {
        self.results.iter().filter_map(|r| r.backup.as_ref())
    }

    /// Process exit code: 0 iff nothing failed
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(self.counts().failed > 0)
    }

    /// Pretty JSON
    ///
    /// # Errors
    /// Returns the serialization error, if any
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Plain text table
    #[must_use]
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let width = self
            .results
            .iter()
            .map(|r| r.resource.resource_name().len())
            .max()
            .unwrap_or(0)
            .max("RESOURCE".len());

        let _ = writeln!(
            out,
            "{:<4} {:<width$} {:<26} {:<15} DETAIL",
            "#", "RESOURCE", "MIGRATION", "STATE"
        );
        for (i, r) in self.results.iter().enumerate() {
            let mut detail = match (&r.message, &r.backup) {
                (Some(m), Some(b)) => format!("{m} (backup: {b})"),
                (Some(m), None) => m.clone(),
                (None, Some(b)) => format!("backup: {b}"),
                (None, None) => String::new(),
            };
            if r.needs_manual_verification() {
                detail.insert_str(0, "NEEDS MANUAL VERIFICATION: ");
            }
            let _ = writeln!(
                out,
                "{:<4} {:<width$} {:<26} {:<15} {}",
                i + 1,
                r.resource.resource_name(),
                r.migration_type,
                r.state,
                detail
            );
        }

        if !self.edges.is_empty() {
            let _ = writeln!(out, "\nDependencies:");
            for edge in &self.edges {
                let _ = writeln!(
                    out,
                    "  {} -> {}",
                    edge.from.resource_name(),
                    edge.to.resource_name()
                );
            }
        }

        let external: Vec<_> = self
            .results
            .iter()
            .filter(|r| !r.external_dependencies.is_empty())
            .collect();
        if !external.is_empty() {
            let _ = writeln!(out, "\nOutside the batch:");
            for r in external {
                let deps: Vec<_> = r.external_dependencies.iter().map(ToString::to_string).collect();
                let _ = writeln!(
                    out,
                    "  {} requires {}",
                    r.resource.resource_name(),
                    deps.join(", ")
                );
            }
        }

        if !self.rejected.is_empty() {
            let _ = writeln!(out, "\nRejected input:");
            for r in &self.rejected {
                let _ = writeln!(out, "  line {} ({:?}): {}: {}", r.line, r.stage, r.input, r.reason);
            }
        }

        let counts = self.counts();
        let _ = writeln!(
            out,
            "\n{} total: {} succeeded, {} skipped, {} failed, {} pending",
            counts.total, counts.succeeded, counts.skipped, counts.failed, counts.pending
        );
        if let Some(reason) = &self.halt_reason {
            let _ = writeln!(out, "Halted: {reason}");
        }
        if self.dry_run {
            let _ = writeln!(out, "Dry run: no resources were changed.");
        }
        out
    }
}

impl Display for BatchReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_table())
    }
}
