//! Migration strategy trait and core types
//!
//! Provides the [`MigrationStrategy`] trait: every resource-specific migration
//! is a `validate` / `execute` / `verify` triple behind this one contract.

use async_trait::async_trait;
use azmig_resource::{MigrationType, ProviderClient, ProviderError, ResourceIdentifier, ResourceRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Migration strategy for one [`MigrationType`]
///
/// # Contract
/// - `validate` is pure: it inspects the record and never calls the provider.
/// - `execute` performs the mutating operation. It may retry transient
///   provider errors it knows about but never validation or authorization
///   failures.
/// - `verify` re-reads provider state and reports a structured outcome; it
///   does not fail, since a failed check after a successful `execute` is a
///   distinct state that needs manual inspection.
#[async_trait]
pub trait MigrationStrategy: Send + Sync + std::fmt::Debug {
    /// Migration type this strategy implements
    fn migration_type(&self) -> MigrationType;

    /// Strategy name (for logs)
    fn name(&self) -> &'static str;

    /// Check execution preconditions
    ///
    /// # Errors
    /// Returns [`StrategyError::UnsupportedScenario`] for configurations this
    /// strategy cannot migrate
    fn validate(&self, record: &ResourceRecord) -> Result<(), StrategyError>;

    /// Perform the migration
    ///
    /// # Preconditions
    /// `validate()` must have returned `Ok` for this record
    ///
    /// # Errors
    /// Returns [`StrategyError::Execution`] naming the provider step that failed
    async fn execute(
        &self,
        record: &ResourceRecord,
        client: &dyn ProviderClient,
        options: &ExecuteOptions,
    ) -> Result<ExecutionHandle, StrategyError>;

    /// Confirm the expected post-condition
    async fn verify(&self, handle: &ExecutionHandle, client: &dyn ProviderClient)
        -> VerificationOutcome;
}

/// Options passed to [`MigrationStrategy::execute`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Fixed back-off before the single retry of a snapshot-limit failure
    pub snapshot_retry_backoff: Duration,
    /// Start VMs again after disk conversion if they were running before
    pub restart_vms: bool,
}

impl ExecuteOptions {
    /// With snapshot retry back-off
    #[inline]
    #[must_use]
    pub fn with_snapshot_retry_backoff(mut self, backoff: Duration) -> Self {
        self.snapshot_retry_backoff = backoff;
        self
    }

    /// With VM restart behavior
    #[inline]
    #[must_use]
    pub fn with_restart_vms(mut self, restart: bool) -> Self {
        self.restart_vms = restart;
        self
    }
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            snapshot_retry_backoff: Duration::from_secs(30),
            restart_vms: true,
        }
    }
}

/// Record of a completed `execute` call, consumed by `verify`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionHandle {
    /// Migrated resource
    pub resource: ResourceIdentifier,
    /// Migration performed
    pub migration_type: MigrationType,
    /// Resource state before execution
    pub baseline: ResourceRecord,
    /// Provider steps performed, in order
    pub steps: Vec<String>,
    /// Provider attempts made, retries included
    pub attempts: u32,
    /// Execution start
    pub started_at: DateTime<Utc>,
    /// Execution end
    pub finished_at: DateTime<Utc>,
}

impl ExecutionHandle {
    /// Start a handle for `baseline`
    #[must_use]
    pub fn begin(migration_type: MigrationType, baseline: &ResourceRecord) -> Self {
        let now = Utc::now();
        Self {
            resource: baseline.id.clone(),
            migration_type,
            baseline: baseline.clone(),
            steps: Vec::new(),
            attempts: 0,
            started_at: now,
            finished_at: now,
        }
    }

    /// Record a provider step
    pub fn step(&mut self, step: impl Into<String>) {
        let step = step.into();
        tracing::debug!(resource = %self.resource, step = %step, "Migration step completed");
        self.steps.push(step);
        self.attempts += 1;
    }

    /// Count a failed attempt that was retried
    pub fn retried(&mut self) {
        self.attempts += 1;
    }

    /// Mark execution finished
    #[must_use]
    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }
}

/// One named post-condition check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationCheck {
    /// Check name
    pub name: String,
    /// Whether it held
    pub passed: bool,
    /// Observed value or failure detail
    pub detail: String,
}

impl VerificationCheck {
    /// Build check from a condition
    #[must_use]
    pub fn new(name: impl Into<String>, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

/// Structured result of [`MigrationStrategy::verify`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// Verified resource
    pub resource: ResourceIdentifier,
    /// Checks performed
    pub checks: Vec<VerificationCheck>,
}

impl VerificationOutcome {
    /// Create empty outcome
    #[must_use]
    pub fn new(resource: ResourceIdentifier) -> Self {
        Self {
            resource,
            checks: Vec::new(),
        }
    }

    /// Outcome when the resource could not be re-read
    #[must_use]
    pub fn unreadable(resource: ResourceIdentifier, error: &ProviderError) -> Self {
        Self::new(resource).check("resource readable", false, error.to_string())
    }

    /// Append a check
    #[must_use]
    pub fn check(mut self, name: impl Into<String>, passed: bool, detail: impl Into<String>) -> Self {
        self.checks.push(VerificationCheck::new(name, passed, detail));
        self
    }

    /// All checks passed (and there was at least one)
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.checks.is_empty() && self.checks.iter().all(|c| c.passed)
    }

    /// Checks that failed
    pub fn failures(&self) -> impl Iterator<Item = &VerificationCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }

    /// One-line summary of failed checks
    #[must_use]
    pub fn failure_summary(&self) -> String {
        if self.checks.is_empty() {
            return "no post-condition checks were performed".to_string();
        }
        self.failures()
            .map(|c| format!("{}: {}", c.name, c.detail))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Strategy errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum StrategyError {
    /// Resource has a configuration this strategy cannot migrate
    #[error("unsupported scenario for {resource}: {reason}")]
    UnsupportedScenario {
        /// Resource validated
        resource: ResourceIdentifier,
        /// Why it cannot be migrated
        reason: String,
    },

    /// A mutating provider call failed
    #[error("{step} failed for {resource} after {attempts} attempt(s): {source}")]
    Execution {
        /// Resource being migrated
        resource: ResourceIdentifier,
        /// Provider step that failed
        step: String,
        /// Provider attempts made, retries included
        attempts: u32,
        /// Underlying provider error
        #[source]
        source: ProviderError,
    },
}

impl StrategyError {
    /// Create unsupported scenario error
    #[inline]
    pub fn unsupported(resource: &ResourceIdentifier, reason: impl Into<String>) -> Self {
        Self::UnsupportedScenario {
            resource: resource.clone(),
            reason: reason.into(),
        }
    }

    /// Create execution error for a failed step
    #[inline]
    pub fn execution(
        handle: &ExecutionHandle,
        step: impl Into<String>,
        source: ProviderError,
    ) -> Self {
        Self::Execution {
            resource: handle.resource.clone(),
            step: step.into(),
            attempts: handle.attempts + 1,
            source,
        }
    }

    /// Check if this is a validation failure
    #[inline]
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedScenario { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azmig_resource::{AvailabilitySetProperties, ResourceProperties, Sku};

    fn record() -> ResourceRecord {
        ResourceRecord::new(
            ResourceIdentifier::new("s", "rg", "Microsoft.Compute", "availabilitySets", "as1").unwrap(),
            "westeurope",
            ResourceProperties::AvailabilitySet(AvailabilitySetProperties {
                sku: Sku::classic(),
                platform_fault_domain_count: 2,
            }),
        )
    }

    #[test]
    fn handle_counts_attempts() {
        let mut handle = ExecutionHandle::begin(MigrationType::AvailabilitySetConversion, &record());
        handle.retried();
        handle.step("apply_sku_change");
        let handle = handle.finish();

        assert_eq!(handle.attempts, 2);
        assert_eq!(handle.steps, vec!["apply_sku_change"]);
        assert!(handle.finished_at >= handle.started_at);
    }

    #[test]
    fn empty_outcome_does_not_pass() {
        let outcome = VerificationOutcome::new(record().id);
        assert!(!outcome.passed());
        assert!(outcome.failure_summary().contains("no post-condition"));
    }

    #[test]
    fn outcome_summarizes_failures() {
        let outcome = VerificationOutcome::new(record().id)
            .check("sku", false, "expected Aligned, found Classic")
            .check("exists", true, "ok");
        assert!(!outcome.passed());
        assert_eq!(outcome.failures().count(), 1);
        assert_eq!(outcome.failure_summary(), "sku: expected Aligned, found Classic");
    }

    #[test]
    fn execution_error_reports_attempts() {
        let handle = ExecutionHandle::begin(MigrationType::AvailabilitySetConversion, &record());
        let err = StrategyError::execution(&handle, "apply_sku_change", ProviderError::Transient("x".into()));
        assert!(err.to_string().contains("after 1 attempt(s)"));
        assert!(!err.is_unsupported());
    }

    #[test]
    fn execute_options_builder() {
        let options = ExecuteOptions::default()
            .with_snapshot_retry_backoff(Duration::ZERO)
            .with_restart_vms(false);
        assert_eq!(options.snapshot_retry_backoff, Duration::ZERO);
        assert!(!options.restart_vms);
    }
}
