//! Error types for azmig core
//!
//! Provides error handling for:
//! - Classification (provider reads during assessment)
//! - Planning (cyclic or duplicate dependencies)
//! - Backups (snapshot could not be stored)
//! - State machine transitions
//! - Audit log integrity
//!
//! [`MigrationError`] is the umbrella type. Per-resource failures are folded
//! into a serializable [`FailureKind`] on the migration result.

use crate::state_machine::MigrationState;
use azmig_resource::{IdentifierError, ProviderError, ResourceIdentifier, ResourceKind};
use azmig_strategy::{RegistryError, StrategyError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main migration error type
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Input line is not a resource identifier
    #[error("malformed identifier: {0}")]
    MalformedIdentifier(#[from] IdentifierError),

    /// Provider read failed during assessment
    #[error("classification failed: {0}")]
    Classification(#[from] ClassificationError),

    /// Batch cannot be ordered
    #[error("planning failed: {0}")]
    Plan(#[from] PlanError),

    /// A dependency was not migrated or confirmed clean
    #[error("dependency unresolved for {resource}: {reason}")]
    DependencyUnresolved {
        /// Resource whose dependency check failed
        resource: ResourceIdentifier,
        /// What was wrong
        reason: String,
    },

    /// No strategy for the migration type
    #[error("strategy lookup failed: {0}")]
    Registry(#[from] RegistryError),

    /// Validation or execution failed
    #[error(transparent)]
    Strategy(#[from] StrategyError),

    /// Snapshot could not be stored
    #[error("backup failed: {0}")]
    Backup(#[from] BackupError),

    /// Post-condition not met after execution
    #[error("verification failed for {resource}: {summary}")]
    VerificationFailure {
        /// Migrated resource
        resource: ResourceIdentifier,
        /// Failed checks
        summary: String,
    },

    /// Illegal state transition
    #[error("state machine error: {0}")]
    Transition(#[from] TransitionError),
}

impl MigrationError {
    /// Per-resource failure category
    #[must_use]
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::DependencyUnresolved { .. } => FailureKind::DependencyUnresolved,
            Self::Classification(_) | Self::MalformedIdentifier(_) => FailureKind::Classification,
            Self::Registry(_) | Self::Strategy(StrategyError::UnsupportedScenario { .. }) => {
                FailureKind::UnsupportedScenario
            }
            Self::Strategy(StrategyError::Execution { .. }) => FailureKind::ExecutionError,
            Self::Backup(_) => FailureKind::BackupFailure,
            Self::VerificationFailure { .. } => FailureKind::VerificationFailure,
            Self::Plan(_) | Self::Transition(_) => FailureKind::Internal,
        }
    }
}

/// Category of a failed migration result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Dependency neither migrated nor confirmed clean
    DependencyUnresolved,
    /// Resource could not be re-read before execution
    Classification,
    /// Known-unsupported configuration, or no strategy
    UnsupportedScenario,
    /// Snapshot failed; execution was not attempted
    BackupFailure,
    /// Mutating provider call failed
    ExecutionError,
    /// Execution succeeded but the post-condition does not hold
    VerificationFailure,
    /// Orchestrator bug
    Internal,
}

impl FailureKind {
    /// The mutating step already happened; a human has to look
    #[inline]
    #[must_use]
    pub fn needs_manual_verification(self) -> bool {
        matches!(self, Self::VerificationFailure)
    }
}

/// Classification errors
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    /// Provider read failed
    #[error("could not read {resource}: {source}")]
    Provider {
        /// Resource being classified
        resource: ResourceIdentifier,
        /// Underlying provider error
        #[source]
        source: ProviderError,
    },

    /// Provider returned attributes for another kind of resource
    #[error("{resource} was reported as {found:?}, expected {expected}")]
    KindMismatch {
        /// Resource being classified
        resource: ResourceIdentifier,
        /// Kind implied by the identifier
        expected: ResourceKind,
        /// Kind the provider reported
        found: Option<ResourceKind>,
    },
}

impl ClassificationError {
    /// Wrap a provider error
    #[inline]
    pub fn provider(resource: &ResourceIdentifier, source: ProviderError) -> Self {
        Self::Provider {
            resource: resource.clone(),
            source,
        }
    }

    /// Check if the underlying cause is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider { source, .. } if source.is_retryable())
    }
}

/// Planning errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// Dependency edges form a cycle
    #[error("cyclic dependency between: {}", display_ids(participants))]
    CyclicDependency {
        /// Resources on the cycle
        participants: Vec<ResourceIdentifier>,
    },

    /// Same resource appears twice
    #[error("duplicate resource in batch: {0}")]
    DuplicateResource(ResourceIdentifier),
}

fn display_ids(ids: &[ResourceIdentifier]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Backup errors
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// Filesystem operation failed
    #[error("i/o error at {path}: {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Snapshot could not be serialized
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Every candidate file name is taken
    #[error("no free backup file name under {0}")]
    NameExhausted(PathBuf),

    /// Store rejected the snapshot
    #[error("backup store unavailable: {0}")]
    Unavailable(String),
}

impl BackupError {
    /// I/O error helper
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// State machine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// Transition not in the table
    #[error("illegal state transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current state
        from: MigrationState,
        /// Requested state
        to: MigrationState,
    },
}

/// Audit log errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuditError {
    /// Hash chain broken at an entry
    #[error("audit log integrity violation at entry {sequence}")]
    IntegrityViolation {
        /// Sequence number of the first bad entry
        sequence: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use azmig_strategy::ExecutionHandle;

    fn lb() -> ResourceIdentifier {
        ResourceIdentifier::new("s", "rg", "Microsoft.Network", "loadBalancers", "lb1").unwrap()
    }

    #[test]
    fn failure_kinds() {
        let unresolved = MigrationError::DependencyUnresolved {
            resource: lb(),
            reason: "x".into(),
        };
        assert_eq!(unresolved.failure_kind(), FailureKind::DependencyUnresolved);

        let unsupported = MigrationError::from(StrategyError::unsupported(&lb(), "IPv6"));
        assert_eq!(unsupported.failure_kind(), FailureKind::UnsupportedScenario);

        let backup = MigrationError::from(BackupError::Unavailable("disk full".into()));
        assert_eq!(backup.failure_kind(), FailureKind::BackupFailure);

        let verification = MigrationError::VerificationFailure {
            resource: lb(),
            summary: "sku: sku is Basic".into(),
        };
        assert!(verification.failure_kind().needs_manual_verification());
        assert!(!FailureKind::ExecutionError.needs_manual_verification());
    }

    #[test]
    fn execution_error_kind() {
        let record = azmig_resource::ResourceRecord::new(
            lb(),
            "westeurope",
            azmig_resource::ResourceProperties::Other(serde_json::Value::Null),
        );
        let handle = ExecutionHandle::begin(azmig_resource::MigrationType::LoadBalancerUpgrade, &record);
        let err = MigrationError::from(StrategyError::execution(
            &handle,
            "create_replacement_resource",
            ProviderError::Transient("timeout".into()),
        ));
        assert_eq!(err.failure_kind(), FailureKind::ExecutionError);
        assert!(err.to_string().starts_with("create_replacement_resource failed"));
    }

    #[test]
    fn cycle_names_participants() {
        let err = PlanError::CyclicDependency {
            participants: vec![lb()],
        };
        assert!(err.to_string().contains("loadBalancers/lb1"));
        assert_eq!(MigrationError::from(err).failure_kind(), FailureKind::Internal);
    }

    #[test]
    fn classification_retryable() {
        let err = ClassificationError::provider(&lb(), ProviderError::Transient("429".into()));
        assert!(err.is_retryable());
        let err = ClassificationError::provider(&lb(), ProviderError::NotFound(lb()));
        assert!(!err.is_retryable());
    }
}
