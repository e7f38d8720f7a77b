//! Migration assessment
//!
//! A [`MigrationAssessment`] is the classifier's verdict on one resource:
//! whether it needs migrating, how, and what must happen before it.

use azmig_resource::{MigrationType, ResourceIdentifier, ResourceRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Classifier verdict for one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationAssessment {
    /// Resource still uses a retiring SKU or disk type
    pub needs_migration: bool,
    /// Migration that applies to this resource kind
    pub migration_type: MigrationType,
    /// Human-readable explanation
    pub reason: String,
    /// Ordering tier, lower runs first
    pub priority_tier: u8,
    /// Resources that must be migrated or confirmed clean first
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub dependencies: BTreeSet<ResourceIdentifier>,
    /// Resources that must wait for this one (inverted by the planner)
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub dependents: BTreeSet<ResourceIdentifier>,
    /// Operator override suppressed the dependency lookup
    #[serde(default)]
    pub dependency_check_skipped: bool,
    /// Warnings to surface in the report
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl MigrationAssessment {
    /// Create assessment; the tier follows the migration type
    #[must_use]
    pub fn new(migration_type: MigrationType, needs_migration: bool, reason: impl Into<String>) -> Self {
        Self {
            needs_migration,
            migration_type,
            reason: reason.into(),
            priority_tier: migration_type.tier(),
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
            dependency_check_skipped: false,
            warnings: Vec::new(),
        }
    }

    /// Assessment for a resource type with no automatic migration
    #[must_use]
    pub fn unsupported() -> Self {
        Self::new(
            MigrationType::Unsupported,
            false,
            "type not supported for automatic assessment",
        )
    }

    /// With dependency
    #[inline]
    #[must_use]
    pub fn with_dependency(mut self, id: ResourceIdentifier) -> Self {
        self.dependencies.insert(id);
        self
    }

    /// With dependent
    #[inline]
    #[must_use]
    pub fn with_dependent(mut self, id: ResourceIdentifier) -> Self {
        self.dependents.insert(id);
        self
    }

    /// With warning
    #[inline]
    #[must_use]
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Mark the dependency lookup as skipped by override
    #[must_use]
    pub fn with_dependency_check_skipped(self) -> Self {
        let mut assessment = self.with_warning(
            "load balancer dependency check skipped by operator override",
        );
        assessment.dependency_check_skipped = true;
        assessment
    }
}

/// A classified resource: identifier, state snapshot and verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Classified resource
    pub id: ResourceIdentifier,
    /// State read during classification; absent for unsupported types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<ResourceRecord>,
    /// Verdict
    pub assessment: MigrationAssessment,
}

impl Classification {
    /// Create classification
    #[must_use]
    pub fn new(
        id: ResourceIdentifier,
        record: Option<ResourceRecord>,
        assessment: MigrationAssessment,
    ) -> Self {
        Self {
            id,
            record,
            assessment,
        }
    }
}
