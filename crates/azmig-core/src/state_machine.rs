//! Per-resource migration state machine
//!
//! ```text
//! Pending -> Skipped
//! Pending -> DependencyCheck -> BackingUp -> Executing -> Verifying -> Succeeded
//!                  |               |            |            |
//!                  +---------------+------------+------------+--> Failed
//!                  |
//!                  +--> Skipped (already migrated when re-read)
//! ```

use crate::error::TransitionError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Migration state of one plan entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MigrationState {
    /// Not attempted
    Pending,
    /// Checking dependencies and preconditions
    DependencyCheck,
    /// Taking the pre-migration snapshot
    BackingUp,
    /// Strategy is mutating the resource
    Executing,
    /// Checking the post-condition
    Verifying,
    /// Migrated and verified
    Succeeded,
    /// Failed at some stage
    Failed,
    /// No migration needed
    Skipped,
}

impl MigrationState {
    /// No further transitions
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        allowed_transitions(self).is_empty()
    }

    /// Satisfies a dependency edge
    #[inline]
    #[must_use]
    pub fn is_clean(self) -> bool {
        matches!(self, Self::Succeeded | Self::Skipped)
    }

    /// Display name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::DependencyCheck => "DependencyCheck",
            Self::BackingUp => "BackingUp",
            Self::Executing => "Executing",
            Self::Verifying => "Verifying",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Skipped => "Skipped",
        }
    }
}

impl Display for MigrationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Validates a state transition
///
/// # Errors
/// Returns [`TransitionError::IllegalTransition`] for transitions not in the table
pub fn validate_transition(from: MigrationState, to: MigrationState) -> Result<(), TransitionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError::IllegalTransition { from, to })
    }
}

/// States reachable in one step from `from`
#[must_use]
pub fn allowed_transitions(from: MigrationState) -> &'static [MigrationState] {
    use MigrationState::{
        BackingUp, DependencyCheck, Executing, Failed, Pending, Skipped, Succeeded, Verifying,
    };
    match from {
        Pending => &[DependencyCheck, Skipped],
        DependencyCheck => &[BackingUp, Failed, Skipped],
        BackingUp => &[Executing, Failed],
        Executing => &[Verifying, Failed],
        Verifying => &[Succeeded, Failed],
        Succeeded | Failed | Skipped => &[],
    }
}
