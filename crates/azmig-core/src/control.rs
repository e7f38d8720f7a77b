//! Operator controls: batch confirmation and the stop signal

use azmig_resource::{MigrationType, ResourceIdentifier};
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What the operator is asked to approve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    /// Entries that will be mutated, in plan order
    pub migrations: Vec<(ResourceIdentifier, MigrationType)>,
    /// Entries with no migration needed
    pub skipped: usize,
    /// Failed entries will not halt the batch
    pub continue_on_error: bool,
}

impl Display for ConfirmationRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} resource(s) will be migrated, {} skipped:",
            self.migrations.len(),
            self.skipped
        )?;
        for (id, migration_type) in &self.migrations {
            writeln!(f, "  {migration_type:<26} {id}")?;
        }
        if self.continue_on_error {
            writeln!(f, "Failures will not stop the remaining migrations.")?;
        }
        Ok(())
    }
}

/// Confirmation capability passed into the orchestrator
#[cfg_attr(test, mockall::automock)]
pub trait Confirmation: Send + Sync {
    /// Ask once for the whole batch; `true` proceeds
    fn confirm(&self, request: &ConfirmationRequest) -> bool;
}

/// Approves everything
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

impl Confirmation for AutoConfirm {
    fn confirm(&self, _request: &ConfirmationRequest) -> bool {
        true
    }
}

/// Cooperative stop flag, honored between plan entries
///
/// Clones share the same flag.
#[derive(Debug, Default, Clone)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    /// Create unset signal
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request stop; the entry in progress still finishes
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Check if stop was requested
    #[inline]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}
