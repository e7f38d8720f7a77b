//! Migration events and loggers
//!
//! The orchestrator reports progress through an explicit [`MigrationLogger`]
//! rather than ambient global state, so tests can substitute their own.
//!
//! - [`TracingLogger`]: forwards events to `tracing`
//! - [`AuditLog`]: append-only, SHA-256 hash-chained event log
//! - [`TeeLogger`]: fans events out to several loggers

use crate::backup::BackupReference;
use crate::error::AuditError;
use crate::state_machine::MigrationState;
use azmig_resource::{MigrationType, ResourceIdentifier};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

/// Something that happened during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MigrationEvent {
    /// Run started
    RunStarted {
        /// Run id
        run_id: Uuid,
        /// Plan entries
        entries: usize,
        /// Plan-only run
        dry_run: bool,
    },
    /// Entry changed state
    Transition {
        /// Resource
        resource: ResourceIdentifier,
        /// Migration type
        migration_type: MigrationType,
        /// Previous state
        from: MigrationState,
        /// New state
        to: MigrationState,
        /// Failure or skip detail
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    /// Snapshot stored
    BackupCreated {
        /// Resource
        resource: ResourceIdentifier,
        /// Where it was stored
        reference: BackupReference,
    },
    /// Operator-relevant warning
    Warning {
        /// Resource
        resource: ResourceIdentifier,
        /// Message
        message: String,
    },
    /// Remaining entries will not be attempted
    Halted {
        /// Why
        reason: String,
    },
    /// Run finished
    RunFinished {
        /// Run id
        run_id: Uuid,
        /// Succeeded entries
        succeeded: usize,
        /// Skipped entries
        skipped: usize,
        /// Failed entries
        failed: usize,
        /// Entries never attempted
        pending: usize,
    },
}

/// Logger capability passed into the orchestrator
pub trait MigrationLogger: Send + Sync {
    /// Record one event
    fn record(&self, event: &MigrationEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl MigrationLogger for TracingLogger {
    fn record(&self, event: &MigrationEvent) {
        match event {
            MigrationEvent::RunStarted {
                run_id,
                entries,
                dry_run,
            } => tracing::info!(%run_id, entries, dry_run, "Migration run started"),
            MigrationEvent::Transition {
                resource,
                migration_type,
                from,
                to,
                detail,
            } => match to {
                MigrationState::Failed => tracing::error!(
                    resource = %resource,
                    migration_type = %migration_type,
                    from = %from,
                    detail = detail.as_deref().unwrap_or(""),
                    "Migration failed"
                ),
                _ => tracing::info!(
                    resource = %resource,
                    migration_type = %migration_type,
                    from = %from,
                    to = %to,
                    "Migration state changed"
                ),
            },
            MigrationEvent::BackupCreated {
                resource,
                reference,
            } => tracing::info!(resource = %resource, backup = %reference, "Backup created"),
            MigrationEvent::Warning { resource, message } => {
                tracing::warn!(resource = %resource, "{message}");
            }
            MigrationEvent::Halted { reason } => tracing::warn!(reason = %reason, "Batch halted"),
            MigrationEvent::RunFinished {
                run_id,
                succeeded,
                skipped,
                failed,
                pending,
            } => tracing::info!(
                %run_id,
                succeeded,
                skipped,
                failed,
                pending,
                "Migration run finished"
            ),
        }
    }
}

/// One entry of the [`AuditLog`] chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the log, starting at 0
    pub sequence: u64,
    /// When the event was recorded
    pub timestamp: DateTime<Utc>,
    /// The event
    pub event: MigrationEvent,
    /// Hash of the previous entry (hex), zeros for the first
    pub prev_hash: String,
    /// Hash of this entry (hex)
    pub hash: String,
}

/// Append-only, hash-chained event log
#[derive(Debug, Default)]
pub struct AuditLog {
    inner: Mutex<Vec<AuditEntry>>,
}

impl AuditLog {
    /// Create empty log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, returning its sequence number
    pub fn append(&self, event: MigrationEvent) -> u64 {
        let mut guard = self.inner.lock();
        let prev_hash = guard
            .last()
            .map_or_else(genesis_hash, |e| e.hash.clone());
        let mut entry = AuditEntry {
            sequence: guard.len() as u64,
            timestamp: Utc::now(),
            event,
            prev_hash,
            hash: String::new(),
        };
        entry.hash = compute_hash(&entry);
        let sequence = entry.sequence;
        guard.push(entry);
        sequence
    }

    /// Copy of all entries
    #[must_use]
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.inner.lock().clone()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Re-compute the chain
    ///
    /// # Errors
    /// Returns [`AuditError::IntegrityViolation`] at the first entry whose
    /// link or hash does not match
    pub fn verify_integrity(&self) -> Result<(), AuditError> {
        verify_chain(&self.inner.lock())
    }

    /// Export as JSON lines, one entry per line
    ///
    /// # Errors
    /// Returns the serialization error, if any
    pub fn to_json_lines(&self) -> Result<String, serde_json::Error> {
        let guard = self.inner.lock();
        let mut out = String::new();
        for entry in guard.iter() {
            out.push_str(&serde_json::to_string(entry)?);
            out.push('\n');
        }
        Ok(out)
    }
}

impl MigrationLogger for AuditLog {
    fn record(&self, event: &MigrationEvent) {
        self.append(event.clone());
    }
}

/// Verify a chain of entries, e.g. one read back from a JSON-lines export
///
/// # Errors
/// Returns [`AuditError::IntegrityViolation`] at the first bad entry
pub fn verify_chain(entries: &[AuditEntry]) -> Result<(), AuditError> {
    let mut prev = genesis_hash();
    for (i, entry) in entries.iter().enumerate() {
        if entry.sequence != i as u64 || entry.prev_hash != prev || entry.hash != compute_hash(entry) {
            return Err(AuditError::IntegrityViolation {
                sequence: entry.sequence,
            });
        }
        prev.clone_from(&entry.hash);
    }
    Ok(())
}

fn genesis_hash() -> String {
    hex::encode([0u8; 32])
}

fn compute_hash(entry: &AuditEntry) -> String {
    let mut hasher = Sha256::new();
    hasher.update(entry.sequence.to_le_bytes());
    hasher.update(entry.timestamp.to_rfc3339().as_bytes());
    hasher.update([0]);
    // Serializing a plain enum of strings and integers cannot fail
    hasher.update(serde_json::to_vec(&entry.event).unwrap_or_default());
    hasher.update([0]);
    hasher.update(entry.prev_hash.as_bytes());
    hex::encode(hasher.finalize())
}

/// Fans events out to several loggers
#[derive(Default, Clone)]
pub struct TeeLogger {
    loggers: Vec<Arc<dyn MigrationLogger>>,
}

impl TeeLogger {
    /// Create empty tee
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With another logger
    #[must_use]
    pub fn with(mut self, logger: Arc<dyn MigrationLogger>) -> Self {
        self.loggers.push(logger);
        self
    }
}

impl std::fmt::Debug for TeeLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeeLogger")
            .field("loggers", &self.loggers.len())
            .finish()
    }
}

impl MigrationLogger for TeeLogger {
    fn record(&self, event: &MigrationEvent) {
        for logger in &self.loggers {
            logger.record(event);
        }
    }
}
