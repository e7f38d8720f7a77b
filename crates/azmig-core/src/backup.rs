//! Backup recorder
//!
//! A [`BackupSnapshot`] is stored before any mutating step runs. Stores are
//! append-only: a snapshot is never overwritten, and each one is keyed by
//! resource and timestamp.

use crate::error::BackupError;
use async_trait::async_trait;
use azmig_resource::{MigrationType, ResourceIdentifier, ResourceRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Collision suffixes tried before giving up
const MAX_NAME_ATTEMPTS: u32 = 1_000;

/// Pre-migration copy of a resource's configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    /// Run that took the snapshot
    pub run_id: Uuid,
    /// Resource
    pub resource: ResourceIdentifier,
    /// Migration about to run
    pub migration_type: MigrationType,
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
    /// Configuration before migration
    pub record: ResourceRecord,
}

impl BackupSnapshot {
    /// Snapshot `record` now
    #[must_use]
    pub fn new(run_id: Uuid, migration_type: MigrationType, record: &ResourceRecord) -> Self {
        Self {
            run_id,
            resource: record.id.clone(),
            migration_type,
            taken_at: Utc::now(),
            record: record.clone(),
        }
    }
}

/// Where a snapshot was stored
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackupReference {
    /// Store-specific location (a file path for [`FileBackupStore`])
    pub location: String,
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
}

impl Display for BackupReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}

/// Durable snapshot store
#[async_trait]
pub trait BackupRecorder: Send + Sync {
    /// Store a snapshot durably
    ///
    /// Must not return before the snapshot survives a crash.
    ///
    /// # Errors
    /// Returns [`BackupError`] if the snapshot could not be stored
    async fn snapshot(&self, snapshot: &BackupSnapshot) -> Result<BackupReference, BackupError>;
}

/// Filesystem snapshot store
///
/// Layout: `<root>/<subscription>/<resourceGroup>/<provider>_<type>/<name>-<timestamp>.json`
#[derive(Debug, Clone)]
pub struct FileBackupStore {
    root: PathBuf,
}

impl FileBackupStore {
    /// Create store rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory snapshots of `id` are written to
    #[must_use]
    pub fn directory_for(&self, id: &ResourceIdentifier) -> PathBuf {
        self.root
            .join(path_component(id.subscription_id()))
            .join(path_component(id.resource_group()))
            .join(path_component(&format!("{}_{}", id.provider(), id.resource_type())))
    }

    fn file_name(id: &ResourceIdentifier, taken_at: DateTime<Utc>, attempt: u32) -> String {
        let stamp = taken_at.format("%Y%m%dT%H%M%S%.3fZ");
        let name = path_component(id.resource_name());
        if attempt == 0 {
            format!("{name}-{stamp}.json")
        } else {
            format!("{name}-{stamp}-{attempt}.json")
        }
    }
}

/// Make an identifier segment safe to use as one path component
fn path_component(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':' | '\0') { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

#[async_trait]
impl BackupRecorder for FileBackupStore {
    async fn snapshot(&self, snapshot: &BackupSnapshot) -> Result<BackupReference, BackupError> {
        let dir = self.directory_for(&snapshot.resource);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| BackupError::io(&dir, e))?;

        let body = serde_json::to_vec_pretty(snapshot)?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = dir.join(Self::file_name(&snapshot.resource, snapshot.taken_at, attempt));
            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(BackupError::io(&path, e)),
            };

            file.write_all(&body)
                .await
                .map_err(|e| BackupError::io(&path, e))?;
            file.sync_all()
                .await
                .map_err(|e| BackupError::io(&path, e))?;

            tracing::info!(
                resource = %snapshot.resource,
                path = %path.display(),
                "Backup snapshot written"
            );
            return Ok(BackupReference {
                location: path.display().to_string(),
                taken_at: snapshot.taken_at,
            });
        }

        Err(BackupError::NameExhausted(dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azmig_resource::{AvailabilitySetProperties, ResourceProperties, Sku};

    fn record() -> ResourceRecord {
        ResourceRecord::new(
            ResourceIdentifier::new("sub-1", "rg-1", "Microsoft.Compute", "availabilitySets", "as1")
                .unwrap(),
            "westeurope",
            ResourceProperties::AvailabilitySet(AvailabilitySetProperties {
                sku: Sku::classic(),
                platform_fault_domain_count: 2,
            }),
        )
    }

    #[tokio::test]
    async fn writes_snapshot_under_resource_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBackupStore::new(dir.path());
        let snapshot = BackupSnapshot::new(Uuid::new_v4(), MigrationType::AvailabilitySetConversion, &record());

        let reference = store.snapshot(&snapshot).await.unwrap();
        let path = PathBuf::from(&reference.location);
        assert!(path.starts_with(dir.path().join("sub-1/rg-1/Microsoft.Compute_availabilitySets")));
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("as1-"));

        let stored: BackupSnapshot = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(stored, snapshot);
    }

    #[tokio::test]
    async fn never_overwrites_existing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBackupStore::new(dir.path());
        let snapshot = BackupSnapshot::new(Uuid::new_v4(), MigrationType::AvailabilitySetConversion, &record());

        let first = store.snapshot(&snapshot).await.unwrap();
        let second = store.snapshot(&snapshot).await.unwrap();
        assert_ne!(first.location, second.location);
        assert!(second.location.ends_with("-1.json"));
        assert!(Path::new(&first.location).exists());
    }

    #[tokio::test]
    async fn unwritable_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let store = FileBackupStore::new(&blocker);
        let snapshot = BackupSnapshot::new(Uuid::new_v4(), MigrationType::AvailabilitySetConversion, &record());

        let err = store.snapshot(&snapshot).await.unwrap_err();
        assert!(matches!(err, BackupError::Io { .. }));
    }

    #[test]
    fn path_components_are_sanitized() {
        assert_eq!(path_component(".."), "_");
        assert_eq!(path_component("a:b"), "a_b");
        assert_eq!(path_component("loadBalancers/frontendIPConfigurations"), "loadBalancers_frontendIPConfigurations");
    }
}
