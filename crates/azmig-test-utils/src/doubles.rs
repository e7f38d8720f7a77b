//! Recording test doubles
//!
//! The provider and backup doubles share one [`CallLog`] so tests can assert
//! the relative order of backups and mutating provider calls.

use async_trait::async_trait;
use azmig_core::{
    BackupError, BackupRecorder, BackupReference, BackupSnapshot, Confirmation, ConfirmationRequest,
};
use azmig_resource::{
    AllocationMethod, InMemoryProvider, PowerAction, ProviderClient, ProviderError, Relation,
    ReplacementRequest, ResourceIdentifier, ResourceRecord, Sku,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Ordered log of calls, entries look like `"apply_sku_change pip1"`
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, operation: &str, id: &ResourceIdentifier) {
        self.calls
            .lock()
            .push(format!("{operation} {}", id.resource_name()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn contains(&self, call: &str) -> bool {
        self.calls.lock().iter().any(|c| c == call)
    }

    /// Index of the first matching call
    pub fn position(&self, call: &str) -> Option<usize> {
        self.calls.lock().iter().position(|c| c == call)
    }

    /// Calls for one resource name, in order
    pub fn for_resource(&self, name: &str) -> Vec<String> {
        let suffix = format!(" {name}");
        self.calls
            .lock()
            .iter()
            .filter(|c| c.ends_with(&suffix))
            .cloned()
            .collect()
    }
}

/// [`InMemoryProvider`] that logs every call before delegating
#[derive(Debug, Clone)]
pub struct RecordingProvider {
    inner: Arc<InMemoryProvider>,
    log: CallLog,
}

impl RecordingProvider {
    pub fn new(inner: InMemoryProvider, log: CallLog) -> Self {
        Self {
            inner: Arc::new(inner),
            log,
        }
    }

    pub fn inner(&self) -> &InMemoryProvider {
        &self.inner
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

#[async_trait]
impl ProviderClient for RecordingProvider {
    async fn fetch_resource(
        &self,
        id: &ResourceIdentifier,
    ) -> Result<ResourceRecord, ProviderError> {
        self.log.push("fetch_resource", id);
        self.inner.fetch_resource(id).await
    }

    async fn fetch_associated(
        &self,
        id: &ResourceIdentifier,
        relation: Relation,
    ) -> Result<Vec<ResourceRecord>, ProviderError> {
        self.log.push("fetch_associated", id);
        self.inner.fetch_associated(id, relation).await
    }

    async fn apply_sku_change(
        &self,
        id: &ResourceIdentifier,
        sku: &Sku,
    ) -> Result<ResourceRecord, ProviderError> {
        self.log.push("apply_sku_change", id);
        self.inner.apply_sku_change(id, sku).await
    }

    async fn set_public_ip_allocation(
        &self,
        id: &ResourceIdentifier,
        allocation: AllocationMethod,
    ) -> Result<ResourceRecord, ProviderError> {
        self.log.push("set_public_ip_allocation", id);
        self.inner.set_public_ip_allocation(id, allocation).await
    }

    async fn set_power_state(
        &self,
        id: &ResourceIdentifier,
        action: PowerAction,
    ) -> Result<(), ProviderError> {
        self.log.push("set_power_state", id);
        self.inner.set_power_state(id, action).await
    }

    async fn replace_disk(&self, id: &ResourceIdentifier) -> Result<ResourceRecord, ProviderError> {
        self.log.push("replace_disk", id);
        self.inner.replace_disk(id).await
    }

    async fn create_replacement_resource(
        &self,
        request: &ReplacementRequest,
    ) -> Result<ResourceRecord, ProviderError> {
        self.log.push("create_replacement_resource", &request.source);
        self.inner.create_replacement_resource(request).await
    }
}

/// Keeps snapshots in memory and logs `"snapshot <name>"`
#[derive(Debug, Default)]
pub struct MemoryBackupStore {
    snapshots: Mutex<Vec<BackupSnapshot>>,
    log: CallLog,
}

impl MemoryBackupStore {
    pub fn new(log: CallLog) -> Self {
        Self {
            snapshots: Mutex::new(Vec::new()),
            log,
        }
    }

    pub fn snapshots(&self) -> Vec<BackupSnapshot> {
        self.snapshots.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.lock().is_empty()
    }
}

#[async_trait]
impl BackupRecorder for MemoryBackupStore {
    async fn snapshot(&self, snapshot: &BackupSnapshot) -> Result<BackupReference, BackupError> {
        self.log.push("snapshot", &snapshot.resource);
        let mut snapshots = self.snapshots.lock();
        snapshots.push(snapshot.clone());
        Ok(BackupReference {
            location: format!("memory://{}/{}", snapshots.len(), snapshot.resource.resource_name()),
            taken_at: snapshot.taken_at,
        })
    }
}

/// Rejects every snapshot, logging `"snapshot <name>"` first
#[derive(Debug, Default)]
pub struct FailingBackupStore {
    log: CallLog,
}

impl FailingBackupStore {
    pub fn new(log: CallLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl BackupRecorder for FailingBackupStore {
    async fn snapshot(&self, snapshot: &BackupSnapshot) -> Result<BackupReference, BackupError> {
        self.log.push("snapshot", &snapshot.resource);
        Err(BackupError::Unavailable("backup store offline".to_string()))
    }
}

/// Fixed answer, remembering every request it was asked
#[derive(Debug, Default)]
pub struct StaticConfirmation {
    answer: bool,
    requests: Mutex<Vec<ConfirmationRequest>>,
}

impl StaticConfirmation {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ConfirmationRequest> {
        self.requests.lock().clone()
    }
}

impl Confirmation for StaticConfirmation {
    fn confirm(&self, request: &ConfirmationRequest) -> bool {
        self.requests.lock().push(request.clone());
        self.answer
    }
}
