//! Orchestrator configuration

use azmig_strategy::ExecuteOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Batch-level migration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Keep going after a failed entry instead of halting the batch
    pub continue_on_error: bool,
    /// Plan only: no backups, no provider writes
    pub dry_run: bool,
    /// Do not ask for confirmation
    pub force: bool,
    /// Operator override: skip the public IP to load balancer dependency check
    pub skip_dependency_check: bool,
    /// Pause between successive mutating entries
    pub pacing_delay_ms: u64,
    /// Back-off before retrying a snapshot-limit failure
    pub snapshot_retry_backoff_ms: u64,
    /// Restart VMs that were running before disk conversion
    pub restart_vms: bool,
}

impl MigrationConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With continue-on-error
    #[inline]
    #[must_use]
    pub fn with_continue_on_error(mut self, enabled: bool) -> Self {
        self.continue_on_error = enabled;
        self
    }

    /// With dry run
    #[inline]
    #[must_use]
    pub fn with_dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// With force
    #[inline]
    #[must_use]
    pub fn with_force(mut self, enabled: bool) -> Self {
        self.force = enabled;
        self
    }

    /// With dependency check override
    #[inline]
    #[must_use]
    pub fn with_skip_dependency_check(mut self, enabled: bool) -> Self {
        self.skip_dependency_check = enabled;
        self
    }

    /// With pacing delay
    #[inline]
    #[must_use]
    pub fn with_pacing_delay_ms(mut self, ms: u64) -> Self {
        self.pacing_delay_ms = ms;
        self
    }

    /// With snapshot retry back-off
    #[inline]
    #[must_use]
    pub fn with_snapshot_retry_backoff_ms(mut self, ms: u64) -> Self {
        self.snapshot_retry_backoff_ms = ms;
        self
    }

    /// With VM restart behavior
    #[inline]
    #[must_use]
    pub fn with_restart_vms(mut self, enabled: bool) -> Self {
        self.restart_vms = enabled;
        self
    }

    /// Pacing delay as a duration
    #[inline]
    #[must_use]
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    /// Options handed to strategies
    #[must_use]
    pub fn execute_options(&self) -> ExecuteOptions {
        ExecuteOptions::default()
            .with_snapshot_retry_backoff(Duration::from_millis(self.snapshot_retry_backoff_ms))
            .with_restart_vms(self.restart_vms)
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            continue_on_error: false,
            dry_run: false,
            force: false,
            skip_dependency_check: false,
            pacing_delay_ms: 2_000,
            snapshot_retry_backoff_ms: 30_000,
            restart_vms: true,
        }
    }
}
