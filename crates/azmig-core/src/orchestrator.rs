//! Orchestrator / batch runner
//!
//! Drives every plan entry through the per-resource state machine, strictly
//! in plan order and one entry at a time:
//!
//! 1. `DependencyCheck`: in-plan dependencies are clean, external ones are
//!    re-classified, the resource itself is re-classified and the strategy
//!    validates it. A resource found already migrated ends `Skipped` here.
//! 2. `BackingUp`: the snapshot is stored before anything is mutated
//! 3. `Executing`: the strategy performs the migration
//! 4. `Verifying`: the strategy confirms the post-condition
//!
//! Failures are scoped to the entry. Whether a failure halts the remaining
//! plan is governed by [`MigrationConfig::continue_on_error`].

use crate::assessment::Classification;
use crate::backup::{BackupRecorder, BackupSnapshot};
use crate::batch::{BatchInput, RejectedInput, RejectionStage};
use crate::classifier::Classifier;
use crate::config::MigrationConfig;
use crate::control::{AutoConfirm, Confirmation, ConfirmationRequest, StopSignal};
use crate::error::{MigrationError, TransitionError};
use crate::events::{MigrationEvent, MigrationLogger, TracingLogger};
use crate::planner::{MigrationPlan, PlanEntry};
use crate::report::{BatchReport, MigrationResult};
use crate::state_machine::{validate_transition, MigrationState};
use azmig_resource::ProviderClient;
use azmig_strategy::StrategyRegistry;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Sequential migration runner
pub struct Orchestrator {
    client: Arc<dyn ProviderClient>,
    registry: StrategyRegistry,
    backups: Arc<dyn BackupRecorder>,
    logger: Arc<dyn MigrationLogger>,
    confirmation: Arc<dyn Confirmation>,
    stop: StopSignal,
    config: MigrationConfig,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .field("stop", &self.stop)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create orchestrator with the default strategies, tracing logger and
    /// automatic confirmation
    #[must_use]
    pub fn new(client: Arc<dyn ProviderClient>, backups: Arc<dyn BackupRecorder>) -> Self {
        Self {
            client,
            registry: StrategyRegistry::with_defaults(),
            backups,
            logger: Arc::new(TracingLogger),
            confirmation: Arc::new(AutoConfirm),
            stop: StopSignal::new(),
            config: MigrationConfig::default(),
        }
    }

    /// With strategy registry
    #[inline]
    #[must_use]
    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// With logger
    #[inline]
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn MigrationLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// With confirmation capability
    #[inline]
    #[must_use]
    pub fn with_confirmation(mut self, confirmation: Arc<dyn Confirmation>) -> Self {
        self.confirmation = confirmation;
        self
    }

    /// With stop signal
    #[inline]
    #[must_use]
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: MigrationConfig) -> Self {
        self.config = config;
        self
    }

    /// Configuration in effect
    #[inline]
    #[must_use]
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Classifier configured with the dependency check override
    #[must_use]
    pub fn classifier(&self) -> Classifier {
        Classifier::new().with_skip_dependency_check(self.config.skip_dependency_check)
    }

    /// Classify every accepted line of a batch
    ///
    /// Lines whose classification fails are returned as rejections; they are
    /// not part of the plan.
    pub async fn classify_batch(
        &self,
        input: &BatchInput,
    ) -> (Vec<Classification>, Vec<RejectedInput>) {
        let classifier = self.classifier();
        let mut classified = Vec::with_capacity(input.resources.len());
        let mut rejected = Vec::new();

        for (line, id) in &input.resources {
            match classifier.classify(id, self.client.as_ref()).await {
                Ok(c) => classified.push(c),
                Err(e) => {
                    let retryable = e.is_retryable();
                    tracing::warn!(line, resource = %id, error = %e, retryable, "Classification failed");
                    let reason = if retryable {
                        format!("{e} (transient, may succeed on a later run)")
                    } else {
                        e.to_string()
                    };
                    rejected.push(RejectedInput {
                        line: *line,
                        input: id.to_string(),
                        stage: RejectionStage::Classification,
                        reason,
                    });
                }
            }
        }
        (classified, rejected)
    }

    /// Parse, classify and plan a batch without running it
    ///
    /// Returns the plan together with every rejected input line.
    ///
    /// # Errors
    /// Returns [`MigrationError::Plan`] if the batch cannot be ordered
    pub async fn build_plan(
        &self,
        input: &str,
    ) -> Result<(MigrationPlan, Vec<RejectedInput>), MigrationError> {
        self.plan_input(&BatchInput::parse(input)).await
    }

    /// Classify and plan an already parsed batch
    ///
    /// # Errors
    /// Returns [`MigrationError::Plan`] if the batch cannot be ordered
    pub async fn plan_input(
        &self,
        batch: &BatchInput,
    ) -> Result<(MigrationPlan, Vec<RejectedInput>), MigrationError> {
        let mut rejected = batch.rejected.clone();
        let (classified, classification_rejects) = self.classify_batch(batch).await;
        rejected.extend(classification_rejects);
        rejected.sort_by_key(|r| r.line);

        let plan = MigrationPlan::build(classified)?;
        Ok((plan, rejected))
    }

    /// Full pipeline: parse, classify, plan, run
    ///
    /// # Errors
    /// Returns [`MigrationError::Plan`] on a cyclic dependency; nothing is run
    pub async fn run_batch(&self, input: &str) -> Result<BatchReport, MigrationError> {
        self.run_input(&BatchInput::parse(input)).await
    }

    /// Classify, plan and run an already parsed batch
    ///
    /// # Errors
    /// Returns [`MigrationError::Plan`] on a cyclic dependency; nothing is run
    pub async fn run_input(&self, batch: &BatchInput) -> Result<BatchReport, MigrationError> {
        let (plan, rejected) = self.plan_input(batch).await?;
        let mut report = self.run(&plan).await;
        report.rejected = rejected;
        Ok(report)
    }

    /// Run a plan
    ///
    /// Every entry yields exactly one result. Entries that were never reached
    /// stay `Pending`.
    pub async fn run(&self, plan: &MigrationPlan) -> BatchReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let dry_run = self.config.dry_run;

        self.logger.record(&MigrationEvent::RunStarted {
            run_id,
            entries: plan.len(),
            dry_run,
        });

        let mut results: Vec<MigrationResult> = plan
            .entries()
            .iter()
            .map(|e| {
                let mut result = MigrationResult::pending(e.id.clone(), e.migration_type());
                result.warnings.clone_from(&e.assessment.warnings);
                result.external_dependencies.clone_from(&e.external_dependencies);
                result
            })
            .collect();

        let mut halt_reason = None;
        let confirmed = self.confirm(plan);
        if !confirmed {
            halt_reason = Some(self.halt("batch not confirmed by operator"));
        }

        let mut attempted = false;
        for (i, entry) in plan.entries().iter().enumerate() {
            if self.stop.is_stopped() {
                halt_reason = Some(self.halt("stop requested"));
                break;
            }

            for warning in &entry.assessment.warnings {
                self.logger.record(&MigrationEvent::Warning {
                    resource: entry.id.clone(),
                    message: warning.clone(),
                });
            }

            if !entry.needs_migration() {
                let reason = entry.assessment.reason.clone();
                let result = &mut results[i];
                if self.advance(result, MigrationState::Skipped, Some(reason.clone())).is_ok() {
                    result.skipped = true;
                    result.message = Some(reason);
                }
                continue;
            }

            if dry_run {
                let message = match self.check_external_dependencies(entry).await {
                    Ok(()) => format!("would migrate: {}", entry.assessment.reason),
                    Err(e) => format!("would fail: {e}"),
                };
                results[i].message = Some(message);
                continue;
            }
            if !confirmed {
                results[i].message = Some("not confirmed".to_string());
                continue;
            }

            if attempted && !self.config.pacing_delay().is_zero() {
                tokio::time::sleep(self.config.pacing_delay()).await;
            }
            attempted = true;

            let unresolved = unresolved_dependencies(plan, &results, entry);
            let result = &mut results[i];
            if let Err(e) = self.migrate_entry(run_id, entry, unresolved, result).await {
                self.fail(result, &e);
                if !self.config.continue_on_error {
                    halt_reason = Some(self.halt(&format!(
                        "{} failed; remaining entries not attempted",
                        entry.id
                    )));
                    break;
                }
            }
        }

        let report = BatchReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            dry_run,
            results,
            rejected: Vec::new(),
            edges: plan.edges().to_vec(),
            halt_reason,
        };

        let counts = report.counts();
        self.logger.record(&MigrationEvent::RunFinished {
            run_id,
            succeeded: counts.succeeded,
            skipped: counts.skipped,
            failed: counts.failed,
            pending: counts.pending,
        });
        report
    }

    fn confirm(&self, plan: &MigrationPlan) -> bool {
        if self.config.dry_run || self.config.force {
            return true;
        }
        let migrations: Vec<_> = plan
            .migrating()
            .map(|e| (e.id.clone(), e.migration_type()))
            .collect();
        if migrations.is_empty() {
            return true;
        }
        let request = ConfirmationRequest {
            skipped: plan.len() - migrations.len(),
            migrations,
            continue_on_error: self.config.continue_on_error,
        };
        self.confirmation.confirm(&request)
    }

    fn halt(&self, reason: &str) -> String {
        self.logger.record(&MigrationEvent::Halted {
            reason: reason.to_string(),
        });
        reason.to_string()
    }

    async fn migrate_entry(
        &self,
        run_id: Uuid,
        entry: &PlanEntry,
        unresolved: Option<String>,
        result: &mut MigrationResult,
    ) -> Result<(), MigrationError> {
        let id = &entry.id;
        let migration_type = entry.migration_type();

        self.advance(result, MigrationState::DependencyCheck, None)?;
        if let Some(reason) = unresolved {
            return Err(MigrationError::DependencyUnresolved {
                resource: id.clone(),
                reason,
            });
        }
        self.check_external_dependencies(entry).await?;

        let refreshed = self.classifier().classify(id, self.client.as_ref()).await?;
        let record = match refreshed.record {
            Some(record) if refreshed.assessment.needs_migration => record,
            _ => {
                let reason = format!("already migrated: {}", refreshed.assessment.reason);
                self.advance(result, MigrationState::Skipped, Some(reason.clone()))?;
                result.skipped = true;
                result.message = Some(reason);
                return Ok(());
            }
        };
        let strategy = self.registry.resolve(migration_type)?;
        strategy.validate(&record)?;

        self.advance(result, MigrationState::BackingUp, None)?;
        let snapshot = BackupSnapshot::new(run_id, migration_type, &record);
        let reference = self.backups.snapshot(&snapshot).await?;
        self.logger.record(&MigrationEvent::BackupCreated {
            resource: id.clone(),
            reference: reference.clone(),
        });
        result.backup = Some(reference);

        self.advance(result, MigrationState::Executing, None)?;
        tracing::debug!(resource = %id, strategy = strategy.name(), "Executing migration");
        let handle = strategy
            .execute(&record, self.client.as_ref(), &self.config.execute_options())
            .await?;

        self.advance(result, MigrationState::Verifying, None)?;
        let outcome = strategy.verify(&handle, self.client.as_ref()).await;
        let passed = outcome.passed();
        let summary = outcome.failure_summary();
        result.verification = Some(outcome);
        if !passed {
            return Err(MigrationError::VerificationFailure {
                resource: id.clone(),
                summary,
            });
        }

        self.advance(result, MigrationState::Succeeded, None)?;
        result.success = true;
        Ok(())
    }

    /// Dependencies outside the batch must still be clean at execution time
    async fn check_external_dependencies(&self, entry: &PlanEntry) -> Result<(), MigrationError> {
        let classifier = self.classifier();
        for dep in &entry.external_dependencies {
            let unresolved = |reason: String| MigrationError::DependencyUnresolved {
                resource: entry.id.clone(),
                reason,
            };
            let c = classifier
                .classify(dep, self.client.as_ref())
                .await
                .map_err(|e| unresolved(format!("could not confirm {dep}: {e}")))?;
            if c.assessment.needs_migration {
                return Err(unresolved(format!(
                    "{dep} is not in the batch and still needs {}",
                    c.assessment.migration_type
                )));
            }
        }
        Ok(())
    }

    fn advance(
        &self,
        result: &mut MigrationResult,
        to: MigrationState,
        detail: Option<String>,
    ) -> Result<(), TransitionError> {
        let from = result.state;
        validate_transition(from, to)?;

        let now = Utc::now();
        result.state = to;
        if from == MigrationState::Pending {
            result.started_at = Some(now);
        }
        if to.is_terminal() {
            result.finished_at = Some(now);
        }

        self.logger.record(&MigrationEvent::Transition {
            resource: result.resource.clone(),
            migration_type: result.migration_type,
            from,
            to,
            detail,
        });
        Ok(())
    }

    fn fail(&self, result: &mut MigrationResult, error: &MigrationError) {
        let message = error.to_string();
        result.failure = Some(error.failure_kind());
        result.message = Some(message.clone());

        if self
            .advance(result, MigrationState::Failed, Some(message))
            .is_err()
        {
            tracing::error!(
                resource = %result.resource,
                state = %result.state,
                "Cannot record failure from current state"
            );
            result.state = MigrationState::Failed;
            result.finished_at = Some(Utc::now());
        }
    }
}

/// Describe the first in-plan dependency that is not clean
fn unresolved_dependencies(
    plan: &MigrationPlan,
    results: &[MigrationResult],
    entry: &PlanEntry,
) -> Option<String> {
    entry.depends_on.iter().find_map(|dep| {
        let state = plan.position(dep).map(|p| results[p].state)?;
        (!state.is_clean()).then(|| format!("dependency {dep} is {state}"))
    })
}
