//! Run a plan or migration from parsed options

use crate::options::{Mode, RunOptions, Target};
use anyhow::{Context, Result};
use azmig_core::{
    AuditLog, BatchInput, BatchReport, Confirmation, FileBackupStore, Orchestrator, StopSignal, TeeLogger,
    TracingLogger,
};
use azmig_resource::InMemoryProvider;
use std::sync::Arc;

/// Load inputs, run the orchestrator and persist its outputs
///
/// Writes back the inventory after a migration, plus the JSON report and
/// audit log when requested.
///
/// # Errors
/// Fails on unreadable or unwritable files and on fatal planning errors
pub async fn execute(
    options: &RunOptions,
    confirmation: Arc<dyn Confirmation>,
    stop: StopSignal,
) -> Result<BatchReport> {
    let batch = match &options.target {
        Target::ResourceId(id) => BatchInput::single(id.clone()),
        Target::BatchFile(path) => BatchInput::parse(
            &tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading batch file {}", path.display()))?,
        ),
    };

    let inventory = tokio::fs::read_to_string(&options.inventory)
        .await
        .with_context(|| format!("reading inventory {}", options.inventory.display()))?;
    let provider = Arc::new(
        InMemoryProvider::from_inventory_json(&inventory)
            .with_context(|| format!("parsing inventory {}", options.inventory.display()))?,
    );
    tracing::info!(
        resources = provider.len(),
        inventory = %options.inventory.display(),
        "Inventory loaded"
    );

    let audit = Arc::new(AuditLog::new());
    let logger = TeeLogger::new()
        .with(Arc::new(TracingLogger))
        .with(audit.clone());

    let orchestrator = Orchestrator::new(
        provider.clone(),
        Arc::new(FileBackupStore::new(&options.backup_dir)),
    )
    .with_config(options.config.clone())
    .with_logger(Arc::new(logger))
    .with_confirmation(confirmation)
    .with_stop_signal(stop);

    let report = orchestrator.run_input(&batch).await?;

    if options.mode == Mode::Migrate {
        let json = provider.to_inventory_json()?;
        tokio::fs::write(&options.inventory, json)
            .await
            .with_context(|| format!("writing inventory {}", options.inventory.display()))?;
    }

    if let Some(path) = &options.report {
        tokio::fs::write(path, report.to_json()?)
            .await
            .with_context(|| format!("writing report {}", path.display()))?;
    }

    if let Some(path) = &options.audit_log {
        audit.verify_integrity()?;
        tokio::fs::write(path, audit.to_json_lines()?)
            .await
            .with_context(|| format!("writing audit log {}", path.display()))?;
    }

    Ok(report)
}

/// Render the report for stdout
///
/// # Errors
/// Fails only if JSON serialization fails
pub fn render(report: &BatchReport, json: bool) -> Result<String> {
    if json {
        Ok(report.to_json()?)
    } else {
        Ok(report.render_table())
    }
}
