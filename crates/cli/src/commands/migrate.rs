use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clinic_core::{init_logging, AppConfig, AppConfigTrait, LoggingConfig};
use clinic_orm::{
    clinic_catalog, MigrationCatalog, MigrationConfig, MigrationRollback, MigrationRunner,
    MigrationStatus, PostgresBackend, RollbackResult, StatusReport, StepOutcome,
};
use tracing::info;

/// Which applied migrations a rollback reverts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackScope {
    Steps(usize),
    LastBatch,
    All,
}

/// Logging only needs `LOG_*`, so `list` works without a database URL
pub fn setup_logging() -> Result<()> {
    let logging = LoggingConfig::from_env().context("invalid logging configuration")?;
    init_logging(&logging).map_err(|e| anyhow!("failed to initialise logging: {}", e))
}

fn migration_config(config: &AppConfig) -> MigrationConfig {
    MigrationConfig {
        migrations_table: config.migrations.table.clone(),
        strict_descriptors: config.migrations.strict,
    }
}

async fn connect() -> Result<MigrationRunner<PostgresBackend>> {
    let config = AppConfig::from_env().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    let backend = PostgresBackend::connect(&config.database.url, config.database.max_connections)
        .await
        .context("failed to connect to the database")?;
    info!(app = %config.name, table = %config.migrations.table, "connected");

    let runner = MigrationRunner::with_config(backend, clinic_catalog()?, migration_config(&config))?;
    Ok(runner)
}

fn outcome_marker(outcome: StepOutcome) -> &'static str {
    match outcome {
        StepOutcome::Applied => "applied",
        StepOutcome::AlreadySatisfied => "already present",
        StepOutcome::Reverted => "reverted",
        StepOutcome::AlreadyReverted => "already absent",
    }
}

pub async fn run() -> Result<()> {
    let runner = connect().await?;
    let result = runner.run_migrations().await?;

    if result.applied.is_empty() {
        println!("Nothing to migrate ({} already applied)", result.skipped_count);
        return Ok(());
    }

    println!(
        "Batch {}: {} migration(s) in {}ms",
        result.batch,
        result.applied_count(),
        result.execution_time_ms
    );
    for (id, outcome) in &result.applied {
        println!("  ✅ {} ({})", id, outcome_marker(*outcome));
    }
    Ok(())
}

pub async fn rollback(scope: RollbackScope) -> Result<()> {
    let runner = connect().await?;
    let result = match scope {
        RollbackScope::Steps(steps) => runner.rollback(steps).await?,
        RollbackScope::LastBatch => runner.rollback_last_batch().await?,
        RollbackScope::All => runner.rollback_all().await?,
    };
    print_rollback(&result);
    Ok(())
}

fn print_rollback(result: &RollbackResult) {
    if result.rolled_back.is_empty() {
        println!("Nothing to roll back");
        return;
    }
    println!(
        "Rolled back {} migration(s) in {}ms",
        result.rolled_back_count(),
        result.execution_time_ms
    );
    for (id, outcome) in &result.rolled_back {
        println!("  ↩️  {} ({})", id, outcome_marker(*outcome));
    }
}

pub async fn status() -> Result<()> {
    let runner = connect().await?;
    let report = runner.status().await?;
    print!("{}", render_status(&report));
    Ok(())
}

fn render_status(report: &StatusReport) -> String {
    let mut out = String::from("Migration Status:\n================\n");
    for (id, status) in &report.steps {
        match status {
            MigrationStatus::Applied { applied_at, batch } => out.push_str(&format!(
                "  ✅ {} (batch {}, {})\n",
                id,
                batch,
                applied_at.format("%Y-%m-%d %H:%M:%S UTC")
            )),
            MigrationStatus::Pending => out.push_str(&format!("  ⏳ {}\n", id)),
        }
    }
    for orphan in &report.orphans {
        out.push_str(&format!(
            "  ❓ {} (batch {}, not in catalog)\n",
            orphan.id, orphan.batch
        ));
    }
    out.push_str(&format!("\n{} pending\n", report.pending().len()));
    out
}

pub fn list() -> Result<()> {
    let started = Instant::now();
    let catalog = clinic_catalog()?;
    print!("{}", render_catalog(&catalog));
    info!(steps = catalog.len(), elapsed_us = started.elapsed().as_micros() as u64, "catalog listed");
    Ok(())
}

fn render_catalog(catalog: &MigrationCatalog) -> String {
    let mut out = format!("{} migration(s):\n", catalog.len());
    for step in catalog.steps() {
        out.push_str(&format!("  {}\n", step.id()));
        for operation in &step.operations {
            out.push_str(&format!("      {} {}\n", operation.kind(), operation.target()));
        }
    }
    out
}
