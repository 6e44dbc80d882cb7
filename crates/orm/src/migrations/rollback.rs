//! Migration Rollback - Handles rolling back applied migrations
//!
//! Reverts steps most recent first, by count, by batch or all at once.
//! A ledger row whose step is not in the catalog stops the rollback with
//! [`MigrationError::UnknownMigration`] before anything is touched.

use std::time::Instant;

use async_trait::async_trait;
use tracing::{error, info};

use super::definitions::{MigrationRecord, MigrationStep, RollbackResult, StepOutcome};
use super::runner::MigrationRunner;
use crate::backends::MigrationBackend;
use crate::error::{MigrationError, MigrationResult};

/// Extension trait for MigrationRunner to add rollback functionality
#[async_trait]
pub trait MigrationRollback {
    /// Revert the `steps` most recently applied migrations
    async fn rollback(&self, steps: usize) -> MigrationResult<RollbackResult>;

    /// Rollback the last batch of migrations
    async fn rollback_last_batch(&self) -> MigrationResult<RollbackResult>;

    /// Rollback all migrations in a specific batch
    async fn rollback_batch(&self, batch: i32) -> MigrationResult<RollbackResult>;

    /// Rollback all applied migrations
    async fn rollback_all(&self) -> MigrationResult<RollbackResult>;
}

#[async_trait]
impl<B: MigrationBackend> MigrationRollback for MigrationRunner<B> {
    async fn rollback(&self, steps: usize) -> MigrationResult<RollbackResult> {
        let start_time = Instant::now();
        let mut records = self.load_ledger().await?;
        sort_most_recent_first(&mut records);
        records.truncate(steps);
        self.revert_records(records, start_time).await
    }

    async fn rollback_last_batch(&self) -> MigrationResult<RollbackResult> {
        let records = self.load_ledger().await?;
        match records.iter().map(|r| r.batch).max() {
            Some(latest) => self.rollback_batch(latest).await,
            None => Ok(RollbackResult {
                rolled_back: Vec::new(),
                execution_time_ms: 0,
            }),
        }
    }

    async fn rollback_batch(&self, batch: i32) -> MigrationResult<RollbackResult> {
        let start_time = Instant::now();
        let mut records: Vec<MigrationRecord> = self
            .load_ledger()
            .await?
            .into_iter()
            .filter(|r| r.batch == batch)
            .collect();
        sort_most_recent_first(&mut records);
        self.revert_records(records, start_time).await
    }

    async fn rollback_all(&self) -> MigrationResult<RollbackResult> {
        let start_time = Instant::now();
        let mut records = self.load_ledger().await?;
        sort_most_recent_first(&mut records);
        self.revert_records(records, start_time).await
    }
}

impl<B: MigrationBackend> MigrationRunner<B> {
    async fn revert_records(
        &self,
        records: Vec<MigrationRecord>,
        start_time: Instant,
    ) -> MigrationResult<RollbackResult> {
        // Resolve every row up front so an orphan aborts before any revert
        let steps = records
            .iter()
            .map(|record| {
                self.catalog()
                    .find(&record.id)
                    .ok_or_else(|| MigrationError::UnknownMigration(record.id.clone()))
            })
            .collect::<MigrationResult<Vec<&MigrationStep>>>()?;

        if steps.is_empty() {
            info!(backend = self.backend().name(), "Nothing to roll back");
        }

        let mut rolled_back = Vec::with_capacity(steps.len());
        for step in steps {
            let id = step.id();
            info!(migration = %id, "Rolling back migration");
            let outcome = self.revert_step(step).await.map_err(|e| {
                error!(migration = %id, error = %e, "Rollback failed");
                e
            })?;
            if outcome == StepOutcome::AlreadyReverted {
                info!(migration = %id, "Migration already reverted, ledger entry removed");
            }
            rolled_back.push((id, outcome));
        }

        Ok(RollbackResult {
            rolled_back,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }
}

/// Descending version; rows without a version prefix sort by id after versioned ones
fn sort_most_recent_first(records: &mut [MigrationRecord]) {
    records.sort_by(|a, b| {
        b.version()
            .cmp(&a.version())
            .then_with(|| b.id.cmp(&a.id))
    });
}
