//! Migration Runner - Executes migrations against the database
//!
//! Each pending step runs in its own session: the step's operations, then
//! its ledger row, then commit. Operations check whether their forward
//! state is already present and skip the mutation when it is, so a schema
//! provisioned by another path (or a half-finished earlier run on a
//! backend without transactional DDL) converges instead of failing.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::definitions::{
    Guard, MigrationConfig, MigrationRecord, MigrationRunResult, MigrationStatus, MigrationStep,
    Operation, StatusReport, StepOutcome,
};
use super::manager::MigrationCatalog;
use super::schema_builder::{ColumnDescriptor, EnumReplacement, TableDefinition};
use super::statements::split_sql_statements;
use crate::backends::{ColumnInfo, MigrationBackend, SchemaSession};
use crate::error::{MigrationError, MigrationResult};

/// Migration runner that applies and reverts catalog steps
pub struct MigrationRunner<B: MigrationBackend> {
    backend: B,
    catalog: MigrationCatalog,
    config: MigrationConfig,
}

impl<B: MigrationBackend> MigrationRunner<B> {
    /// Create a runner with the default configuration
    pub fn new(backend: B, catalog: MigrationCatalog) -> MigrationResult<Self> {
        Self::with_config(backend, catalog, MigrationConfig::default())
    }

    /// Create a runner with an explicit configuration
    pub fn with_config(
        backend: B,
        catalog: MigrationCatalog,
        config: MigrationConfig,
    ) -> MigrationResult<Self> {
        validate_ledger_name(&config.migrations_table)?;
        Ok(Self {
            backend,
            catalog,
            config,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn catalog(&self) -> &MigrationCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Apply every pending step in ascending version order as one batch
    pub async fn run_migrations(&self) -> MigrationResult<MigrationRunResult> {
        let start_time = Instant::now();
        let records = self.load_ledger().await?;

        let applied_ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
        for record in &records {
            if self.catalog.find(&record.id).is_none() {
                warn!(migration = %record.id, "Ledger entry has no matching migration");
            }
        }

        let pending: Vec<&MigrationStep> = self
            .catalog
            .steps()
            .iter()
            .filter(|step| !applied_ids.contains(step.id().as_str()))
            .collect();
        let skipped_count = self.catalog.len() - pending.len();

        if pending.is_empty() {
            info!(backend = self.backend.name(), "Nothing to migrate");
            return Ok(MigrationRunResult {
                batch: 0,
                applied: Vec::new(),
                skipped_count,
                execution_time_ms: start_time.elapsed().as_millis(),
            });
        }

        let batch = records.iter().map(|r| r.batch).max().unwrap_or(0) + 1;
        let highest_applied = records
            .iter()
            .filter(|r| self.catalog.find(&r.id).is_some())
            .filter_map(|r| r.version())
            .max();

        info!(
            backend = self.backend.name(),
            batch,
            pending = pending.len(),
            "Running migrations"
        );

        let mut applied = Vec::with_capacity(pending.len());
        for step in pending {
            let id = step.id();
            if highest_applied.is_some_and(|highest| step.version < highest) {
                warn!(
                    migration = %id,
                    batch,
                    "Applying migration older than the latest applied one"
                );
            }

            let outcome = self.apply_step(step, batch).await.map_err(|e| {
                error!(migration = %id, batch, error = %e, "Migration failed");
                e
            })?;
            match outcome {
                StepOutcome::AlreadySatisfied => {
                    info!(migration = %id, batch, "Migration already satisfied, recorded")
                }
                _ => info!(migration = %id, batch, "Migrated"),
            }
            applied.push((id, outcome));
        }

        Ok(MigrationRunResult {
            batch,
            applied,
            skipped_count,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Applied/pending state of every step, plus ledger rows with no step
    pub async fn status(&self) -> MigrationResult<StatusReport> {
        let records = self.read_ledger().await?;
        let by_id: HashMap<&str, &MigrationRecord> =
            records.iter().map(|r| (r.id.as_str(), r)).collect();

        let steps = self
            .catalog
            .steps()
            .iter()
            .map(|step| {
                let id = step.id();
                let status = match by_id.get(id.as_str()) {
                    Some(record) => MigrationStatus::Applied {
                        applied_at: record.applied_at,
                        batch: record.batch,
                    },
                    None => MigrationStatus::Pending,
                };
                (id, status)
            })
            .collect();

        let mut orphans: Vec<MigrationRecord> = records
            .iter()
            .filter(|r| self.catalog.find(&r.id).is_none())
            .cloned()
            .collect();
        orphans.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(StatusReport { steps, orphans })
    }

    /// Ensure the ledger exists and read it
    pub(crate) async fn load_ledger(&self) -> MigrationResult<Vec<MigrationRecord>> {
        self.backend.ensure_ledger(&self.config.migrations_table).await?;
        self.backend
            .applied_migrations(&self.config.migrations_table)
            .await
    }

    /// Read the ledger without creating it; a missing table reads as empty
    async fn read_ledger(&self) -> MigrationResult<Vec<MigrationRecord>> {
        let ledger = &self.config.migrations_table;
        if !self.backend.ledger_exists(ledger).await? {
            debug!(ledger = %ledger, "Ledger table absent, nothing applied yet");
            return Ok(Vec::new());
        }
        self.backend.applied_migrations(ledger).await
    }

    async fn apply_step(&self, step: &MigrationStep, batch: i32) -> MigrationResult<StepOutcome> {
        let id = step.id();
        let mut session = self.backend.begin().await?;

        let mut mutated = false;
        for operation in &step.operations {
            match self.apply_operation(session.as_mut(), &id, operation).await {
                Ok(changed) => mutated |= changed,
                Err(e) => {
                    abandon(session, &id).await;
                    return Err(e);
                }
            }
        }

        if let Err(e) = session
            .record_migration(&self.config.migrations_table, &id, batch)
            .await
        {
            abandon(session, &id).await;
            return Err(MigrationError::LedgerWriteFailure {
                id,
                message: e.engine_message(),
            });
        }

        session
            .commit()
            .await
            .map_err(|e| MigrationError::LedgerWriteFailure {
                id: id.clone(),
                message: e.engine_message(),
            })?;

        Ok(if mutated {
            StepOutcome::Applied
        } else {
            StepOutcome::AlreadySatisfied
        })
    }

    /// Revert one step and remove its ledger row in a single session
    pub(crate) async fn revert_step(&self, step: &MigrationStep) -> MigrationResult<StepOutcome> {
        let id = step.id();
        let mut session = self.backend.begin().await?;

        let mut mutated = false;
        for operation in step.operations.iter().rev() {
            match self.revert_operation(session.as_mut(), &id, operation).await {
                Ok(changed) => mutated |= changed,
                Err(e) => {
                    abandon(session, &id).await;
                    return Err(e);
                }
            }
        }

        if let Err(e) = session
            .remove_migration(&self.config.migrations_table, &id)
            .await
        {
            abandon(session, &id).await;
            return Err(MigrationError::LedgerWriteFailure {
                id,
                message: e.engine_message(),
            });
        }

        session
            .commit()
            .await
            .map_err(|e| MigrationError::LedgerWriteFailure {
                id: id.clone(),
                message: e.engine_message(),
            })?;

        Ok(if mutated {
            StepOutcome::Reverted
        } else {
            StepOutcome::AlreadyReverted
        })
    }

    /// Bring one operation to its forward state. Returns whether it mutated.
    async fn apply_operation(
        &self,
        session: &mut dyn SchemaSession,
        id: &str,
        operation: &Operation,
    ) -> MigrationResult<bool> {
        let target = operation.target();
        let fail = |e: MigrationError| mutation_failure(id, &target, e);

        match operation {
            Operation::CreateTable(table) => {
                if session.get_table(&table.name).await.map_err(fail)?.is_some() {
                    info!(migration = %id, target = %target, "Table already exists, skipping");
                    return Ok(false);
                }
                create_table(session, table).await.map_err(fail)?;
            }
            Operation::DropTable(table) => {
                if session.get_table(&table.name).await.map_err(fail)?.is_none() {
                    info!(migration = %id, target = %target, "Table already absent, skipping");
                    return Ok(false);
                }
                drop_table(session, table).await.map_err(fail)?;
            }
            Operation::AddColumn { table, column } => {
                if let Some(live) = find_column(session, table, &column.name).await.map_err(fail)? {
                    info!(migration = %id, target = %target, "Column already exists, skipping");
                    self.check_descriptor(id, &target, &live, column)?;
                    return Ok(false);
                }
                add_column(session, table, column).await.map_err(fail)?;
            }
            Operation::DropColumn { table, column } => {
                if find_column(session, table, &column.name).await.map_err(fail)?.is_none() {
                    info!(migration = %id, target = %target, "Column already absent, skipping");
                    return Ok(false);
                }
                drop_column(session, table, column).await.map_err(fail)?;
            }
            Operation::AlterEnum {
                table,
                column,
                type_name,
                values,
                default,
                ..
            } => {
                let change = EnumReplacement {
                    table: table.clone(),
                    column: column.clone(),
                    type_name: type_name.clone(),
                    values: values.clone(),
                    default: default.clone(),
                };
                if !replace_enum(session, &change).await.map_err(fail)? {
                    info!(
                        migration = %id,
                        target = %target,
                        "Enum already has the requested values, skipping"
                    );
                    return Ok(false);
                }
            }
            Operation::Raw { guard, up, .. } => {
                if guard_present(session, guard).await.map_err(fail)? {
                    info!(migration = %id, target = %target, "Target already exists, skipping");
                    return Ok(false);
                }
                run_raw(session, up).await.map_err(fail)?;
            }
        }

        debug!(
            migration = %id,
            target = %target,
            operation = operation.kind(),
            "Applied operation"
        );
        Ok(true)
    }

    /// Bring one operation back to its prior state. Returns whether it mutated.
    async fn revert_operation(
        &self,
        session: &mut dyn SchemaSession,
        id: &str,
        operation: &Operation,
    ) -> MigrationResult<bool> {
        let target = operation.target();
        let fail = |e: MigrationError| mutation_failure(id, &target, e);

        match operation {
            Operation::CreateTable(table) => {
                if session.get_table(&table.name).await.map_err(fail)?.is_none() {
                    info!(migration = %id, target = %target, "Table already absent, skipping");
                    return Ok(false);
                }
                drop_table(session, table).await.map_err(fail)?;
            }
            Operation::DropTable(table) => {
                if session.get_table(&table.name).await.map_err(fail)?.is_some() {
                    info!(migration = %id, target = %target, "Table already exists, skipping");
                    return Ok(false);
                }
                create_table(session, table).await.map_err(fail)?;
            }
            Operation::AddColumn { table, column } => {
                if find_column(session, table, &column.name).await.map_err(fail)?.is_none() {
                    info!(migration = %id, target = %target, "Column already absent, skipping");
                    return Ok(false);
                }
                drop_column(session, table, column).await.map_err(fail)?;
            }
            Operation::DropColumn { table, column } => {
                if session.get_table(table).await.map_err(fail)?.is_none() {
                    info!(migration = %id, target = %target, "Table absent, nothing to restore");
                    return Ok(false);
                }
                if find_column(session, table, &column.name).await.map_err(fail)?.is_some() {
                    info!(migration = %id, target = %target, "Column already exists, skipping");
                    return Ok(false);
                }
                add_column(session, table, column).await.map_err(fail)?;
            }
            Operation::AlterEnum {
                table,
                column,
                type_name,
                previous,
                default,
                ..
            } => {
                let live = find_column(session, table, column).await.map_err(fail)?;
                let labels = session.enum_values(type_name).await.map_err(fail)?;
                if live.is_none() || labels.is_none() {
                    info!(
                        migration = %id,
                        target = %target,
                        "Enum column already absent, skipping"
                    );
                    return Ok(false);
                }
                let change = EnumReplacement {
                    table: table.clone(),
                    column: column.clone(),
                    type_name: type_name.clone(),
                    values: previous.clone(),
                    default: default.clone(),
                };
                if !replace_enum(session, &change).await.map_err(fail)? {
                    info!(
                        migration = %id,
                        target = %target,
                        "Enum already has the previous values, skipping"
                    );
                    return Ok(false);
                }
            }
            Operation::Raw { guard, down, .. } => {
                if !guard_present(session, guard).await.map_err(fail)? {
                    info!(migration = %id, target = %target, "Target already absent, skipping");
                    return Ok(false);
                }
                run_raw(session, down).await.map_err(fail)?;
            }
        }

        debug!(
            migration = %id,
            target = %target,
            operation = operation.kind(),
            "Reverted operation"
        );
        Ok(true)
    }

    /// Compare an existing column with the descriptor that would have created it
    fn check_descriptor(
        &self,
        id: &str,
        target: &str,
        live: &ColumnInfo,
        column: &ColumnDescriptor,
    ) -> MigrationResult<()> {
        if live.matches(column) {
            return Ok(());
        }

        let expected = ColumnInfo::from_descriptor(column).describe();
        let found = live.describe();
        if self.config.strict_descriptors {
            return Err(MigrationError::DescriptorMismatch {
                id: id.to_string(),
                target: target.to_string(),
                expected,
                found,
            });
        }

        warn!(
            migration = %id,
            target = %target,
            expected = %expected,
            found = %found,
            "Existing column differs from its declaration"
        );
        Ok(())
    }
}

/// Ledger table names are interpolated into SQL, so keep them to plain identifiers
fn validate_ledger_name(name: &str) -> MigrationResult<()> {
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(MigrationError::Configuration(format!(
            "invalid migrations table name '{}'",
            name
        )))
    }
}

fn mutation_failure(id: &str, target: &str, err: MigrationError) -> MigrationError {
    match err {
        MigrationError::Database(message) => MigrationError::MutationFailure {
            id: id.to_string(),
            target: target.to_string(),
            message,
        },
        other => other,
    }
}

async fn abandon(session: Box<dyn SchemaSession>, id: &str) {
    if let Err(e) = session.rollback().await {
        warn!(migration = %id, error = %e, "Failed to roll back migration session");
    }
}

async fn find_column(
    session: &mut dyn SchemaSession,
    table: &str,
    column: &str,
) -> MigrationResult<Option<ColumnInfo>> {
    Ok(session
        .get_table(table)
        .await?
        .and_then(|t| t.find_column_by_name(column).cloned()))
}

async fn guard_present(session: &mut dyn SchemaSession, guard: &Guard) -> MigrationResult<bool> {
    match guard {
        Guard::TableExists(table) => Ok(session.get_table(table).await?.is_some()),
        Guard::ColumnExists { table, column } => {
            Ok(find_column(session, table, column).await?.is_some())
        }
    }
}

async fn ensure_enum_type(
    session: &mut dyn SchemaSession,
    type_name: &str,
    values: &[String],
) -> MigrationResult<()> {
    if session.enum_values(type_name).await?.is_none() {
        session.create_enum_type(type_name, values).await?;
    }
    Ok(())
}

async fn create_table(
    session: &mut dyn SchemaSession,
    table: &TableDefinition,
) -> MigrationResult<()> {
    for (type_name, values) in table.enum_types() {
        ensure_enum_type(session, type_name, values).await?;
    }
    session.create_table(table).await
}

async fn drop_table(
    session: &mut dyn SchemaSession,
    table: &TableDefinition,
) -> MigrationResult<()> {
    session.drop_table(&table.name).await?;
    for (type_name, _) in table.enum_types() {
        session.drop_enum_type(type_name).await?;
    }
    Ok(())
}

async fn add_column(
    session: &mut dyn SchemaSession,
    table: &str,
    column: &ColumnDescriptor,
) -> MigrationResult<()> {
    if let Some((type_name, values)) = column.column_type.enum_type() {
        ensure_enum_type(session, type_name, values).await?;
    }
    session.add_column(table, column).await
}

async fn drop_column(
    session: &mut dyn SchemaSession,
    table: &str,
    column: &ColumnDescriptor,
) -> MigrationResult<()> {
    session.drop_column(table, &column.name).await?;
    if let Some((type_name, _)) = column.column_type.enum_type() {
        session.drop_enum_type(type_name).await?;
    }
    Ok(())
}

/// Swap the enum's label set unless it already matches. Returns whether it mutated.
async fn replace_enum(
    session: &mut dyn SchemaSession,
    change: &EnumReplacement,
) -> MigrationResult<bool> {
    match session.enum_values(&change.type_name).await? {
        Some(current) if current == change.values => Ok(false),
        Some(_) => {
            session.replace_enum_type(change).await?;
            Ok(true)
        }
        None => Err(MigrationError::Database(format!(
            "type \"{}\" does not exist",
            change.type_name
        ))),
    }
}

async fn run_raw(session: &mut dyn SchemaSession, sql: &str) -> MigrationResult<()> {
    for statement in split_sql_statements(sql) {
        session.query(&statement).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryBackend;

    fn catalog(steps: Vec<MigrationStep>) -> MigrationCatalog {
        MigrationCatalog::new(steps).unwrap()
    }

    fn users_table() -> TableDefinition {
        TableDefinition::new("users").id().string("email", Some(255))
    }

    #[test]
    fn test_ledger_name_validation() {
        assert!(validate_ledger_name("clinic_migrations").is_ok());
        assert!(validate_ledger_name("_migrations2").is_ok());
        assert!(validate_ledger_name("").is_err());
        assert!(validate_ledger_name("1migrations").is_err());
        assert!(validate_ledger_name("migrations; DROP TABLE users").is_err());
    }

    #[test]
    fn test_runner_rejects_bad_ledger_name() {
        let config = MigrationConfig {
            migrations_table: "bad name".to_string(),
            ..MigrationConfig::default()
        };
        let result = MigrationRunner::with_config(MemoryBackend::new(), catalog(vec![]), config);
        assert!(matches!(result, Err(MigrationError::Configuration(_))));
    }

    #[test]
    fn test_mutation_failure_mapping() {
        let err = mutation_failure(
            "1_Step",
            "users.name",
            MigrationError::Database("permission denied for table users".to_string()),
        );
        assert_eq!(
            err,
            MigrationError::MutationFailure {
                id: "1_Step".to_string(),
                target: "users.name".to_string(),
                message: "permission denied for table users".to_string(),
            }
        );

        let passthrough =
            mutation_failure("1_Step", "users", MigrationError::LedgerRead("x".to_string()));
        assert!(matches!(passthrough, MigrationError::LedgerRead(_)));
    }

    #[tokio::test]
    async fn test_create_table_then_add_enum_column() {
        let backend = MemoryBackend::new();
        let runner = MigrationRunner::new(
            backend.clone(),
            catalog(vec![
                MigrationStep::new(1, "CreateUsers")
                    .operation(Operation::CreateTable(users_table())),
                MigrationStep::new(2, "AddRole").operation(Operation::add_column(
                    "users",
                    ColumnDescriptor::enumeration("role", "users_role_enum", &["admin", "staff"]),
                )),
            ]),
        )
        .unwrap();

        let result = runner.run_migrations().await.unwrap();
        assert_eq!(result.batch, 1);
        assert_eq!(result.applied_ids(), vec!["1_CreateUsers", "2_AddRole"]);
        assert!(backend.has_column("users", "role"));
        assert_eq!(
            backend.enum_labels("users_role_enum"),
            Some(vec!["admin".to_string(), "staff".to_string()])
        );
    }

    #[tokio::test]
    async fn test_alter_enum_is_skipped_when_values_match() {
        let backend = MemoryBackend::new().with_table(
            TableDefinition::new("reservations")
                .id()
                .column(ColumnDescriptor::enumeration(
                    "type",
                    "reservations_type_enum",
                    &["a", "b"],
                )),
        );
        let runner = MigrationRunner::new(
            backend.clone(),
            catalog(vec![MigrationStep::new(1, "AlterType").operation(Operation::AlterEnum {
                table: "reservations".to_string(),
                column: "type".to_string(),
                type_name: "reservations_type_enum".to_string(),
                values: vec!["a".to_string(), "b".to_string()],
                previous: vec!["a".to_string()],
                default: None,
            })]),
        )
        .unwrap();

        let result = runner.run_migrations().await.unwrap();
        assert_eq!(
            result.applied,
            vec![("1_AlterType".to_string(), StepOutcome::AlreadySatisfied)]
        );
    }

    #[tokio::test]
    async fn test_nothing_pending_returns_batch_zero() {
        let runner = MigrationRunner::new(MemoryBackend::new(), catalog(vec![])).unwrap();
        let result = runner.run_migrations().await.unwrap();
        assert_eq!(result.batch, 0);
        assert_eq!(result.applied_count(), 0);
    }
}
