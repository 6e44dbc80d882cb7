//! Migration Definitions - Core types and structures for migrations
//!
//! Defines the fundamental types used throughout the migration system:
//! steps and their operations, ledger records, runner configuration and
//! run results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::schema_builder::{ColumnDescriptor, TableDefinition};

/// Schema object a guard inspects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    TableExists(String),
    ColumnExists { table: String, column: String },
}

impl Guard {
    pub fn table(table: &str) -> Self {
        Guard::TableExists(table.to_string())
    }

    pub fn column(table: &str, column: &str) -> Self {
        Guard::ColumnExists {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    /// `table` or `table.column`, used in logs and errors
    pub fn target(&self) -> String {
        match self {
            Guard::TableExists(table) => table.clone(),
            Guard::ColumnExists { table, column } => format!("{}.{}", table, column),
        }
    }
}

/// A single schema change with its inverse
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Forward state: the table exists
    CreateTable(TableDefinition),
    /// Forward state: the table is absent; the definition restores it on revert
    DropTable(TableDefinition),
    /// Forward state: the column exists
    AddColumn {
        table: String,
        column: ColumnDescriptor,
    },
    /// Forward state: the column is absent; the descriptor restores it on revert
    DropColumn {
        table: String,
        column: ColumnDescriptor,
    },
    /// Forward state: the enum type carries exactly `values`
    AlterEnum {
        table: String,
        column: String,
        type_name: String,
        values: Vec<String>,
        previous: Vec<String>,
        default: Option<String>,
    },
    /// Forward state: the guard target exists
    Raw {
        guard: Guard,
        up: String,
        down: String,
    },
}

impl Operation {
    pub fn add_column(table: &str, column: ColumnDescriptor) -> Self {
        Operation::AddColumn {
            table: table.to_string(),
            column,
        }
    }

    pub fn drop_column(table: &str, column: ColumnDescriptor) -> Self {
        Operation::DropColumn {
            table: table.to_string(),
            column,
        }
    }

    pub fn raw(guard: Guard, up: &str, down: &str) -> Self {
        Operation::Raw {
            guard,
            up: up.to_string(),
            down: down.to_string(),
        }
    }

    /// Schema object this operation touches, as `table` or `table.column`
    pub fn target(&self) -> String {
        match self {
            Operation::CreateTable(def) | Operation::DropTable(def) => def.name.clone(),
            Operation::AddColumn { table, column } | Operation::DropColumn { table, column } => {
                format!("{}.{}", table, column.name)
            }
            Operation::AlterEnum { table, column, .. } => format!("{}.{}", table, column),
            Operation::Raw { guard, .. } => guard.target(),
        }
    }

    /// Short verb for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::CreateTable(_) => "create_table",
            Operation::DropTable(_) => "drop_table",
            Operation::AddColumn { .. } => "add_column",
            Operation::DropColumn { .. } => "drop_column",
            Operation::AlterEnum { .. } => "alter_enum",
            Operation::Raw { .. } => "raw",
        }
    }
}

/// A migration step: a versioned, named list of operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStep {
    /// Epoch milliseconds at authoring time; orders the catalog
    pub version: u64,
    /// Human-readable name
    pub name: String,
    pub operations: Vec<Operation>,
}

impl MigrationStep {
    pub fn new(version: u64, name: &str) -> Self {
        Self {
            version,
            name: name.to_string(),
            operations: Vec::new(),
        }
    }

    /// Append an operation
    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Ledger identifier, `{version}_{name}`
    pub fn id(&self) -> String {
        format!("{}_{}", self.version, self.name)
    }
}

/// Migration status in the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Migration ID
    pub id: String,
    /// When the migration was applied
    pub applied_at: DateTime<Utc>,
    /// Batch number (for grouping migrations)
    pub batch: i32,
}

impl MigrationRecord {
    /// Version prefix of the id, if it has one
    pub fn version(&self) -> Option<u64> {
        self.id.split('_').next().and_then(|v| v.parse().ok())
    }
}

/// Configuration for the migration system
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Table name for tracking migrations
    pub migrations_table: String,
    /// Fail instead of warn when an existing column differs from its descriptor
    pub strict_descriptors: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations_table: "clinic_migrations".to_string(),
            strict_descriptors: false,
        }
    }
}

/// What happened to one step during a run or rollback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// At least one operation mutated the schema
    Applied,
    /// Every operation found its target already present
    AlreadySatisfied,
    /// At least one operation issued its inverse
    Reverted,
    /// Every operation found its target already absent
    AlreadyReverted,
}

/// Result of running migrations
#[derive(Debug, Clone)]
pub struct MigrationRunResult {
    /// Batch number assigned to this run (0 when nothing was pending)
    pub batch: i32,
    /// Steps processed in this run, in order, with their outcome
    pub applied: Vec<(String, StepOutcome)>,
    /// Number of migrations that were skipped (already applied)
    pub skipped_count: usize,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl MigrationRunResult {
    /// Number of migrations recorded by this run
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    /// IDs of migrations recorded by this run
    pub fn applied_ids(&self) -> Vec<&str> {
        self.applied.iter().map(|(id, _)| id.as_str()).collect()
    }
}

/// Result of rolling back migrations
#[derive(Debug, Clone)]
pub struct RollbackResult {
    /// Steps reverted, most recent first, with their outcome
    pub rolled_back: Vec<(String, StepOutcome)>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl RollbackResult {
    /// Number of migrations that were rolled back
    pub fn rolled_back_count(&self) -> usize {
        self.rolled_back.len()
    }

    /// IDs of migrations that were rolled back
    pub fn rolled_back_ids(&self) -> Vec<&str> {
        self.rolled_back.iter().map(|(id, _)| id.as_str()).collect()
    }
}

/// Migration status in the system
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStatus {
    /// Migration is pending (not yet applied)
    Pending,
    /// Migration has been applied
    Applied {
        /// When it was applied
        applied_at: DateTime<Utc>,
        /// Batch number
        batch: i32,
    },
}

/// Status report for every catalog step plus ledger rows with no step
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub steps: Vec<(String, MigrationStatus)>,
    /// Ledger ids that the catalog does not define
    pub orphans: Vec<MigrationRecord>,
}

impl StatusReport {
    pub fn pending(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|(_, status)| *status == MigrationStatus::Pending)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn is_applied(&self, id: &str) -> bool {
        self.steps
            .iter()
            .any(|(step_id, status)| step_id == id && *status != MigrationStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_id_format() {
        let step = MigrationStep::new(1716900000000, "Addnametousers");
        assert_eq!(step.id(), "1716900000000_Addnametousers");
    }

    #[test]
    fn test_record_version() {
        let record = MigrationRecord {
            id: "1716900000000_Addnametousers".to_string(),
            applied_at: Utc::now(),
            batch: 1,
        };
        assert_eq!(record.version(), Some(1716900000000));

        let legacy = MigrationRecord {
            id: "manual".to_string(),
            applied_at: Utc::now(),
            batch: 1,
        };
        assert_eq!(legacy.version(), None);
    }

    #[test]
    fn test_operation_target() {
        let op = Operation::add_column("users", ColumnDescriptor::varchar("name", 255));
        assert_eq!(op.target(), "users.name");
        assert_eq!(op.kind(), "add_column");

        let raw = Operation::raw(Guard::table("settings"), "SELECT 1", "SELECT 1");
        assert_eq!(raw.target(), "settings");
    }
}
