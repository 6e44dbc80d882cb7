//! Core Migration Backend Traits
//!
//! These traits abstract schema introspection, DDL and the migration ledger
//! so the runner can be driven against PostgreSQL or an in-memory schema.

use async_trait::async_trait;

use crate::error::MigrationResult;
use crate::migrations::definitions::MigrationRecord;
use crate::migrations::schema_builder::{ColumnDescriptor, ColumnType, EnumReplacement, TableDefinition};

/// Live description of one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// `information_schema.columns.data_type`
    pub data_type: String,
    /// Underlying type name; the enum type for `USER-DEFINED` columns
    pub udt_name: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub max_length: Option<i32>,
}

impl ColumnInfo {
    /// The column a descriptor would produce
    pub fn from_descriptor(column: &ColumnDescriptor) -> Self {
        let (udt_name, max_length) = match &column.column_type {
            ColumnType::Enum { type_name, .. } => (type_name.clone(), None),
            ColumnType::Varchar(len) => ("varchar".to_string(), Some(*len as i32)),
            other => (other.data_type().to_string(), None),
        };

        Self {
            name: column.name.clone(),
            data_type: column.column_type.data_type().to_string(),
            udt_name,
            nullable: column.nullable && !column.primary_key,
            default: column.default.clone(),
            max_length,
        }
    }

    /// Structural comparison against a descriptor: type family, enum type
    /// name, varchar length and nullability. Defaults are not compared.
    pub fn matches(&self, column: &ColumnDescriptor) -> bool {
        let expected = ColumnInfo::from_descriptor(column);

        if self.data_type != expected.data_type || self.nullable != expected.nullable {
            return false;
        }
        if let ColumnType::Enum { type_name, .. } = &column.column_type {
            if &self.udt_name != type_name {
                return false;
            }
        }
        match (self.max_length, expected.max_length) {
            (Some(found), Some(wanted)) => found == wanted,
            _ => true,
        }
    }

    /// Short human description used in drift reports
    pub fn describe(&self) -> String {
        let type_name = if self.data_type == "USER-DEFINED" {
            self.udt_name.clone()
        } else {
            match self.max_length {
                Some(len) => format!("{}({})", self.data_type, len),
                None => self.data_type.clone(),
            }
        };
        format!("{} {}", type_name, if self.nullable { "NULL" } else { "NOT NULL" })
    }
}

/// Live description of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableInfo {
    pub fn find_column_by_name(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.find_column_by_name(name).is_some()
    }
}

/// Entry point to a database for the migration runner
#[async_trait]
pub trait MigrationBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Whether DDL participates in session transactions
    fn supports_transactional_ddl(&self) -> bool;

    /// Create the ledger table if it does not exist
    async fn ensure_ledger(&self, ledger: &str) -> MigrationResult<()>;

    /// Whether the ledger table exists, without creating it
    async fn ledger_exists(&self, ledger: &str) -> MigrationResult<bool>;

    /// Applied ledger rows, in no particular order
    async fn applied_migrations(&self, ledger: &str) -> MigrationResult<Vec<MigrationRecord>>;

    /// Start a unit of work for one step
    async fn begin(&self) -> MigrationResult<Box<dyn SchemaSession>>;
}

/// Unit of work covering one step's mutations and its ledger write
#[async_trait]
pub trait SchemaSession: Send {
    /// Introspect a table; `None` when it does not exist
    async fn get_table(&mut self, name: &str) -> MigrationResult<Option<TableInfo>>;

    /// Labels of an enum type in declaration order; `None` when it does not exist
    async fn enum_values(&mut self, type_name: &str) -> MigrationResult<Option<Vec<String>>>;

    async fn create_enum_type(&mut self, type_name: &str, values: &[String]) -> MigrationResult<()>;

    async fn drop_enum_type(&mut self, type_name: &str) -> MigrationResult<()>;

    /// Swap the label set of an enum type backing one column
    async fn replace_enum_type(&mut self, change: &EnumReplacement) -> MigrationResult<()>;

    async fn create_table(&mut self, table: &TableDefinition) -> MigrationResult<()>;

    async fn drop_table(&mut self, name: &str) -> MigrationResult<()>;

    async fn add_column(&mut self, table: &str, column: &ColumnDescriptor) -> MigrationResult<()>;

    async fn drop_column(&mut self, table: &str, column: &str) -> MigrationResult<()>;

    /// Execute one raw statement
    async fn query(&mut self, sql: &str) -> MigrationResult<()>;

    async fn record_migration(&mut self, ledger: &str, id: &str, batch: i32) -> MigrationResult<()>;

    async fn remove_migration(&mut self, ledger: &str, id: &str) -> MigrationResult<()>;

    async fn commit(self: Box<Self>) -> MigrationResult<()>;

    async fn rollback(self: Box<Self>) -> MigrationResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_info_matches_descriptor() {
        let descriptor = ColumnDescriptor::varchar("name", 255);
        let live = ColumnInfo::from_descriptor(&descriptor);
        assert!(live.matches(&descriptor));

        let narrower = ColumnInfo {
            max_length: Some(100),
            ..live.clone()
        };
        assert!(!narrower.matches(&descriptor));

        let not_null = ColumnInfo {
            nullable: false,
            ..live
        };
        assert!(!not_null.matches(&descriptor));
    }

    #[test]
    fn test_enum_column_matches_on_type_name() {
        let descriptor = ColumnDescriptor::enumeration("type", "reservations_type_enum", &["online"]);
        let live = ColumnInfo::from_descriptor(&descriptor);
        assert_eq!(live.data_type, "USER-DEFINED");
        assert!(live.matches(&descriptor));

        let other = ColumnInfo {
            udt_name: "visit_kind".to_string(),
            ..live
        };
        assert!(!other.matches(&descriptor));
        assert_eq!(other.describe(), "visit_kind NULL");
    }

    #[test]
    fn test_table_info_lookup() {
        let table = TableInfo {
            name: "users".to_string(),
            columns: vec![ColumnInfo::from_descriptor(&ColumnDescriptor::id("id"))],
        };
        assert!(table.has_column("id"));
        assert!(table.find_column_by_name("name").is_none());
        assert!(!table.columns[0].nullable);
    }
}
