//! In-memory Backend
//!
//! Keeps a structural model of the schema (tables, columns, enum types and
//! CHECK literal sets) plus the ledger. Raw statements are parsed with
//! sqlparser; only `ALTER TABLE ... ADD COLUMN / DROP COLUMN` is understood.
//!
//! Errors mirror the messages PostgreSQL produces for the same situations,
//! and failures can be injected per table or for ledger writes.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use sqlparser::ast::{
    AlterTableOperation, ColumnDef, ColumnOption, Expr, Statement, Value as SqlValue,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use super::core::{ColumnInfo, MigrationBackend, SchemaSession, TableInfo};
use crate::error::{MigrationError, MigrationResult};
use crate::migrations::definitions::MigrationRecord;
use crate::migrations::schema_builder::{
    add_column_sql, create_enum_type_sql, drop_column_sql, drop_enum_type_sql, drop_table_sql,
    ColumnDescriptor, EnumReplacement, TableDefinition,
};

/// Structural schema state, comparable across runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySnapshot {
    pub tables: BTreeMap<String, Vec<ColumnInfo>>,
    pub enums: BTreeMap<String, Vec<String>>,
    /// Literal sets of `CHECK (col IN (...))` constraints, keyed by table and column
    pub checks: BTreeMap<(String, String), Vec<String>>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    schema: MemorySnapshot,
    ledgers: BTreeMap<String, BTreeMap<String, MigrationRecord>>,
}

#[derive(Debug, Clone, Default)]
struct FailurePlan {
    tables: HashSet<String>,
    ledger_writes: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: MemoryState,
    failures: FailurePlan,
    statements: Vec<String>,
}

/// In-memory migration backend
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    shared: Arc<Mutex<Shared>>,
    transactional: bool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Backend whose sessions behave like transactions
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared::default())),
            transactional: true,
        }
    }

    /// Backend where every DDL statement commits immediately
    pub fn non_transactional() -> Self {
        Self {
            transactional: false,
            ..Self::new()
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a table, as if created by another provisioning path
    pub fn with_table(self, table: TableDefinition) -> Self {
        {
            let mut shared = self.lock();
            for (type_name, values) in table.enum_types() {
                shared
                    .state
                    .schema
                    .enums
                    .insert(type_name.to_string(), values.to_vec());
            }
            let columns = table.columns.iter().map(ColumnInfo::from_descriptor).collect();
            shared.state.schema.tables.insert(table.name.clone(), columns);
        }
        self
    }

    /// Seed a column on an existing table
    pub fn with_column(self, table: &str, column: ColumnDescriptor) -> Self {
        {
            let mut shared = self.lock();
            if let Some((type_name, values)) = column.column_type.enum_type() {
                shared
                    .state
                    .schema
                    .enums
                    .insert(type_name.to_string(), values.to_vec());
            }
            shared
                .state
                .schema
                .tables
                .entry(table.to_string())
                .or_default()
                .push(ColumnInfo::from_descriptor(&column));
        }
        self
    }

    /// Make every DDL statement touching `table` fail
    pub fn fail_on_table(&self, table: &str) {
        self.lock().failures.tables.insert(table.to_string());
    }

    /// Make ledger inserts and deletes fail
    pub fn fail_ledger_writes(&self, fail: bool) {
        self.lock().failures.ledger_writes = fail;
    }

    pub fn clear_failures(&self) {
        self.lock().failures = FailurePlan::default();
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        self.lock().state.schema.clone()
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.lock().state.schema.tables.contains_key(table)
    }

    pub fn column(&self, table: &str, column: &str) -> Option<ColumnInfo> {
        self.lock()
            .state
            .schema
            .tables
            .get(table)
            .and_then(|columns| columns.iter().find(|c| c.name == column).cloned())
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.column(table, column).is_some()
    }

    /// Count of columns with this name; more than one would be a duplicate
    pub fn column_count(&self, table: &str, column: &str) -> usize {
        self.lock()
            .state
            .schema
            .tables
            .get(table)
            .map(|columns| columns.iter().filter(|c| c.name == column).count())
            .unwrap_or(0)
    }

    pub fn enum_labels(&self, type_name: &str) -> Option<Vec<String>> {
        self.lock().state.schema.enums.get(type_name).cloned()
    }

    pub fn check_values(&self, table: &str, column: &str) -> Option<Vec<String>> {
        self.lock()
            .state
            .schema
            .checks
            .get(&(table.to_string(), column.to_string()))
            .cloned()
    }

    pub fn has_ledger(&self, ledger: &str) -> bool {
        self.lock().state.ledgers.contains_key(ledger)
    }

    /// Ledger ids in id order
    pub fn ledger_ids(&self, ledger: &str) -> Vec<String> {
        self.lock()
            .state
            .ledgers
            .get(ledger)
            .map(|rows| rows.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every statement that reached the schema, in execution order
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }
}

#[async_trait]
impl MigrationBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn supports_transactional_ddl(&self) -> bool {
        self.transactional
    }

    async fn ensure_ledger(&self, ledger: &str) -> MigrationResult<()> {
        self.lock()
            .state
            .ledgers
            .entry(ledger.to_string())
            .or_default();
        Ok(())
    }

    async fn ledger_exists(&self, ledger: &str) -> MigrationResult<bool> {
        Ok(self.lock().state.ledgers.contains_key(ledger))
    }

    async fn applied_migrations(&self, ledger: &str) -> MigrationResult<Vec<MigrationRecord>> {
        let shared = self.lock();
        let rows = shared.state.ledgers.get(ledger).ok_or_else(|| {
            MigrationError::LedgerRead(format!("relation \"{}\" does not exist", ledger))
        })?;
        Ok(rows.values().cloned().collect())
    }

    async fn begin(&self) -> MigrationResult<Box<dyn SchemaSession>> {
        let shared = self.lock();
        Ok(Box::new(MemorySession {
            shared: Arc::clone(&self.shared),
            working: shared.state.clone(),
            failures: shared.failures.clone(),
            autocommit: !self.transactional,
            pending_statements: Vec::new(),
        }))
    }
}

/// Session over a private copy of the state, published on commit (or after
/// every statement when the backend is non-transactional)
pub struct MemorySession {
    shared: Arc<Mutex<Shared>>,
    working: MemoryState,
    failures: FailurePlan,
    autocommit: bool,
    pending_statements: Vec<String>,
}

fn db_error(message: String) -> MigrationError {
    MigrationError::Database(message)
}

impl MemorySession {
    fn check_table_failure(&self, table: &str) -> MigrationResult<()> {
        if self.failures.tables.contains(table) {
            return Err(db_error(format!("permission denied for table {}", table)));
        }
        Ok(())
    }

    fn publish(&mut self) {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        shared.state = self.working.clone();
        shared.statements.append(&mut self.pending_statements);
    }

    fn executed(&mut self, sql: String) {
        self.pending_statements.push(sql);
        if self.autocommit {
            self.publish();
        }
    }

    fn schema(&mut self) -> &mut MemorySnapshot {
        &mut self.working.schema
    }

    fn columns_mut(&mut self, table: &str) -> MigrationResult<&mut Vec<ColumnInfo>> {
        self.working
            .schema
            .tables
            .get_mut(table)
            .ok_or_else(|| db_error(format!("relation \"{}\" does not exist", table)))
    }

    fn insert_column(&mut self, table: &str, column: ColumnInfo) -> MigrationResult<()> {
        if column.data_type == "USER-DEFINED"
            && !self.working.schema.enums.contains_key(&column.udt_name)
        {
            return Err(db_error(format!("type \"{}\" does not exist", column.udt_name)));
        }
        let columns = self.columns_mut(table)?;
        if columns.iter().any(|c| c.name == column.name) {
            return Err(db_error(format!(
                "column \"{}\" of relation \"{}\" already exists",
                column.name, table
            )));
        }
        columns.push(column);
        Ok(())
    }

    fn remove_column(&mut self, table: &str, column: &str) -> MigrationResult<()> {
        let columns = self.columns_mut(table)?;
        let before = columns.len();
        columns.retain(|c| c.name != column);
        if columns.len() == before {
            return Err(db_error(format!(
                "column \"{}\" of relation \"{}\" does not exist",
                column, table
            )));
        }
        self.schema()
            .checks
            .remove(&(table.to_string(), column.to_string()));
        Ok(())
    }

    fn apply_statement(&mut self, statement: &Statement) -> MigrationResult<()> {
        let (name, operations) = match statement {
            Statement::AlterTable {
                name, operations, ..
            } => (name, operations),
            other => {
                return Err(db_error(format!(
                    "memory backend cannot execute statement: {}",
                    other
                )))
            }
        };

        let table = name
            .0
            .last()
            .map(|ident| ident.value.clone())
            .ok_or_else(|| db_error("ALTER TABLE without a table name".to_string()))?;
        self.check_table_failure(&table)?;

        for operation in operations {
            match operation {
                AlterTableOperation::AddColumn { column_def, .. } => {
                    let (column, check) = column_from_def(column_def);
                    let column_name = column.name.clone();
                    self.insert_column(&table, column)?;
                    if let Some(values) = check {
                        self.schema()
                            .checks
                            .insert((table.clone(), column_name), values);
                    }
                }
                AlterTableOperation::DropColumn { column_name, .. } => {
                    self.remove_column(&table, &column_name.value)?;
                }
                other => {
                    return Err(db_error(format!(
                        "memory backend cannot execute ALTER TABLE operation: {}",
                        other
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Literal set of a `col IN ('a', 'b')` check expression
fn in_list_literals(expr: &Expr) -> Option<Vec<String>> {
    match expr {
        Expr::InList {
            list,
            negated: false,
            ..
        } => list
            .iter()
            .map(|item| match item {
                Expr::Value(SqlValue::SingleQuotedString(value)) => Some(value.clone()),
                _ => None,
            })
            .collect(),
        Expr::Nested(inner) => in_list_literals(inner),
        _ => None,
    }
}

/// Map a rendered SQL type to `(data_type, udt_name, max_length)`
fn classify_type(type_sql: &str) -> (String, String, Option<i32>) {
    let lower = type_sql.to_lowercase();
    let base = lower.split('(').next().unwrap_or("").trim().to_string();
    let length = lower
        .split_once('(')
        .and_then(|(_, rest)| rest.trim_end_matches(')').trim().parse::<i32>().ok());

    let known = match base.as_str() {
        "varchar" | "character varying" => Some(("character varying", "varchar")),
        "text" => Some(("text", "text")),
        "int" | "int4" | "integer" => Some(("integer", "int4")),
        "bigint" | "int8" => Some(("bigint", "int8")),
        "bool" | "boolean" => Some(("boolean", "bool")),
        "numeric" | "decimal" => Some(("numeric", "numeric")),
        "date" => Some(("date", "date")),
        "time" => Some(("time without time zone", "time")),
        "timestamp" => Some(("timestamp without time zone", "timestamp")),
        "timestamptz" => Some(("timestamp with time zone", "timestamptz")),
        "uuid" => Some(("uuid", "uuid")),
        "jsonb" => Some(("jsonb", "jsonb")),
        _ => None,
    };

    match known {
        Some((data_type, udt)) => {
            let max_length = if data_type == "character varying" { length } else { None };
            (data_type.to_string(), udt.to_string(), max_length)
        }
        None => (
            "USER-DEFINED".to_string(),
            type_sql.trim_matches('"').to_string(),
            None,
        ),
    }
}

fn column_from_def(def: &ColumnDef) -> (ColumnInfo, Option<Vec<String>>) {
    let (data_type, udt_name, max_length) = classify_type(&def.data_type.to_string());
    let mut column = ColumnInfo {
        name: def.name.value.clone(),
        data_type,
        udt_name,
        nullable: true,
        default: None,
        max_length,
    };
    let mut check = None;

    for option in &def.options {
        match &option.option {
            ColumnOption::NotNull => column.nullable = false,
            ColumnOption::Null => column.nullable = true,
            ColumnOption::Default(expr) => column.default = Some(expr.to_string()),
            ColumnOption::Check(expr) => check = in_list_literals(expr),
            _ => {}
        }
    }

    (column, check)
}

#[async_trait]
impl SchemaSession for MemorySession {
    async fn get_table(&mut self, name: &str) -> MigrationResult<Option<TableInfo>> {
        Ok(self.working.schema.tables.get(name).map(|columns| TableInfo {
            name: name.to_string(),
            columns: columns.clone(),
        }))
    }

    async fn enum_values(&mut self, type_name: &str) -> MigrationResult<Option<Vec<String>>> {
        Ok(self.working.schema.enums.get(type_name).cloned())
    }

    async fn create_enum_type(
        &mut self,
        type_name: &str,
        values: &[String],
    ) -> MigrationResult<()> {
        if self.working.schema.enums.contains_key(type_name) {
            return Err(db_error(format!("type \"{}\" already exists", type_name)));
        }
        self.schema()
            .enums
            .insert(type_name.to_string(), values.to_vec());
        self.executed(create_enum_type_sql(type_name, values));
        Ok(())
    }

    async fn drop_enum_type(&mut self, type_name: &str) -> MigrationResult<()> {
        let in_use = self
            .working
            .schema
            .tables
            .values()
            .flatten()
            .any(|c| c.data_type == "USER-DEFINED" && c.udt_name == type_name);
        if in_use {
            return Err(db_error(format!(
                "cannot drop type {} because other objects depend on it",
                type_name
            )));
        }
        self.schema().enums.remove(type_name);
        self.executed(drop_enum_type_sql(type_name));
        Ok(())
    }

    async fn replace_enum_type(&mut self, change: &EnumReplacement) -> MigrationResult<()> {
        self.check_table_failure(&change.table)?;
        if !self.working.schema.enums.contains_key(&change.type_name) {
            return Err(db_error(format!("type \"{}\" does not exist", change.type_name)));
        }

        let column = self
            .columns_mut(&change.table)?
            .iter_mut()
            .find(|c| c.name == change.column)
            .ok_or_else(|| {
                db_error(format!(
                    "column \"{}\" of relation \"{}\" does not exist",
                    change.column, change.table
                ))
            })?;
        column.udt_name = change.type_name.clone();
        column.default = change.default.clone();

        self.schema()
            .enums
            .insert(change.type_name.clone(), change.values.clone());
        for statement in change.to_sql() {
            self.executed(statement);
        }
        Ok(())
    }

    async fn create_table(&mut self, table: &TableDefinition) -> MigrationResult<()> {
        self.check_table_failure(&table.name)?;
        if self.working.schema.tables.contains_key(&table.name) {
            return Err(db_error(format!("relation \"{}\" already exists", table.name)));
        }
        for (type_name, _) in table.enum_types() {
            if !self.working.schema.enums.contains_key(type_name) {
                return Err(db_error(format!("type \"{}\" does not exist", type_name)));
            }
        }

        let columns = table.columns.iter().map(ColumnInfo::from_descriptor).collect();
        self.schema().tables.insert(table.name.clone(), columns);
        self.executed(table.to_sql());
        Ok(())
    }

    async fn drop_table(&mut self, name: &str) -> MigrationResult<()> {
        self.check_table_failure(name)?;
        self.schema().tables.remove(name);
        self.schema().checks.retain(|(table, _), _| table != name);
        self.executed(drop_table_sql(name));
        Ok(())
    }

    async fn add_column(&mut self, table: &str, column: &ColumnDescriptor) -> MigrationResult<()> {
        self.check_table_failure(table)?;
        self.insert_column(table, ColumnInfo::from_descriptor(column))?;
        self.executed(add_column_sql(table, column));
        Ok(())
    }

    async fn drop_column(&mut self, table: &str, column: &str) -> MigrationResult<()> {
        self.check_table_failure(table)?;
        self.remove_column(table, column)?;
        self.executed(drop_column_sql(table, column));
        Ok(())
    }

    async fn query(&mut self, sql: &str) -> MigrationResult<()> {
        let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)
            .map_err(|e| db_error(format!("syntax error: {}", e)))?;
        for statement in &statements {
            self.apply_statement(statement)?;
        }
        self.executed(sql.to_string());
        Ok(())
    }

    async fn record_migration(
        &mut self,
        ledger: &str,
        id: &str,
        batch: i32,
    ) -> MigrationResult<()> {
        if self.failures.ledger_writes {
            return Err(db_error(format!("permission denied for table {}", ledger)));
        }
        let rows = self
            .working
            .ledgers
            .get_mut(ledger)
            .ok_or_else(|| db_error(format!("relation \"{}\" does not exist", ledger)))?;
        if rows.contains_key(id) {
            return Err(db_error(format!(
                "duplicate key value violates unique constraint \"{}_pkey\"",
                ledger
            )));
        }
        rows.insert(
            id.to_string(),
            MigrationRecord {
                id: id.to_string(),
                applied_at: Utc::now(),
                batch,
            },
        );
        if self.autocommit {
            self.publish();
        }
        Ok(())
    }

    async fn remove_migration(&mut self, ledger: &str, id: &str) -> MigrationResult<()> {
        if self.failures.ledger_writes {
            return Err(db_error(format!("permission denied for table {}", ledger)));
        }
        if let Some(rows) = self.working.ledgers.get_mut(ledger) {
            rows.remove(id);
        }
        if self.autocommit {
            self.publish();
        }
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> MigrationResult<()> {
        self.publish();
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> MigrationResult<()> {
        Ok(())
    }
}
