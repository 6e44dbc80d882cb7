//! PostgreSQL Backend Implementation
//!
//! Runs migrations through sqlx. PostgreSQL DDL is transactional, so each
//! session is a real transaction covering the step's mutations and its
//! ledger row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Row, Transaction};

use super::core::{ColumnInfo, MigrationBackend, SchemaSession, TableInfo};
use crate::error::{MigrationError, MigrationResult};
use crate::migrations::definitions::MigrationRecord;
use crate::migrations::schema_builder::{
    add_column_sql, create_enum_type_sql, drop_column_sql, drop_enum_type_sql, drop_table_sql,
    quote_ident, ColumnDescriptor, EnumReplacement, TableDefinition,
};

/// PostgreSQL migration backend
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a backend from a database URL
    pub async fn connect(database_url: &str, max_connections: u32) -> MigrationResult<Self> {
        if !database_url.starts_with("postgresql://") && !database_url.starts_with("postgres://") {
            return Err(MigrationError::Configuration(
                "Invalid PostgreSQL URL scheme".to_string(),
            ));
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| {
                MigrationError::Configuration(format!("Failed to connect to database: {}", e))
            })?;

        Ok(Self::new(pool))
    }

    /// Get the database pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MigrationBackend for PostgresBackend {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn supports_transactional_ddl(&self) -> bool {
        true
    }

    async fn ensure_ledger(&self, ledger: &str) -> MigrationResult<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                id VARCHAR(255) PRIMARY KEY,\n    \
                applied_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,\n    \
                batch INTEGER NOT NULL\n\
            )",
            quote_ident(ledger)
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                MigrationError::LedgerRead(format!("Failed to create migrations table: {}", e))
            })?;
        Ok(())
    }

    async fn ledger_exists(&self, ledger: &str) -> MigrationResult<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = $1",
        )
        .bind(ledger)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MigrationError::LedgerRead(format!("Failed to look up ledger table: {}", e)))?;
        Ok(row.is_some())
    }

    async fn applied_migrations(&self, ledger: &str) -> MigrationResult<Vec<MigrationRecord>> {
        let sql = format!(
            "SELECT id, applied_at, batch FROM {} ORDER BY batch DESC, applied_at DESC",
            quote_ident(ledger)
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                MigrationError::LedgerRead(format!("Failed to query applied migrations: {}", e))
            })?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row
                .try_get("id")
                .map_err(|e| {
                    MigrationError::LedgerRead(format!("Failed to get migration id: {}", e))
                })?;
            let applied_at: DateTime<Utc> = row
                .try_get("applied_at")
                .map_err(|e| {
                    MigrationError::LedgerRead(format!("Failed to get applied_at: {}", e))
                })?;
            let batch: i32 = row
                .try_get("batch")
                .map_err(|e| MigrationError::LedgerRead(format!("Failed to get batch: {}", e)))?;

            records.push(MigrationRecord {
                id,
                applied_at,
                batch,
            });
        }

        Ok(records)
    }

    async fn begin(&self) -> MigrationResult<Box<dyn SchemaSession>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MigrationError::Database(format!("Failed to start transaction: {}", e)))?;
        Ok(Box::new(PostgresSession { tx }))
    }
}

/// One transaction on the PostgreSQL pool
pub struct PostgresSession {
    tx: Transaction<'static, Postgres>,
}

impl PostgresSession {
    async fn execute(&mut self, sql: &str) -> MigrationResult<()> {
        tracing::debug!(sql = %sql, "Executing migration statement");
        sqlx::query(sql).execute(&mut *self.tx).await?;
        Ok(())
    }
}

#[async_trait]
impl SchemaSession for PostgresSession {
    async fn get_table(&mut self, name: &str) -> MigrationResult<Option<TableInfo>> {
        let exists = sqlx::query(
            "SELECT 1 FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = $1",
        )
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;

        if exists.is_none() {
            return Ok(None);
        }

        // information_schema uses domain types sqlx cannot decode directly
        let rows = sqlx::query(
            "SELECT column_name::text AS column_name, \
                    data_type::text AS data_type, \
                    udt_name::text AS udt_name, \
                    is_nullable::text AS is_nullable, \
                    column_default::text AS column_default, \
                    character_maximum_length::int4 AS max_length \
             FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 \
             ORDER BY ordinal_position",
        )
        .bind(name)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let is_nullable: String = row.try_get("is_nullable")?;
            columns.push(ColumnInfo {
                name: row.try_get("column_name")?,
                data_type: row.try_get("data_type")?,
                udt_name: row.try_get("udt_name")?,
                nullable: is_nullable == "YES",
                default: row.try_get("column_default")?,
                max_length: row.try_get("max_length")?,
            });
        }

        Ok(Some(TableInfo {
            name: name.to_string(),
            columns,
        }))
    }

    async fn enum_values(&mut self, type_name: &str) -> MigrationResult<Option<Vec<String>>> {
        let exists = sqlx::query(
            "SELECT 1 FROM pg_type t \
             JOIN pg_namespace n ON n.oid = t.typnamespace \
             WHERE t.typname = $1 AND t.typtype = 'e' AND n.nspname = current_schema()",
        )
        .bind(type_name)
        .fetch_optional(&mut *self.tx)
        .await?;

        if exists.is_none() {
            return Ok(None);
        }

        let rows = sqlx::query(
            "SELECT e.enumlabel::text AS label FROM pg_type t \
             JOIN pg_enum e ON e.enumtypid = t.oid \
             JOIN pg_namespace n ON n.oid = t.typnamespace \
             WHERE t.typname = $1 AND n.nspname = current_schema() \
             ORDER BY e.enumsortorder",
        )
        .bind(type_name)
        .fetch_all(&mut *self.tx)
        .await?;

        let labels = rows
            .iter()
            .map(|row| row.try_get::<String, _>("label"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(labels))
    }

    async fn create_enum_type(
        &mut self,
        type_name: &str,
        values: &[String],
    ) -> MigrationResult<()> {
        self.execute(&create_enum_type_sql(type_name, values)).await
    }

    async fn drop_enum_type(&mut self, type_name: &str) -> MigrationResult<()> {
        self.execute(&drop_enum_type_sql(type_name)).await
    }

    async fn replace_enum_type(&mut self, change: &EnumReplacement) -> MigrationResult<()> {
        for statement in change.to_sql() {
            self.execute(&statement).await?;
        }
        Ok(())
    }

    async fn create_table(&mut self, table: &TableDefinition) -> MigrationResult<()> {
        self.execute(&table.to_sql()).await
    }

    async fn drop_table(&mut self, name: &str) -> MigrationResult<()> {
        self.execute(&drop_table_sql(name)).await
    }

    async fn add_column(&mut self, table: &str, column: &ColumnDescriptor) -> MigrationResult<()> {
        self.execute(&add_column_sql(table, column)).await
    }

    async fn drop_column(&mut self, table: &str, column: &str) -> MigrationResult<()> {
        self.execute(&drop_column_sql(table, column)).await
    }

    async fn query(&mut self, sql: &str) -> MigrationResult<()> {
        self.execute(sql).await
    }

    async fn record_migration(
        &mut self,
        ledger: &str,
        id: &str,
        batch: i32,
    ) -> MigrationResult<()> {
        let sql = format!(
            "INSERT INTO {} (id, applied_at, batch) VALUES ($1, $2, $3)",
            quote_ident(ledger)
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(Utc::now())
            .bind(batch)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn remove_migration(&mut self, ledger: &str, id: &str) -> MigrationResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", quote_ident(ledger));
        sqlx::query(&sql).bind(id).execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> MigrationResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| MigrationError::Database(format!("Failed to commit migration: {}", e)))
    }

    async fn rollback(self: Box<Self>) -> MigrationResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| MigrationError::Database(format!("Failed to roll back migration: {}", e)))
    }
}
