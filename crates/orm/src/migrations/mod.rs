//! Migration System
//!
//! Typed migration steps, the catalog that orders them, and the runner
//! that applies and reverts them against a [`MigrationBackend`](crate::backends::MigrationBackend).

pub mod definitions;
pub mod manager;
pub mod rollback;
pub mod runner;
pub mod schema_builder;
pub mod statements;

pub use definitions::*;
pub use manager::MigrationCatalog;
pub use rollback::MigrationRollback;
pub use runner::MigrationRunner;
pub use schema_builder::*;
pub use statements::split_sql_statements;
