//! Database Backend Abstractions
//!
//! The runner talks to the database only through [`MigrationBackend`] and
//! [`SchemaSession`]. PostgreSQL is the production backend; the memory
//! backend models the schema structurally for tests and dry runs.

pub mod core;
pub mod memory;
pub mod postgres;

// Re-export core traits and types
pub use self::core::*;
pub use memory::{MemoryBackend, MemorySnapshot};
pub use postgres::PostgresBackend;
