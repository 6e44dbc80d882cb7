//! # clinic-orm: Schema migrations for the clinic platform
//!
//! Ordered, idempotent and reversible schema migrations tracked in a
//! ledger table. Every operation inspects the live schema before mutating
//! it, so a database provisioned by another path converges instead of
//! failing.

pub mod backends;
pub mod catalog;
pub mod error;
pub mod migrations;

// Re-export core traits and types
pub use backends::{
    MemoryBackend, MemorySnapshot, MigrationBackend, PostgresBackend, SchemaSession,
};
pub use catalog::{clinic_catalog, clinic_steps};
pub use error::*;
pub use migrations::*;
