//! # clinic-core
//!
//! Environment driven configuration and logging shared by the clinic crates.

pub mod app_config;
pub mod logging;

pub use app_config::{
    AppConfig, AppConfigTrait, ConfigError, ConfigSource, DatabaseConfig, Environment, LogFormat,
    LoggingConfig, MigrationSettings,
};
pub use logging::init_logging;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
