mod commands;

use clap::{Parser, Subcommand};
use commands::migrate;

#[derive(Parser)]
#[command(name = "clinic")]
#[command(about = "Clinic platform database tooling", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database migration management
    Migrate {
        #[command(subcommand)]
        migrate_command: MigrateCommands,
    },
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Run pending migrations
    Run,

    /// Roll back applied migrations, most recent first
    Rollback {
        /// Number of migrations to revert
        #[arg(long, default_value_t = 1)]
        step: usize,

        /// Revert the whole last batch instead of a step count
        #[arg(long, conflicts_with_all = ["step", "all"])]
        batch: bool,

        /// Revert every applied migration
        #[arg(long, conflicts_with = "step")]
        all: bool,
    },

    /// Show migration status
    Status,

    /// List the migration catalog without connecting to the database
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    migrate::setup_logging()?;

    match cli.command {
        Commands::Migrate { migrate_command } => match migrate_command {
            MigrateCommands::Run => migrate::run().await?,
            MigrateCommands::Rollback { step, batch, all } => {
                let scope = if all {
                    migrate::RollbackScope::All
                } else if batch {
                    migrate::RollbackScope::LastBatch
                } else {
                    migrate::RollbackScope::Steps(step)
                };
                migrate::rollback(scope).await?
            }
            MigrateCommands::Status => migrate::status().await?,
            MigrateCommands::List => migrate::list()?,
        },
    }

    Ok(())
}
