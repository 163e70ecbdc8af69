//! Schema migration tool
//!
//! Run with: cargo run --bin migration -- <up|down|status|fresh>

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use agrichain_api::{
    config,
    db::{self, DbConfig},
    migrator::Migrator,
};

#[derive(Debug, Parser)]
#[command(name = "migration", about = "Apply, roll back or inspect schema migrations")]
struct Cli {
    /// Overrides the configured database URL
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply all pending migrations
    Up,
    /// Roll back the most recent migrations
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// Show applied and pending migrations
    Status,
    /// Drop every table and reapply all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(&cfg.log_level, cfg.log_json);

    let mut db_cfg = DbConfig::from(&cfg);
    if let Some(url) = cli.database_url {
        db_cfg.url = url;
    }
    db_cfg.max_connections = 1;
    db_cfg.min_connections = 1;

    info!("Connecting to database");
    let pool = db::establish_connection_with_config(&db_cfg)
        .await
        .context("failed to connect to the database")?;

    match cli.command {
        Commands::Up => {
            db::run_migrations(&pool).await?;
        }
        Commands::Down { steps } => {
            info!(steps, "Rolling back migrations");
            Migrator::down(&pool, Some(steps)).await?;
        }
        Commands::Status => {
            for name in Migrator::get_applied_migrations(&pool)
                .await?
                .iter()
                .map(|m| m.name().to_string())
            {
                println!("applied  {name}");
            }
            for name in Migrator::get_pending_migrations(&pool)
                .await?
                .iter()
                .map(|m| m.name().to_string())
            {
                println!("pending  {name}");
            }
        }
        Commands::Fresh => {
            info!("Dropping all tables and reapplying migrations");
            Migrator::fresh(&pool).await?;
        }
    }

    db::close_pool(pool).await?;
    info!("Migration command completed");
    Ok(())
}
