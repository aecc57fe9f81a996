use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gridiron::cli::db_counts::{self, DbCountsConfig};
use gridiron::importer::{self, ImportConfig, ImportContext};
use gridiron::util::db::Db;
use gridiron::util::env;

#[derive(Parser, Debug)]
#[command(name = "gridiron", version, about = "NFL historical data import CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Import the full player roster (insert-if-absent)
    Players,
    /// Import play-by-play data for the configured year range
    PlayByPlay {
        /// Import a single year instead of the configured range
        #[arg(long)]
        year: Option<i32>,
    },
    /// Import weekly player stats for the configured year range
    WeeklyStats {
        /// Import a single year instead of the configured range
        #[arg(long)]
        year: Option<i32>,
    },
    /// Run every import in sequence: players, play-by-play, weekly stats
    All,
    /// Print row counts for the core tables
    DbCounts {
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
        /// Include a per-season breakdown
        #[arg(long, default_value_t = false)]
        per_season: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env::init_env();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .with_target(false)
        .compact()
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::DbCounts { db_url, per_season } => {
            db_counts::run(DbCountsConfig {
                database_url: db_url,
                per_season,
            })
            .await?;
            return Ok(());
        }
        _ => {}
    }

    let database_url = env::db_url().context("resolve database URL for import")?;
    let db = Db::connect(&database_url, 5).await?;
    let mut cfg = ImportConfig::from_env();

    match cli.command {
        Commands::Players => {
            let ctx = ImportContext::new(db, cfg)?;
            importer::run_players(&ctx).await?;
        }
        Commands::PlayByPlay { year } => {
            if let Some(y) = year {
                cfg.start_year = y;
                cfg.end_year = y;
            }
            let ctx = ImportContext::new(db, cfg)?;
            importer::run_play_by_play(&ctx).await?;
        }
        Commands::WeeklyStats { year } => {
            if let Some(y) = year {
                cfg.start_year = y;
                cfg.end_year = y;
            }
            let ctx = ImportContext::new(db, cfg)?;
            importer::run_weekly_stats(&ctx).await?;
        }
        Commands::All => {
            let ctx = ImportContext::new(db, cfg)?;
            importer::run_all(&ctx).await?;
        }
        Commands::DbCounts { .. } => unreachable!("handled above"),
    }

    info!("done");
    Ok(())
}
