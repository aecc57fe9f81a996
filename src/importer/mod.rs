//! Bulk historical import pipelines.
//!
//! Three datasets share the same fetch -> decode -> transform -> write shape:
//! play-by-play (upsert, with sub-entity fan-out), the player roster and
//! weekly stats (both insert-if-absent). Years run strictly sequentially;
//! one bad year never aborts the range.

pub mod coerce;
pub mod model;
pub mod play_by_play;
pub mod players;
pub mod weekly_stats;
pub mod writer;

use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info};

use crate::fetch::Fetcher;
use crate::util::db::Db;
use crate::util::env;

/// All tunables for a run, resolved once from the environment. Carried in
/// the context instead of read ad hoc so repeated runs can't observe each
/// other's state.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub start_year: i32,
    pub end_year: i32,
    /// Rows per play-batch transaction.
    pub batch_size: usize,
    /// Rows per insert-if-absent chunk transaction (players, weekly stats).
    pub chunk_size: usize,
    pub max_retries: u32,
    pub fetch_timeout: Duration,
    pub fetch_retry_delay: Duration,
    pub deadlock_retry_delay: Duration,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            start_year: 1999,
            end_year: 2024,
            batch_size: 500,
            chunk_size: 100,
            max_retries: 3,
            fetch_timeout: Duration::from_secs(30),
            fetch_retry_delay: Duration::from_secs(5),
            deadlock_retry_delay: Duration::from_secs(1),
        }
    }
}

impl ImportConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            start_year: env::env_parse("IMPORT_START_YEAR", d.start_year),
            end_year: env::env_parse("IMPORT_END_YEAR", d.end_year),
            batch_size: env::env_parse("IMPORT_BATCH_SIZE", d.batch_size),
            chunk_size: env::env_parse("IMPORT_CHUNK_SIZE", d.chunk_size),
            max_retries: env::env_parse("IMPORT_MAX_RETRIES", d.max_retries),
            fetch_timeout: Duration::from_secs(env::env_parse("IMPORT_FETCH_TIMEOUT_SECS", 30)),
            fetch_retry_delay: Duration::from_secs(env::env_parse("IMPORT_RETRY_DELAY_SECS", 5)),
            deadlock_retry_delay: Duration::from_secs(env::env_parse(
                "IMPORT_DEADLOCK_DELAY_SECS",
                1,
            )),
        }
    }
}

/// Per-run context: one datastore handle, one HTTP client, one config.
/// Passed explicitly through every pipeline call.
pub struct ImportContext {
    pub db: Db,
    pub cfg: ImportConfig,
    pub fetcher: Fetcher,
}

impl ImportContext {
    pub fn new(db: Db, cfg: ImportConfig) -> anyhow::Result<Self> {
        let fetcher = Fetcher::new(cfg.fetch_timeout, cfg.max_retries, cfg.fetch_retry_delay)?;
        Ok(Self { db, cfg, fetcher })
    }
}

/// Per-year counters for the play-by-play pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct YearSummary {
    pub games: usize,
    pub processed: usize,
    pub skipped: usize,
}

/// Full historical play-by-play import. Year failures are isolated; partial
/// coverage is acceptable, a total abort is not.
pub async fn run_play_by_play(ctx: &ImportContext) -> anyhow::Result<()> {
    let started = Instant::now();
    let (mut processed, mut skipped, mut failed_years) = (0usize, 0usize, 0usize);

    info!(
        start = ctx.cfg.start_year,
        end = ctx.cfg.end_year,
        "starting play-by-play import"
    );
    for year in ctx.cfg.start_year..=ctx.cfg.end_year {
        match play_by_play::import_year(ctx, year).await {
            Ok(summary) => {
                processed += summary.processed;
                skipped += summary.skipped;
            }
            Err(err) => {
                failed_years += 1;
                error!(year, error = %err, "year import failed; continuing with next year");
            }
        }
    }
    info!(
        processed,
        skipped,
        failed_years,
        elapsed_secs = format!("{:.2}", started.elapsed().as_secs_f64()),
        "play-by-play import complete"
    );
    Ok(())
}

/// Full historical weekly-stats import, same isolation shape as play-by-play.
pub async fn run_weekly_stats(ctx: &ImportContext) -> anyhow::Result<()> {
    let started = Instant::now();
    let (mut created, mut failed_years) = (0u64, 0usize);

    info!(
        start = ctx.cfg.start_year,
        end = ctx.cfg.end_year,
        "starting weekly stats import"
    );
    for year in ctx.cfg.start_year..=ctx.cfg.end_year {
        match weekly_stats::import_year(ctx, year).await {
            Ok(n) => created += n,
            Err(err) => {
                failed_years += 1;
                error!(year, error = %err, "year import failed; continuing with next year");
            }
        }
    }
    info!(
        created,
        failed_years,
        elapsed_secs = format!("{:.2}", started.elapsed().as_secs_f64()),
        "weekly stats import complete"
    );
    Ok(())
}

/// Player roster import (single full extract, no year loop).
pub async fn run_players(ctx: &ImportContext) -> anyhow::Result<()> {
    let started = Instant::now();
    let created = players::import(ctx).await?;
    info!(
        created,
        elapsed_secs = format!("{:.2}", started.elapsed().as_secs_f64()),
        "player import complete"
    );
    Ok(())
}

/// Chained full import. Players go first: the other datasets reference
/// player ids.
pub async fn run_all(ctx: &ImportContext) -> anyhow::Result<()> {
    run_players(ctx).await?;
    run_play_by_play(ctx).await?;
    run_weekly_stats(ctx).await?;
    info!("all imports completed");
    Ok(())
}
