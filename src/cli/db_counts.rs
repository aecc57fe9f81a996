use anyhow::Result;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::Row;
use std::str::FromStr;

use crate::util::env as env_util;

#[derive(Debug, Clone, Default)]
pub struct DbCountsConfig {
    /// Optional override for the Postgres connection string.
    pub database_url: Option<String>,
    /// Also print a per-season play breakdown (slower on large datasets).
    pub per_season: bool,
}

pub async fn run(cfg: DbCountsConfig) -> Result<()> {
    env_util::init_env();
    let db_url = match cfg.database_url.clone() {
        Some(url) => url,
        None => env_util::db_url().map_err(|e| {
            anyhow::anyhow!("database URL not resolved; set DATABASE_URL or pass --db-url ({e})")
        })?,
    };
    let mut connect_options = PgConnectOptions::from_str(&db_url)?.statement_cache_capacity(0);
    if db_url.contains("sslmode=require") && !db_url.contains("sslmode=disable") {
        connect_options = connect_options.ssl_mode(PgSslMode::Require);
    }
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await?;

    fn is_undefined_table_error(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("42P01"),
            _ => false,
        }
    }

    // A table a migration hasn't created yet reads as zero, not as a failure.
    macro_rules! count {
        ($sql:expr) => {
            match sqlx::query_scalar::<_, i64>($sql)
                .persistent(false)
                .fetch_one(&pool)
                .await
            {
                Ok(val) => val,
                Err(e) if is_undefined_table_error(&e) => 0,
                Err(e) => return Err(e.into()),
            }
        };
    }

    let games = count!("SELECT count(*) FROM public.games");
    let plays = count!("SELECT count(*) FROM public.plays");
    let play_details = count!("SELECT count(*) FROM public.play_details");
    let play_participants = count!("SELECT count(*) FROM public.play_participants");
    let play_advanced_stats = count!("SELECT count(*) FROM public.play_advanced_stats");
    let play_game_info = count!("SELECT count(*) FROM public.play_game_info");
    let play_special_teams = count!("SELECT count(*) FROM public.play_special_teams");
    let players = count!("SELECT count(*) FROM public.players");
    let weekly_stats = count!("SELECT count(*) FROM public.player_weekly_stats");

    use std::fmt::Write as _;
    let mut out = String::new();
    writeln!(out, "DB COUNTS SUMMARY:").ok();
    writeln!(out, "games: {games}").ok();
    writeln!(out, "plays: {plays}").ok();
    writeln!(out, "  play_details: {play_details}").ok();
    writeln!(out, "  play_participants: {play_participants}").ok();
    writeln!(out, "  play_advanced_stats: {play_advanced_stats}").ok();
    writeln!(out, "  play_game_info: {play_game_info}").ok();
    writeln!(out, "  play_special_teams: {play_special_teams}").ok();
    writeln!(out, "players: {players}").ok();
    writeln!(out, "player_weekly_stats: {weekly_stats}").ok();

    if plays > 0 {
        // Sub-entity rows should never exceed plays (one each per play, max).
        for (name, n) in [
            ("play_details", play_details),
            ("play_participants", play_participants),
            ("play_advanced_stats", play_advanced_stats),
            ("play_game_info", play_game_info),
            ("play_special_teams", play_special_teams),
        ] {
            if n > plays {
                writeln!(
                    out,
                    "  WARNING: {name} has {n} rows for {plays} plays; duplicate ids likely"
                )
                .ok();
            }
        }
    }
    println!("{out}");

    if cfg.per_season {
        let season_rows = sqlx::query(
            r#"
            SELECT g.season,
                   COUNT(DISTINCT g.id) AS games,
                   COUNT(p.id) AS plays
            FROM public.games g
            LEFT JOIN public.plays p ON p.game_id = g.id
            GROUP BY g.season
            ORDER BY g.season
            "#,
        )
        .persistent(false)
        .fetch_all(&pool)
        .await;
        let season_rows = match season_rows {
            Ok(rows) => rows,
            Err(e) if is_undefined_table_error(&e) => Vec::new(),
            Err(e) => {
                println!("NOTE: per-season coverage query failed: {e}");
                Vec::new()
            }
        };
        if !season_rows.is_empty() {
            let mut out = String::new();
            writeln!(out, "per-season coverage:").ok();
            for row in season_rows {
                let season: i32 = row.get("season");
                let games: i64 = row.get("games");
                let plays: i64 = row.get("plays");
                writeln!(out, "  {season}: games {games}, plays {plays}").ok();
            }
            println!("{out}");
        }

        let stat_rows = sqlx::query(
            r#"
            SELECT season, COUNT(*) AS n, COUNT(DISTINCT player_id) AS players
            FROM public.player_weekly_stats
            GROUP BY season
            ORDER BY season
            "#,
        )
        .persistent(false)
        .fetch_all(&pool)
        .await;
        let stat_rows = match stat_rows {
            Ok(rows) => rows,
            Err(e) if is_undefined_table_error(&e) => Vec::new(),
            Err(e) => {
                println!("NOTE: per-season weekly stats query failed: {e}");
                Vec::new()
            }
        };
        if !stat_rows.is_empty() {
            let mut out = String::new();
            writeln!(out, "per-season weekly stat lines:").ok();
            for row in stat_rows {
                let season: i32 = row.get("season");
                let n: i64 = row.get("n");
                let players: i64 = row.get("players");
                writeln!(out, "  {season}: lines {n}, distinct players {players}").ok();
            }
            println!("{out}");
        }
    }

    Ok(())
}
