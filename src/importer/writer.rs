//! Transactional batch writer.
//!
//! Games and plays are upserted in multi-row statements, one transaction per
//! batch, retried as a whole on deadlock. Players and weekly stats are
//! insert-if-absent: an existence check precedes every create and existing
//! rows are never touched.

use futures::future::BoxFuture;
use itertools::Itertools;
use sqlx::{Postgres, QueryBuilder};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::ImportError;
use crate::importer::model::{Game, Player, PlayerWeeklyStats, ProcessedPlay};
use crate::importer::ImportConfig;
use crate::util::db::Db;

/// Run `op` up to `max_attempts` times, retrying only on deadlock, with a
/// linearly increasing delay (`attempt x base_delay`) between attempts.
/// Non-deadlock errors propagate immediately.
pub async fn with_deadlock_retry<'a, T>(
    max_attempts: u32,
    base_delay: Duration,
    mut op: impl FnMut() -> BoxFuture<'a, Result<T, ImportError>>,
) -> Result<T, ImportError> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return Ok(v),
            Err(err) if err.is_deadlock() => {
                if attempt >= max_attempts {
                    return Err(ImportError::DeadlockRetryExhausted { attempts: attempt });
                }
                warn!(attempt, max_attempts, "deadlock detected; retrying batch");
                sleep(base_delay * attempt).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Upsert every game observed in a year's row set as one transaction.
/// On conflict only the scores update; season/week/team identity is
/// immutable once written.
pub async fn upsert_games(
    db: &Db,
    cfg: &ImportConfig,
    games: &HashMap<String, Game>,
) -> Result<(), ImportError> {
    if games.is_empty() {
        return Ok(());
    }
    with_deadlock_retry(cfg.max_retries, cfg.deadlock_retry_delay, || {
        Box::pin(upsert_games_once(db, games))
    })
    .await
}

async fn upsert_games_once(db: &Db, games: &HashMap<String, Game>) -> Result<(), ImportError> {
    // Stable id order keeps lock acquisition order consistent across writers.
    let rows: Vec<&Game> = games.values().sorted_by_key(|g| g.id.as_str()).collect();

    let mut tx = db.pool.begin().await?;
    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "INSERT INTO games (id, season, week, game_type, home_team, away_team, home_score, away_score) ",
    );
    qb.push_values(&rows, |mut b, g| {
        b.push_bind(&g.id)
            .push_bind(g.season)
            .push_bind(g.week)
            .push_bind(&g.game_type)
            .push_bind(&g.home_team)
            .push_bind(&g.away_team)
            .push_bind(g.home_score)
            .push_bind(g.away_score);
    });
    qb.push(
        " ON CONFLICT (id) DO UPDATE SET \
           home_score = EXCLUDED.home_score, \
           away_score = EXCLUDED.away_score",
    );
    qb.build().persistent(false).execute(&mut *tx).await?;
    tx.commit().await?;
    Ok(())
}

/// Write one play batch (play rows plus any triggered sub-entities) as one
/// transaction, retried as a whole on deadlock. Upserts are full overwrites:
/// a re-run with revised source data replaces every field.
pub async fn write_play_batch(
    db: &Db,
    cfg: &ImportConfig,
    batch: &[ProcessedPlay],
) -> Result<(), ImportError> {
    if batch.is_empty() {
        return Ok(());
    }
    with_deadlock_retry(cfg.max_retries, cfg.deadlock_retry_delay, || {
        Box::pin(write_play_batch_once(db, batch))
    })
    .await
}

async fn write_play_batch_once(db: &Db, batch: &[ProcessedPlay]) -> Result<(), ImportError> {
    let mut tx = db.pool.begin().await?;

    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "INSERT INTO plays (id, game_id, quarter, down, yards_to_go, yards_gained, \
         play_type, possession_team, defensive_team, play_description, epa, cpoe, success) ",
    );
    qb.push_values(batch, |mut b, p| {
        let p = &p.play;
        b.push_bind(&p.id)
            .push_bind(&p.game_id)
            .push_bind(p.quarter)
            .push_bind(p.down)
            .push_bind(p.yards_to_go)
            .push_bind(p.yards_gained)
            .push_bind(&p.play_type)
            .push_bind(p.possession_team.as_deref())
            .push_bind(p.defensive_team.as_deref())
            .push_bind(p.play_description.as_deref())
            .push_bind(p.epa)
            .push_bind(p.cpoe)
            .push_bind(p.success);
    });
    qb.push(
        " ON CONFLICT (id) DO UPDATE SET \
           game_id = EXCLUDED.game_id, quarter = EXCLUDED.quarter, down = EXCLUDED.down, \
           yards_to_go = EXCLUDED.yards_to_go, yards_gained = EXCLUDED.yards_gained, \
           play_type = EXCLUDED.play_type, possession_team = EXCLUDED.possession_team, \
           defensive_team = EXCLUDED.defensive_team, play_description = EXCLUDED.play_description, \
           epa = EXCLUDED.epa, cpoe = EXCLUDED.cpoe, success = EXCLUDED.success",
    );
    qb.build().persistent(false).execute(&mut *tx).await?;

    let details: Vec<_> = batch
        .iter()
        .filter_map(|p| p.details.as_ref().map(|d| (p.play.id.as_str(), d)))
        .collect();
    if !details.is_empty() {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "INSERT INTO play_details (id, play_id, yardline_100, quarter_secs_remaining, \
             half_secs_remaining, game_secs_remaining, goal_to_go, shotgun, no_huddle, \
             qb_dropback, qb_kneel, qb_spike, qb_scramble, pass_length, pass_location, \
             run_location, run_gap, field_goal_result, kick_distance) ",
        );
        qb.push_values(&details, |mut b, (play_id, d)| {
            b.push_bind(&d.id)
                .push_bind(*play_id)
                .push_bind(d.yardline_100)
                .push_bind(d.quarter_secs_remaining)
                .push_bind(d.half_secs_remaining)
                .push_bind(d.game_secs_remaining)
                .push_bind(d.goal_to_go)
                .push_bind(d.shotgun)
                .push_bind(d.no_huddle)
                .push_bind(d.qb_dropback)
                .push_bind(d.qb_kneel)
                .push_bind(d.qb_spike)
                .push_bind(d.qb_scramble)
                .push_bind(d.pass_length.as_deref())
                .push_bind(d.pass_location.as_deref())
                .push_bind(d.run_location.as_deref())
                .push_bind(d.run_gap.as_deref())
                .push_bind(d.field_goal_result.as_deref())
                .push_bind(d.kick_distance);
        });
        qb.push(
            " ON CONFLICT (id) DO UPDATE SET \
               yardline_100 = EXCLUDED.yardline_100, \
               quarter_secs_remaining = EXCLUDED.quarter_secs_remaining, \
               half_secs_remaining = EXCLUDED.half_secs_remaining, \
               game_secs_remaining = EXCLUDED.game_secs_remaining, \
               goal_to_go = EXCLUDED.goal_to_go, shotgun = EXCLUDED.shotgun, \
               no_huddle = EXCLUDED.no_huddle, qb_dropback = EXCLUDED.qb_dropback, \
               qb_kneel = EXCLUDED.qb_kneel, qb_spike = EXCLUDED.qb_spike, \
               qb_scramble = EXCLUDED.qb_scramble, pass_length = EXCLUDED.pass_length, \
               pass_location = EXCLUDED.pass_location, run_location = EXCLUDED.run_location, \
               run_gap = EXCLUDED.run_gap, field_goal_result = EXCLUDED.field_goal_result, \
               kick_distance = EXCLUDED.kick_distance",
        );
        qb.build().persistent(false).execute(&mut *tx).await?;
    }

    let participants: Vec<_> = batch
        .iter()
        .filter_map(|p| p.participants.as_ref().map(|x| (p.play.id.as_str(), x)))
        .collect();
    if !participants.is_empty() {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "INSERT INTO play_participants (id, play_id, passer_id, passer_name, receiver_id, \
             receiver_name, rusher_id, rusher_name, tacklers, assist_tacklers, blocking_players, \
             passing_yards, receiving_yards, rushing_yards) ",
        );
        qb.push_values(&participants, |mut b, (play_id, x)| {
            b.push_bind(&x.id)
                .push_bind(*play_id)
                .push_bind(x.passer_id.as_deref())
                .push_bind(x.passer_name.as_deref())
                .push_bind(x.receiver_id.as_deref())
                .push_bind(x.receiver_name.as_deref())
                .push_bind(x.rusher_id.as_deref())
                .push_bind(x.rusher_name.as_deref())
                .push_bind(&x.tacklers)
                .push_bind(&x.assist_tacklers)
                .push_bind(&x.blocking_players)
                .push_bind(x.passing_yards)
                .push_bind(x.receiving_yards)
                .push_bind(x.rushing_yards);
        });
        qb.push(
            " ON CONFLICT (id) DO UPDATE SET \
               passer_id = EXCLUDED.passer_id, passer_name = EXCLUDED.passer_name, \
               receiver_id = EXCLUDED.receiver_id, receiver_name = EXCLUDED.receiver_name, \
               rusher_id = EXCLUDED.rusher_id, rusher_name = EXCLUDED.rusher_name, \
               tacklers = EXCLUDED.tacklers, assist_tacklers = EXCLUDED.assist_tacklers, \
               blocking_players = EXCLUDED.blocking_players, \
               passing_yards = EXCLUDED.passing_yards, \
               receiving_yards = EXCLUDED.receiving_yards, \
               rushing_yards = EXCLUDED.rushing_yards",
        );
        qb.build().persistent(false).execute(&mut *tx).await?;
    }

    let advanced: Vec<_> = batch
        .iter()
        .filter_map(|p| p.advanced_stats.as_ref().map(|x| (p.play.id.as_str(), x)))
        .collect();
    if !advanced.is_empty() {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "INSERT INTO play_advanced_stats (id, play_id, air_yards, yards_after_catch, \
             expected_points, win_probability, expected_yards, success, success_probability, \
             total_home_epa, total_away_epa, total_home_rush_epa, total_away_rush_epa, \
             total_home_pass_epa, total_away_pass_epa, air_epa, yac_epa, xyac_epa, \
             xyac_mean_yardage, xyac_median_yardage, xyac_success, xyac_fd, xpass, pass_oe) ",
        );
        qb.push_values(&advanced, |mut b, (play_id, x)| {
            b.push_bind(&x.id)
                .push_bind(*play_id)
                .push_bind(x.air_yards)
                .push_bind(x.yards_after_catch)
                .push_bind(x.expected_points)
                .push_bind(x.win_probability)
                .push_bind(x.expected_yards)
                .push_bind(x.success)
                .push_bind(x.success_probability)
                .push_bind(x.total_home_epa)
                .push_bind(x.total_away_epa)
                .push_bind(x.total_home_rush_epa)
                .push_bind(x.total_away_rush_epa)
                .push_bind(x.total_home_pass_epa)
                .push_bind(x.total_away_pass_epa)
                .push_bind(x.air_epa)
                .push_bind(x.yac_epa)
                .push_bind(x.xyac_epa)
                .push_bind(x.xyac_mean_yardage)
                .push_bind(x.xyac_median_yardage)
                .push_bind(x.xyac_success)
                .push_bind(x.xyac_fd)
                .push_bind(x.xpass)
                .push_bind(x.pass_oe);
        });
        qb.push(
            " ON CONFLICT (id) DO UPDATE SET \
               air_yards = EXCLUDED.air_yards, yards_after_catch = EXCLUDED.yards_after_catch, \
               expected_points = EXCLUDED.expected_points, \
               win_probability = EXCLUDED.win_probability, \
               expected_yards = EXCLUDED.expected_yards, success = EXCLUDED.success, \
               success_probability = EXCLUDED.success_probability, \
               total_home_epa = EXCLUDED.total_home_epa, \
               total_away_epa = EXCLUDED.total_away_epa, \
               total_home_rush_epa = EXCLUDED.total_home_rush_epa, \
               total_away_rush_epa = EXCLUDED.total_away_rush_epa, \
               total_home_pass_epa = EXCLUDED.total_home_pass_epa, \
               total_away_pass_epa = EXCLUDED.total_away_pass_epa, \
               air_epa = EXCLUDED.air_epa, yac_epa = EXCLUDED.yac_epa, \
               xyac_epa = EXCLUDED.xyac_epa, xyac_mean_yardage = EXCLUDED.xyac_mean_yardage, \
               xyac_median_yardage = EXCLUDED.xyac_median_yardage, \
               xyac_success = EXCLUDED.xyac_success, xyac_fd = EXCLUDED.xyac_fd, \
               xpass = EXCLUDED.xpass, pass_oe = EXCLUDED.pass_oe",
        );
        qb.build().persistent(false).execute(&mut *tx).await?;
    }

    let game_info: Vec<_> = batch
        .iter()
        .filter_map(|p| p.game_info.as_ref().map(|x| (p.play.id.as_str(), x)))
        .collect();
    if !game_info.is_empty() {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "INSERT INTO play_game_info (id, play_id, home_score, away_score, location, \
             stadium, weather, surface, roof, temperature, wind_speed, home_coach, away_coach) ",
        );
        qb.push_values(&game_info, |mut b, (play_id, x)| {
            b.push_bind(&x.id)
                .push_bind(*play_id)
                .push_bind(x.home_score)
                .push_bind(x.away_score)
                .push_bind(x.location.as_deref())
                .push_bind(x.stadium.as_deref())
                .push_bind(x.weather.as_deref())
                .push_bind(x.surface.as_deref())
                .push_bind(x.roof.as_deref())
                .push_bind(x.temperature)
                .push_bind(x.wind_speed)
                .push_bind(x.home_coach.as_deref())
                .push_bind(x.away_coach.as_deref());
        });
        qb.push(
            " ON CONFLICT (id) DO UPDATE SET \
               home_score = EXCLUDED.home_score, away_score = EXCLUDED.away_score, \
               location = EXCLUDED.location, stadium = EXCLUDED.stadium, \
               weather = EXCLUDED.weather, surface = EXCLUDED.surface, roof = EXCLUDED.roof, \
               temperature = EXCLUDED.temperature, wind_speed = EXCLUDED.wind_speed, \
               home_coach = EXCLUDED.home_coach, away_coach = EXCLUDED.away_coach",
        );
        qb.build().persistent(false).execute(&mut *tx).await?;
    }

    let special: Vec<_> = batch
        .iter()
        .filter_map(|p| p.special_teams.as_ref().map(|x| (p.play.id.as_str(), x)))
        .collect();
    if !special.is_empty() {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "INSERT INTO play_special_teams (id, play_id, punt_blocked, punt_inside_twenty, \
             punt_in_endzone, punt_out_of_bounds, punt_downed, punt_fair_catch, \
             kickoff_inside_twenty, kickoff_in_endzone, kickoff_out_of_bounds, kickoff_downed, \
             kickoff_fair_catch, return_team, return_yards, punter_player_id, \
             punter_player_name, kicker_player_id, kicker_player_name, returner_player_id, \
             returner_player_name) ",
        );
        qb.push_values(&special, |mut b, (play_id, x)| {
            b.push_bind(&x.id)
                .push_bind(*play_id)
                .push_bind(x.punt_blocked)
                .push_bind(x.punt_inside_twenty)
                .push_bind(x.punt_in_endzone)
                .push_bind(x.punt_out_of_bounds)
                .push_bind(x.punt_downed)
                .push_bind(x.punt_fair_catch)
                .push_bind(x.kickoff_inside_twenty)
                .push_bind(x.kickoff_in_endzone)
                .push_bind(x.kickoff_out_of_bounds)
                .push_bind(x.kickoff_downed)
                .push_bind(x.kickoff_fair_catch)
                .push_bind(x.return_team.as_deref())
                .push_bind(x.return_yards)
                .push_bind(x.punter_player_id.as_deref())
                .push_bind(x.punter_player_name.as_deref())
                .push_bind(x.kicker_player_id.as_deref())
                .push_bind(x.kicker_player_name.as_deref())
                .push_bind(x.returner_player_id.as_deref())
                .push_bind(x.returner_player_name.as_deref());
        });
        qb.push(
            " ON CONFLICT (id) DO UPDATE SET \
               punt_blocked = EXCLUDED.punt_blocked, \
               punt_inside_twenty = EXCLUDED.punt_inside_twenty, \
               punt_in_endzone = EXCLUDED.punt_in_endzone, \
               punt_out_of_bounds = EXCLUDED.punt_out_of_bounds, \
               punt_downed = EXCLUDED.punt_downed, punt_fair_catch = EXCLUDED.punt_fair_catch, \
               kickoff_inside_twenty = EXCLUDED.kickoff_inside_twenty, \
               kickoff_in_endzone = EXCLUDED.kickoff_in_endzone, \
               kickoff_out_of_bounds = EXCLUDED.kickoff_out_of_bounds, \
               kickoff_downed = EXCLUDED.kickoff_downed, \
               kickoff_fair_catch = EXCLUDED.kickoff_fair_catch, \
               return_team = EXCLUDED.return_team, return_yards = EXCLUDED.return_yards, \
               punter_player_id = EXCLUDED.punter_player_id, \
               punter_player_name = EXCLUDED.punter_player_name, \
               kicker_player_id = EXCLUDED.kicker_player_id, \
               kicker_player_name = EXCLUDED.kicker_player_name, \
               returner_player_id = EXCLUDED.returner_player_id, \
               returner_player_name = EXCLUDED.returner_player_name",
        );
        qb.build().persistent(false).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Plays currently in the datastore for a given season, by the game-id
/// prefix convention (game ids start with the season year).
pub async fn count_plays_for_year(db: &Db, year: i32) -> Result<i64, ImportError> {
    let n = sqlx::query_scalar::<_, i64>("SELECT count(*) FROM plays WHERE game_id LIKE $1")
        .bind(format!("{year}%"))
        .persistent(false)
        .fetch_one(&db.pool)
        .await?;
    Ok(n)
}

/// Insert-if-absent roster writer. One transaction per chunk; a failed chunk
/// is logged and skipped so the rest of the extract still lands.
pub async fn insert_players_if_absent(
    db: &Db,
    cfg: &ImportConfig,
    players: &[Player],
) -> Result<u64, ImportError> {
    let mut created = 0u64;
    for chunk in players.chunks(cfg.chunk_size) {
        match insert_player_chunk(db, chunk).await {
            Ok(n) => {
                created += n;
                debug!(chunk_rows = chunk.len(), created, "player chunk committed");
            }
            Err(err) => {
                warn!(
                    chunk_rows = chunk.len(),
                    first_id = chunk.first().map(|p| p.gsis_id.as_str()),
                    error = %err,
                    "player chunk failed; skipping"
                );
            }
        }
    }
    Ok(created)
}

async fn insert_player_chunk(db: &Db, chunk: &[Player]) -> Result<u64, ImportError> {
    let mut tx = db.pool.begin().await?;
    let mut created = 0u64;
    for p in chunk {
        let exists = sqlx::query_scalar::<_, i32>("SELECT 1 FROM players WHERE gsis_id = $1")
            .bind(&p.gsis_id)
            .persistent(false)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_some() {
            continue;
        }
        // ON CONFLICT DO NOTHING guards the (single-writer) reimport race
        // between the check above and the insert.
        let result = sqlx::query(
            "INSERT INTO players (gsis_id, first_name, last_name, display_name, football_name, \
             short_name, suffix, position, position_group, esb_id, gsis_it_id, smart_id, \
             rookie_year, entry_year, draft_club, draft_number, draft_round, college_name, \
             college_conference, height, weight, birth_date, headshot, jersey_number, \
             uniform_number, status, status_description_abbr, status_short_description, \
             team_abbr, current_team_id, team_seq, years_of_experience) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32) \
             ON CONFLICT (gsis_id) DO NOTHING",
        )
        .bind(&p.gsis_id)
        .bind(&p.first_name)
        .bind(&p.last_name)
        .bind(p.display_name.as_deref())
        .bind(p.football_name.as_deref())
        .bind(p.short_name.as_deref())
        .bind(p.suffix.as_deref())
        .bind(p.position.as_deref())
        .bind(p.position_group.as_deref())
        .bind(p.esb_id.as_deref())
        .bind(p.gsis_it_id.as_deref())
        .bind(p.smart_id.as_deref())
        .bind(p.rookie_year)
        .bind(p.entry_year)
        .bind(p.draft_club.as_deref())
        .bind(p.draft_number)
        .bind(p.draft_round)
        .bind(p.college_name.as_deref())
        .bind(p.college_conference.as_deref())
        .bind(p.height.as_deref())
        .bind(p.weight)
        .bind(p.birth_date)
        .bind(p.headshot.as_deref())
        .bind(p.jersey_number.as_deref())
        .bind(p.uniform_number.as_deref())
        .bind(p.status.as_deref())
        .bind(p.status_description_abbr.as_deref())
        .bind(p.status_short_description.as_deref())
        .bind(p.team_abbr.as_deref())
        .bind(p.current_team_id.as_deref())
        .bind(p.team_seq)
        .bind(p.years_of_experience)
        .persistent(false)
        .execute(&mut *tx)
        .await?;
        created += result.rows_affected();
    }
    tx.commit().await?;
    Ok(created)
}

/// Insert-if-absent weekly-stat writer, keyed on the composite
/// (player_id, season, week, season_type).
pub async fn insert_weekly_stats_if_absent(
    db: &Db,
    cfg: &ImportConfig,
    stats: &[PlayerWeeklyStats],
) -> Result<u64, ImportError> {
    let mut created = 0u64;
    for chunk in stats.chunks(cfg.chunk_size) {
        match insert_weekly_chunk(db, chunk).await {
            Ok(n) => {
                created += n;
                debug!(chunk_rows = chunk.len(), created, "weekly stats chunk committed");
            }
            Err(err) => {
                warn!(
                    chunk_rows = chunk.len(),
                    first_id = chunk.first().map(|s| s.id.as_str()),
                    error = %err,
                    "weekly stats chunk failed; skipping"
                );
            }
        }
    }
    Ok(created)
}

async fn insert_weekly_chunk(db: &Db, chunk: &[PlayerWeeklyStats]) -> Result<u64, ImportError> {
    let mut tx = db.pool.begin().await?;
    let mut created = 0u64;
    for s in chunk {
        let exists = sqlx::query_scalar::<_, i32>(
            "SELECT 1 FROM player_weekly_stats \
             WHERE player_id = $1 AND season = $2 AND week = $3 AND season_type = $4",
        )
        .bind(&s.player_id)
        .bind(s.season)
        .bind(s.week)
        .bind(&s.season_type)
        .persistent(false)
        .fetch_optional(&mut *tx)
        .await?;
        if exists.is_some() {
            continue;
        }
        let result = sqlx::query(
            "INSERT INTO player_weekly_stats (id, player_id, season, week, season_type, \
             player_name, position, team, opponent, fantasy_points, fantasy_points_ppr, \
             completions, attempts, passing_yards, passing_touchdowns, interceptions, sacks, \
             sack_yards, sack_fumbles, sack_fumbles_lost, passing_air_yards, \
             passing_yards_after_catch, passing_first_downs, passing_epa, \
             passing_2pt_conversions, carries, rushing_yards, rushing_touchdowns, \
             rushing_fumbles, rushing_fumbles_lost, rushing_first_downs, rushing_epa, \
             rushing_2pt_conversions, receptions, targets, receiving_yards, \
             receiving_touchdowns, receiving_fumbles, receiving_fumbles_lost, \
             receiving_air_yards, receiving_yards_after_catch, receiving_first_downs, \
             receiving_epa, receiving_2pt_conversions, racr, target_share, air_yards_share, \
             wopr, pacr, dakota, special_teams_touchdowns) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32, \
             $33, $34, $35, $36, $37, $38, $39, $40, $41, $42, $43, $44, $45, $46, $47, $48, \
             $49, $50, $51) \
             ON CONFLICT (player_id, season, week, season_type) DO NOTHING",
        )
        .bind(&s.id)
        .bind(&s.player_id)
        .bind(s.season)
        .bind(s.week)
        .bind(&s.season_type)
        .bind(s.player_name.as_deref())
        .bind(s.position.as_deref())
        .bind(s.team.as_deref())
        .bind(s.opponent.as_deref())
        .bind(s.fantasy_points)
        .bind(s.fantasy_points_ppr)
        .bind(s.completions)
        .bind(s.attempts)
        .bind(s.passing_yards)
        .bind(s.passing_touchdowns)
        .bind(s.interceptions)
        .bind(s.sacks)
        .bind(s.sack_yards)
        .bind(s.sack_fumbles)
        .bind(s.sack_fumbles_lost)
        .bind(s.passing_air_yards)
        .bind(s.passing_yards_after_catch)
        .bind(s.passing_first_downs)
        .bind(s.passing_epa)
        .bind(s.passing_2pt_conversions)
        .bind(s.carries)
        .bind(s.rushing_yards)
        .bind(s.rushing_touchdowns)
        .bind(s.rushing_fumbles)
        .bind(s.rushing_fumbles_lost)
        .bind(s.rushing_first_downs)
        .bind(s.rushing_epa)
        .bind(s.rushing_2pt_conversions)
        .bind(s.receptions)
        .bind(s.targets)
        .bind(s.receiving_yards)
        .bind(s.receiving_touchdowns)
        .bind(s.receiving_fumbles)
        .bind(s.receiving_fumbles_lost)
        .bind(s.receiving_air_yards)
        .bind(s.receiving_yards_after_catch)
        .bind(s.receiving_first_downs)
        .bind(s.receiving_epa)
        .bind(s.receiving_2pt_conversions)
        .bind(s.racr)
        .bind(s.target_share)
        .bind(s.air_yards_share)
        .bind(s.wopr)
        .bind(s.pacr)
        .bind(s.dakota)
        .bind(s.special_teams_touchdowns)
        .persistent(false)
        .execute(&mut *tx)
        .await?;
        created += result.rows_affected();
    }
    tx.commit().await?;
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn deadlock_err() -> ImportError {
        // sqlx surfaces pooled-connection deadlocks without a SQLSTATE in
        // some paths; classification falls back to the message.
        ImportError::Db(sqlx::Error::Protocol("deadlock detected".into()))
    }

    fn other_err() -> ImportError {
        ImportError::Db(sqlx::Error::Protocol("permission denied".into()))
    }

    #[tokio::test]
    async fn deadlocks_then_success_commits_once() {
        let attempts = Cell::new(0u32);
        let result = with_deadlock_retry(3, Duration::from_millis(1), || {
            attempts.set(attempts.get() + 1);
            let n = attempts.get();
            Box::pin(async move {
                if n < 3 {
                    Err(deadlock_err())
                } else {
                    Ok(n)
                }
            })
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts.get(), 3);
    }

    #[tokio::test]
    async fn non_deadlock_propagates_immediately() {
        let attempts = Cell::new(0u32);
        let result: Result<(), _> = with_deadlock_retry(3, Duration::from_millis(1), || {
            attempts.set(attempts.get() + 1);
            Box::pin(async { Err(other_err()) })
        })
        .await;
        assert!(matches!(result, Err(ImportError::Db(_))));
        assert_eq!(attempts.get(), 1);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_as_typed_error() {
        let attempts = Cell::new(0u32);
        let result: Result<(), _> = with_deadlock_retry(3, Duration::from_millis(1), || {
            attempts.set(attempts.get() + 1);
            Box::pin(async { Err(deadlock_err()) })
        })
        .await;
        assert!(matches!(
            result,
            Err(ImportError::DeadlockRetryExhausted { attempts: 3 })
        ));
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn deadlock_classification() {
        assert!(deadlock_err().is_deadlock());
        assert!(!other_err().is_deadlock());
        assert!(!ImportError::DeadlockRetryExhausted { attempts: 3 }.is_deadlock());
    }
}
