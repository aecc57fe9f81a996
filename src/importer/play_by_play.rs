//! Play-by-play pipeline: transform + year orchestration.
//!
//! Transformation is a pure function of one source row. Each optional
//! sub-entity is attached iff at least one of its trigger fields is present,
//! so row counts in the sub-tables stay proportional to information density.

use std::collections::HashMap;
use tracing::{error, info, warn};

use crate::decode::{decode_csv, RawRow};
use crate::error::ImportError;
use crate::fetch::Dataset;
use crate::importer::coerce::{flag, i32_or, opt_f64, opt_flag, opt_i32, opt_string};
use crate::importer::model::{
    Game, Play, PlayAdvancedStats, PlayDetails, PlayGameInfo, PlayParticipants, PlaySpecialTeams,
    ProcessedPlay,
};
use crate::importer::{writer, ImportContext, YearSummary};

/// Non-play administrative rows (timeouts, end-of-quarter markers) carry no
/// play type, id, game id or quarter; they never reach the writer.
pub fn is_valid_play(row: &RawRow<'_>) -> bool {
    row.has("play_type") && row.has("play_id") && row.has("game_id") && row.has("qtr")
}

/// Map one raw row into a play plus its triggered sub-entities. Total: parse
/// failures coerce to None and can never abort an otherwise-valid row.
pub fn transform_play(row: &RawRow<'_>) -> ProcessedPlay {
    let game_id = row.get("game_id").unwrap_or_default().to_string();
    let play_id = row.get("play_id").unwrap_or_default();
    // Deterministic composite id; re-running a year rewrites the same rows.
    let id = format!("{game_id}_{play_id}");

    let play = Play {
        id: id.clone(),
        game_id,
        quarter: i32_or(row.get("qtr"), 1),
        down: opt_i32(row.get("down")),
        yards_to_go: opt_i32(row.get("ydstogo")),
        yards_gained: opt_f64(row.get("yards_gained")),
        play_type: row.get("play_type").unwrap_or_default().to_string(),
        possession_team: opt_string(row.get("posteam")),
        defensive_team: opt_string(row.get("defteam")),
        play_description: opt_string(row.get("desc")),
        epa: opt_f64(row.get("epa")),
        cpoe: opt_f64(row.get("cpoe")),
        success: flag(row.get("success")),
    };

    let details = (row.has("yardline_100")
        || row.has("quarter_seconds_remaining")
        || row.has("shotgun")
        || row.has("pass_length"))
    .then(|| PlayDetails {
        id: format!("{id}_details"),
        yardline_100: opt_i32(row.get("yardline_100")),
        quarter_secs_remaining: opt_i32(row.get("quarter_seconds_remaining")),
        half_secs_remaining: opt_i32(row.get("half_seconds_remaining")),
        game_secs_remaining: opt_i32(row.get("game_seconds_remaining")),
        goal_to_go: opt_flag(row.get("goal_to_go")),
        shotgun: opt_flag(row.get("shotgun")),
        no_huddle: opt_flag(row.get("no_huddle")),
        qb_dropback: opt_flag(row.get("qb_dropback")),
        qb_kneel: opt_flag(row.get("qb_kneel")),
        qb_spike: opt_flag(row.get("qb_spike")),
        qb_scramble: opt_flag(row.get("qb_scramble")),
        pass_length: opt_string(row.get("pass_length")),
        pass_location: opt_string(row.get("pass_location")),
        run_location: opt_string(row.get("run_location")),
        run_gap: opt_string(row.get("run_gap")),
        field_goal_result: opt_string(row.get("field_goal_result")),
        kick_distance: opt_i32(row.get("kick_distance")),
    });

    let participants = (row.has("passer_player_id")
        || row.has("receiver_player_id")
        || row.has("rusher_player_id"))
    .then(|| PlayParticipants {
        id: format!("{id}_participants"),
        passer_id: opt_string(row.get("passer_player_id")),
        passer_name: opt_string(row.get("passer_player_name")),
        receiver_id: opt_string(row.get("receiver_player_id")),
        receiver_name: opt_string(row.get("receiver_player_name")),
        rusher_id: opt_string(row.get("rusher_player_id")),
        rusher_name: opt_string(row.get("rusher_player_name")),
        // Tackle/block attribution only exists in the free-text description;
        // left unpopulated rather than guessed at.
        tacklers: Vec::new(),
        assist_tacklers: Vec::new(),
        blocking_players: Vec::new(),
        passing_yards: opt_i32(row.get("passing_yards")),
        receiving_yards: opt_i32(row.get("receiving_yards")),
        rushing_yards: opt_i32(row.get("rushing_yards")),
    });

    let advanced_stats = (row.has("air_yards")
        || row.has("yards_after_catch")
        || row.has("epa"))
    .then(|| PlayAdvancedStats {
        id: format!("{id}_advanced_stats"),
        air_yards: opt_i32(row.get("air_yards")),
        yards_after_catch: opt_i32(row.get("yards_after_catch")),
        expected_points: opt_f64(row.get("ep")),
        win_probability: opt_f64(row.get("wp")),
        expected_yards: None,
        success: opt_flag(row.get("success")),
        success_probability: None,
        total_home_epa: opt_f64(row.get("total_home_rush_epa")),
        total_away_epa: opt_f64(row.get("total_away_rush_epa")),
        total_home_rush_epa: opt_f64(row.get("total_home_rush_epa")),
        total_away_rush_epa: opt_f64(row.get("total_away_rush_epa")),
        total_home_pass_epa: opt_f64(row.get("total_home_pass_epa")),
        total_away_pass_epa: opt_f64(row.get("total_away_pass_epa")),
        air_epa: opt_f64(row.get("air_epa")),
        yac_epa: opt_f64(row.get("yac_epa")),
        xyac_epa: opt_f64(row.get("xyac_epa")),
        xyac_mean_yardage: opt_f64(row.get("xyac_mean_yardage")),
        xyac_median_yardage: opt_f64(row.get("xyac_median_yardage")),
        xyac_success: opt_f64(row.get("xyac_success")),
        xyac_fd: opt_f64(row.get("xyac_fd")),
        xpass: opt_f64(row.get("xpass")),
        pass_oe: opt_f64(row.get("pass_oe")),
    });

    let game_info = (row.has("stadium") || row.has("weather") || row.has("temp")).then(|| {
        PlayGameInfo {
            id: format!("{id}_game_info"),
            home_score: opt_i32(row.get("total_home_score")),
            away_score: opt_i32(row.get("total_away_score")),
            location: None,
            stadium: opt_string(row.get("stadium")),
            weather: opt_string(row.get("weather")),
            surface: opt_string(row.get("surface")),
            roof: opt_string(row.get("roof")),
            temperature: opt_i32(row.get("temp")),
            wind_speed: opt_i32(row.get("wind")),
            home_coach: opt_string(row.get("home_coach")),
            away_coach: opt_string(row.get("away_coach")),
        }
    });

    let special_teams = (row.has("punt_blocked")
        || row.has("kickoff_inside_twenty")
        || row.has("punt_inside_twenty"))
    .then(|| PlaySpecialTeams {
        id: format!("{id}_special_teams"),
        punt_blocked: opt_flag(row.get("punt_blocked")),
        punt_inside_twenty: opt_flag(row.get("punt_inside_twenty")),
        punt_in_endzone: opt_flag(row.get("punt_in_endzone")),
        punt_out_of_bounds: opt_flag(row.get("punt_out_of_bounds")),
        punt_downed: opt_flag(row.get("punt_downed")),
        punt_fair_catch: opt_flag(row.get("punt_fair_catch")),
        kickoff_inside_twenty: opt_flag(row.get("kickoff_inside_twenty")),
        kickoff_in_endzone: opt_flag(row.get("kickoff_in_endzone")),
        kickoff_out_of_bounds: opt_flag(row.get("kickoff_out_of_bounds")),
        kickoff_downed: opt_flag(row.get("kickoff_downed")),
        kickoff_fair_catch: opt_flag(row.get("kickoff_fair_catch")),
        return_team: opt_string(row.get("return_team")),
        return_yards: opt_i32(row.get("return_yards")),
        punter_player_id: opt_string(row.get("punter_player_id")),
        punter_player_name: opt_string(row.get("punter_player_name")),
        kicker_player_id: opt_string(row.get("kicker_player_id")),
        kicker_player_name: opt_string(row.get("kicker_player_name")),
        returner_player_id: None,
        returner_player_name: None,
    });

    ProcessedPlay {
        play,
        details,
        participants,
        advanced_stats,
        game_info,
        special_teams,
    }
}

/// Deduplicate games by id across a year's rows. The first occurrence's
/// identity fields win; scores come from that row too (defaulting 0).
///
/// Caveat carried over from the previous importer: source rows show evolving
/// cumulative scores, and nothing guarantees the retained row holds the
/// final score. Flagged, not fixed.
pub fn group_games(rows: &[RawRow<'_>]) -> HashMap<String, Game> {
    let mut games: HashMap<String, Game> = HashMap::new();
    for row in rows {
        let Some(game_id) = row.get("game_id") else {
            continue;
        };
        games.entry(game_id.to_string()).or_insert_with(|| Game {
            id: game_id.to_string(),
            season: i32_or(row.get("season"), 0),
            week: i32_or(row.get("week"), 0),
            game_type: row.get("season_type").unwrap_or_default().to_string(),
            home_team: row.get("home_team").unwrap_or_default().to_string(),
            away_team: row.get("away_team").unwrap_or_default().to_string(),
            home_score: i32_or(row.get("total_home_score"), 0),
            away_score: i32_or(row.get("total_away_score"), 0),
        });
    }
    games
}

/// One year, end to end: fetch, decode, write games, then plays in batches.
/// A batch that fails (deadlock budget exhausted or otherwise) is skipped;
/// only fetch/decode/game-write failures are fatal for the year.
pub async fn import_year(ctx: &ImportContext, year: i32) -> Result<YearSummary, ImportError> {
    let raw = ctx.fetcher.fetch(Dataset::PlayByPlay { year }).await?;
    let table = decode_csv(&raw)?;
    info!(year, rows = table.len(), "decoded play-by-play extract");

    let rows: Vec<RawRow<'_>> = table.iter().collect();
    let games = group_games(&rows);
    info!(year, games = games.len(), "writing games");
    writer::upsert_games(&ctx.db, &ctx.cfg, &games).await?;

    let mut summary = YearSummary {
        games: games.len(),
        ..Default::default()
    };

    for batch in rows.chunks(ctx.cfg.batch_size) {
        let mut processed: Vec<ProcessedPlay> = Vec::with_capacity(batch.len());
        for row in batch {
            if is_valid_play(row) {
                processed.push(transform_play(row));
            } else {
                warn!(
                    year,
                    play_id = row.get("play_id").unwrap_or("?"),
                    game_id = row.get("game_id").unwrap_or("?"),
                    play_type = row.get("play_type").unwrap_or(""),
                    "skipping non-play row"
                );
                summary.skipped += 1;
            }
        }
        if processed.is_empty() {
            continue;
        }
        match writer::write_play_batch(&ctx.db, &ctx.cfg, &processed).await {
            Ok(()) => {
                summary.processed += processed.len();
                // Sanity signal only; a failed count never fails the batch.
                match writer::count_plays_for_year(&ctx.db, year).await {
                    Ok(count) => info!(
                        year,
                        batch_rows = processed.len(),
                        processed = summary.processed,
                        skipped = summary.skipped,
                        plays_in_db = count,
                        "play batch committed"
                    ),
                    Err(err) => warn!(year, error = %err, "post-batch count query failed"),
                }
            }
            Err(err) => {
                summary.skipped += processed.len();
                error!(
                    year,
                    batch_rows = processed.len(),
                    error = %err,
                    "play batch failed; skipping batch"
                );
            }
        }
    }

    match writer::count_plays_for_year(&ctx.db, year).await {
        Ok(count) => info!(
            year,
            processed = summary.processed,
            skipped = summary.skipped,
            plays_in_db = count,
            rows_in_csv = table.len(),
            "year import complete"
        ),
        Err(err) => warn!(year, error = %err, "final count query failed"),
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{decode_csv, RawTable};

    const HEADER: &str = "play_id,game_id,home_team,away_team,season_type,week,season,qtr,down,\
ydstogo,yards_gained,play_type,posteam,defteam,desc,epa,cpoe,success,total_home_score,\
total_away_score,yardline_100,quarter_seconds_remaining,shotgun,pass_length,goal_to_go,\
passer_player_id,passer_player_name,passing_yards,air_yards,yards_after_catch,ep,wp,\
stadium,weather,temp,punt_blocked,kickoff_inside_twenty,punt_inside_twenty,return_yards";

    fn table(rows: &[&str]) -> RawTable {
        let mut csv = String::from(HEADER);
        csv.push('\n');
        for r in rows {
            csv.push_str(r);
            csv.push('\n');
        }
        decode_csv(&csv).unwrap()
    }

    // 39 columns; fill only what the test cares about.
    fn row(fields: &[(&str, &str)]) -> String {
        let headers: Vec<&str> = HEADER.split(',').collect();
        let mut cells = vec![String::new(); headers.len()];
        for (name, value) in fields {
            let i = headers.iter().position(|h| h == name).unwrap();
            cells[i] = value.to_string();
        }
        cells.join(",")
    }

    fn base_play() -> Vec<(&'static str, &'static str)> {
        vec![
            ("play_id", "75"),
            ("game_id", "2023_01_DET_KC"),
            ("qtr", "1"),
            ("play_type", "pass"),
        ]
    }

    #[test]
    fn play_id_is_deterministic_composite() {
        let t = table(&[&row(&base_play())]);
        let p = transform_play(&t.iter().next().unwrap());
        assert_eq!(p.play.id, "2023_01_DET_KC_75");
        assert_eq!(p.play.game_id, "2023_01_DET_KC");
    }

    #[test]
    fn unparseable_quarter_defaults_to_one() {
        let mut fields = base_play();
        fields.retain(|(k, _)| *k != "qtr");
        fields.push(("qtr", "bogus"));
        let t = table(&[&row(&fields)]);
        let p = transform_play(&t.iter().next().unwrap());
        assert_eq!(p.play.quarter, 1);
    }

    #[test]
    fn empty_numerics_become_none_never_zero() {
        let t = table(&[&row(&base_play())]);
        let p = transform_play(&t.iter().next().unwrap());
        assert_eq!(p.play.down, None);
        assert_eq!(p.play.yards_gained, None);
        assert_eq!(p.play.epa, None);
        assert_eq!(p.play.cpoe, None);
    }

    #[test]
    fn success_boolean_coercion() {
        let mut yes = base_play();
        yes.push(("success", "1"));
        let mut no = base_play();
        no.push(("success", "0"));
        let t = table(&[&row(&yes), &row(&no), &row(&base_play())]);
        let plays: Vec<_> = t.iter().map(|r| transform_play(&r)).collect();
        assert!(plays[0].play.success);
        assert!(!plays[1].play.success);
        assert!(!plays[2].play.success); // absent => false for non-nullable
    }

    #[test]
    fn no_trigger_fields_yields_no_sub_entities() {
        let t = table(&[&row(&base_play())]);
        let p = transform_play(&t.iter().next().unwrap());
        assert!(p.details.is_none());
        assert!(p.participants.is_none());
        assert!(p.advanced_stats.is_none());
        assert!(p.game_info.is_none());
        assert!(p.special_teams.is_none());
    }

    #[test]
    fn punt_blocked_triggers_exactly_one_special_teams_row() {
        let mut fields = base_play();
        fields.push(("punt_blocked", "1"));
        fields.push(("return_yards", "12"));
        let t = table(&[&row(&fields)]);
        let p = transform_play(&t.iter().next().unwrap());
        let st = p.special_teams.expect("special teams row");
        assert_eq!(st.id, "2023_01_DET_KC_75_special_teams");
        assert_eq!(st.punt_blocked, Some(true));
        assert_eq!(st.return_yards, Some(12));
        // Untriggered nullable booleans on the same row stay absent.
        assert_eq!(st.kickoff_downed, None);
    }

    #[test]
    fn details_trigger_on_any_of_its_fields() {
        let mut fields = base_play();
        fields.push(("pass_length", "deep"));
        let t = table(&[&row(&fields)]);
        let p = transform_play(&t.iter().next().unwrap());
        let d = p.details.expect("details row");
        assert_eq!(d.id, "2023_01_DET_KC_75_details");
        assert_eq!(d.pass_length.as_deref(), Some("deep"));
        assert_eq!(d.yardline_100, None);
    }

    #[test]
    fn participants_carry_empty_tackler_placeholders() {
        let mut fields = base_play();
        fields.push(("passer_player_id", "00-0033873"));
        fields.push(("passer_player_name", "P.Mahomes"));
        fields.push(("passing_yards", "27"));
        let t = table(&[&row(&fields)]);
        let p = transform_play(&t.iter().next().unwrap());
        let pp = p.participants.expect("participants row");
        assert_eq!(pp.passer_id.as_deref(), Some("00-0033873"));
        assert_eq!(pp.passing_yards, Some(27));
        assert!(pp.tacklers.is_empty());
        assert!(pp.blocking_players.is_empty());
    }

    #[test]
    fn advanced_stats_nullable_success_tracks_presence() {
        let mut with = base_play();
        with.push(("epa", "0.45"));
        with.push(("success", "1"));
        let mut without = base_play();
        without.push(("air_yards", "8"));
        let t = table(&[&row(&with), &row(&without)]);
        let plays: Vec<_> = t.iter().map(|r| transform_play(&r)).collect();
        let a0 = plays[0].advanced_stats.as_ref().unwrap();
        assert_eq!(a0.success, Some(true));
        assert_eq!(a0.air_yards, None);
        let a1 = plays[1].advanced_stats.as_ref().unwrap();
        assert_eq!(a1.success, None); // nullable boolean: absent stays null
        assert_eq!(a1.air_yards, Some(8));
    }

    #[test]
    fn invalid_rows_are_rejected() {
        let mut no_type = base_play();
        no_type.retain(|(k, _)| *k != "play_type");
        let mut no_qtr = base_play();
        no_qtr.retain(|(k, _)| *k != "qtr");
        let t = table(&[&row(&base_play()), &row(&no_type), &row(&no_qtr)]);
        let verdicts: Vec<bool> = t.iter().map(|r| is_valid_play(&r)).collect();
        assert_eq!(verdicts, vec![true, false, false]);
    }

    #[test]
    fn games_dedup_by_id_first_row_wins() {
        let mut first = base_play();
        first.extend([
            ("season", "2023"),
            ("week", "1"),
            ("season_type", "REG"),
            ("home_team", "KC"),
            ("away_team", "DET"),
            ("total_home_score", "0"),
            ("total_away_score", "0"),
        ]);
        let mut later = base_play();
        later.extend([
            ("season", "2023"),
            ("week", "1"),
            ("season_type", "REG"),
            ("home_team", "KC"),
            ("away_team", "DET"),
            ("total_home_score", "20"),
            ("total_away_score", "21"),
        ]);
        let mut other = base_play();
        other.retain(|(k, _)| *k != "game_id");
        other.push(("game_id", "2023_01_BUF_NYJ"));
        let t = table(&[&row(&first), &row(&later), &row(&other)]);
        let rows: Vec<_> = t.iter().collect();
        let games = group_games(&rows);
        assert_eq!(games.len(), 2);
        let g = &games["2023_01_DET_KC"];
        assert_eq!(g.season, 2023);
        assert_eq!(g.home_team, "KC");
        assert_eq!(g.home_score, 0); // first occurrence retained
    }

    #[test]
    fn three_row_extract_counts_two_valid_one_skipped() {
        let mut missing_type = base_play();
        missing_type.retain(|(k, _)| *k != "play_type");
        let mut second = base_play();
        second.retain(|(k, _)| *k != "play_id");
        second.push(("play_id", "76"));
        let t = table(&[&row(&base_play()), &row(&missing_type), &row(&second)]);
        let rows: Vec<_> = t.iter().collect();
        let valid = rows.iter().filter(|r| is_valid_play(r)).count();
        assert_eq!(valid, 2);
        assert_eq!(rows.len() - valid, 1);
        let games = group_games(&rows);
        assert_eq!(games.len(), 1); // both valid rows share one game_id
    }

    #[test]
    fn same_row_transforms_identically() {
        let t = table(&[&row(&base_play())]);
        let r = t.iter().next().unwrap();
        assert_eq!(transform_play(&r), transform_play(&r));
    }
}
