//! Weekly player stat lines, one extract per season.
//!
//! Counting stats default to zero when absent (a missing completions column
//! means none, not unknown); rate metrics like RACR or WOPR stay null when
//! unparseable because a fabricated zero would read as a real value.

use tracing::{info, warn};

use crate::decode::{decode_csv, RawRow};
use crate::fetch::Dataset;
use crate::importer::coerce::{f64_or, i32_or, opt_f64, opt_string};
use crate::importer::model::PlayerWeeklyStats;
use crate::importer::{writer, ImportContext};

/// A stat line needs a player id, season and week to be keyed; anything
/// else can be defaulted.
pub fn transform_weekly_stat(row: &RawRow<'_>) -> Option<PlayerWeeklyStats> {
    let player_id = row.get("player_id")?.to_string();
    let season = opt_f64(row.get("season")).map(|s| s as i32)?;
    let week = opt_f64(row.get("week")).map(|w| w as i32)?;

    Some(PlayerWeeklyStats {
        id: format!("{season}_{week}_{player_id}"),
        player_id,
        season,
        week,
        season_type: row.get("season_type").unwrap_or("REG").to_string(),
        player_name: opt_string(row.get("player_display_name")),
        position: opt_string(row.get("position")),
        team: opt_string(row.get("recent_team")),
        opponent: opt_string(row.get("opponent_team")),
        fantasy_points: f64_or(row.get("fantasy_points"), 0.0),
        fantasy_points_ppr: f64_or(row.get("fantasy_points_ppr"), 0.0),
        completions: i32_or(row.get("completions"), 0),
        attempts: i32_or(row.get("attempts"), 0),
        passing_yards: i32_or(row.get("passing_yards"), 0),
        passing_touchdowns: i32_or(row.get("passing_tds"), 0),
        interceptions: i32_or(row.get("interceptions"), 0),
        sacks: i32_or(row.get("sacks"), 0),
        sack_yards: i32_or(row.get("sack_yards"), 0),
        sack_fumbles: i32_or(row.get("sack_fumbles"), 0),
        sack_fumbles_lost: i32_or(row.get("sack_fumbles_lost"), 0),
        passing_air_yards: i32_or(row.get("passing_air_yards"), 0),
        passing_yards_after_catch: i32_or(row.get("passing_yards_after_catch"), 0),
        passing_first_downs: i32_or(row.get("passing_first_downs"), 0),
        passing_epa: f64_or(row.get("passing_epa"), 0.0),
        passing_2pt_conversions: i32_or(row.get("passing_2pt_conversions"), 0),
        carries: i32_or(row.get("carries"), 0),
        rushing_yards: i32_or(row.get("rushing_yards"), 0),
        rushing_touchdowns: i32_or(row.get("rushing_tds"), 0),
        rushing_fumbles: i32_or(row.get("rushing_fumbles"), 0),
        rushing_fumbles_lost: i32_or(row.get("rushing_fumbles_lost"), 0),
        rushing_first_downs: i32_or(row.get("rushing_first_downs"), 0),
        rushing_epa: f64_or(row.get("rushing_epa"), 0.0),
        rushing_2pt_conversions: i32_or(row.get("rushing_2pt_conversions"), 0),
        receptions: i32_or(row.get("receptions"), 0),
        targets: i32_or(row.get("targets"), 0),
        receiving_yards: i32_or(row.get("receiving_yards"), 0),
        receiving_touchdowns: i32_or(row.get("receiving_tds"), 0),
        receiving_fumbles: i32_or(row.get("receiving_fumbles"), 0),
        receiving_fumbles_lost: i32_or(row.get("receiving_fumbles_lost"), 0),
        receiving_air_yards: i32_or(row.get("receiving_air_yards"), 0),
        receiving_yards_after_catch: i32_or(row.get("receiving_yards_after_catch"), 0),
        receiving_first_downs: i32_or(row.get("receiving_first_downs"), 0),
        receiving_epa: f64_or(row.get("receiving_epa"), 0.0),
        receiving_2pt_conversions: i32_or(row.get("receiving_2pt_conversions"), 0),
        racr: opt_f64(row.get("racr")),
        target_share: opt_f64(row.get("target_share")),
        air_yards_share: opt_f64(row.get("air_yards_share")),
        wopr: opt_f64(row.get("wopr")),
        pacr: opt_f64(row.get("pacr")),
        dakota: opt_f64(row.get("dakota")),
        special_teams_touchdowns: i32_or(row.get("special_teams_tds"), 0),
    })
}

/// One season's stat lines, insert-if-absent. Returns rows created.
pub async fn import_year(ctx: &ImportContext, year: i32) -> Result<u64, crate::ImportError> {
    let raw = ctx.fetcher.fetch(Dataset::WeeklyStats { year }).await?;
    let table = decode_csv(&raw)?;
    info!(year, rows = table.len(), "decoded weekly stats extract");

    let mut stats: Vec<PlayerWeeklyStats> = Vec::with_capacity(table.len());
    let mut unkeyed = 0usize;
    for row in table.iter() {
        match transform_weekly_stat(&row) {
            Some(s) => stats.push(s),
            None => unkeyed += 1,
        }
    }
    if unkeyed > 0 {
        warn!(year, unkeyed, "dropped stat lines missing player/season/week");
    }

    let created = writer::insert_weekly_stats_if_absent(&ctx.db, &ctx.cfg, &stats).await?;
    info!(
        year,
        created,
        existing = stats.len() as u64 - created,
        "weekly stats written"
    );
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_csv;

    fn stats(rows: &str) -> crate::decode::RawTable {
        let csv = format!(
            "player_id,player_display_name,position,recent_team,opponent_team,season,week,\
season_type,completions,attempts,passing_yards,passing_tds,fantasy_points,racr,target_share,\
wopr,dakota\n{rows}"
        );
        decode_csv(&csv).unwrap()
    }

    #[test]
    fn id_composes_season_week_player() {
        let t = stats("00-0033873,P.Mahomes,QB,KC,DET,2023,1,REG,21,39,226,2,17.5,,,,0.18\n");
        let s = transform_weekly_stat(&t.iter().next().unwrap()).unwrap();
        assert_eq!(s.id, "2023_1_00-0033873");
        assert_eq!(s.completions, 21);
        assert_eq!(s.passing_touchdowns, 2);
        assert_eq!(s.dakota, Some(0.18));
    }

    #[test]
    fn missing_key_fields_drop_the_row() {
        let t = stats(
            ",P.Nobody,QB,KC,DET,2023,1,REG,0,0,0,0,0,,,,\n\
00-0000001,No,QB,KC,DET,,1,REG,0,0,0,0,0,,,,\n\
00-0000002,Week,QB,KC,DET,2023,,REG,0,0,0,0,0,,,,\n",
        );
        for row in t.iter() {
            assert!(transform_weekly_stat(&row).is_none());
        }
    }

    #[test]
    fn counting_stats_default_zero_rate_metrics_stay_null() {
        let t = stats("00-0030506,T.Kelce,TE,KC,DET,2023,1,,,,,,,NA,NA,NA,NA\n");
        let s = transform_weekly_stat(&t.iter().next().unwrap()).unwrap();
        assert_eq!(s.season_type, "REG"); // absent season type defaults
        assert_eq!(s.completions, 0);
        assert_eq!(s.fantasy_points, 0.0);
        assert_eq!(s.racr, None);
        assert_eq!(s.target_share, None);
        assert_eq!(s.wopr, None);
    }

    #[test]
    fn float_rendered_season_and_week_parse() {
        let t = stats("00-0030506,T.Kelce,TE,KC,DET,2023.0,1.0,REG,0,0,0,0,0,,,,\n");
        let s = transform_weekly_stat(&t.iter().next().unwrap()).unwrap();
        assert_eq!(s.season, 2023);
        assert_eq!(s.week, 1);
    }
}
