//! Player roster pipeline.
//!
//! One full extract covering every player in the feed's history, written
//! insert-if-absent: roster imports never overwrite rows that later manual
//! corrections may have touched.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::decode::{decode_csv, RawRow};
use crate::fetch::Dataset;
use crate::importer::coerce::{opt_i32, opt_string};
use crate::importer::model::Player;
use crate::importer::{writer, ImportContext};

/// A roster row without a gsis id cannot be keyed and is dropped.
pub fn transform_player(row: &RawRow<'_>) -> Option<Player> {
    let gsis_id = row.get("gsis_id")?.to_string();
    Some(Player {
        gsis_id,
        first_name: row.get("first_name").unwrap_or_default().to_string(),
        last_name: row.get("last_name").unwrap_or_default().to_string(),
        display_name: opt_string(row.get("display_name")),
        football_name: opt_string(row.get("football_name")),
        short_name: opt_string(row.get("short_name")),
        suffix: opt_string(row.get("suffix")),
        position: opt_string(row.get("position")),
        position_group: opt_string(row.get("position_group")),
        esb_id: opt_string(row.get("esb_id")),
        gsis_it_id: opt_string(row.get("gsis_it_id")),
        smart_id: opt_string(row.get("smart_id")),
        rookie_year: opt_i32(row.get("rookie_year")),
        entry_year: opt_i32(row.get("entry_year")),
        draft_club: opt_string(row.get("draft_club")),
        draft_number: opt_i32(row.get("draft_number")),
        draft_round: opt_i32(row.get("draft_round")),
        college_name: opt_string(row.get("college_name")),
        college_conference: opt_string(row.get("college_conference")),
        height: opt_string(row.get("height")),
        weight: opt_i32(row.get("weight")),
        birth_date: row
            .get("birth_date")
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok()),
        headshot: opt_string(row.get("headshot")),
        jersey_number: opt_string(row.get("jersey_number")),
        uniform_number: opt_string(row.get("uniform_number")),
        status: opt_string(row.get("status")),
        status_description_abbr: opt_string(row.get("status_description_abbr")),
        status_short_description: opt_string(row.get("status_short_description")),
        team_abbr: opt_string(row.get("team_abbr")),
        current_team_id: opt_string(row.get("current_team_id")),
        team_seq: opt_i32(row.get("team_seq")),
        years_of_experience: opt_i32(row.get("years_of_experience")),
    })
}

/// Fetch, decode and write the full roster. Returns the number of newly
/// created rows; rows already present count as skips, not errors.
pub async fn import(ctx: &ImportContext) -> Result<u64, crate::ImportError> {
    let raw = ctx.fetcher.fetch(Dataset::Players).await?;
    let table = decode_csv(&raw)?;
    info!(rows = table.len(), "decoded player roster extract");

    let mut players: Vec<Player> = Vec::with_capacity(table.len());
    let mut unkeyed = 0usize;
    for row in table.iter() {
        match transform_player(&row) {
            Some(p) => players.push(p),
            None => unkeyed += 1,
        }
    }
    if unkeyed > 0 {
        warn!(unkeyed, "dropped roster rows without a gsis id");
    }

    let created = writer::insert_players_if_absent(&ctx.db, &ctx.cfg, &players).await?;
    info!(
        created,
        existing = players.len() as u64 - created,
        "player roster written"
    );
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_csv;

    fn roster(rows: &str) -> crate::decode::RawTable {
        let csv = format!(
            "gsis_id,first_name,last_name,display_name,position,weight,birth_date,draft_round\n{rows}"
        );
        decode_csv(&csv).unwrap()
    }

    #[test]
    fn keyed_row_maps_with_typed_fields() {
        let t = roster("00-0033873,Patrick,Mahomes,P.Mahomes,QB,225,1995-09-17,1\n");
        let p = transform_player(&t.iter().next().unwrap()).unwrap();
        assert_eq!(p.gsis_id, "00-0033873");
        assert_eq!(p.first_name, "Patrick");
        assert_eq!(p.weight, Some(225));
        assert_eq!(
            p.birth_date,
            NaiveDate::from_ymd_opt(1995, 9, 17)
        );
        assert_eq!(p.draft_round, Some(1));
    }

    #[test]
    fn missing_gsis_id_drops_the_row() {
        let t = roster(",John,Doe,J.Doe,WR,,,\n");
        assert!(transform_player(&t.iter().next().unwrap()).is_none());
    }

    #[test]
    fn na_birth_date_and_weight_stay_absent() {
        let t = roster("00-0000001,Old,Timer,O.Timer,G,NA,NA,NA\n");
        let p = transform_player(&t.iter().next().unwrap()).unwrap();
        assert_eq!(p.birth_date, None);
        assert_eq!(p.weight, None);
        assert_eq!(p.draft_round, None);
    }

    #[test]
    fn malformed_birth_date_is_dropped_not_fatal() {
        let t = roster("00-0000002,Bad,Date,B.Date,QB,200,17-09-1995,2\n");
        let p = transform_player(&t.iter().next().unwrap()).unwrap();
        assert_eq!(p.birth_date, None);
        assert_eq!(p.weight, Some(200));
    }
}
