//! Normalized entities as they land in the datastore.
//!
//! `Game` and `Play` are upserted; `Player` and `PlayerWeeklyStats` are
//! insert-if-absent. Each play sub-entity is zero-or-one per play and its id
//! is the parent play id plus a fixed suffix, which enforces the cardinality
//! without a separate uniqueness constraint.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    pub id: String,
    pub season: i32,
    pub week: i32,
    pub game_type: String,
    pub home_team: String,
    pub away_team: String,
    pub home_score: i32,
    pub away_score: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Play {
    pub id: String,
    pub game_id: String,
    pub quarter: i32,
    pub down: Option<i32>,
    pub yards_to_go: Option<i32>,
    pub yards_gained: Option<f64>,
    pub play_type: String,
    pub possession_team: Option<String>,
    pub defensive_team: Option<String>,
    pub play_description: Option<String>,
    pub epa: Option<f64>,
    pub cpoe: Option<f64>,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayDetails {
    pub id: String,
    pub yardline_100: Option<i32>,
    pub quarter_secs_remaining: Option<i32>,
    pub half_secs_remaining: Option<i32>,
    pub game_secs_remaining: Option<i32>,
    pub goal_to_go: Option<bool>,
    pub shotgun: Option<bool>,
    pub no_huddle: Option<bool>,
    pub qb_dropback: Option<bool>,
    pub qb_kneel: Option<bool>,
    pub qb_spike: Option<bool>,
    pub qb_scramble: Option<bool>,
    pub pass_length: Option<String>,
    pub pass_location: Option<String>,
    pub run_location: Option<String>,
    pub run_gap: Option<String>,
    pub field_goal_result: Option<String>,
    pub kick_distance: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayParticipants {
    pub id: String,
    pub passer_id: Option<String>,
    pub passer_name: Option<String>,
    pub receiver_id: Option<String>,
    pub receiver_name: Option<String>,
    pub rusher_id: Option<String>,
    pub rusher_name: Option<String>,
    /// The feed never carries tackle/blocking attribution; these stay empty
    /// rather than being inferred from the free-text description.
    pub tacklers: Vec<String>,
    pub assist_tacklers: Vec<String>,
    pub blocking_players: Vec<String>,
    pub passing_yards: Option<i32>,
    pub receiving_yards: Option<i32>,
    pub rushing_yards: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayAdvancedStats {
    pub id: String,
    pub air_yards: Option<i32>,
    pub yards_after_catch: Option<i32>,
    pub expected_points: Option<f64>,
    pub win_probability: Option<f64>,
    pub expected_yards: Option<f64>,
    pub success: Option<bool>,
    pub success_probability: Option<f64>,
    pub total_home_epa: Option<f64>,
    pub total_away_epa: Option<f64>,
    pub total_home_rush_epa: Option<f64>,
    pub total_away_rush_epa: Option<f64>,
    pub total_home_pass_epa: Option<f64>,
    pub total_away_pass_epa: Option<f64>,
    pub air_epa: Option<f64>,
    pub yac_epa: Option<f64>,
    pub xyac_epa: Option<f64>,
    pub xyac_mean_yardage: Option<f64>,
    pub xyac_median_yardage: Option<f64>,
    pub xyac_success: Option<f64>,
    pub xyac_fd: Option<f64>,
    pub xpass: Option<f64>,
    pub pass_oe: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayGameInfo {
    pub id: String,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub location: Option<String>,
    pub stadium: Option<String>,
    pub weather: Option<String>,
    pub surface: Option<String>,
    pub roof: Option<String>,
    pub temperature: Option<i32>,
    pub wind_speed: Option<i32>,
    pub home_coach: Option<String>,
    pub away_coach: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaySpecialTeams {
    pub id: String,
    pub punt_blocked: Option<bool>,
    pub punt_inside_twenty: Option<bool>,
    pub punt_in_endzone: Option<bool>,
    pub punt_out_of_bounds: Option<bool>,
    pub punt_downed: Option<bool>,
    pub punt_fair_catch: Option<bool>,
    pub kickoff_inside_twenty: Option<bool>,
    pub kickoff_in_endzone: Option<bool>,
    pub kickoff_out_of_bounds: Option<bool>,
    pub kickoff_downed: Option<bool>,
    pub kickoff_fair_catch: Option<bool>,
    pub return_team: Option<String>,
    pub return_yards: Option<i32>,
    pub punter_player_id: Option<String>,
    pub punter_player_name: Option<String>,
    pub kicker_player_id: Option<String>,
    pub kicker_player_name: Option<String>,
    pub returner_player_id: Option<String>,
    pub returner_player_name: Option<String>,
}

/// A transformed play plus whichever sub-entities its source row triggered.
/// The writer includes each `Some` in the same transaction as the play.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedPlay {
    pub play: Play,
    pub details: Option<PlayDetails>,
    pub participants: Option<PlayParticipants>,
    pub advanced_stats: Option<PlayAdvancedStats>,
    pub game_info: Option<PlayGameInfo>,
    pub special_teams: Option<PlaySpecialTeams>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub gsis_id: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: Option<String>,
    pub football_name: Option<String>,
    pub short_name: Option<String>,
    pub suffix: Option<String>,
    pub position: Option<String>,
    pub position_group: Option<String>,
    pub esb_id: Option<String>,
    pub gsis_it_id: Option<String>,
    pub smart_id: Option<String>,
    pub rookie_year: Option<i32>,
    pub entry_year: Option<i32>,
    pub draft_club: Option<String>,
    pub draft_number: Option<i32>,
    pub draft_round: Option<i32>,
    pub college_name: Option<String>,
    pub college_conference: Option<String>,
    pub height: Option<String>,
    pub weight: Option<i32>,
    pub birth_date: Option<NaiveDate>,
    pub headshot: Option<String>,
    pub jersey_number: Option<String>,
    pub uniform_number: Option<String>,
    pub status: Option<String>,
    pub status_description_abbr: Option<String>,
    pub status_short_description: Option<String>,
    pub team_abbr: Option<String>,
    pub current_team_id: Option<String>,
    pub team_seq: Option<i32>,
    pub years_of_experience: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerWeeklyStats {
    pub id: String,
    pub player_id: String,
    pub season: i32,
    pub week: i32,
    pub season_type: String,
    pub player_name: Option<String>,
    pub position: Option<String>,
    pub team: Option<String>,
    pub opponent: Option<String>,
    pub fantasy_points: f64,
    pub fantasy_points_ppr: f64,
    pub completions: i32,
    pub attempts: i32,
    pub passing_yards: i32,
    pub passing_touchdowns: i32,
    pub interceptions: i32,
    pub sacks: i32,
    pub sack_yards: i32,
    pub sack_fumbles: i32,
    pub sack_fumbles_lost: i32,
    pub passing_air_yards: i32,
    pub passing_yards_after_catch: i32,
    pub passing_first_downs: i32,
    pub passing_epa: f64,
    pub passing_2pt_conversions: i32,
    pub carries: i32,
    pub rushing_yards: i32,
    pub rushing_touchdowns: i32,
    pub rushing_fumbles: i32,
    pub rushing_fumbles_lost: i32,
    pub rushing_first_downs: i32,
    pub rushing_epa: f64,
    pub rushing_2pt_conversions: i32,
    pub receptions: i32,
    pub targets: i32,
    pub receiving_yards: i32,
    pub receiving_touchdowns: i32,
    pub receiving_fumbles: i32,
    pub receiving_fumbles_lost: i32,
    pub receiving_air_yards: i32,
    pub receiving_yards_after_catch: i32,
    pub receiving_first_downs: i32,
    pub receiving_epa: f64,
    pub receiving_2pt_conversions: i32,
    pub racr: Option<f64>,
    pub target_share: Option<f64>,
    pub air_yards_share: Option<f64>,
    pub wopr: Option<f64>,
    pub pacr: Option<f64>,
    pub dakota: Option<f64>,
    pub special_teams_touchdowns: i32,
}
