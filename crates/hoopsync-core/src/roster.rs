//! Teams and players: descriptive records created on first observation and
//! refined in place afterwards. Neither is ever deleted.
//!
//! Players arrive from two directions: box scores name everyone who took the
//! floor, and season rosters add the biographical fields.

use serde::{Deserialize, Serialize};

provider_id!(TeamId);
provider_id!(PlayerId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
  pub team_id:      TeamId,
  /// e.g. "Auburn Tigers".
  pub display_name: Option<String>,
  pub short_name:   Option<String>,
  pub abbreviation: Option<String>,
  /// e.g. "Auburn".
  pub location:     Option<String>,
  /// Mascot, e.g. "Tigers".
  pub nickname:     Option<String>,
  pub conference:   Option<String>,
  pub logo:         Option<String>,
}

impl Team {
  /// A team known only by id.
  pub fn bare(team_id: TeamId) -> Self {
    Self {
      team_id,
      display_name: None,
      short_name: None,
      abbreviation: None,
      location: None,
      nickname: None,
      conference: None,
      logo: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
  pub player_id:    PlayerId,
  pub display_name: Option<String>,
  pub short_name:   Option<String>,
  pub position:     Option<String>,
  pub jersey:       Option<String>,
  pub headshot:     Option<String>,
  /// Last team the player was observed with. A lookup key into the team
  /// collection, not an owning reference.
  pub team_id:      Option<TeamId>,

  // Roster-only fields; box scores do not carry them.
  /// As displayed, e.g. `6' 9"`.
  pub height:       Option<String>,
  /// As displayed, e.g. `205 lbs`.
  pub weight:       Option<String>,
  /// Academic class, e.g. "Freshman".
  pub class_year:   Option<String>,
  pub profile_url:  Option<String>,
  /// Season of the last roster the player appeared on.
  pub season:       Option<i32>,
}

impl Player {
  pub fn bare(player_id: PlayerId) -> Self {
    Self {
      player_id,
      display_name: None,
      short_name: None,
      position: None,
      jersey: None,
      headshot: None,
      team_id: None,
      height: None,
      weight: None,
      class_year: None,
      profile_url: None,
      season: None,
    }
  }
}

/// One team's roster for one season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
  pub team_id: TeamId,
  pub season:  i32,
  pub players: Vec<Player>,
}

/// The season a calendar date belongs to, named by the year it ends in:
/// games from August onwards count toward the next year's season.
pub fn season_of(date: chrono::NaiveDate) -> i32 {
  use chrono::Datelike as _;
  if date.month() >= 8 { date.year() + 1 } else { date.year() }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  #[test]
  fn seasons_straddle_the_new_year() {
    let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
    assert_eq!(season_of(d(2024, 11, 4)), 2025);
    assert_eq!(season_of(d(2025, 3, 31)), 2025);
    assert_eq!(season_of(d(2025, 7, 31)), 2025);
    assert_eq!(season_of(d(2025, 8, 1)), 2026);
  }
}
