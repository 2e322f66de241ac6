use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// League-wide roster limit used when no override is configured.
pub const DEFAULT_ROSTER_CAP: u32 = 15;

/// A named stage of the simulated season, in season order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Preseason,
    RegularSeason,
    TradeDeadline,
    Playoffs,
    Draft,
    FreeAgency,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Preseason,
        Phase::RegularSeason,
        Phase::TradeDeadline,
        Phase::Playoffs,
        Phase::Draft,
        Phase::FreeAgency,
    ];

    /// Position of this phase within a season.
    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// The single phase that follows this one. FreeAgency wraps around to the
    /// Preseason of the next season.
    pub fn successor(self) -> Phase {
        match self {
            Phase::Preseason => Phase::RegularSeason,
            Phase::RegularSeason => Phase::TradeDeadline,
            Phase::TradeDeadline => Phase::Playoffs,
            Phase::Playoffs => Phase::Draft,
            Phase::Draft => Phase::FreeAgency,
            Phase::FreeAgency => Phase::Preseason,
        }
    }

    /// True when leaving this phase starts a new season.
    pub fn ends_season(self) -> bool {
        self == Phase::FreeAgency
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Preseason => "preseason",
            Phase::RegularSeason => "regular_season",
            Phase::TradeDeadline => "trade_deadline",
            Phase::Playoffs => "playoffs",
            Phase::Draft => "draft",
            Phase::FreeAgency => "free_agency",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Phase::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| format!("unknown phase: {s}"))
    }
}

/// Snapshot of the managed team at a point in time.
///
/// Built fresh from every extraction pass and never mutated afterwards; a new
/// snapshot replaces the old one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameState {
    pub season: u32,
    pub phase: Phase,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub team_rating: i32,
    #[serde(default)]
    pub salary_cap_used: Decimal,
    #[serde(default)]
    pub available_cap_space: Decimal,
    #[serde(default)]
    pub roster_size: u32,
    #[serde(default)]
    pub playoff_position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roster: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upcoming_schedule: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_offers: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_agents: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_prospects: Option<Vec<serde_json::Value>>,
}

impl GameState {
    pub fn new(season: u32, phase: Phase) -> Self {
        Self {
            season,
            phase,
            wins: 0,
            losses: 0,
            team_rating: 0,
            salary_cap_used: Decimal::ZERO,
            available_cap_space: Decimal::ZERO,
            roster_size: 0,
            playoff_position: None,
            roster: None,
            upcoming_schedule: None,
            trade_offers: None,
            free_agents: None,
            draft_prospects: None,
        }
    }

    /// Win-loss record formatted as `W-L`.
    pub fn record(&self) -> String {
        format!("{}-{}", self.wins, self.losses)
    }

    /// Check the snapshot invariants against the league roster cap.
    pub fn validate(&self, roster_cap: u32) -> Result<(), String> {
        if self.season == 0 {
            return Err("season must be positive".to_string());
        }
        if self.salary_cap_used.is_sign_negative() && !self.salary_cap_used.is_zero() {
            return Err(format!(
                "salary_cap_used is negative: {}",
                self.salary_cap_used
            ));
        }
        if self.available_cap_space.is_sign_negative() && !self.available_cap_space.is_zero() {
            return Err(format!(
                "available_cap_space is negative: {}",
                self.available_cap_space
            ));
        }
        if self.roster_size > roster_cap {
            return Err(format!(
                "roster_size {} exceeds roster cap {roster_cap}",
                self.roster_size
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn successor_follows_season_order() {
        assert_eq!(Phase::Preseason.successor(), Phase::RegularSeason);
        assert_eq!(Phase::RegularSeason.successor(), Phase::TradeDeadline);
        assert_eq!(Phase::TradeDeadline.successor(), Phase::Playoffs);
        assert_eq!(Phase::Playoffs.successor(), Phase::Draft);
        assert_eq!(Phase::Draft.successor(), Phase::FreeAgency);
        assert_eq!(Phase::FreeAgency.successor(), Phase::Preseason);
    }

    #[test]
    fn only_free_agency_wraps_backward() {
        for phase in Phase::ALL {
            let next = phase.successor();
            if phase.ends_season() {
                assert!(next < phase);
            } else {
                assert_eq!(next.ordinal(), phase.ordinal() + 1);
            }
        }
    }

    #[test]
    fn phase_parses_loose_spellings() {
        assert_eq!("trade-deadline".parse::<Phase>().unwrap(), Phase::TradeDeadline);
        assert_eq!("Free Agency".parse::<Phase>().unwrap(), Phase::FreeAgency);
        assert!("offseason".parse::<Phase>().is_err());
    }

    #[test]
    fn phase_serialization() {
        assert_eq!(
            serde_json::to_string(&Phase::RegularSeason).unwrap(),
            "\"regular_season\""
        );
    }

    #[test]
    fn minimal_state_deserializes_with_defaults() {
        let state: GameState =
            serde_json::from_str(r#"{"season": 2, "phase": "trade_deadline", "wins": 30}"#)
                .unwrap();
        assert_eq!(state.record(), "30-0");
        assert_eq!(state.salary_cap_used, Decimal::ZERO);
        assert!(state.trade_offers.is_none());
    }

    #[test]
    fn validate_rejects_oversized_roster() {
        let mut state = GameState::new(1, Phase::Preseason);
        state.roster_size = 16;
        assert!(state.validate(DEFAULT_ROSTER_CAP).is_err());
        state.roster_size = 15;
        assert!(state.validate(DEFAULT_ROSTER_CAP).is_ok());
    }

    #[test]
    fn validate_rejects_negative_cap_space() {
        let mut state = GameState::new(1, Phase::Preseason);
        state.available_cap_space = dec!(-1.5);
        assert!(state.validate(DEFAULT_ROSTER_CAP).is_err());
    }

    #[test]
    fn validate_rejects_season_zero() {
        let state = GameState::new(0, Phase::Preseason);
        assert!(state.validate(DEFAULT_ROSTER_CAP).is_err());
    }
}
