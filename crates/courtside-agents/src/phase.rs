use courtside_models::config::{PhaseBudgets, PhaseConfig};
use courtside_models::{GameState, Phase};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Teams with more wins than this at the trade deadline are treated as playoff bound.
pub const PLAYOFF_WIN_THRESHOLD: u32 = 35;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhaseError {
    #[error("no phase follows {phase} of final season {season}")]
    NoSuccessor { season: u32, phase: Phase },

    #[error("cannot move backward from {from} to {to}")]
    Backward { from: Phase, to: Phase },
}

/// Explicit per-run state for the phase machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub season: u32,
    pub phase: Phase,
    /// Roster moves left in the current phase.
    pub remaining: u32,
    /// Set on entering a phase; the next action must re-read game state first.
    pub needs_state_refresh: bool,
    pub initialized: bool,
}

/// Record of a single phase change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
    pub season: u32,
    pub new_season: bool,
    /// Budget granted for the new phase.
    pub remaining: u32,
}

/// How decisions are allowed to execute in a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPolicy {
    /// Execute unconditionally.
    Always,
    /// Execute when the confidence gate passes.
    GateOnly,
    /// Execute when a roster move remains and the confidence gate passes.
    BudgetAndGate,
}

impl ExecutionPolicy {
    pub fn for_phase(phase: Phase) -> Self {
        match phase {
            Phase::Draft => ExecutionPolicy::Always,
            Phase::RegularSeason | Phase::Playoffs => ExecutionPolicy::GateOnly,
            Phase::Preseason | Phase::TradeDeadline | Phase::FreeAgency => {
                ExecutionPolicy::BudgetAndGate
            }
        }
    }
}

/// Phase state machine. Holds configuration only; all state lives in [`Session`].
#[derive(Debug, Clone)]
pub struct PhaseManager {
    budgets: PhaseBudgets,
    max_seasons: Option<u32>,
}

impl PhaseManager {
    pub fn new(config: &PhaseConfig) -> Self {
        Self {
            budgets: config.budgets.clone(),
            max_seasons: config.max_seasons,
        }
    }

    pub fn budget_for(&self, phase: Phase) -> u32 {
        self.budgets.for_phase(phase)
    }

    /// Open a session at `phase` of `season` with that phase's full budget.
    pub fn start(&self, season: u32, phase: Phase) -> Session {
        let session = Session {
            season,
            phase,
            remaining: self.budget_for(phase),
            needs_state_refresh: true,
            initialized: true,
        };
        info!(season, %phase, remaining = session.remaining, "Session started");
        session
    }

    /// Spend one roster move. Returns false, leaving the budget at zero, when none remain.
    pub fn try_consume_action(&self, session: &mut Session) -> bool {
        if session.remaining == 0 {
            warn!(phase = %session.phase, season = session.season, "No actions remaining in phase");
            return false;
        }
        session.remaining -= 1;
        info!(
            phase = %session.phase,
            remaining = session.remaining,
            "Action consumed"
        );
        true
    }

    /// True when the session is at the last phase of the final season.
    pub fn is_terminal(&self, session: &Session) -> bool {
        session.phase.ends_season()
            && self.max_seasons.is_some_and(|max| session.season >= max)
    }

    /// Move exactly one phase forward and reset the budget for the new phase.
    pub fn on_budget_exhausted(&self, session: &mut Session) -> Result<PhaseTransition, PhaseError> {
        if self.is_terminal(session) {
            return Err(PhaseError::NoSuccessor {
                season: session.season,
                phase: session.phase,
            });
        }
        let from = session.phase;
        let to = from.successor();
        Ok(self.enter(session, from, to, from.ends_season()))
    }

    /// Skip forward to `target` within the current season.
    pub fn advance_to(&self, session: &mut Session, target: Phase) -> Result<PhaseTransition, PhaseError> {
        let from = session.phase;
        if target <= from {
            return Err(PhaseError::Backward { from, to: target });
        }
        Ok(self.enter(session, from, target, false))
    }

    /// Where to go after the current phase given the latest game state.
    /// A team that is not playoff bound leaves the trade deadline straight for the draft.
    pub fn next_phase_for(&self, session: &Session, state: &GameState) -> Phase {
        if session.phase == Phase::TradeDeadline && state.wins <= PLAYOFF_WIN_THRESHOLD {
            Phase::Draft
        } else {
            session.phase.successor()
        }
    }

    /// Whether a decision may execute right now under the phase's policy,
    /// before the confidence gate is applied.
    pub fn can_act(&self, session: &Session) -> bool {
        match ExecutionPolicy::for_phase(session.phase) {
            ExecutionPolicy::Always | ExecutionPolicy::GateOnly => true,
            ExecutionPolicy::BudgetAndGate => session.remaining > 0,
        }
    }

    pub fn mark_state_refreshed(&self, session: &mut Session) {
        session.needs_state_refresh = false;
    }

    fn enter(&self, session: &mut Session, from: Phase, to: Phase, new_season: bool) -> PhaseTransition {
        if new_season {
            session.season += 1;
        }
        session.phase = to;
        session.remaining = self.budget_for(to);
        session.needs_state_refresh = true;

        info!(
            %from,
            %to,
            season = session.season,
            remaining = session.remaining,
            "Phase transition"
        );
        PhaseTransition {
            from,
            to,
            season: session.season,
            new_season,
            remaining: session.remaining,
        }
    }
}
