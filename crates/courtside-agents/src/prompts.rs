use courtside_models::{DecisionType, GameState};
use serde_json::Value;

use crate::specialist::DecisionContext;

const MAX_PROSPECTS: usize = 10;
const MAX_FREE_AGENTS: usize = 15;
const MAX_UPCOMING_GAMES: usize = 5;

/// Fields every specialist reply carries, plus the role-specific extra.
fn response_schema(decision_type: DecisionType) -> String {
    let mut example = serde_json::json!({
        "recommendation": "<one clear action to take>",
        "reasoning": "<concise explanation grounded in the data>",
        "confidence": "0.75",
        "alternatives": ["<backup option>"],
        "next_steps": ["<what to do in the game UI>"],
        "tool_calls": [{"type": "click", "selector": "<css selector>"}]
    });
    let extra = match decision_type {
        DecisionType::Trade => ("priority_targets", serde_json::json!(["<position>"])),
        DecisionType::Draft => ("target_positions", serde_json::json!(["<position>"])),
        DecisionType::FreeAgency => (
            "budget_allocation",
            serde_json::json!({"<position>": "<max offer>"}),
        ),
        DecisionType::Lineup => (
            "starting_five",
            serde_json::json!(["PG", "SG", "SF", "PF", "C"]),
        ),
    };
    if let Value::Object(map) = &mut example {
        map.insert(extra.0.to_string(), extra.1);
    }
    serde_json::to_string_pretty(&example).unwrap_or_default()
}

fn output_rules(decision_type: DecisionType) -> String {
    format!(
        "## OUTPUT FORMAT\n\n\
         Return ONLY a JSON object with this structure:\n{}\n\n\
         `confidence` is a number between 0.0 and 1.0. Be calibrated: high confidence \
         triggers automatic execution, so reserve values above 0.85 for clear-cut calls.\n\
         `tool_calls` may only use `click` (with `selector`) or `select_option` \
         (with `selector` and `value`).",
        response_schema(decision_type)
    )
}

pub fn trade_system_prompt() -> String {
    format!(
        "You are the trade specialist for a Basketball GM franchise. You review the roster, \
         pending trade offers and team needs, and decide which deals move the team forward.\n\n\
         ## WHAT TO DECIDE\n\n\
         1. Should any current trade offer be accepted?\n\
         2. Which positions should we target in trades?\n\
         3. Which players should we consider trading away?\n\
         4. What is our trade deadline strategy?\n\n\
         ## RULES\n\n\
         - Never take on salary that pushes the team over the cap without a clear upgrade.\n\
         - Contenders (winning record) trade future picks for present value; rebuilders do the opposite.\n\
         - List the positions you want in `priority_targets`.\n\n\
         {}",
        output_rules(DecisionType::Trade)
    )
}

pub fn draft_system_prompt() -> String {
    format!(
        "You are the draft specialist for a Basketball GM franchise. You scout the available \
         prospects and recommend how to use our pick.\n\n\
         ## WHAT TO DECIDE\n\n\
         1. Who should we target with our pick?\n\
         2. Should we trade up or down?\n\
         3. Which positions should we prioritize?\n\
         4. Any sleeper picks to watch?\n\n\
         ## RULES\n\n\
         - Prefer upside (age, potential) over current rating unless the team is contending.\n\
         - Break ties by positional need.\n\
         - List position priorities in `target_positions`.\n\n\
         {}",
        output_rules(DecisionType::Draft)
    )
}

pub fn free_agency_system_prompt() -> String {
    format!(
        "You are the free agency specialist for a Basketball GM franchise. You manage cap \
         space and fill roster holes with signings.\n\n\
         ## WHAT TO DECIDE\n\n\
         1. Which free agents should we target?\n\
         2. How should the available budget be allocated?\n\
         3. Should we make any qualifying offers?\n\
         4. Who should we let walk?\n\n\
         ## RULES\n\n\
         - Never commit more than the available cap space.\n\
         - Keep the roster at or under the league roster limit.\n\
         - Put per-position maximum offers in `budget_allocation`.\n\n\
         {}",
        output_rules(DecisionType::FreeAgency)
    )
}

pub fn lineup_system_prompt() -> String {
    format!(
        "You are the lineup specialist for a Basketball GM franchise. You set the starting \
         five and the rotation.\n\n\
         ## WHAT TO DECIDE\n\n\
         1. Who should start at each position?\n\
         2. What should the rotation look like?\n\
         3. Any matchup-specific adjustments for the upcoming games?\n\
         4. How should minutes be distributed?\n\n\
         ## RULES\n\n\
         - Injured players cannot start.\n\
         - Put the five starters in `starting_five`, point guard first.\n\n\
         {}",
        output_rules(DecisionType::Lineup)
    )
}

/// Get the system prompt for a decision type.
pub fn system_prompt(decision_type: DecisionType) -> String {
    match decision_type {
        DecisionType::Trade => trade_system_prompt(),
        DecisionType::Draft => draft_system_prompt(),
        DecisionType::FreeAgency => free_agency_system_prompt(),
        DecisionType::Lineup => lineup_system_prompt(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn first_n(items: Option<&Vec<Value>>, n: usize) -> Value {
    Value::Array(items.map(|v| v.iter().take(n).cloned().collect()).unwrap_or_default())
}

/// Build the user prompt: team status plus the context this role needs.
pub fn user_prompt(decision_type: DecisionType, state: &GameState, context: &DecisionContext) -> String {
    let mut out = format!(
        "TEAM STATUS:\n\
         - Season: {}\n\
         - Phase: {}\n\
         - Record: {}\n\
         - Team Rating: {}\n\
         - Salary Cap Used: ${}\n\
         - Available Cap Space: ${}\n\
         - Roster Size: {}\n",
        state.season,
        state.phase,
        state.record(),
        state.team_rating,
        state.salary_cap_used,
        state.available_cap_space,
        state.roster_size,
    );
    if let Some(position) = &state.playoff_position {
        out.push_str(&format!("- Playoff Position: {position}\n"));
    }
    out.push('\n');

    let roster = context
        .roster
        .clone()
        .or_else(|| state.roster.clone().map(Value::Array))
        .unwrap_or(Value::Null);
    let team_needs = context.team_needs.join(", ");

    match decision_type {
        DecisionType::Trade => {
            let offers = context
                .trade_offers
                .as_ref()
                .or(state.trade_offers.as_ref());
            out.push_str(&format!("ROSTER: {}\n", pretty(&roster)));
            out.push_str(&format!("TRADE OFFERS: {}\n", pretty(&first_n(offers, usize::MAX))));
            out.push_str(&format!("TEAM NEEDS: {team_needs}\n"));
        }
        DecisionType::Draft => {
            let prospects = context
                .draft_prospects
                .as_ref()
                .or(state.draft_prospects.as_ref());
            let position = context.draft_position.as_deref().unwrap_or("Unknown");
            out.push_str(&format!("DRAFT POSITION: {position}\n"));
            out.push_str(&format!(
                "DRAFT PROSPECTS: {}\n",
                pretty(&first_n(prospects, MAX_PROSPECTS))
            ));
            out.push_str(&format!("TEAM NEEDS: {team_needs}\n"));
        }
        DecisionType::FreeAgency => {
            let agents = context.free_agents.as_ref().or(state.free_agents.as_ref());
            out.push_str(&format!(
                "FREE AGENTS: {}\n",
                pretty(&first_n(agents, MAX_FREE_AGENTS))
            ));
            out.push_str(&format!("CURRENT ROSTER: {}\n", pretty(&roster)));
            out.push_str(&format!("TEAM NEEDS: {team_needs}\n"));
        }
        DecisionType::Lineup => {
            let schedule = context
                .upcoming_schedule
                .as_ref()
                .or(state.upcoming_schedule.as_ref());
            out.push_str(&format!("ROSTER: {}\n", pretty(&roster)));
            out.push_str(&format!(
                "UPCOMING GAMES: {}\n",
                pretty(&first_n(schedule, MAX_UPCOMING_GAMES))
            ));
            out.push_str(&format!("INJURIES: {}\n", context.injuries.join(", ")));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_models::Phase;

    #[test]
    fn each_role_has_its_extra_field() {
        assert!(system_prompt(DecisionType::Trade).contains("priority_targets"));
        assert!(system_prompt(DecisionType::Draft).contains("target_positions"));
        assert!(system_prompt(DecisionType::FreeAgency).contains("budget_allocation"));
        assert!(system_prompt(DecisionType::Lineup).contains("starting_five"));
    }

    #[test]
    fn prompts_are_distinct() {
        let prompts: Vec<String> = DecisionType::ALL.into_iter().map(system_prompt).collect();
        for (i, a) in prompts.iter().enumerate() {
            for b in &prompts[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn schema_is_valid_json() {
        for t in DecisionType::ALL {
            let schema: Value = serde_json::from_str(&response_schema(t)).unwrap();
            assert!(schema.get("confidence").is_some());
        }
    }

    #[test]
    fn draft_prompt_truncates_prospects() {
        let mut state = GameState::new(2, Phase::Draft);
        state.draft_prospects = Some((0..25).map(|i| serde_json::json!({"id": i})).collect());
        let prompt = user_prompt(DecisionType::Draft, &state, &DecisionContext::default());
        assert!(prompt.contains("\"id\": 9"));
        assert!(!prompt.contains("\"id\": 10"));
        assert!(prompt.contains("DRAFT POSITION: Unknown"));
    }

    #[test]
    fn context_overrides_state_collections() {
        let mut state = GameState::new(1, Phase::TradeDeadline);
        state.trade_offers = Some(vec![serde_json::json!({"from": "state"})]);
        let context = DecisionContext {
            trade_offers: Some(vec![serde_json::json!({"from": "context"})]),
            team_needs: vec!["C".to_string(), "rebounding".to_string()],
            ..DecisionContext::default()
        };
        let prompt = user_prompt(DecisionType::Trade, &state, &context);
        assert!(prompt.contains("context"));
        assert!(!prompt.contains("\"state\""));
        assert!(prompt.contains("TEAM NEEDS: C, rebounding"));
    }
}
