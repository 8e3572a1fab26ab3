//! JSON-string entry points.
//!
//! Every function here accepts serialized documents plus scalar inputs and
//! returns a response struct carrying the updated serialized document(s),
//! the execution log, and the call's side outputs. Input errors never
//! escape as `Err` or panics: they come back as a well-formed document with
//! `battleState = "Error"` and a descriptive `battleMessage`.

use crate::battle::log::ExecutionLog;
use crate::battle::rng::BattleRng;
use crate::battle::{ai, effects, engine, items, setup, turn_order};
use crate::config::EngineConfig;
use crate::errors::{DocumentError, EngineError};
use crate::progression;
use schema::{BattleState, BattleStateTag, ProgressionData};

#[derive(Debug, Clone)]
pub struct InitiateBattleResponse {
    pub battle_state: String,
    pub log: String,
}

#[derive(Debug, Clone)]
pub struct BasicAttackResponse {
    pub battle_state: String,
    pub was_target_eliminated: bool,
    pub log: String,
}

#[derive(Debug, Clone)]
pub struct SkillResponse {
    pub battle_state: String,
    pub was_target_eliminated: bool,
    pub actor_acts_again: bool,
    pub sfx: String,
    pub log: String,
}

#[derive(Debug, Clone)]
pub struct ItemUseResponse {
    pub battle_state: String,
    pub log: String,
}

#[derive(Debug, Clone)]
pub struct EnemyTurnResponse {
    pub battle_state: String,
    pub was_target_eliminated: bool,
    pub log: String,
}

#[derive(Debug, Clone)]
pub struct EffectsResponse {
    pub battle_state: String,
    pub log: String,
}

#[derive(Debug, Clone)]
pub struct AdvanceTurnResponse {
    pub battle_state: String,
    pub log: String,
}

#[derive(Debug, Clone)]
pub struct BattleResultsResponse {
    pub battle_state: String,
    pub progression_data: String,
    pub log: String,
}

#[derive(Debug, Clone)]
pub struct ExerciseProgressionResponse {
    /// Empty when the progression document could not be updated.
    pub progression_data: String,
    pub did_level_up: bool,
    pub log: String,
}

fn parse_battle_state(input: &str, log: &mut ExecutionLog) -> Result<BattleState, String> {
    let parsed = if input.trim().is_empty() {
        Err(DocumentError::EmptyInput("battle_state"))
    } else {
        serde_json::from_str(input)
            .map_err(|e| DocumentError::Malformed(format!("battle_state: {}", e)))
    };
    parsed.map_err(|error| {
        let message = EngineError::from(error).to_string();
        log.push(format!("PARSE_ERROR: {}", message));
        message
    })
}

fn parse_progression(input: &str, log: &mut ExecutionLog) -> Result<ProgressionData, String> {
    let parsed = if input.trim().is_empty() {
        Err(DocumentError::EmptyInput("progression_data"))
    } else {
        serde_json::from_str(input)
            .map_err(|e| DocumentError::Malformed(format!("progression_data: {}", e)))
    };
    parsed.map_err(|error| {
        let message = EngineError::from(error).to_string();
        log.push(format!("PARSE_ERROR: {}", message));
        message
    })
}

fn error_state(message: &str) -> BattleState {
    BattleState {
        battle_state: BattleStateTag::Error,
        battle_message: message.to_string(),
        ..Default::default()
    }
}

fn embed_error(state: &mut BattleState, context: &str, error: &EngineError, log: &mut ExecutionLog) {
    log.push(format!("{}_ERROR: {}", context, error));
    state.battle_state = BattleStateTag::Error;
    state.battle_message = format!("{} Error: {}", context, error);
}

fn serialize_state(state: &BattleState) -> String {
    serde_json::to_string(state).unwrap_or_else(|_| {
        "{\"battleState\":\"Error\",\"battleMessage\":\"Failed to serialize battle document\"}"
            .to_string()
    })
}

fn serialize_progression(progression: &ProgressionData) -> String {
    serde_json::to_string(progression).unwrap_or_default()
}

/// Builds the initial battle document from a roster document and a
/// progression snapshot.
pub fn initiate_battle(
    battle_state: &str,
    progression_data: &str,
    config: &EngineConfig,
    rng: &mut BattleRng,
) -> InitiateBattleResponse {
    let mut log = ExecutionLog::new();

    let mut state = match parse_battle_state(battle_state, &mut log) {
        Ok(state) => state,
        Err(message) => {
            return InitiateBattleResponse {
                battle_state: serialize_state(&error_state(&message)),
                log: log.as_text(),
            }
        }
    };
    let progression = match parse_progression(progression_data, &mut log) {
        Ok(progression) => progression,
        Err(message) => {
            return InitiateBattleResponse {
                battle_state: serialize_state(&error_state(&message)),
                log: log.as_text(),
            }
        }
    };

    if let Err(error) = setup::initiate_battle(&mut state, &progression, config, rng, &mut log) {
        embed_error(&mut state, "Initiate Battle", &error, &mut log);
    }

    InitiateBattleResponse {
        battle_state: serialize_state(&state),
        log: log.as_text(),
    }
}

/// Resolves a basic attack from `actor_id` against `target_id`.
pub fn resolve_basic_attack(
    battle_state: &str,
    actor_id: &str,
    target_id: &str,
    config: &EngineConfig,
    rng: &mut BattleRng,
) -> BasicAttackResponse {
    let mut log = ExecutionLog::new();

    let mut state = match parse_battle_state(battle_state, &mut log) {
        Ok(state) => state,
        Err(message) => {
            return BasicAttackResponse {
                battle_state: serialize_state(&error_state(&message)),
                was_target_eliminated: false,
                log: log.as_text(),
            }
        }
    };

    let was_target_eliminated =
        match engine::resolve_basic_attack(&mut state, actor_id, target_id, config, rng, &mut log) {
            Ok(outcome) => outcome.was_target_eliminated,
            Err(error) => {
                embed_error(&mut state, "Basic Attack", &error, &mut log);
                false
            }
        };

    BasicAttackResponse {
        battle_state: serialize_state(&state),
        was_target_eliminated,
        log: log.as_text(),
    }
}

/// Resolves a skill. `affected_target_ids` is a JSON string array of the
/// UI-selected affected unit ids.
pub fn resolve_skill(
    battle_state: &str,
    actor_id: &str,
    command_id: &str,
    affected_target_ids: &str,
    config: &EngineConfig,
    rng: &mut BattleRng,
) -> SkillResponse {
    let mut log = ExecutionLog::new();

    let error_response = |message: &str, log: &ExecutionLog| SkillResponse {
        battle_state: serialize_state(&error_state(message)),
        was_target_eliminated: false,
        actor_acts_again: false,
        sfx: String::new(),
        log: log.as_text(),
    };

    let mut state = match parse_battle_state(battle_state, &mut log) {
        Ok(state) => state,
        Err(message) => return error_response(&message, &log),
    };
    let target_ids: Vec<String> = match serde_json::from_str(affected_target_ids) {
        Ok(ids) => ids,
        Err(_) => {
            let message = "Input 'affected_target_ids' must be a JSON string array.".to_string();
            log.push(format!("PARSE_ERROR: {}", message));
            return error_response(&message, &log);
        }
    };

    let mut response = SkillResponse {
        battle_state: String::new(),
        was_target_eliminated: false,
        actor_acts_again: false,
        sfx: String::new(),
        log: String::new(),
    };
    match engine::resolve_skill(&mut state, actor_id, command_id, &target_ids, config, rng, &mut log)
    {
        Ok(outcome) => {
            response.was_target_eliminated = outcome.was_target_eliminated;
            response.actor_acts_again = outcome.actor_acts_again;
            response.sfx = outcome.sfx.unwrap_or_default();
        }
        Err(error) => {
            embed_error(&mut state, "Skill", &error, &mut log);
        }
    }

    response.battle_state = serialize_state(&state);
    response.log = log.as_text();
    response
}

/// Resolves a consumable item use for the active unit's team.
pub fn resolve_item_use(
    battle_state: &str,
    item_id: &str,
    config: &EngineConfig,
    rng: &mut BattleRng,
) -> ItemUseResponse {
    let mut log = ExecutionLog::new();

    let mut state = match parse_battle_state(battle_state, &mut log) {
        Ok(state) => state,
        Err(message) => {
            return ItemUseResponse {
                battle_state: serialize_state(&error_state(&message)),
                log: log.as_text(),
            }
        }
    };

    if let Err(error) = items::resolve_item_use(&mut state, item_id, config, rng, &mut log) {
        embed_error(&mut state, "Item", &error, &mut log);
    }

    ItemUseResponse {
        battle_state: serialize_state(&state),
        log: log.as_text(),
    }
}

/// Resolves the active enemy's turn (reads `activeUnitID` from the document).
pub fn resolve_enemy_turn(battle_state: &str, rng: &mut BattleRng) -> EnemyTurnResponse {
    let mut log = ExecutionLog::new();

    let mut state = match parse_battle_state(battle_state, &mut log) {
        Ok(state) => state,
        Err(message) => {
            return EnemyTurnResponse {
                battle_state: serialize_state(&error_state(&message)),
                was_target_eliminated: false,
                log: log.as_text(),
            }
        }
    };

    let was_target_eliminated = match ai::resolve_enemy_turn(&mut state, rng, &mut log) {
        Ok(outcome) => outcome.was_target_eliminated,
        Err(error) => {
            embed_error(&mut state, "Enemy AI", &error, &mut log);
            false
        }
    };

    EnemyTurnResponse {
        battle_state: serialize_state(&state),
        was_target_eliminated,
        log: log.as_text(),
    }
}

/// Processes queued effects for the unit that just acted. Runs before the
/// turn advances.
pub fn process_end_of_turn_effects(battle_state: &str) -> EffectsResponse {
    process_effects(battle_state, effects::process_end_of_turn_effects)
}

/// Processes queued effects for the newly active unit. Runs after the turn
/// advances.
pub fn process_start_of_turn_effects(battle_state: &str) -> EffectsResponse {
    process_effects(battle_state, effects::process_start_of_turn_effects)
}

fn process_effects(
    battle_state: &str,
    processor: fn(&mut BattleState, &mut ExecutionLog),
) -> EffectsResponse {
    let mut log = ExecutionLog::new();

    let mut state = match parse_battle_state(battle_state, &mut log) {
        Ok(state) => state,
        Err(message) => {
            return EffectsResponse {
                battle_state: serialize_state(&error_state(&message)),
                log: log.as_text(),
            }
        }
    };

    processor(&mut state, &mut log);

    EffectsResponse {
        battle_state: serialize_state(&state),
        log: log.as_text(),
    }
}

/// Runs end-of-turn upkeep for the acting unit and selects the next actor.
pub fn advance_turn(battle_state: &str, rng: &mut BattleRng) -> AdvanceTurnResponse {
    let mut log = ExecutionLog::new();

    let mut state = match parse_battle_state(battle_state, &mut log) {
        Ok(state) => state,
        Err(message) => {
            return AdvanceTurnResponse {
                battle_state: serialize_state(&error_state(&message)),
                log: log.as_text(),
            }
        }
    };

    turn_order::advance_turn(&mut state, rng, &mut log);

    AdvanceTurnResponse {
        battle_state: serialize_state(&state),
        log: log.as_text(),
    }
}

/// Finalizes battle results: computes experience, levels heroes, moves the
/// enemy level, and injects the result summary into the battle document.
pub fn finalize_battle_results(battle_state: &str, progression_data: &str) -> BattleResultsResponse {
    let mut log = ExecutionLog::new();

    let mut state = match parse_battle_state(battle_state, &mut log) {
        Ok(state) => state,
        Err(message) => {
            return BattleResultsResponse {
                battle_state: serialize_state(&error_state(&message)),
                progression_data: progression_data.to_string(),
                log: log.as_text(),
            }
        }
    };
    let mut progression = match parse_progression(progression_data, &mut log) {
        Ok(progression) => progression,
        Err(message) => {
            let mut error = state;
            error.battle_state = BattleStateTag::Error;
            error.battle_message = message;
            return BattleResultsResponse {
                battle_state: serialize_state(&error),
                progression_data: progression_data.to_string(),
                log: log.as_text(),
            };
        }
    };

    progression::finalize_battle_results(&mut state, &mut progression, &mut log);

    BattleResultsResponse {
        battle_state: serialize_state(&state),
        progression_data: serialize_progression(&progression),
        log: log.as_text(),
    }
}

/// Adds exercise experience outside of battle. The progression document
/// comes back empty when the update failed.
pub fn add_exercise_progression(
    progression_data: &str,
    exercise_id: &str,
    amount: i64,
) -> ExerciseProgressionResponse {
    let mut log = ExecutionLog::new();

    let mut progression = match parse_progression(progression_data, &mut log) {
        Ok(progression) => progression,
        Err(_) => {
            return ExerciseProgressionResponse {
                progression_data: String::new(),
                did_level_up: false,
                log: log.as_text(),
            }
        }
    };

    match progression::add_exercise_progression(&mut progression, exercise_id, amount, &mut log) {
        Ok(did_level_up) => ExerciseProgressionResponse {
            progression_data: serialize_progression(&progression),
            did_level_up,
            log: log.as_text(),
        },
        Err(error) => {
            log.push(format!("EXERCISE_ERROR: {}", error));
            ExerciseProgressionResponse {
                progression_data: String::new(),
                did_level_up: false,
                log: log.as_text(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::{Unit, UnitStats, UnitStatus, UnitType};

    fn small_battle_json() -> String {
        let state = BattleState {
            units: vec![
                Unit {
                    id: "a1".to_string(),
                    name: "Hero".to_string(),
                    unit_type: UnitType::Ally,
                    tier: None,
                    role: None,
                    status: UnitStatus::Active,
                    pseudo_pos: 0,
                    level: 1,
                    exp_value: None,
                    stats: UnitStats {
                        hp: 30,
                        max_hp: 30,
                        atk: 20.0,
                        shield_hp: 0,
                        gauge: 0,
                        max_gauge: 100,
                        ..Default::default()
                    },
                    commands: Vec::new(),
                    status_effects: Default::default(),
                },
                Unit {
                    id: "e1".to_string(),
                    name: "Slime".to_string(),
                    unit_type: UnitType::Enemy,
                    tier: None,
                    role: None,
                    status: UnitStatus::Idle,
                    pseudo_pos: 1,
                    level: 1,
                    exp_value: Some(1.0),
                    stats: UnitStats {
                        hp: 30,
                        max_hp: 30,
                        atk: 5.0,
                        shield_hp: 5,
                        ..Default::default()
                    },
                    commands: Vec::new(),
                    status_effects: Default::default(),
                },
            ],
            turn_order: vec!["a1".into(), "e1".into()],
            active_unit_id: Some("a1".into()),
            round: 1,
            turn_in_round: 1,
            team_sp: 0,
            max_team_sp: 10,
            ..Default::default()
        };
        serde_json::to_string(&state).unwrap()
    }

    #[test]
    fn malformed_document_returns_error_document_not_panic() {
        let config = EngineConfig::default();
        let mut rng = BattleRng::seeded(1);
        let response = resolve_basic_attack("{not json", "a1", "e1", &config, &mut rng);

        let state: BattleState = serde_json::from_str(&response.battle_state).unwrap();
        assert_eq!(state.battle_state, BattleStateTag::Error);
        assert!(!state.battle_message.is_empty());
        assert!(response.log.contains("PARSE_ERROR"));
    }

    #[test]
    fn basic_attack_round_trips_through_json() {
        let config = EngineConfig::default();
        let mut rng = BattleRng::seeded(1);
        let response =
            resolve_basic_attack(&small_battle_json(), "a1", "e1", &config, &mut rng);

        assert!(!response.was_target_eliminated);
        let state: BattleState = serde_json::from_str(&response.battle_state).unwrap();
        let slime = state.unit("e1").unwrap();
        // 20 damage: 5 eaten by shield, 15 from HP.
        assert_eq!(slime.stats.shield_hp, 0);
        assert_eq!(slime.stats.hp, 15);
        assert_eq!(state.unit("a1").unwrap().status, UnitStatus::EndTurn);
        assert!(state.team_sp >= 1);
    }

    #[test]
    fn unknown_actor_becomes_error_document() {
        let config = EngineConfig::default();
        let mut rng = BattleRng::seeded(1);
        let response =
            resolve_basic_attack(&small_battle_json(), "ghost", "e1", &config, &mut rng);

        let state: BattleState = serde_json::from_str(&response.battle_state).unwrap();
        assert_eq!(state.battle_state, BattleStateTag::Error);
        assert!(state.battle_message.contains("ghost"));
    }

    #[test]
    fn skill_with_bad_target_list_is_an_input_error() {
        let config = EngineConfig::default();
        let mut rng = BattleRng::seeded(1);
        let response = resolve_skill(
            &small_battle_json(),
            "a1",
            "cmd_x",
            "not-a-list",
            &config,
            &mut rng,
        );

        let state: BattleState = serde_json::from_str(&response.battle_state).unwrap();
        assert_eq!(state.battle_state, BattleStateTag::Error);
    }

    #[test]
    fn advance_turn_parses_and_advances() {
        let mut rng = BattleRng::seeded(1);
        let mut json = small_battle_json();
        // Mark the hero as done so the enemy becomes the next actor.
        json = json.replace("\"status\":\"Active\"", "\"status\":\"EndTurn\"");
        let response = advance_turn(&json, &mut rng);

        let state: BattleState = serde_json::from_str(&response.battle_state).unwrap();
        assert_eq!(state.active_unit_id.as_deref(), Some("e1"));
        assert_eq!(state.turn_order[0], "e1");
    }

    #[test]
    fn exercise_errors_return_empty_progression() {
        let response = add_exercise_progression("{}", "push_up", 10);
        // An empty heroes/enemyProgression document fails to parse.
        assert!(response.progression_data.is_empty());
        assert!(!response.did_level_up);
    }
}
