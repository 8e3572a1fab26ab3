//! Battle initialization: one-time snapshot of roster + progression data
//! into a ready battle document.

use crate::battle::log::ExecutionLog;
use crate::battle::rng::BattleRng;
use crate::battle::turn_order;
use crate::config::{EngineConfig, StatGrowth};
use crate::errors::EngineResult;
use schema::{BattleState, BattleStateTag, ProgressionData, StatBoost, Unit, UnitStatus, UnitType};

/// Prepares a battle document for its first turn: applies level and exercise
/// progression to unit stats, scales enemy exp values, builds the shuffled
/// initial turn order, and activates the first unit.
pub fn initiate_battle(
    state: &mut BattleState,
    progression: &ProgressionData,
    config: &EngineConfig,
    rng: &mut BattleRng,
    log: &mut ExecutionLog,
) -> EngineResult<()> {
    log.push("INIT: battle initialization started.".to_string());

    state.round = 1;
    state.turn_in_round = 1;
    state.battle_state = BattleStateTag::Ongoing;
    state.progression_snapshot = Some(progression.clone());

    let enemy_level = progression.enemy_progression.global_level.max(1);
    log.push(format!("INIT: enemy global level is {}.", enemy_level));

    for unit in &mut state.units {
        match unit.unit_type {
            UnitType::Ally => {
                let level = progression
                    .heroes
                    .iter()
                    .find(|h| h.id == unit.id)
                    .map(|h| h.level)
                    .unwrap_or(1);
                apply_level_growth(unit, level, config.ally_growth);
                unit.level = level;
            }
            UnitType::Enemy => {
                apply_level_growth(unit, enemy_level, config.growth_for_tier(unit.tier));
                unit.exp_value = Some(unit.exp_value.unwrap_or(1.0) * enemy_level as f64);
                unit.level = enemy_level;
            }
        }
    }
    log.push("INIT: stat progressions applied.".to_string());

    if let Some(hero_id) = &config.exercise_stat_hero {
        if let Some(unit) = state.unit_mut(hero_id) {
            apply_exercise_bonuses(unit, progression, log);
        }
    }

    let mut initial_order: Vec<String> = Vec::new();
    for unit in &mut state.units {
        if unit.is_alive() {
            unit.status = UnitStatus::Idle;
            initial_order.push(unit.id.clone());
        }
    }

    if initial_order.is_empty() {
        state.battle_state = BattleStateTag::Error;
        state.battle_message = "No units available to start the battle.".to_string();
        state.turn_order.clear();
        return Ok(());
    }

    rng.shuffle(&mut initial_order);
    state.turn_order = initial_order;
    state.active_unit_id = state.turn_order.first().cloned();

    if let Some(first_id) = state.active_unit_id.clone() {
        let mut first_name = String::new();
        let mut first_type = None;
        if let Some(unit) = state.unit_mut(&first_id) {
            unit.status = UnitStatus::Active;
            first_name = unit.name.clone();
            first_type = Some(unit.unit_type);
        }
        state.active_unit_type = first_type;
        state.battle_message = format!("Battle Start! {}'s turn.", first_name);
    }

    turn_order::sync_pseudo_positions(state);
    log.push(format!(
        "INIT: initial turn order established: [{}].",
        state.turn_order.join(", ")
    ));
    Ok(())
}

/// Raises max HP and attack by the growth rate per level above 1 and refills
/// HP. Level-1 units keep their roster stats untouched.
fn apply_level_growth(unit: &mut Unit, level: u32, growth: StatGrowth) {
    if level <= 1 {
        return;
    }
    let bonus_levels = (level - 1) as i64;
    unit.stats.max_hp += bonus_levels * growth.hp;
    unit.stats.hp = unit.stats.max_hp;
    unit.stats.atk += bonus_levels as f64 * growth.atk;
}

/// Applies exercise-stat levels as flat bonuses to the beneficiary hero:
/// +1 ATK or +1 max HP per exercise level above 1.
fn apply_exercise_bonuses(unit: &mut Unit, progression: &ProgressionData, log: &mut ExecutionLog) {
    for exercise in &progression.exercise_stats_progression {
        if exercise.level <= 1 {
            continue;
        }
        let bonus = (exercise.level - 1) as i64;
        match exercise.stats {
            Some(StatBoost::Atk) => {
                unit.stats.atk += bonus as f64;
                log.push(format!("INIT: {} gains +{} ATK from {}.", unit.name, bonus, exercise.id));
            }
            Some(StatBoost::Hp) => {
                unit.stats.max_hp += bonus;
                unit.stats.hp = unit.stats.max_hp;
                log.push(format!("INIT: {} gains +{} HP from {}.", unit.name, bonus, exercise.id));
            }
            None => {}
        }
    }
}
