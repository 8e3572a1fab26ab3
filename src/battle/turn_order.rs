//! Turn order management: pseudo-position sync, mid-skill insertion, round
//! rollover, and the end-of-turn advance step.

use crate::battle::effects;
use crate::battle::log::ExecutionLog;
use crate::battle::rng::BattleRng;
use schema::{BattleState, BattleStateTag, UnitStatus, UnitType};

/// Re-derives every unit's `pseudoPos` from its index in `_turnOrder`.
/// `_turnOrder` is the source of truth; this is the only place the cached
/// ordinal is ever written.
pub fn sync_pseudo_positions(state: &mut BattleState) {
    let order = state.turn_order.clone();
    for (index, id) in order.iter().enumerate() {
        if let Some(unit) = state.unit_mut(id) {
            unit.pseudo_pos = index;
        }
    }
}

/// Splices a unit into `_turnOrder` at the given slot (clamped to the valid
/// range), removing any previous occurrence first.
pub fn insert_and_reorder(state: &mut BattleState, unit_id: &str, index: usize) {
    state.turn_order.retain(|id| id != unit_id);
    let final_index = index.min(state.turn_order.len());
    state.turn_order.insert(final_index, unit_id.to_string());
    sync_pseudo_positions(state);
}

/// Evaluates the win/lose condition and stamps the outcome tag. Returns true
/// when the battle is over. Win and Lose are terminal; an Error tag is left
/// alone.
pub fn check_battle_end(state: &mut BattleState) -> bool {
    let alive_allies = state.living_units_of_type(UnitType::Ally).count();
    let alive_enemies = state.living_units_of_type(UnitType::Enemy).count();

    if alive_enemies == 0 && alive_allies > 0 {
        state.battle_state = BattleStateTag::Win;
        state.battle_message = "Victory!".to_string();
        return true;
    }
    if alive_allies == 0 {
        state.battle_state = BattleStateTag::Lose;
        state.battle_message = "Defeat...".to_string();
        return true;
    }
    if !state.battle_state.is_terminal() {
        state.battle_state = BattleStateTag::Ongoing;
    }
    false
}

/// End-of-turn upkeep plus selection of the next actor.
///
/// Runs after an action (and its end-of-turn effects) has resolved: ticks
/// the acting unit's status durations, prunes defeated units from the
/// order, honors an act-again flag, rolls over the round when everyone has
/// acted, and rotates the chosen actor to the front of `_turnOrder`.
pub fn advance_turn(state: &mut BattleState, rng: &mut BattleRng, log: &mut ExecutionLog) {
    state.last_action_details = None;

    let actor_id = state.active_unit_id.clone();
    if let Some(id) = &actor_id {
        if let Some(unit) = state.unit_mut(id) {
            effects::tick_unit_statuses(unit, log);
        }
    }

    let living_order: Vec<String> = state
        .turn_order
        .iter()
        .filter(|id| state.unit(id).is_some_and(|u| u.is_alive()))
        .cloned()
        .collect();
    state.turn_order = living_order;

    if check_battle_end(state) || state.turn_order.is_empty() {
        log.push("TURN_MANAGER: the battle has ended.".to_string());
        state.active_unit_id = None;
        return;
    }

    let acts_again =
        actor_id.is_some() && state.actor_should_act_again.as_deref() == actor_id.as_deref();
    state.actor_should_act_again = None;
    state.turn_order_modified_by_skill = None;

    if !acts_again {
        if let Some(id) = &actor_id {
            if let Some(unit) = state.unit_mut(id) {
                if unit.is_alive() {
                    unit.status = UnitStatus::EndTurn;
                }
            }
        }
    }

    let next_active_id = if acts_again {
        log.push("TURN_MANAGER: the actor acts again.".to_string());
        actor_id.clone()
    } else {
        state
            .turn_order
            .iter()
            .find(|id| state.unit(id).is_some_and(|u| u.status == UnitStatus::Idle))
            .cloned()
    };

    let next_active_id = match next_active_id {
        Some(id) => id,
        None => {
            // Everyone has acted: start a new round with a fresh shuffle.
            log.push("TURN_MANAGER: all units have acted. Starting a new round.".to_string());
            state.round += 1;
            state.turn_in_round = 0;
            for unit in &mut state.units {
                if unit.is_alive() {
                    unit.status = UnitStatus::Idle;
                }
            }
            let mut new_order: Vec<String> = state
                .units
                .iter()
                .filter(|u| u.is_alive())
                .map(|u| u.id.clone())
                .collect();
            rng.shuffle(&mut new_order);
            state.turn_order = new_order;
            log.push(format!(
                "TURN_MANAGER: new round order: [{}]",
                state.turn_order.join(", ")
            ));
            match state.turn_order.first() {
                Some(id) => id.clone(),
                None => {
                    state.active_unit_id = None;
                    return;
                }
            }
        }
    };

    // Rotate the chosen actor to the front, preserving relative order.
    if let Some(position) = state.turn_order.iter().position(|id| *id == next_active_id) {
        state.turn_order.rotate_left(position);
    }
    state.active_unit_id = state.turn_order.first().cloned();

    if let Some(active_id) = state.active_unit_id.clone() {
        let mut active_name = String::new();
        let mut active_type = None;
        if let Some(unit) = state.unit_mut(&active_id) {
            unit.status = UnitStatus::Active;
            active_name = unit.name.clone();
            active_type = Some(unit.unit_type);
        }
        state.active_unit_type = active_type;
        state.turn_in_round += 1;
        state.battle_message = format!("Turn of {}.", active_name);
    }

    sync_pseudo_positions(state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::{Unit, UnitStats};

    fn make_unit(id: &str, unit_type: UnitType, status: UnitStatus) -> Unit {
        Unit {
            id: id.to_string(),
            name: id.to_string(),
            unit_type,
            tier: None,
            role: None,
            status,
            pseudo_pos: 0,
            level: 1,
            exp_value: None,
            stats: UnitStats {
                hp: 20,
                max_hp: 20,
                atk: 5.0,
                ..Default::default()
            },
            commands: Vec::new(),
            status_effects: Default::default(),
        }
    }

    fn three_unit_state() -> BattleState {
        BattleState {
            units: vec![
                make_unit("a1", UnitType::Ally, UnitStatus::Active),
                make_unit("a2", UnitType::Ally, UnitStatus::Idle),
                make_unit("e1", UnitType::Enemy, UnitStatus::Idle),
            ],
            turn_order: vec!["a1".into(), "a2".into(), "e1".into()],
            active_unit_id: Some("a1".into()),
            round: 1,
            turn_in_round: 1,
            ..Default::default()
        }
    }

    #[test]
    fn sync_matches_index_for_every_unit() {
        let mut state = three_unit_state();
        state.turn_order = vec!["e1".into(), "a1".into(), "a2".into()];
        sync_pseudo_positions(&mut state);

        for (i, id) in state.turn_order.clone().iter().enumerate() {
            assert_eq!(state.unit(id).unwrap().pseudo_pos, i);
        }
    }

    #[test]
    fn insert_clamps_index_and_resyncs() {
        let mut state = three_unit_state();
        insert_and_reorder(&mut state, "a1", 99);
        assert_eq!(state.turn_order, vec!["a2".to_string(), "e1".to_string(), "a1".to_string()]);
        assert_eq!(state.unit("a1").unwrap().pseudo_pos, 2);

        insert_and_reorder(&mut state, "a1", 1);
        assert_eq!(state.turn_order, vec!["a2".to_string(), "a1".to_string(), "e1".to_string()]);
        assert_eq!(state.unit("a1").unwrap().pseudo_pos, 1);
    }

    #[test]
    fn win_requires_a_living_ally() {
        let mut state = three_unit_state();
        state.unit_mut("e1").unwrap().status = UnitStatus::Defeated;
        assert!(check_battle_end(&mut state));
        assert_eq!(state.battle_state, BattleStateTag::Win);
    }

    #[test]
    fn lose_when_all_allies_fall() {
        let mut state = three_unit_state();
        state.unit_mut("a1").unwrap().status = UnitStatus::Defeated;
        state.unit_mut("a2").unwrap().status = UnitStatus::Defeated;
        assert!(check_battle_end(&mut state));
        assert_eq!(state.battle_state, BattleStateTag::Lose);
    }

    #[test]
    fn ongoing_battle_is_not_ended() {
        let mut state = three_unit_state();
        assert!(!check_battle_end(&mut state));
        assert_eq!(state.battle_state, BattleStateTag::Ongoing);
    }
}
