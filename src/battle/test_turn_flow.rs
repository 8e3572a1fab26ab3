//! Scenario tests for the turn order manager: advancing, round rollover,
//! act-again handling, and the pseudo-position invariant.

use crate::battle::log::ExecutionLog;
use crate::battle::rng::BattleRng;
use crate::battle::turn_order::{advance_turn, sync_pseudo_positions};
use pretty_assertions::assert_eq;
use schema::{
    BattleState, BattleStateTag, Unit, UnitStats, UnitStatus, UnitStatusEffect, UnitType,
};

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
            hp: 30,
            max_hp: 30,
            atk: 10.0,
            ..Default::default()
        },
        commands: Vec::new(),
        status_effects: Default::default(),
    }
}

fn battle_of(units: Vec<Unit>) -> BattleState {
    let mut state = BattleState {
        turn_order: units.iter().map(|u| u.id.clone()).collect(),
        active_unit_id: units.first().map(|u| u.id.clone()),
        round: 1,
        turn_in_round: 1,
        units,
        ..Default::default()
    };
    sync_pseudo_positions(&mut state);
    state
}

fn assert_positions_match_order(state: &BattleState) {
    for (i, id) in state.turn_order.iter().enumerate() {
        assert_eq!(
            state.unit(id).unwrap().pseudo_pos,
            i,
            "pseudoPos out of sync for {}",
            id
        );
    }
}

#[test]
fn advance_moves_to_the_next_idle_unit_and_rotates() {
    let mut state = battle_of(vec![
        make_unit("a1", UnitType::Ally, UnitStatus::Active),
        make_unit("a2", UnitType::Ally, UnitStatus::Idle),
        make_unit("e1", UnitType::Enemy, UnitStatus::Idle),
    ]);
    let mut rng = BattleRng::seeded(3);
    let mut log = ExecutionLog::new();

    advance_turn(&mut state, &mut rng, &mut log);

    assert_eq!(state.active_unit_id.as_deref(), Some("a2"));
    assert_eq!(state.turn_order, vec!["a2".to_string(), "e1".to_string(), "a1".to_string()]);
    assert_eq!(state.unit("a1").unwrap().status, UnitStatus::EndTurn);
    assert_eq!(state.unit("a2").unwrap().status, UnitStatus::Active);
    assert_eq!(state.active_unit_type, Some(UnitType::Ally));
    assert_eq!(state.turn_in_round, 2);
    assert_positions_match_order(&state);
    assert!(state.last_action_details.is_none());
}

#[test]
fn round_increments_exactly_once_per_full_pass() {
    let mut state = battle_of(vec![
        make_unit("a1", UnitType::Ally, UnitStatus::Active),
        make_unit("e1", UnitType::Enemy, UnitStatus::Idle),
    ]);
    let mut rng = BattleRng::seeded(7);
    let mut log = ExecutionLog::new();

    // a1 finishes, e1 becomes active: still round 1.
    advance_turn(&mut state, &mut rng, &mut log);
    assert_eq!(state.round, 1);
    assert_eq!(state.active_unit_id.as_deref(), Some("e1"));

    // e1 finishes: everyone has acted, so a new round starts.
    advance_turn(&mut state, &mut rng, &mut log);
    assert_eq!(state.round, 2);
    assert_eq!(state.turn_in_round, 1);
    // Everyone alive is reset; the new active unit leads the fresh order.
    let active = state.active_unit_id.clone().unwrap();
    assert_eq!(state.turn_order[0], active);
    assert_eq!(state.unit(&active).unwrap().status, UnitStatus::Active);
    assert_positions_match_order(&state);

    // A third advance only rolls the round if the pass completed again.
    advance_turn(&mut state, &mut rng, &mut log);
    assert_eq!(state.round, 2);
}

#[test]
fn act_again_keeps_the_same_actor_without_consuming_a_slot() {
    let mut state = battle_of(vec![
        make_unit("a1", UnitType::Ally, UnitStatus::Active),
        make_unit("a2", UnitType::Ally, UnitStatus::Idle),
    ]);
    state.actor_should_act_again = Some("a1".to_string());
    let mut rng = BattleRng::seeded(1);
    let mut log = ExecutionLog::new();

    advance_turn(&mut state, &mut rng, &mut log);

    assert_eq!(state.active_unit_id.as_deref(), Some("a1"));
    assert_eq!(state.unit("a1").unwrap().status, UnitStatus::Active);
    // a2 is still waiting for its first activation this round.
    assert_eq!(state.unit("a2").unwrap().status, UnitStatus::Idle);
    assert!(state.actor_should_act_again.is_none());
    assert_eq!(state.round, 1);
}

#[test]
fn defeated_units_are_pruned_from_the_order() {
    let mut state = battle_of(vec![
        make_unit("a1", UnitType::Ally, UnitStatus::Active),
        make_unit("e1", UnitType::Enemy, UnitStatus::Idle),
        make_unit("e2", UnitType::Enemy, UnitStatus::Idle),
    ]);
    let defeated = state.unit_mut("e1").unwrap();
    defeated.status = UnitStatus::Defeated;
    defeated.stats.hp = 0;
    let mut rng = BattleRng::seeded(1);
    let mut log = ExecutionLog::new();

    advance_turn(&mut state, &mut rng, &mut log);

    assert!(!state.turn_order.contains(&"e1".to_string()));
    assert_eq!(state.active_unit_id.as_deref(), Some("e2"));
    assert_positions_match_order(&state);
}

#[test]
fn battle_ends_when_no_enemy_survives() {
    let mut state = battle_of(vec![
        make_unit("a1", UnitType::Ally, UnitStatus::Active),
        make_unit("e1", UnitType::Enemy, UnitStatus::Idle),
    ]);
    let defeated = state.unit_mut("e1").unwrap();
    defeated.status = UnitStatus::Defeated;
    defeated.stats.hp = 0;
    let mut rng = BattleRng::seeded(1);
    let mut log = ExecutionLog::new();

    advance_turn(&mut state, &mut rng, &mut log);

    assert_eq!(state.battle_state, BattleStateTag::Win);
    assert!(state.active_unit_id.is_none());
}

#[test]
fn upkeep_ticks_the_acting_units_statuses_only() {
    let mut state = battle_of(vec![
        make_unit("a1", UnitType::Ally, UnitStatus::Active),
        make_unit("e1", UnitType::Enemy, UnitStatus::Idle),
    ]);
    state.unit_mut("a1").unwrap().status_effects.debuffs.push(UnitStatusEffect {
        name: "Stun".to_string(),
        duration: 1,
        source_unit_id: None,
    });
    state.unit_mut("e1").unwrap().status_effects.debuffs.push(UnitStatusEffect {
        name: "Poison".to_string(),
        duration: 2,
        source_unit_id: None,
    });
    let mut rng = BattleRng::seeded(1);
    let mut log = ExecutionLog::new();

    advance_turn(&mut state, &mut rng, &mut log);

    // The actor's expired stun is gone; the bystander's poison is untouched.
    assert!(state.unit("a1").unwrap().status_effects.debuffs.is_empty());
    assert_eq!(state.unit("e1").unwrap().status_effects.debuffs[0].duration, 2);
}

#[test]
fn new_round_order_contains_every_living_unit() {
    let mut state = battle_of(vec![
        make_unit("a1", UnitType::Ally, UnitStatus::EndTurn),
        make_unit("a2", UnitType::Ally, UnitStatus::EndTurn),
        make_unit("e1", UnitType::Enemy, UnitStatus::Active),
    ]);
    state.active_unit_id = Some("e1".to_string());
    let mut rng = BattleRng::seeded(21);
    let mut log = ExecutionLog::new();

    advance_turn(&mut state, &mut rng, &mut log);

    assert_eq!(state.round, 2);
    let mut order = state.turn_order.clone();
    order.sort();
    assert_eq!(order, vec!["a1".to_string(), "a2".to_string(), "e1".to_string()]);
    assert_positions_match_order(&state);
}
