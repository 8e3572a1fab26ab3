//! Scenario tests for the skill pipeline: costs, effect dispatch, revive
//! reinsertion, act-again, and status queuing.

use crate::battle::engine::resolve_skill;
use crate::battle::log::ExecutionLog;
use crate::battle::rng::BattleRng;
use crate::battle::turn_order::sync_pseudo_positions;
use crate::config::EngineConfig;
use crate::errors::{CommandError, EngineError};
use pretty_assertions::assert_eq;
use schema::{
    BattleState, Command, CommandType, EffectDetails, EffectSpec, EffectTarget,
    StatusEffectInstance, TriggerPhase, Unit, UnitStats, UnitStatus, UnitType,
};

fn make_unit(id: &str, unit_type: UnitType, hp: i64, max_hp: i64) -> Unit {
    Unit {
        id: id.to_string(),
        name: id.to_string(),
        unit_type,
        tier: None,
        role: None,
        status: UnitStatus::Idle,
        pseudo_pos: 0,
        level: 1,
        exp_value: Some(1.0),
        stats: UnitStats {
            hp,
            max_hp,
            atk: 10.0,
            shield_hp: 0,
            gauge: 0,
            max_gauge: 100,
            ..Default::default()
        },
        commands: Vec::new(),
        status_effects: Default::default(),
    }
}

fn skill(command_id: &str, sp_cost: i64, effects: Vec<EffectSpec>) -> Command {
    Command {
        command_id: command_id.to_string(),
        name: format!("Skill {}", command_id),
        command_type: CommandType::Skill,
        sp_cost,
        is_ultimate: false,
        gauge_cost: None,
        sfx_filename: Some("skill.wav".to_string()),
        effects,
        applied_effects: Vec::new(),
        targeting_params: None,
    }
}

fn battle_with_skill(command: Command) -> BattleState {
    let mut actor = make_unit("a1", UnitType::Ally, 30, 30);
    actor.status = UnitStatus::Active;
    actor.commands.push(command);
    let mut state = BattleState {
        units: vec![
            actor,
            make_unit("a2", UnitType::Ally, 30, 30),
            make_unit("e1", UnitType::Enemy, 25, 25),
            make_unit("e2", UnitType::Enemy, 25, 25),
        ],
        turn_order: vec!["a1".into(), "a2".into(), "e1".into(), "e2".into()],
        active_unit_id: Some("a1".into()),
        round: 1,
        turn_in_round: 1,
        team_sp: 5,
        max_team_sp: 10,
        ..Default::default()
    };
    sync_pseudo_positions(&mut state);
    state
}

#[test]
fn damage_skill_scales_attack_and_deducts_sp() {
    let command = skill(
        "cmd_blast",
        3,
        vec![EffectSpec::Damage {
            multiplier: 1.5,
            target: EffectTarget::Selected,
        }],
    );
    let mut state = battle_with_skill(command);
    let config = EngineConfig::default();
    let mut rng = BattleRng::seeded(1);
    let mut log = ExecutionLog::new();

    let outcome = resolve_skill(
        &mut state,
        "a1",
        "cmd_blast",
        &["e1".to_string()],
        &config,
        &mut rng,
        &mut log,
    )
    .unwrap();

    assert_eq!(state.team_sp, 2);
    assert_eq!(state.unit("e1").unwrap().stats.hp, 10); // 25 - round(10 * 1.5)
    assert!(!outcome.was_target_eliminated);
    assert_eq!(outcome.sfx.as_deref(), Some("skill.wav"));
    assert_eq!(state.unit("a1").unwrap().status, UnitStatus::EndTurn);
    assert!(state.battle_message.contains("e1 (-15 HP)"));
}

#[test]
fn insufficient_sp_is_an_input_error() {
    let command = skill(
        "cmd_blast",
        9,
        vec![EffectSpec::Damage {
            multiplier: 1.0,
            target: EffectTarget::Selected,
        }],
    );
    let mut state = battle_with_skill(command);
    state.team_sp = 2;
    let config = EngineConfig::default();
    let mut rng = BattleRng::seeded(1);
    let mut log = ExecutionLog::new();

    let err = resolve_skill(
        &mut state,
        "a1",
        "cmd_blast",
        &["e1".to_string()],
        &config,
        &mut rng,
        &mut log,
    )
    .unwrap_err();

    assert_eq!(
        err,
        EngineError::Command(CommandError::InsufficientSp {
            required: 9,
            available: 2
        })
    );
    // The failed attempt must not have mutated resources or targets.
    assert_eq!(state.team_sp, 2);
    assert_eq!(state.unit("e1").unwrap().stats.hp, 25);
}

#[test]
fn ultimate_requires_full_gauge_and_resets_it() {
    let mut command = skill(
        "cmd_ult",
        0,
        vec![EffectSpec::Damage {
            multiplier: 2.0,
            target: EffectTarget::Selected,
        }],
    );
    command.is_ultimate = true;
    let mut state = battle_with_skill(command);
    let config = EngineConfig::default();
    let mut log = ExecutionLog::new();

    // Uncharged gauge: the skill is rejected.
    let mut rng = BattleRng::seeded(1);
    let err = resolve_skill(
        &mut state,
        "a1",
        "cmd_ult",
        &["e1".to_string()],
        &config,
        &mut rng,
        &mut log,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Command(CommandError::InsufficientGauge { required: 100, .. })
    ));

    // Charged gauge: the skill fires and the gauge resets to zero.
    state.unit_mut("a1").unwrap().stats.gauge = 100;
    resolve_skill(
        &mut state,
        "a1",
        "cmd_ult",
        &["e1".to_string()],
        &config,
        &mut rng,
        &mut log,
    )
    .unwrap();
    assert_eq!(state.unit("a1").unwrap().stats.gauge, 0);
    assert_eq!(state.unit("e1").unwrap().stats.hp, 5);
}

#[test]
fn lethal_damage_tracks_the_defeated_enemy_once() {
    let command = skill(
        "cmd_blast",
        0,
        vec![
            EffectSpec::Damage {
                multiplier: 3.0,
                target: EffectTarget::Selected,
            },
            EffectSpec::Damage {
                multiplier: 3.0,
                target: EffectTarget::Selected,
            },
        ],
    );
    let mut state = battle_with_skill(command);
    let config = EngineConfig::default();
    let mut rng = BattleRng::seeded(1);
    let mut log = ExecutionLog::new();

    let outcome = resolve_skill(
        &mut state,
        "a1",
        "cmd_blast",
        &["e1".to_string()],
        &config,
        &mut rng,
        &mut log,
    )
    .unwrap();

    assert!(outcome.was_target_eliminated);
    assert_eq!(state.unit("e1").unwrap().status, UnitStatus::Defeated);
    let tracked = state.defeated_enemies_this_battle.unwrap();
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].id, "e1");
}

#[test]
fn revive_reinserts_at_slot_one_and_flags_the_order() {
    let command = skill(
        "cmd_revive",
        0,
        vec![EffectSpec::Revive {
            hp_percentage: Some(0.5),
            target: EffectTarget::Selected,
        }],
    );
    let mut state = battle_with_skill(command);
    {
        let fallen = state.unit_mut("a2").unwrap();
        fallen.status = UnitStatus::Defeated;
        fallen.stats.hp = 0;
        fallen.stats.max_hp = 100;
    }
    state.turn_order.retain(|id| id != "a2");
    sync_pseudo_positions(&mut state);
    let config = EngineConfig::default();
    let mut rng = BattleRng::seeded(1);
    let mut log = ExecutionLog::new();

    resolve_skill(
        &mut state,
        "a1",
        "cmd_revive",
        &["a2".to_string()],
        &config,
        &mut rng,
        &mut log,
    )
    .unwrap();

    let revived = state.unit("a2").unwrap();
    assert_eq!(revived.status, UnitStatus::Idle);
    assert_eq!(revived.stats.hp, 50);
    assert_eq!(revived.stats.shield_hp, 0);
    assert_eq!(state.turn_order[1], "a2");
    assert_eq!(revived.pseudo_pos, 1);
    assert_eq!(state.turn_order_modified_by_skill, Some(true));
    // Every index still matches its unit's pseudoPos after the splice.
    for (i, id) in state.turn_order.clone().iter().enumerate() {
        assert_eq!(state.unit(id).unwrap().pseudo_pos, i);
    }
}

#[test]
fn act_again_sets_the_flag_instead_of_ending_the_turn() {
    let command = skill("cmd_encore", 0, vec![EffectSpec::ActAgain {}]);
    let mut state = battle_with_skill(command);
    let config = EngineConfig::default();
    let mut rng = BattleRng::seeded(1);
    let mut log = ExecutionLog::new();

    let outcome = resolve_skill(
        &mut state,
        "a1",
        "cmd_encore",
        &[],
        &config,
        &mut rng,
        &mut log,
    )
    .unwrap();

    assert!(outcome.actor_acts_again);
    assert_eq!(state.actor_should_act_again.as_deref(), Some("a1"));
    assert_eq!(state.unit("a1").unwrap().status, UnitStatus::Active);
}

#[test]
fn status_effect_joins_queue_and_target_debuffs() {
    let command = skill(
        "cmd_venom",
        0,
        vec![EffectSpec::Status {
            status_name: "Poison".to_string(),
            chance: Some(1.0),
            duration: Some(3),
            effect_details: Some(EffectDetails {
                damage: Some(4.0),
                trigger_phase: Some(TriggerPhase::EndOfTurn),
            }),
            target: EffectTarget::Selected,
        }],
    );
    let mut state = battle_with_skill(command);
    let config = EngineConfig::default();
    let mut rng = BattleRng::seeded(1);
    let mut log = ExecutionLog::new();

    resolve_skill(
        &mut state,
        "a1",
        "cmd_venom",
        &["e1".to_string()],
        &config,
        &mut rng,
        &mut log,
    )
    .unwrap();

    assert_eq!(state.active_effects.len(), 1);
    let queued = &state.active_effects[0];
    assert_eq!(queued.effect_type, "poison");
    assert_eq!(queued.target_id.as_deref(), Some("e1"));
    assert_eq!(queued.duration, Some(3));
    assert_eq!(queued.damage, Some(4.0));
    assert_eq!(queued.trigger_phase, Some(TriggerPhase::EndOfTurn));
    assert_eq!(queued.source_skill_name.as_deref(), Some("Skill cmd_venom"));

    let target = state.unit("e1").unwrap();
    assert_eq!(target.status_effects.debuffs.len(), 1);
    assert_eq!(target.status_effects.debuffs[0].name, "Poison");
    assert_eq!(target.status_effects.debuffs[0].duration, 3);
}

#[test]
fn status_chance_zero_never_applies() {
    let command = skill(
        "cmd_venom",
        0,
        vec![EffectSpec::Status {
            status_name: "Poison".to_string(),
            chance: Some(0.0),
            duration: Some(3),
            effect_details: None,
            target: EffectTarget::Selected,
        }],
    );
    let mut state = battle_with_skill(command);
    let config = EngineConfig::default();
    let mut rng = BattleRng::seeded(1);
    let mut log = ExecutionLog::new();

    resolve_skill(
        &mut state,
        "a1",
        "cmd_venom",
        &["e1".to_string()],
        &config,
        &mut rng,
        &mut log,
    )
    .unwrap();

    assert!(state.active_effects.is_empty());
    assert!(state.unit("e1").unwrap().status_effects.debuffs.is_empty());
}

#[test]
fn applied_effect_templates_are_stamped_per_target() {
    let mut command = skill("cmd_hex", 0, vec![]);
    command.applied_effects.push(StatusEffectInstance {
        effect_id: Some("hex_dot".to_string()),
        effect_type: "damage_over_time".to_string(),
        trigger_phase: Some(TriggerPhase::StartOfTurn),
        target_type: Some("individual".to_string()),
        chance: Some(1.0),
        damage: Some(2.0),
        ..Default::default()
    });
    let mut state = battle_with_skill(command);
    let config = EngineConfig::default();
    let mut rng = BattleRng::seeded(1);
    let mut log = ExecutionLog::new();

    resolve_skill(
        &mut state,
        "a1",
        "cmd_hex",
        &["e1".to_string(), "e2".to_string()],
        &config,
        &mut rng,
        &mut log,
    )
    .unwrap();

    assert_eq!(state.active_effects.len(), 2);
    let targets: Vec<&str> = state
        .active_effects
        .iter()
        .filter_map(|e| e.target_id.as_deref())
        .collect();
    assert_eq!(targets, vec!["e1", "e2"]);
    for queued in &state.active_effects {
        assert!(queued.chance.is_none());
        assert_eq!(queued.source_actor_id.as_deref(), Some("a1"));
        assert_eq!(queued.source_skill_name.as_deref(), Some("Skill cmd_hex"));
    }
}

#[test]
fn heal_lowest_hp_ally_picks_by_fraction() {
    let command = skill(
        "cmd_mend",
        0,
        vec![EffectSpec::HealLowestHpAlly {
            multiplier: 0.5,
            based_on: None,
        }],
    );
    let mut state = battle_with_skill(command);
    // a2 at 10/30 is lower than a1 at 30/30.
    state.unit_mut("a2").unwrap().stats.hp = 10;
    let config = EngineConfig::default();
    let mut rng = BattleRng::seeded(1);
    let mut log = ExecutionLog::new();

    resolve_skill(&mut state, "a1", "cmd_mend", &[], &config, &mut rng, &mut log).unwrap();

    // Healed by round(30 * 0.5) = 15.
    assert_eq!(state.unit("a2").unwrap().stats.hp, 25);
    assert_eq!(state.unit("a1").unwrap().stats.hp, 30);
}

#[test]
fn caster_adjacent_damage_hits_ring_neighbors() {
    let command = skill(
        "cmd_sweep",
        0,
        vec![EffectSpec::DamageAoeAdjacent {
            multiplier: 1.0,
            target: EffectTarget::CasterAdjacentEnemies,
        }],
    );
    // Order: a1(0), e1(1), a2(2), e2(3) — neighbors of a1 are e1 and e2.
    let mut state = battle_with_skill(command);
    state.turn_order = vec!["a1".into(), "e1".into(), "a2".into(), "e2".into()];
    sync_pseudo_positions(&mut state);
    let config = EngineConfig::default();
    let mut rng = BattleRng::seeded(1);
    let mut log = ExecutionLog::new();

    resolve_skill(&mut state, "a1", "cmd_sweep", &[], &config, &mut rng, &mut log).unwrap();

    assert_eq!(state.unit("e1").unwrap().stats.hp, 15);
    assert_eq!(state.unit("e2").unwrap().stats.hp, 15);
    assert_eq!(state.unit("a2").unwrap().stats.hp, 30);
}

#[test]
fn defeated_targets_are_skipped_except_for_revive() {
    let command = skill(
        "cmd_blast",
        0,
        vec![EffectSpec::Damage {
            multiplier: 1.0,
            target: EffectTarget::Selected,
        }],
    );
    let mut state = battle_with_skill(command);
    {
        let fallen = state.unit_mut("e1").unwrap();
        fallen.status = UnitStatus::Defeated;
        fallen.stats.hp = 0;
    }
    let config = EngineConfig::default();
    let mut rng = BattleRng::seeded(1);
    let mut log = ExecutionLog::new();

    let outcome = resolve_skill(
        &mut state,
        "a1",
        "cmd_blast",
        &["e1".to_string()],
        &config,
        &mut rng,
        &mut log,
    )
    .unwrap();

    assert!(!outcome.was_target_eliminated);
    assert!(state.battle_message.contains("no valid targets"));
}

#[test]
fn unknown_command_is_an_input_error() {
    let command = skill("cmd_known", 0, vec![]);
    let mut state = battle_with_skill(command);
    let config = EngineConfig::default();
    let mut rng = BattleRng::seeded(1);
    let mut log = ExecutionLog::new();

    let err = resolve_skill(
        &mut state,
        "a1",
        "cmd_ghost",
        &[],
        &config,
        &mut rng,
        &mut log,
    )
    .unwrap_err();
    assert!(err.to_string().contains("cmd_ghost"));
}
