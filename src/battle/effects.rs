//! Scheduled status effect processing.
//!
//! `active_effects` is a flat queue keyed by trigger phase and target. The
//! end-of-turn pass runs for the unit that just acted (before the turn
//! advances); the start-of-turn pass runs for the newly active unit (after
//! the turn advances). Effects are interpreted by their type tag; unknown
//! tags are skipped, never fatal.

use crate::battle::log::ExecutionLog;
use schema::{
    BattleState, EffectPopup, LastActionDetails, StatusEffectKind, TriggerPhase, Unit, UnitStatus,
};

/// Decrements the acting unit's buff/debuff durations and drops expired
/// entries. Runs once per end-of-turn upkeep.
pub fn tick_unit_statuses(unit: &mut Unit, log: &mut ExecutionLog) {
    let before =
        unit.status_effects.buffs.len() + unit.status_effects.debuffs.len();
    if before == 0 {
        return;
    }

    for effect in unit
        .status_effects
        .buffs
        .iter_mut()
        .chain(unit.status_effects.debuffs.iter_mut())
    {
        effect.duration -= 1;
    }
    unit.status_effects.buffs.retain(|e| e.duration > 0);
    unit.status_effects.debuffs.retain(|e| e.duration > 0);

    let after = unit.status_effects.buffs.len() + unit.status_effects.debuffs.len();
    log.push(format!(
        "UPKEEP: ticked status effects for {} ({} -> {} active).",
        unit.name, before, after
    ));
}

/// Processes `end_of_turn` effects targeting the unit that just acted.
pub fn process_end_of_turn_effects(state: &mut BattleState, log: &mut ExecutionLog) {
    process_phase(state, TriggerPhase::EndOfTurn, log);
}

/// Processes `start_of_turn` effects targeting the newly active unit.
pub fn process_start_of_turn_effects(state: &mut BattleState, log: &mut ExecutionLog) {
    process_phase(state, TriggerPhase::StartOfTurn, log);
}

fn process_phase(state: &mut BattleState, phase: TriggerPhase, log: &mut ExecutionLog) {
    if state.active_effects.is_empty() {
        return;
    }
    let Some(active_id) = state.active_unit_id.clone() else {
        return;
    };
    if state.unit(&active_id).is_none() {
        return;
    }

    let pending: Vec<schema::StatusEffectInstance> = state
        .active_effects
        .iter()
        .filter(|e| e.trigger_phase == Some(phase) && e.target_id.as_deref() == Some(&active_id))
        .cloned()
        .collect();

    for effect in pending {
        let source = effect
            .source_skill_name
            .clone()
            .unwrap_or_else(|| effect.effect_type.clone());
        log.push(format!(
            "EFFECT_PROCESSOR: processing '{}' from '{}' on {}.",
            effect.effect_type, source, active_id
        ));

        match effect.kind() {
            StatusEffectKind::Poison => {
                let damage = effect.damage.unwrap_or(5.0).round() as i64;
                apply_periodic_damage(state, &active_id, damage, "Poison", log);
            }
            StatusEffectKind::DamageOverTime => {
                let damage = effect.damage.unwrap_or(0.0).round() as i64;
                apply_periodic_damage(state, &active_id, damage, &source, log);
            }
            StatusEffectKind::Stun | StatusEffectKind::Unknown => {
                // Stun is consumed by the enemy turn resolver; anything else
                // has no scheduled behavior here.
                log.push(format!(
                    "EFFECT_PROCESSOR: no scheduled handler for '{}'; skipping.",
                    effect.effect_type
                ));
            }
        }
    }
}

fn apply_periodic_damage(
    state: &mut BattleState,
    unit_id: &str,
    damage: i64,
    source: &str,
    log: &mut ExecutionLog,
) {
    let Some(unit) = state.unit_mut(unit_id) else {
        return;
    };
    let old_hp = unit.stats.hp;
    unit.stats.hp = (unit.stats.hp - damage).max(0);
    let name = unit.name.clone();
    log.push(format!(
        "EFFECT_PROCESSOR: {} takes {} damage ({} -> {} HP).",
        name, damage, old_hp, unit.stats.hp
    ));

    if unit.stats.hp == 0 {
        unit.status = UnitStatus::Defeated;
        log.push(format!("EFFECT_PROCESSOR: {} was defeated by {}!", name, source));
    }

    state.battle_message = format!("{} takes {} damage from {}!", name, damage, source);
    state.last_action_details = Some(LastActionDetails {
        actor_id: Some(unit_id.to_string()),
        effects: Some(vec![EffectPopup {
            popup_type: "damage".to_string(),
            unit_id: Some(unit_id.to_string()),
            amount: Some(damage),
        }]),
        ..Default::default()
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use schema::{StatusEffectInstance, UnitStats, UnitStatusEffect, UnitType};

    fn poisoned_state(damage: Option<f64>, phase: TriggerPhase) -> BattleState {
        let unit = Unit {
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
                hp: 20,
                max_hp: 20,
                atk: 5.0,
                ..Default::default()
            },
            commands: Vec::new(),
            status_effects: Default::default(),
        };
        BattleState {
            units: vec![unit],
            turn_order: vec!["a1".into()],
            active_unit_id: Some("a1".into()),
            active_effects: vec![StatusEffectInstance {
                effect_type: if phase == TriggerPhase::EndOfTurn {
                    "poison".to_string()
                } else {
                    "damage_over_time".to_string()
                },
                trigger_phase: Some(phase),
                target_id: Some("a1".into()),
                damage,
                source_skill_name: Some("Venom Strike".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn poison_damages_at_end_of_turn() {
        let mut state = poisoned_state(Some(6.0), TriggerPhase::EndOfTurn);
        let mut log = ExecutionLog::new();
        process_end_of_turn_effects(&mut state, &mut log);

        assert_eq!(state.unit("a1").unwrap().stats.hp, 14);
        assert!(state.battle_message.contains("6 damage from Poison"));
        let details = state.last_action_details.unwrap();
        assert_eq!(details.effects.unwrap()[0].amount, Some(6));
    }

    #[test]
    fn poison_defaults_to_five_damage() {
        let mut state = poisoned_state(None, TriggerPhase::EndOfTurn);
        let mut log = ExecutionLog::new();
        process_end_of_turn_effects(&mut state, &mut log);
        assert_eq!(state.unit("a1").unwrap().stats.hp, 15);
    }

    #[test]
    fn lethal_poison_defeats_the_unit() {
        let mut state = poisoned_state(Some(25.0), TriggerPhase::EndOfTurn);
        let mut log = ExecutionLog::new();
        process_end_of_turn_effects(&mut state, &mut log);

        let unit = state.unit("a1").unwrap();
        assert_eq!(unit.stats.hp, 0);
        assert_eq!(unit.status, UnitStatus::Defeated);
    }

    #[test]
    fn start_of_turn_processes_damage_over_time() {
        let mut state = poisoned_state(Some(4.0), TriggerPhase::StartOfTurn);
        let mut log = ExecutionLog::new();
        process_start_of_turn_effects(&mut state, &mut log);

        assert_eq!(state.unit("a1").unwrap().stats.hp, 16);
        assert!(state.battle_message.contains("Venom Strike"));
    }

    #[test]
    fn effects_for_other_units_are_left_alone() {
        let mut state = poisoned_state(Some(6.0), TriggerPhase::EndOfTurn);
        state.active_effects[0].target_id = Some("someone_else".into());
        let mut log = ExecutionLog::new();
        process_end_of_turn_effects(&mut state, &mut log);
        assert_eq!(state.unit("a1").unwrap().stats.hp, 20);
    }

    #[test]
    fn tick_prunes_expired_statuses() {
        let mut unit = poisoned_state(None, TriggerPhase::EndOfTurn).units.remove(0);
        unit.status_effects.debuffs = vec![
            UnitStatusEffect {
                name: "Stun".to_string(),
                duration: 1,
                source_unit_id: None,
            },
            UnitStatusEffect {
                name: "Weaken".to_string(),
                duration: 3,
                source_unit_id: None,
            },
        ];
        let mut log = ExecutionLog::new();
        tick_unit_statuses(&mut unit, &mut log);

        assert_eq!(unit.status_effects.debuffs.len(), 1);
        assert_eq!(unit.status_effects.debuffs[0].name, "Weaken");
        assert_eq!(unit.status_effects.debuffs[0].duration, 2);
    }
}
