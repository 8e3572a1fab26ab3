//! Action resolution: basic attacks and the skill-effect pipeline.
//!
//! Both resolvers are pure document transformations: validate, mutate the
//! owned `BattleState`, stamp `battleMessage`/`lastActionDetails`, and hand
//! side outputs back to the caller. Nothing here advances the turn; the
//! external sequencer invokes effect processing and the turn order manager
//! after an action resolves.

use ordered_float::OrderedFloat;

use crate::battle::log::ExecutionLog;
use crate::battle::math::{self, DamageOutcome};
use crate::battle::rng::BattleRng;
use crate::battle::targeting;
use crate::battle::turn_order;
use crate::config::EngineConfig;
use crate::errors::{CommandError, EngineResult, UnitError};
use schema::{
    BattleState, Command, DefeatedEnemy, EffectSpec, EffectTarget, LastActionDetails,
    StatusEffectInstance, UnitStatus, UnitStatusEffect, UnitType,
};

pub const BASIC_ATTACK_COMMAND_ID: &str = "__BASIC_ATTACK__";

/// Side outputs of a basic attack resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicAttackOutcome {
    pub was_target_eliminated: bool,
}

/// Side outputs of a skill resolution.
#[derive(Debug, Clone, Default)]
pub struct SkillOutcome {
    pub was_target_eliminated: bool,
    pub actor_acts_again: bool,
    pub sfx: Option<String>,
}

/// Applies damage through combat math and records a newly defeated enemy
/// into the progression accumulator (dedup by id).
pub(crate) fn deal_damage(
    state: &mut BattleState,
    target_index: usize,
    amount: f64,
    log: &mut ExecutionLog,
) -> DamageOutcome {
    let outcome = math::apply_damage(&mut state.units[target_index], amount);
    if outcome.eliminated {
        let name = state.units[target_index].name.clone();
        log.push(format!("KILL: {} has been defeated!", name));
        track_defeated_enemy(state, target_index, log);
    }
    outcome
}

fn track_defeated_enemy(state: &mut BattleState, unit_index: usize, log: &mut ExecutionLog) {
    let unit = &state.units[unit_index];
    if unit.unit_type != UnitType::Enemy {
        return;
    }
    let entry = DefeatedEnemy {
        id: unit.id.clone(),
        tier: unit.tier,
        exp_value: unit.exp_value.unwrap_or(1.0),
    };
    let name = unit.name.clone();
    let tier = unit.tier;
    let tracked = state
        .defeated_enemies_this_battle
        .get_or_insert_with(Vec::new);
    if !tracked.iter().any(|e| e.id == entry.id) {
        tracked.push(entry);
        log.push(format!(
            "TRACKING: {} (Tier: {:?}) added to progression list.",
            name, tier
        ));
    }
}

/// Resolves a basic attack: flat ATK damage, gauge gain for the attacker,
/// and a weighted SP roll for the team.
pub fn resolve_basic_attack(
    state: &mut BattleState,
    actor_id: &str,
    target_id: &str,
    config: &EngineConfig,
    rng: &mut BattleRng,
    log: &mut ExecutionLog,
) -> EngineResult<BasicAttackOutcome> {
    log.push("BASIC_ATTACK_PROC: started.".to_string());
    state.defeated_enemies_this_battle.get_or_insert_with(Vec::new);

    let actor_index = state
        .unit_index(actor_id)
        .ok_or_else(|| UnitError::NotFound(actor_id.to_string()))?;
    let target_index = state
        .unit_index(target_id)
        .ok_or_else(|| UnitError::NotFound(target_id.to_string()))?;

    if state.units[actor_index].is_defeated() {
        return Err(UnitError::Defeated(state.units[actor_index].name.clone()).into());
    }
    if state.units[target_index].is_defeated() {
        return Err(UnitError::Defeated(state.units[target_index].name.clone()).into());
    }

    let actor_name = state.units[actor_index].name.clone();
    let target_name = state.units[target_index].name.clone();
    let attack = state.units[actor_index].stats.atk;
    log.push(format!("BASIC_ATTACK: actor {}, target {}.", actor_name, target_name));

    let outcome = deal_damage(state, target_index, attack, log);
    log.push(format!(
        "DAMAGE: {} dealt {} total damage.",
        actor_name, outcome.total_damage
    ));

    let actor = &mut state.units[actor_index];
    if actor.stats.max_gauge > 0 {
        actor.stats.gauge =
            (actor.stats.gauge + config.basic_attack_gauge_gain).min(actor.stats.max_gauge);
        log.push(format!(
            "GAUGE: {} at {}/{}.",
            actor_name, actor.stats.gauge, actor.stats.max_gauge
        ));
    }

    let sp_gained = config.sp_gain_table.choose(rng).copied().unwrap_or(0);
    state.team_sp = (state.team_sp + sp_gained).min(state.max_team_sp);
    log.push(format!(
        "SP_GEN: gained {} SP. Team SP now: {}/{}.",
        sp_gained, state.team_sp, state.max_team_sp
    ));

    state.battle_message = format!(
        "{} attacked {}, dealing {} damage. (+{} SP)",
        actor_name, target_name, outcome.total_damage, sp_gained
    );
    state.last_action_details = Some(LastActionDetails {
        actor_id: Some(actor_id.to_string()),
        command_id: Some(BASIC_ATTACK_COMMAND_ID.to_string()),
        command_name: Some("Basic Attack".to_string()),
        targets: Some(vec![target_id.to_string()]),
        effects_summary: Some(vec![format!(
            "{} (-{} HP)",
            target_name, outcome.total_damage
        )]),
        ..Default::default()
    });

    state.units[actor_index].status = UnitStatus::EndTurn;

    Ok(BasicAttackOutcome {
        was_target_eliminated: outcome.eliminated,
    })
}

/// Resolves a skill: cost deduction, queued status-effect templates, and the
/// ordered effect pipeline.
pub fn resolve_skill(
    state: &mut BattleState,
    actor_id: &str,
    command_id: &str,
    affected_target_ids: &[String],
    config: &EngineConfig,
    rng: &mut BattleRng,
    log: &mut ExecutionLog,
) -> EngineResult<SkillOutcome> {
    log.push("SKILL_PROC: started.".to_string());
    state.defeated_enemies_this_battle.get_or_insert_with(Vec::new);

    let actor_index = state
        .unit_index(actor_id)
        .ok_or_else(|| UnitError::NotFound(actor_id.to_string()))?;
    let actor_name = state.units[actor_index].name.clone();
    let actor_atk = state.units[actor_index].stats.atk;

    let command: Command = state.units[actor_index]
        .commands
        .iter()
        .find(|c| c.command_id == command_id)
        .cloned()
        .ok_or_else(|| CommandError::NotFound {
            unit: actor_name.clone(),
            command: command_id.to_string(),
        })?;
    log.push(format!("SKILL_PROC: actor {} | skill {}.", actor_name, command.name));

    deduct_costs(state, actor_index, &command, config, log)?;

    enqueue_applied_effects(state, actor_id, &command, affected_target_ids, rng, log);

    let mut outcome = SkillOutcome {
        sfx: command.sfx_filename.clone(),
        ..Default::default()
    };
    let mut hit_summary: Vec<String> = Vec::new();

    for effect in &command.effects {
        // Global effects first: they need no target resolution.
        match effect {
            EffectSpec::ActAgain {} => {
                outcome.actor_acts_again = true;
                log.push(format!("EFFECT: actor {} will act again.", actor_name));
                continue;
            }
            EffectSpec::HealLowestHpAlly { multiplier, based_on } => {
                heal_lowest_hp_ally(state, actor_atk, *multiplier, based_on.as_deref(), &mut hit_summary, log);
                continue;
            }
            _ => {}
        }

        let Some(target_kind) = effect_target(effect) else {
            continue;
        };
        let target_ids = resolve_effect_targets(state, actor_id, target_kind, affected_target_ids);
        if target_ids.is_empty() {
            log.push("EFFECT_WARN: no valid targets found for effect.".to_string());
            continue;
        }

        for target_id in target_ids {
            let Some(target_index) = state.unit_index(&target_id) else {
                continue;
            };
            let is_revive = matches!(effect, EffectSpec::Revive { .. });
            if state.units[target_index].is_defeated() && !is_revive {
                continue;
            }
            apply_effect_to_target(
                state,
                effect,
                actor_id,
                actor_atk,
                &command,
                target_index,
                config,
                rng,
                &mut outcome,
                &mut hit_summary,
                log,
            );
        }
    }

    finalize_skill(state, actor_id, command_id, &command, affected_target_ids, &outcome, hit_summary);
    Ok(outcome)
}

fn deduct_costs(
    state: &mut BattleState,
    actor_index: usize,
    command: &Command,
    config: &EngineConfig,
    log: &mut ExecutionLog,
) -> EngineResult<()> {
    if command.sp_cost > 0 {
        if state.team_sp < command.sp_cost {
            return Err(CommandError::InsufficientSp {
                required: command.sp_cost,
                available: state.team_sp,
            }
            .into());
        }
        state.team_sp -= command.sp_cost;
        log.push(format!("SP: deducted {}. Team SP now {}.", command.sp_cost, state.team_sp));
    }

    if command.is_ultimate {
        let gauge_cost = command.gauge_cost.unwrap_or(config.default_ultimate_gauge_cost);
        let stats = &mut state.units[actor_index].stats;
        if stats.gauge < gauge_cost {
            return Err(CommandError::InsufficientGauge {
                required: gauge_cost,
                available: stats.gauge,
            }
            .into());
        }
        stats.gauge = 0;
        log.push("ULTIMATE: gauge reset to 0.".to_string());
    }
    Ok(())
}

/// Copies each applied-effect template into `active_effects`, rolling the
/// template's chance independently per UI-affected target.
fn enqueue_applied_effects(
    state: &mut BattleState,
    actor_id: &str,
    command: &Command,
    affected_target_ids: &[String],
    rng: &mut BattleRng,
    log: &mut ExecutionLog,
) {
    for template in &command.applied_effects {
        for target_id in affected_target_ids {
            let chance = template.chance.unwrap_or(1.0);
            if !rng.chance(chance) {
                log.push(format!(
                    "EFFECT_FACTORY: '{}' failed to apply to {} (chance fail).",
                    template.effect_type, target_id
                ));
                continue;
            }

            let mut instance = template.clone();
            instance.source_skill_name = Some(command.name.clone());
            instance.source_actor_id = Some(actor_id.to_string());
            if instance.target_type.as_deref() == Some("individual") {
                instance.target_id = Some(target_id.clone());
            }
            instance.chance = None;

            log.push(format!(
                "EFFECT_FACTORY: queued '{}' for target {}.",
                instance.effect_type, target_id
            ));
            state.active_effects.push(instance);
        }
    }
}

fn effect_target(effect: &EffectSpec) -> Option<EffectTarget> {
    match effect {
        EffectSpec::Damage { target, .. }
        | EffectSpec::DamageAoeAdjacent { target, .. }
        | EffectSpec::Heal { target, .. }
        | EffectSpec::Shield { target, .. }
        | EffectSpec::Revive { target, .. }
        | EffectSpec::Status { target, .. } => Some(*target),
        EffectSpec::ActAgain {} | EffectSpec::HealLowestHpAlly { .. } => None,
    }
}

fn resolve_effect_targets(
    state: &BattleState,
    actor_id: &str,
    target_kind: EffectTarget,
    affected_target_ids: &[String],
) -> Vec<String> {
    match target_kind {
        EffectTarget::Caster => vec![actor_id.to_string()],
        EffectTarget::Selected | EffectTarget::Area => affected_target_ids
            .iter()
            .filter(|id| state.unit(id).is_some())
            .cloned()
            .collect(),
        EffectTarget::CasterAdjacentEnemies => targeting::adjacent_enemies(state, actor_id),
    }
}

fn heal_lowest_hp_ally(
    state: &mut BattleState,
    actor_atk: f64,
    multiplier: f64,
    based_on: Option<&str>,
    hit_summary: &mut Vec<String>,
    log: &mut ExecutionLog,
) {
    log.push("EFFECT: searching for the ally with the lowest HP.".to_string());
    let lowest = state
        .units
        .iter()
        .enumerate()
        .filter(|(_, u)| u.unit_type == UnitType::Ally && u.is_alive())
        .min_by_key(|(_, u)| OrderedFloat(u.hp_fraction()))
        .map(|(i, _)| i);

    let Some(index) = lowest else {
        log.push("EFFECT: no living allies to heal.".to_string());
        return;
    };

    let base = if based_on == Some("caster_atk") {
        actor_atk
    } else {
        state.units[index].stats.max_hp as f64
    };
    let amount = (base * multiplier).round();
    math::apply_heal(&mut state.units[index], amount);
    let name = state.units[index].name.clone();
    hit_summary.push(format!("{} (+{} HP)", name, amount as i64));
    log.push(format!("EFFECT: {} healed by {}.", name, amount as i64));
}

#[allow(clippy::too_many_arguments)]
fn apply_effect_to_target(
    state: &mut BattleState,
    effect: &EffectSpec,
    actor_id: &str,
    actor_atk: f64,
    command: &Command,
    target_index: usize,
    config: &EngineConfig,
    rng: &mut BattleRng,
    outcome: &mut SkillOutcome,
    hit_summary: &mut Vec<String>,
    log: &mut ExecutionLog,
) {
    let target_name = state.units[target_index].name.clone();

    match effect {
        EffectSpec::Damage { multiplier, .. } | EffectSpec::DamageAoeAdjacent { multiplier, .. } => {
            let damage = deal_damage(state, target_index, actor_atk * multiplier, log);
            if damage.eliminated {
                outcome.was_target_eliminated = true;
            }
            hit_summary.push(format!("{} (-{} HP)", target_name, damage.total_damage));
        }
        EffectSpec::Heal { multiplier, based_on, .. } => {
            let base = if based_on.as_deref() == Some("caster_atk") {
                actor_atk
            } else {
                state.units[target_index].stats.max_hp as f64
            };
            let amount = (base * multiplier).round();
            math::apply_heal(&mut state.units[target_index], amount);
            hit_summary.push(format!("{} (+{} HP)", target_name, amount as i64));
        }
        EffectSpec::Shield { multiplier, based_on, .. } => {
            // A shield with no scaling source resolves against base 0; data
            // must opt in with basedOn.
            let base = if based_on.as_deref() == Some("caster_atk") {
                actor_atk
            } else {
                0.0
            };
            let amount = (base * multiplier).round();
            math::apply_shield(&mut state.units[target_index], amount);
            hit_summary.push(format!("{} (+{} Shield)", target_name, amount as i64));
        }
        EffectSpec::Revive { hp_percentage, .. } => {
            let fraction = hp_percentage.unwrap_or(0.5);
            if math::apply_revive(&mut state.units[target_index], fraction) {
                let target_id = state.units[target_index].id.clone();
                hit_summary.push(format!("{} (Revived)", target_name));
                log.push(format!("SKILL_REVIVE: {} has been revived.", target_name));
                turn_order::insert_and_reorder(state, &target_id, config.revive_insert_index);
                state.turn_order_modified_by_skill = Some(true);
            }
        }
        EffectSpec::Status { status_name, chance, duration, effect_details, .. } => {
            if !rng.chance(chance.unwrap_or(1.0)) {
                log.push(format!(
                    "APPLY_STATUS: failed to apply {} to {} (chance fail).",
                    status_name, target_name
                ));
                return;
            }

            let details = effect_details.clone().unwrap_or_default();
            let duration = duration.unwrap_or(1);
            let target_id = state.units[target_index].id.clone();

            state.active_effects.push(StatusEffectInstance {
                name: Some(status_name.clone()),
                effect_type: status_name.to_lowercase(),
                duration: Some(duration),
                damage: details.damage,
                trigger_phase: details.trigger_phase,
                target_id: Some(target_id),
                source_unit_id: Some(actor_id.to_string()),
                source_skill_name: Some(command.name.clone()),
                ..Default::default()
            });
            state.units[target_index]
                .status_effects
                .debuffs
                .push(UnitStatusEffect {
                    name: status_name.clone(),
                    duration,
                    source_unit_id: None,
                });

            log.push(format!(
                "EFFECT_FACTORY: queued '{}' on {} for {} turns.",
                status_name, target_name, duration
            ));
            hit_summary.push(format!("{} ({})", target_name, status_name));
        }
        EffectSpec::ActAgain {} | EffectSpec::HealLowestHpAlly { .. } => {
            // Global effects; handled before target resolution.
        }
    }
}

fn finalize_skill(
    state: &mut BattleState,
    actor_id: &str,
    command_id: &str,
    command: &Command,
    affected_target_ids: &[String],
    outcome: &SkillOutcome,
    hit_summary: Vec<String>,
) {
    let actor_name = state
        .unit(actor_id)
        .map(|u| u.name.clone())
        .unwrap_or_else(|| actor_id.to_string());
    let headline = format!("{} used {}!", actor_name, command.name);

    if !hit_summary.is_empty() {
        let mut seen = std::collections::HashSet::new();
        let deduped: Vec<String> = hit_summary
            .iter()
            .filter(|s| seen.insert((*s).clone()))
            .cloned()
            .collect();
        state.battle_message = format!("{} {}.", headline, deduped.join(". "));
    } else if outcome.actor_acts_again {
        state.battle_message = headline;
    } else {
        state.battle_message = format!("{} ...but no valid targets were found.", headline);
    }

    state.last_action_details = Some(LastActionDetails {
        actor_id: Some(actor_id.to_string()),
        command_id: Some(command_id.to_string()),
        command_name: Some(command.name.clone()),
        targets: Some(affected_target_ids.to_vec()),
        effects_summary: Some(hit_summary),
        ..Default::default()
    });

    if outcome.actor_acts_again {
        state.actor_should_act_again = Some(actor_id.to_string());
    } else if let Some(actor) = state.unit_mut(actor_id) {
        actor.status = UnitStatus::EndTurn;
    }
}
