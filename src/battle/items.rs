//! Consumable item resolution.
//!
//! Items are self-contained single-shot effects driven entirely by the
//! `EngineConfig` item table; magnitudes come from small fixed sets, picked
//! uniformly, never continuous rolls.

use crate::battle::log::ExecutionLog;
use crate::battle::math;
use crate::battle::rng::BattleRng;
use crate::battle::targeting;
use crate::config::{EngineConfig, ItemKind};
use crate::errors::{CommandError, EngineResult, UnitError};
use schema::{BattleState, EffectPopup, LastActionDetails, UnitType};

const HEAL_SHIELD_ACTOR: &str = "SYSTEM_ITEM_HEAL_SHIELD";
const SP_GAIN_ACTOR: &str = "SYSTEM_ITEM_SP_GAIN";

/// Resolves a single item use for the active unit's team.
pub fn resolve_item_use(
    state: &mut BattleState,
    item_id: &str,
    config: &EngineConfig,
    rng: &mut BattleRng,
    log: &mut ExecutionLog,
) -> EngineResult<()> {
    let item = config
        .item(item_id)
        .ok_or_else(|| CommandError::UnknownItem(item_id.to_string()))?
        .clone();
    log.push(format!("ITEM: using {}.", item.name));

    match &item.kind {
        ItemKind::SelfHealShield { fractions } => {
            let Some(active_id) = state.active_unit_id.clone() else {
                return Err(UnitError::NoActiveUnit.into());
            };
            let Some(index) = state.unit_index(&active_id) else {
                return Err(UnitError::NotFound(active_id).into());
            };
            if state.units[index].is_defeated() {
                state.battle_message =
                    format!("The {} was used, but had no effect...", item.name);
                return Ok(());
            }

            let fraction = rng.pick(fractions).copied().unwrap_or(0.0);
            let mut popups = Vec::new();
            heal_and_shield(state, index, fraction, &mut popups, log);

            let name = state.units[index].name.clone();
            state.battle_message =
                format!("{} used a {} and feels a calming energy!", name, item.name);
            state.last_action_details = Some(heal_shield_details(&item.name, popups));
        }
        ItemKind::RadiusHealShield { radius, fractions } => {
            let Some(active_id) = state.active_unit_id.clone() else {
                return Err(UnitError::NoActiveUnit.into());
            };
            let caster_index = state
                .unit_index(&active_id)
                .ok_or_else(|| UnitError::NotFound(active_id.clone()))?;
            if state.units[caster_index].is_defeated() {
                return Err(UnitError::Defeated(state.units[caster_index].name.clone()).into());
            }

            let caster_pos = state.units[caster_index].pseudo_pos;
            let ring_size = if state.turn_order.is_empty() {
                targeting::ordered_alive_units(state).len()
            } else {
                state.turn_order.len()
            };
            let target_indices: Vec<usize> = state
                .units
                .iter()
                .enumerate()
                .filter(|(_, u)| u.unit_type == UnitType::Ally && u.is_alive())
                .filter(|(_, u)| {
                    targeting::circular_distance(caster_pos, u.pseudo_pos, ring_size) <= *radius
                })
                .map(|(i, _)| i)
                .collect();

            if target_indices.is_empty() {
                state.battle_message = format!(
                    "The {} was used, but no one was nearby to receive its effects...",
                    item.name
                );
                return Ok(());
            }

            let mut popups = Vec::new();
            for index in target_indices {
                // The magnitude is re-rolled per recipient.
                let fraction = rng.pick(fractions).copied().unwrap_or(0.0);
                heal_and_shield(state, index, fraction, &mut popups, log);
            }

            let caster_name = state.units[caster_index].name.clone();
            state.battle_message = format!(
                "{} used a {}, revitalizing nearby allies!",
                caster_name, item.name
            );
            state.last_action_details = Some(heal_shield_details(&item.name, popups));
        }
        ItemKind::TeamSpGain { amounts } => {
            let gain = rng.pick(amounts).copied().unwrap_or(0);
            let old_sp = state.team_sp;
            state.team_sp = (state.team_sp + gain).min(state.max_team_sp);
            let actual = state.team_sp - old_sp;

            let mut popups = Vec::new();
            if actual > 0 {
                popups.push(EffectPopup {
                    popup_type: "sp_gain".to_string(),
                    unit_id: None,
                    amount: Some(actual),
                });
            }

            let user_name = state
                .active_unit_id
                .as_ref()
                .and_then(|id| state.unit(id))
                .map(|u| u.name.clone())
                .unwrap_or_else(|| "The team".to_string());
            state.battle_message = format!(
                "{} used a {}. The team gained {} SP!",
                user_name, item.name, actual
            );
            state.last_action_details = Some(LastActionDetails {
                actor_id: Some(SP_GAIN_ACTOR.to_string()),
                command_name: Some(item.name.clone()),
                effects: Some(popups),
                ..Default::default()
            });
            log.push(format!("ITEM: team SP {} -> {}.", old_sp, state.team_sp));
        }
        ItemKind::PartyHealShield { fractions } => {
            let target_indices: Vec<usize> = state
                .units
                .iter()
                .enumerate()
                .filter(|(_, u)| u.unit_type == UnitType::Ally && u.is_alive())
                .map(|(i, _)| i)
                .collect();

            if target_indices.is_empty() {
                state.battle_message =
                    "A powerful energy was released, but no one was there to receive it..."
                        .to_string();
                return Ok(());
            }

            // One roll covers the whole party.
            let fraction = rng.pick(fractions).copied().unwrap_or(0.0);
            let mut popups = Vec::new();
            for index in target_indices {
                heal_and_shield(state, index, fraction, &mut popups, log);
            }

            state.battle_message =
                "A wave of protective energy washes over the party, restoring health and creating a barrier!"
                    .to_string();
            state.last_action_details = Some(heal_shield_details(&item.name, popups));
        }
    }

    Ok(())
}

fn heal_and_shield(
    state: &mut BattleState,
    index: usize,
    fraction: f64,
    popups: &mut Vec<EffectPopup>,
    log: &mut ExecutionLog,
) {
    let base_amount = (state.units[index].stats.max_hp as f64 * fraction).round();
    let healed = math::apply_heal(&mut state.units[index], base_amount);
    let shielded = math::apply_shield(&mut state.units[index], base_amount);
    let unit_id = state.units[index].id.clone();

    if healed > 0 {
        popups.push(EffectPopup {
            popup_type: "heal".to_string(),
            unit_id: Some(unit_id.clone()),
            amount: Some(healed),
        });
    }
    popups.push(EffectPopup {
        popup_type: "shield".to_string(),
        unit_id: Some(unit_id.clone()),
        amount: Some(shielded),
    });
    log.push(format!(
        "ITEM: {} healed {} and gained {} shield.",
        unit_id, healed, shielded
    ));
}

fn heal_shield_details(item_name: &str, popups: Vec<EffectPopup>) -> LastActionDetails {
    LastActionDetails {
        actor_id: Some(HEAL_SHIELD_ACTOR.to_string()),
        command_name: Some(item_name.to_string()),
        effects: Some(popups),
        ..Default::default()
    }
}
