//! A module for defining enemy decision behavior.

use crate::battle::engine::{self, BASIC_ATTACK_COMMAND_ID};
use crate::battle::log::ExecutionLog;
use crate::battle::rng::BattleRng;
use crate::errors::{EngineResult, UnitError};
use schema::{BattleState, LastActionDetails, Unit, UnitRole, UnitType};

/// A trait for any system that can pick a basic-attack target for the active
/// enemy. Provides a seam for alternative difficulty behaviors.
pub trait Behavior {
    /// Inspects the battle state and chooses a target id, or None when no
    /// unit is in reach.
    fn choose_target(
        &self,
        state: &BattleState,
        attacker: &Unit,
        rng: &mut BattleRng,
    ) -> Option<String>;
}

/// Reach-based targeting: melee units hit the slots at circular distance
/// exactly 1 from their own, ranged units the slots at distance exactly 2.
/// Among allies standing on those slots, one is chosen uniformly at random.
pub struct RoleReachBehavior;

impl RoleReachBehavior {
    pub fn new() -> Self {
        Self
    }

    fn reachable_positions(attacker: &Unit, num_alive: usize) -> Vec<usize> {
        let mut positions: Vec<usize> = Vec::new();
        let mut push_unique = |p: usize, positions: &mut Vec<usize>| {
            if !positions.contains(&p) {
                positions.push(p);
            }
        };

        match attacker.role {
            Some(UnitRole::Ranged) => {
                if num_alive > 2 {
                    push_unique(2, &mut positions);
                }
                if num_alive > 3 {
                    push_unique(num_alive - 2, &mut positions);
                }
            }
            // Melee is the default for units without a declared role.
            Some(UnitRole::Melee) | None => {
                if num_alive > 1 {
                    push_unique(1, &mut positions);
                }
                if num_alive > 2 {
                    push_unique(num_alive - 1, &mut positions);
                }
            }
        }
        positions
    }
}

impl Default for RoleReachBehavior {
    fn default() -> Self {
        Self::new()
    }
}

impl Behavior for RoleReachBehavior {
    fn choose_target(
        &self,
        state: &BattleState,
        attacker: &Unit,
        rng: &mut BattleRng,
    ) -> Option<String> {
        let num_alive = state.units.iter().filter(|u| u.is_alive()).count();
        let positions = Self::reachable_positions(attacker, num_alive);

        let candidates: Vec<&Unit> = state
            .units
            .iter()
            .filter(|u| {
                u.is_alive()
                    && u.unit_type == UnitType::Ally
                    && positions.contains(&u.pseudo_pos)
            })
            .collect();

        rng.pick(&candidates).map(|u| u.id.clone())
    }
}

/// Side outputs of an enemy turn resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnemyTurnOutcome {
    pub was_target_eliminated: bool,
}

/// Resolves the active enemy's turn: skip it when stunned, otherwise pick a
/// target in reach and land a basic attack (no SP or gauge side effects).
pub fn resolve_enemy_turn(
    state: &mut BattleState,
    rng: &mut BattleRng,
    log: &mut ExecutionLog,
) -> EngineResult<EnemyTurnOutcome> {
    log.push("ENEMY_AI: started.".to_string());

    let active_id = state.active_unit_id.clone().ok_or(UnitError::NoActiveUnit)?;
    let attacker_index = state
        .unit_index(&active_id)
        .ok_or_else(|| UnitError::NotFound(active_id.clone()))?;
    let attacker_name = state.units[attacker_index].name.clone();

    if state.units[attacker_index].has_debuff("Stun") {
        // The stun's duration is ticked down by the turn advance that
        // follows this skipped turn.
        log.push(format!("ENEMY_AI: {} is stunned. Skipping turn.", attacker_name));
        state.battle_message = format!("{} is stunned!", attacker_name);
        state.last_action_details = Some(LastActionDetails {
            actor_id: Some(active_id),
            command_id: Some("__STUNNED__".to_string()),
            command_name: Some("Stunned".to_string()),
            action_outcome: Some("STUNNED".to_string()),
            ..Default::default()
        });
        return Ok(EnemyTurnOutcome::default());
    }

    let role = state.units[attacker_index].role;
    log.push(format!("ENEMY_AI: turn for {} (Role: {:?}).", attacker_name, role));

    let behavior = RoleReachBehavior::new();
    let chosen = {
        let attacker = &state.units[attacker_index];
        behavior.choose_target(state, attacker, rng)
    };

    let Some(target_id) = chosen else {
        log.push(format!("ENEMY_AI: {} has no target in range.", attacker_name));
        state.battle_message = format!("{} has no target in range.", attacker_name);
        state.last_action_details = Some(LastActionDetails {
            actor_id: Some(active_id),
            action_outcome: Some("NO_TARGET_IN_RANGE".to_string()),
            ..Default::default()
        });
        return Ok(EnemyTurnOutcome::default());
    };

    let target_index = state
        .unit_index(&target_id)
        .ok_or_else(|| UnitError::NotFound(target_id.clone()))?;
    let target_name = state.units[target_index].name.clone();
    let attack = state.units[attacker_index].stats.atk;

    let outcome = engine::deal_damage(state, target_index, attack, log);
    state.battle_message = format!(
        "{} attacked {}, dealing {} damage!",
        attacker_name, target_name, outcome.total_damage
    );
    state.last_action_details = Some(LastActionDetails {
        actor_id: Some(active_id),
        command_id: Some(BASIC_ATTACK_COMMAND_ID.to_string()),
        command_name: Some("Basic Attack".to_string()),
        targets: Some(vec![target_id]),
        effects_summary: Some(vec![format!(
            "{} (-{} HP)",
            target_name, outcome.total_damage
        )]),
        ..Default::default()
    });

    Ok(EnemyTurnOutcome {
        was_target_eliminated: outcome.eliminated,
    })
}
