//! Targeting geometry over the circular turn order.
//!
//! Primary targets come from a command's selection pattern; the affected set
//! then grows through the command's area rule. Both stages work on ordinal
//! positions (`pseudoPos`), never on any 2-D notion of space.

use crate::battle::log::ExecutionLog;
use schema::{
    AreaOrigin, AreaShape, BattleState, Command, SelectionShape, TargetDirection, Unit, UnitStatus,
    UnitType,
};

/// All living units in turn order. Documents without a `_turnOrder` (a
/// malformed-input compatibility mode) fall back to sorting by `pseudoPos`.
pub fn ordered_alive_units(state: &BattleState) -> Vec<&Unit> {
    if !state.turn_order.is_empty() {
        return state
            .turn_order
            .iter()
            .filter_map(|id| state.units.iter().find(|u| u.id == *id && u.is_alive()))
            .collect();
    }

    let mut alive: Vec<&Unit> = state.units.iter().filter(|u| u.is_alive()).collect();
    alive.sort_by_key(|u| u.pseudo_pos);
    alive
}

/// Shortest distance between two ordinal positions on a ring of size `n`.
pub fn circular_distance(p1: usize, p2: usize, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let diff = p1.abs_diff(p2);
    diff.min(n - diff)
}

fn type_matches(allowed: &[String], unit: &Unit) -> bool {
    allowed.iter().any(|t| t == &unit.unit_type.to_string())
}

/// Resolves the primary targets a player may pick for a command.
pub fn valid_primary_targets(
    state: &BattleState,
    actor_id: &str,
    command: &Command,
    log: &mut ExecutionLog,
) -> Vec<String> {
    let Some(actor) = state.unit(actor_id) else {
        log.push(format!("TARGETING_ERROR: actor {} not found.", actor_id));
        return Vec::new();
    };
    let Some(params) = &command.targeting_params else {
        log.push(format!(
            "TARGETING_ERROR: command {} has no targeting parameters.",
            command.command_id
        ));
        return Vec::new();
    };

    let selection = &params.selection;
    let shape = SelectionShape::parse(&selection.pattern.shape);

    // Revive targeting sits outside the ordinal system entirely.
    if shape == SelectionShape::AnyDefeatedAlly {
        let defeated: Vec<String> = state
            .units
            .iter()
            .filter(|u| u.unit_type == UnitType::Ally && u.status == UnitStatus::Defeated)
            .map(|u| u.id.clone())
            .collect();
        log.push(format!(
            "TARGETING [AnyDefeatedAlly]: found {} defeated allies.",
            defeated.len()
        ));
        return defeated;
    }

    let ordered = ordered_alive_units(state);
    if ordered.is_empty() {
        return Vec::new();
    }
    let num_alive = ordered.len();
    let actor_pos = actor.pseudo_pos;

    let mut target_ids: Vec<String> = Vec::new();
    log.push(format!(
        "TARGETING: actor {} (pos {}), command {}, shape {}",
        actor.name, actor_pos, command.name, selection.pattern.shape
    ));

    match shape {
        SelectionShape::Adjacent | SelectionShape::WithinDistance => {
            let max_distance = selection.pattern.distance.unwrap_or(1);
            for unit in &ordered {
                if unit.id == actor.id || !type_matches(&selection.targetable_types, unit) {
                    continue;
                }
                if circular_distance(actor_pos, unit.pseudo_pos, num_alive) <= max_distance {
                    target_ids.push(unit.id.clone());
                }
            }
        }
        SelectionShape::SpecificPosition => {
            let positions = selection
                .pattern
                .positions
                .clone()
                .unwrap_or_else(|| vec![selection.pattern.distance.unwrap_or(1)]);
            let direction = selection.pattern.direction.unwrap_or_default();

            for offset in positions {
                if matches!(direction, TargetDirection::Forward | TargetDirection::Both) {
                    let index = (actor_pos + offset) % num_alive;
                    push_unit_at(&ordered, index, actor, &selection.targetable_types, &mut target_ids);
                }
                if matches!(direction, TargetDirection::Backward | TargetDirection::Both) {
                    let index = (actor_pos + num_alive - (offset % num_alive)) % num_alive;
                    push_unit_at(&ordered, index, actor, &selection.targetable_types, &mut target_ids);
                }
            }
        }
        SelectionShape::SelfOnly => {
            let allows_self = selection
                .targetable_types
                .iter()
                .any(|t| t == "Self" || t == &actor.unit_type.to_string());
            if allows_self {
                target_ids.push(actor.id.clone());
            }
        }
        SelectionShape::AnyDefeatedAlly => unreachable!("handled above"),
        SelectionShape::Unknown => {
            log.push(format!(
                "TARGETING_WARN: unknown selection shape '{}'.",
                selection.pattern.shape
            ));
        }
    }

    dedupe(&mut target_ids);
    log.push(format!(
        "TARGETING: valid primary targets for {}: [{}]",
        command.name,
        target_ids.join(", ")
    ));
    target_ids
}

fn push_unit_at(
    ordered: &[&Unit],
    position: usize,
    actor: &Unit,
    allowed: &[String],
    out: &mut Vec<String>,
) {
    if let Some(unit) = ordered.iter().find(|u| u.pseudo_pos == position) {
        if unit.id != actor.id && type_matches(allowed, unit) {
            out.push(unit.id.clone());
        }
    }
}

/// Expands a chosen primary target into the full affected set via the
/// command's area rule. Commands without area parameters affect only the
/// primary target.
pub fn area_affected_targets(
    state: &BattleState,
    primary_target_id: &str,
    actor_id: &str,
    command: &Command,
    log: &mut ExecutionLog,
) -> Vec<String> {
    let Some(area) = command
        .targeting_params
        .as_ref()
        .and_then(|p| p.area.as_ref())
    else {
        if primary_target_id.is_empty() {
            return Vec::new();
        }
        return vec![primary_target_id.to_string()];
    };

    let ordered = ordered_alive_units(state);
    if ordered.is_empty() {
        return Vec::new();
    }
    let num_alive = ordered.len();

    let origin_id = match area.origin.unwrap_or_default() {
        AreaOrigin::Caster => actor_id,
        AreaOrigin::SelectedTarget => primary_target_id,
    };
    let Some(origin) = ordered.iter().find(|u| u.id == origin_id) else {
        log.push("TARGETING_AOE_ERROR: could not determine the area origin unit.".to_string());
        return Vec::new();
    };
    let origin_pos = origin.pseudo_pos;

    let mut affected: Vec<String> = Vec::new();
    match AreaShape::parse(&area.shape) {
        AreaShape::SingleOnSelected => {
            if let Some(primary) = ordered.iter().find(|u| u.id == primary_target_id) {
                if type_matches(&area.affected_types, primary) {
                    affected.push(primary.id.clone());
                }
            }
        }
        AreaShape::RadiusAroundOrigin => {
            let radius = area.distance.unwrap_or(0);
            for unit in &ordered {
                if circular_distance(origin_pos, unit.pseudo_pos, num_alive) <= radius
                    && type_matches(&area.affected_types, unit)
                {
                    affected.push(unit.id.clone());
                }
            }
        }
        AreaShape::Unknown => {
            // Degrade to the origin alone so the action does not silently
            // resolve to nothing.
            log.push(format!("TARGETING_AOE_WARN: unknown area shape '{}'.", area.shape));
            if type_matches(&area.affected_types, origin) {
                affected.push(origin.id.clone());
            }
        }
    }

    dedupe(&mut affected);
    log.push(format!("TARGETING_AOE: affected targets: [{}]", affected.join(", ")));
    affected
}

/// Living enemies at circular distance 1 from the actor, for skill effects
/// targeting `caster_adjacent_enemies`.
pub fn adjacent_enemies(state: &BattleState, actor_id: &str) -> Vec<String> {
    let ordered = ordered_alive_units(state);
    let num_alive = ordered.len();
    let Some(actor) = ordered.iter().find(|u| u.id == actor_id) else {
        return Vec::new();
    };
    let actor_pos = actor.pseudo_pos;

    ordered
        .iter()
        .filter(|u| {
            u.unit_type == UnitType::Enemy
                && circular_distance(actor_pos, u.pseudo_pos, num_alive) == 1
        })
        .map(|u| u.id.clone())
        .collect()
}

fn dedupe(ids: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use schema::{
        CommandType, SelectionParams, SelectionPattern, TargetingParams, UnitStats,
    };

    fn make_unit(id: &str, unit_type: UnitType, pos: usize) -> Unit {
        Unit {
            id: id.to_string(),
            name: id.to_string(),
            unit_type,
            tier: None,
            role: None,
            status: UnitStatus::Idle,
            pseudo_pos: pos,
            level: 1,
            exp_value: None,
            stats: UnitStats {
                hp: 50,
                max_hp: 50,
                atk: 10.0,
                ..Default::default()
            },
            commands: Vec::new(),
            status_effects: Default::default(),
        }
    }

    fn ring_state(types: &[UnitType]) -> BattleState {
        let units: Vec<Unit> = types
            .iter()
            .enumerate()
            .map(|(i, t)| make_unit(&format!("u{}", i), *t, i))
            .collect();
        BattleState {
            turn_order: units.iter().map(|u| u.id.clone()).collect(),
            units,
            ..Default::default()
        }
    }

    fn command_with_selection(shape: &str, distance: Option<usize>, types: Vec<&str>) -> Command {
        Command {
            command_id: "cmd".to_string(),
            name: "Test Command".to_string(),
            command_type: CommandType::Skill,
            sp_cost: 0,
            is_ultimate: false,
            gauge_cost: None,
            sfx_filename: None,
            effects: Vec::new(),
            applied_effects: Vec::new(),
            targeting_params: Some(TargetingParams {
                selection: SelectionParams {
                    pattern: SelectionPattern {
                        shape: shape.to_string(),
                        distance,
                        positions: None,
                        direction: None,
                    },
                    targetable_types: types.into_iter().map(String::from).collect(),
                },
                area: None,
            }),
        }
    }

    #[rstest]
    #[case(0, 1, 5, 1)]
    #[case(0, 4, 5, 1)] // wraps around the ring
    #[case(0, 2, 5, 2)]
    #[case(1, 4, 5, 2)]
    #[case(3, 3, 6, 0)]
    fn circular_distance_takes_the_short_way(
        #[case] p1: usize,
        #[case] p2: usize,
        #[case] n: usize,
        #[case] expected: usize,
    ) {
        assert_eq!(circular_distance(p1, p2, n), expected);
    }

    #[test]
    fn adjacent_selection_wraps_and_filters_by_type() {
        use UnitType::*;
        // Ring: ally(0), enemy(1), ally(2), enemy(3), enemy(4)
        let state = ring_state(&[Ally, Enemy, Ally, Enemy, Enemy]);
        let command = command_with_selection("Adjacent", None, vec!["Enemy"]);
        let mut log = ExecutionLog::new();

        let targets = valid_primary_targets(&state, "u0", &command, &mut log);
        // Neighbors of position 0 on a 5-ring are positions 1 and 4.
        assert_eq!(targets, vec!["u1".to_string(), "u4".to_string()]);
    }

    #[test]
    fn specific_position_respects_direction() {
        use UnitType::*;
        let state = ring_state(&[Ally, Enemy, Enemy, Enemy, Enemy]);
        let mut command = command_with_selection("SpecificPosition", Some(2), vec!["Enemy"]);
        if let Some(params) = &mut command.targeting_params {
            params.selection.pattern.direction = Some(TargetDirection::Forward);
        }
        let mut log = ExecutionLog::new();

        let targets = valid_primary_targets(&state, "u0", &command, &mut log);
        assert_eq!(targets, vec!["u2".to_string()]);

        if let Some(params) = &mut command.targeting_params {
            params.selection.pattern.direction = Some(TargetDirection::Both);
        }
        let targets = valid_primary_targets(&state, "u0", &command, &mut log);
        // Forward 2 lands on u2, backward 2 on u3.
        assert_eq!(targets, vec!["u2".to_string(), "u3".to_string()]);
    }

    #[test]
    fn self_selection_requires_matching_type() {
        use UnitType::*;
        let state = ring_state(&[Ally, Enemy]);
        let mut log = ExecutionLog::new();

        let command = command_with_selection("Self", None, vec!["Self"]);
        assert_eq!(
            valid_primary_targets(&state, "u0", &command, &mut log),
            vec!["u0".to_string()]
        );

        let command = command_with_selection("Self", None, vec!["Enemy"]);
        assert!(valid_primary_targets(&state, "u0", &command, &mut log).is_empty());
    }

    #[test]
    fn any_defeated_ally_ignores_positions() {
        use UnitType::*;
        let mut state = ring_state(&[Ally, Ally, Enemy]);
        state.units[1].status = UnitStatus::Defeated;
        state.units[1].stats.hp = 0;
        state.turn_order.retain(|id| id != "u1");
        let command = command_with_selection("AnyDefeatedAlly", None, vec!["Ally"]);
        let mut log = ExecutionLog::new();

        let targets = valid_primary_targets(&state, "u0", &command, &mut log);
        assert_eq!(targets, vec!["u1".to_string()]);
    }

    #[test]
    fn unknown_selection_shape_yields_no_targets() {
        use UnitType::*;
        let state = ring_state(&[Ally, Enemy]);
        let command = command_with_selection("Spiral", None, vec!["Enemy"]);
        let mut log = ExecutionLog::new();

        assert!(valid_primary_targets(&state, "u0", &command, &mut log).is_empty());
        assert!(log.as_text().contains("unknown selection shape"));
    }

    #[test]
    fn ordering_falls_back_to_pseudo_pos_without_turn_order() {
        use UnitType::*;
        let mut state = ring_state(&[Ally, Enemy, Enemy]);
        state.turn_order.clear();
        state.units[0].pseudo_pos = 2;
        state.units[2].pseudo_pos = 0;

        let ordered = ordered_alive_units(&state);
        let ids: Vec<&str> = ordered.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["u2", "u1", "u0"]);
    }

    #[test]
    fn area_radius_expands_around_selected_target() {
        use UnitType::*;
        let state = ring_state(&[Ally, Enemy, Enemy, Enemy, Ally]);
        let mut command = command_with_selection("Adjacent", None, vec!["Enemy"]);
        if let Some(params) = &mut command.targeting_params {
            params.area = Some(schema::AreaParams {
                shape: "RadiusAroundOrigin".to_string(),
                distance: Some(1),
                origin: None,
                affected_types: vec!["Enemy".to_string()],
            });
        }
        let mut log = ExecutionLog::new();

        let affected = area_affected_targets(&state, "u2", "u0", &command, &mut log);
        // Positions 1, 2, 3 are within distance 1 of position 2; all enemies.
        assert_eq!(
            affected,
            vec!["u1".to_string(), "u2".to_string(), "u3".to_string()]
        );
    }

    #[test]
    fn unknown_area_shape_degrades_to_origin_only() {
        use UnitType::*;
        let state = ring_state(&[Ally, Enemy, Enemy]);
        let mut command = command_with_selection("Adjacent", None, vec!["Enemy"]);
        if let Some(params) = &mut command.targeting_params {
            params.area = Some(schema::AreaParams {
                shape: "Cone".to_string(),
                distance: Some(2),
                origin: None,
                affected_types: vec!["Enemy".to_string()],
            });
        }
        let mut log = ExecutionLog::new();

        let affected = area_affected_targets(&state, "u1", "u0", &command, &mut log);
        assert_eq!(affected, vec!["u1".to_string()]);
        assert!(log.as_text().contains("unknown area shape"));
    }

    #[test]
    fn no_area_params_means_primary_only() {
        use UnitType::*;
        let state = ring_state(&[Ally, Enemy]);
        let command = command_with_selection("Adjacent", None, vec!["Enemy"]);
        let mut log = ExecutionLog::new();

        let affected = area_affected_targets(&state, "u1", "u0", &command, &mut log);
        assert_eq!(affected, vec!["u1".to_string()]);
    }

    #[test]
    fn adjacent_enemies_uses_ring_distance() {
        use UnitType::*;
        let state = ring_state(&[Ally, Enemy, Ally, Enemy]);
        // Neighbors of position 0 on a 4-ring: positions 1 and 3, both enemies.
        assert_eq!(
            adjacent_enemies(&state, "u0"),
            vec!["u1".to_string(), "u3".to_string()]
        );
    }
}
