//! Damage, heal, shield, and revive arithmetic.
//!
//! These are pure functions over a single unit: no logging, no elimination
//! tracking, no knowledge of the rest of the document. Callers own those
//! concerns.

use schema::{Unit, UnitStatus};

/// Breakdown of a single damage application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DamageOutcome {
    pub total_damage: i64,
    pub shield_damage: i64,
    pub hp_damage: i64,
    /// True when this application reduced the unit's HP to zero.
    pub eliminated: bool,
}

/// Applies damage, shield first, then HP. Raw amounts are rounded to the
/// nearest integer before application; HP and shield never go negative.
pub fn apply_damage(unit: &mut Unit, amount: f64) -> DamageOutcome {
    let mut remaining = amount.round() as i64;
    if remaining < 0 {
        remaining = 0;
    }

    let mut outcome = DamageOutcome::default();

    if unit.stats.shield_hp > 0 {
        outcome.shield_damage = unit.stats.shield_hp.min(remaining);
        unit.stats.shield_hp -= outcome.shield_damage;
        remaining -= outcome.shield_damage;
    }

    if remaining > 0 {
        outcome.hp_damage = unit.stats.hp.min(remaining);
        unit.stats.hp -= outcome.hp_damage;
    }

    if unit.stats.hp <= 0 {
        unit.stats.hp = 0;
        unit.status = UnitStatus::Defeated;
        outcome.eliminated = true;
    }

    outcome.total_damage = outcome.shield_damage + outcome.hp_damage;
    outcome
}

/// Heals up to max HP. Defeated units are untouched. Returns the HP actually
/// restored.
pub fn apply_heal(unit: &mut Unit, amount: f64) -> i64 {
    if unit.is_defeated() {
        return 0;
    }
    let amount = amount.round() as i64;
    let old_hp = unit.stats.hp;
    unit.stats.hp = (unit.stats.hp + amount.max(0)).min(unit.stats.max_hp);
    unit.stats.hp - old_hp
}

/// Adds shield HP; additive and uncapped. Defeated units are untouched.
/// Returns the shield actually granted.
pub fn apply_shield(unit: &mut Unit, amount: f64) -> i64 {
    if unit.is_defeated() {
        return 0;
    }
    let amount = (amount.round() as i64).max(0);
    unit.stats.shield_hp += amount;
    amount
}

/// Brings a Defeated unit back at a fraction of max HP (at least 1), with no
/// shield and no lingering status effects. Returns false if the unit was not
/// Defeated; only Defeated units can be revived.
pub fn apply_revive(unit: &mut Unit, hp_fraction: f64) -> bool {
    if !unit.is_defeated() {
        return false;
    }
    unit.status = UnitStatus::Idle;
    unit.stats.hp = ((unit.stats.max_hp as f64 * hp_fraction).round() as i64).max(1);
    unit.stats.shield_hp = 0;
    unit.status_effects.buffs.clear();
    unit.status_effects.debuffs.clear();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use schema::{UnitStats, UnitStatusEffect, UnitType};

    fn unit_with(hp: i64, max_hp: i64, shield: i64) -> Unit {
        Unit {
            id: "u1".to_string(),
            name: "Test Unit".to_string(),
            unit_type: UnitType::Ally,
            tier: None,
            role: None,
            status: UnitStatus::Idle,
            pseudo_pos: 0,
            level: 1,
            exp_value: None,
            stats: UnitStats {
                hp,
                max_hp,
                atk: 10.0,
                def: 0.0,
                shield_hp: shield,
                gauge: 0,
                max_gauge: 100,
            },
            commands: Vec::new(),
            status_effects: Default::default(),
        }
    }

    #[test]
    fn damage_is_absorbed_by_shield_first() {
        let mut unit = unit_with(30, 30, 5);
        let outcome = apply_damage(&mut unit, 20.0);

        assert_eq!(outcome.shield_damage, 5);
        assert_eq!(outcome.hp_damage, 15);
        assert_eq!(outcome.total_damage, 20);
        assert!(!outcome.eliminated);
        assert_eq!(unit.stats.hp, 15);
        assert_eq!(unit.stats.shield_hp, 0);
        assert_eq!(unit.status, UnitStatus::Idle);
    }

    #[test]
    fn lethal_damage_defeats_the_unit() {
        let mut unit = unit_with(10, 10, 0);
        let outcome = apply_damage(&mut unit, 10.0);

        assert_eq!(unit.stats.hp, 0);
        assert_eq!(unit.status, UnitStatus::Defeated);
        assert!(outcome.eliminated);
    }

    #[test]
    fn overkill_damage_never_goes_negative() {
        let mut unit = unit_with(8, 10, 3);
        let outcome = apply_damage(&mut unit, 100.0);

        assert_eq!(outcome.shield_damage, 3);
        assert_eq!(outcome.hp_damage, 8);
        assert_eq!(outcome.total_damage, 11);
        assert_eq!(unit.stats.hp, 0);
        assert_eq!(unit.stats.shield_hp, 0);
    }

    #[test]
    fn fractional_damage_rounds_before_application() {
        let mut unit = unit_with(30, 30, 0);
        let outcome = apply_damage(&mut unit, 10.4);
        assert_eq!(outcome.hp_damage, 10);

        let outcome = apply_damage(&mut unit, 10.5);
        assert_eq!(outcome.hp_damage, 11);
    }

    #[test]
    fn heal_caps_at_max_hp_and_reports_actual() {
        let mut unit = unit_with(25, 30, 0);
        assert_eq!(apply_heal(&mut unit, 20.0), 5);
        assert_eq!(unit.stats.hp, 30);
    }

    #[test]
    fn heal_and_shield_skip_defeated_units() {
        let mut unit = unit_with(0, 30, 0);
        unit.status = UnitStatus::Defeated;

        assert_eq!(apply_heal(&mut unit, 20.0), 0);
        assert_eq!(apply_shield(&mut unit, 20.0), 0);
        assert_eq!(unit.stats.hp, 0);
        assert_eq!(unit.stats.shield_hp, 0);
    }

    #[test]
    fn shield_is_additive_and_uncapped() {
        let mut unit = unit_with(30, 30, 40);
        assert_eq!(apply_shield(&mut unit, 25.0), 25);
        assert_eq!(unit.stats.shield_hp, 65);
    }

    #[test]
    fn revive_requires_defeated_status() {
        let mut unit = unit_with(30, 100, 0);
        assert!(!apply_revive(&mut unit, 0.5));
        assert_eq!(unit.stats.hp, 30);

        unit.status = UnitStatus::Defeated;
        unit.stats.hp = 0;
        unit.stats.shield_hp = 12;
        unit.status_effects.debuffs.push(UnitStatusEffect {
            name: "Poison".to_string(),
            duration: 2,
            source_unit_id: None,
        });

        assert!(apply_revive(&mut unit, 0.5));
        assert_eq!(unit.status, UnitStatus::Idle);
        assert_eq!(unit.stats.hp, 50);
        assert_eq!(unit.stats.shield_hp, 0);
        assert!(unit.status_effects.debuffs.is_empty());
    }

    #[test]
    fn revive_floors_at_one_hp() {
        let mut unit = unit_with(0, 1, 0);
        unit.status = UnitStatus::Defeated;
        assert!(apply_revive(&mut unit, 0.1));
        assert_eq!(unit.stats.hp, 1);
    }
}
