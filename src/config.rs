//! Engine configuration: every fixed probability table, growth rate, and
//! item definition lives here as declarative data rather than inline
//! branches, so tests can swap in deterministic variants.

use crate::battle::rng::BattleRng;
use schema::EnemyTier;

/// Discrete weighted-choice table. Weights are relative; they do not need to
/// sum to any particular total.
#[derive(Debug, Clone)]
pub struct WeightedTable<T> {
    entries: Vec<(T, u32)>,
}

impl<T> WeightedTable<T> {
    pub fn new(entries: Vec<(T, u32)>) -> Self {
        Self { entries }
    }

    pub fn total_weight(&self) -> u64 {
        self.entries.iter().map(|(_, w)| *w as u64).sum()
    }

    pub fn choose(&self, rng: &mut BattleRng) -> Option<&T> {
        let total = self.total_weight();
        if total == 0 {
            return None;
        }
        let mut roll = rng.below(total);
        for (value, weight) in &self.entries {
            if roll < *weight as u64 {
                return Some(value);
            }
            roll -= *weight as u64;
        }
        None
    }
}

/// Per-level stat growth applied at battle setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatGrowth {
    pub hp: i64,
    pub atk: f64,
}

/// What a consumable does when used. Magnitudes are small fixed sets, picked
/// uniformly, never continuous rolls.
#[derive(Debug, Clone)]
pub enum ItemKind {
    /// Heal + shield the active unit for a fraction of its max HP.
    SelfHealShield { fractions: Vec<f64> },
    /// Heal + shield living allies within a circular radius of the caster;
    /// the fraction is re-rolled per target.
    RadiusHealShield { radius: usize, fractions: Vec<f64> },
    /// Grant the team SP, clamped to the maximum.
    TeamSpGain { amounts: Vec<i64> },
    /// Heal + shield every living ally; one fraction rolled for the party.
    PartyHealShield { fractions: Vec<f64> },
}

#[derive(Debug, Clone)]
pub struct ItemDefinition {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// SP awarded per basic attack: five tiers, 1 SP most common, 5 rarest.
    pub sp_gain_table: WeightedTable<i64>,
    /// Ultimate gauge gained per basic attack, clamped to the unit's max.
    pub basic_attack_gauge_gain: i64,
    /// Gauge cost assumed for ultimates that do not declare one.
    pub default_ultimate_gauge_cost: i64,
    /// Turn-order slot a revived unit is spliced into.
    pub revive_insert_index: usize,
    pub items: Vec<ItemDefinition>,
    pub ally_growth: StatGrowth,
    pub minion_growth: StatGrowth,
    pub elite_growth: StatGrowth,
    pub boss_growth: StatGrowth,
    /// Hero unit that receives exercise-stat bonuses at setup, if any.
    pub exercise_stat_hero: Option<String>,
}

impl EngineConfig {
    pub fn growth_for_tier(&self, tier: Option<EnemyTier>) -> StatGrowth {
        match tier {
            Some(EnemyTier::Minion) | None => self.minion_growth,
            Some(EnemyTier::Elite) => self.elite_growth,
            Some(EnemyTier::Boss) => self.boss_growth,
        }
    }

    pub fn item(&self, item_id: &str) -> Option<&ItemDefinition> {
        self.items.iter().find(|item| item.id == item_id)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sp_gain_table: WeightedTable::new(vec![
                (1, 3818),
                (2, 2728),
                (3, 1636),
                (4, 1272),
                (5, 546),
            ]),
            basic_attack_gauge_gain: 15,
            default_ultimate_gauge_cost: 100,
            revive_insert_index: 1,
            items: vec![
                ItemDefinition {
                    id: "soothing_berry".to_string(),
                    name: "Soothing Berry".to_string(),
                    kind: ItemKind::SelfHealShield {
                        fractions: vec![0.10, 0.20],
                    },
                },
                ItemDefinition {
                    id: "restorative_broth".to_string(),
                    name: "Restorative Broth".to_string(),
                    kind: ItemKind::RadiusHealShield {
                        radius: 2,
                        fractions: vec![0.30, 0.50],
                    },
                },
                ItemDefinition {
                    id: "willpower_candy".to_string(),
                    name: "Willpower Candy".to_string(),
                    kind: ItemKind::TeamSpGain { amounts: vec![1, 2] },
                },
                ItemDefinition {
                    id: "world_tree_fruit".to_string(),
                    name: "World Tree Fruit".to_string(),
                    kind: ItemKind::PartyHealShield {
                        fractions: vec![0.60, 0.90],
                    },
                },
            ],
            ally_growth: StatGrowth { hp: 4, atk: 1.0 },
            minion_growth: StatGrowth { hp: 2, atk: 1.0 },
            elite_growth: StatGrowth { hp: 4, atk: 2.0 },
            boss_growth: StatGrowth { hp: 6, atk: 3.0 },
            exercise_stat_hero: None,
        }
    }
}
