use serde::{Deserialize, Serialize};
use strum::Display;

use crate::command_data::Command;

/// Affiliation of a unit. Serialized names are part of the wire contract.
#[derive(Serialize, Deserialize, Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitType {
    Ally,
    Enemy,
}

/// Per-turn life cycle of a unit: Idle -> Active -> EndTurn -> Idle (next
/// round), or Defeated at any point HP reaches zero.
#[derive(Serialize, Deserialize, Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Idle,
    Active,
    EndTurn,
    Defeated,
}

/// Difficulty tier for enemy units; drives stat growth per global level.
#[derive(Serialize, Deserialize, Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnemyTier {
    Minion,
    Elite,
    Boss,
}

/// Combat role; determines the reach of the enemy AI's basic attack.
#[derive(Serialize, Deserialize, Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitRole {
    Melee,
    Ranged,
}

/// Overall battle outcome tag. Terminal once Win/Lose/Error.
#[derive(Serialize, Deserialize, Display, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BattleStateTag {
    #[default]
    Ongoing,
    Win,
    Lose,
    Error,
}

impl BattleStateTag {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BattleStateTag::Ongoing)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct UnitStats {
    #[serde(default)]
    pub hp: i64,
    #[serde(rename = "maxHp", default)]
    pub max_hp: i64,
    #[serde(default)]
    pub atk: f64,
    #[serde(default)]
    pub def: f64,
    #[serde(rename = "shieldHP", default)]
    pub shield_hp: i64,
    #[serde(default)]
    pub gauge: i64,
    #[serde(rename = "maxGauge", default)]
    pub max_gauge: i64,
}

/// A buff or debuff attached directly to a unit, as shown in the UI.
/// Distinct from the queued `StatusEffectInstance`s in `active_effects`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UnitStatusEffect {
    pub name: String,
    pub duration: i64,
    #[serde(rename = "sourceUnitId", default, skip_serializing_if = "Option::is_none")]
    pub source_unit_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StatusEffectLists {
    #[serde(default)]
    pub buffs: Vec<UnitStatusEffect>,
    #[serde(default)]
    pub debuffs: Vec<UnitStatusEffect>,
}

fn default_level() -> u32 {
    1
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Unit {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub unit_type: UnitType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<EnemyTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UnitRole>,
    pub status: UnitStatus,
    #[serde(rename = "pseudoPos", default)]
    pub pseudo_pos: usize,
    #[serde(default = "default_level")]
    pub level: u32,
    /// Base experience awarded when this unit is defeated (enemies only).
    #[serde(rename = "expValue", default, skip_serializing_if = "Option::is_none")]
    pub exp_value: Option<f64>,
    #[serde(default)]
    pub stats: UnitStats,
    #[serde(default)]
    pub commands: Vec<Command>,
    #[serde(rename = "statusEffects", default)]
    pub status_effects: StatusEffectLists,
}

impl Unit {
    pub fn is_defeated(&self) -> bool {
        self.status == UnitStatus::Defeated
    }

    pub fn is_alive(&self) -> bool {
        !self.is_defeated()
    }

    /// HP as a fraction of max HP; a unit with no max HP counts as full.
    pub fn hp_fraction(&self) -> f64 {
        if self.stats.max_hp > 0 {
            self.stats.hp as f64 / self.stats.max_hp as f64
        } else {
            1.0
        }
    }

    pub fn has_debuff(&self, name: &str) -> bool {
        self.status_effects.debuffs.iter().any(|e| e.name == name)
    }
}

/// Trigger point in the turn cycle for a queued status effect.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerPhase {
    #[serde(rename = "start_of_turn")]
    StartOfTurn,
    #[serde(rename = "end_of_turn")]
    EndOfTurn,
}

/// Interpreted effect kinds. The wire carries a free-form tag; unknown tags
/// are preserved verbatim and skipped at processing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEffectKind {
    Poison,
    DamageOverTime,
    Stun,
    Unknown,
}

impl StatusEffectKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "poison" => StatusEffectKind::Poison,
            "damage_over_time" => StatusEffectKind::DamageOverTime,
            "stun" => StatusEffectKind::Stun,
            _ => StatusEffectKind::Unknown,
        }
    }
}

/// A queued status effect, either as a template inside a command's
/// `applied_effects` (carrying `chance`) or as a live instance inside the
/// battle document's `active_effects` (chance stripped, source stamped).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StatusEffectInstance {
    #[serde(rename = "effect_id", default, skip_serializing_if = "Option::is_none")]
    pub effect_id: Option<String>,
    #[serde(rename = "type", default)]
    pub effect_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "trigger_phase", default, skip_serializing_if = "Option::is_none")]
    pub trigger_phase: Option<TriggerPhase>,
    /// `"individual"` templates get a `target_id` stamped per affected unit.
    #[serde(rename = "target_type", default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    #[serde(rename = "target_id", default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<f64>,
    #[serde(rename = "source_skill_name", default, skip_serializing_if = "Option::is_none")]
    pub source_skill_name: Option<String>,
    #[serde(rename = "source_actor_id", default, skip_serializing_if = "Option::is_none")]
    pub source_actor_id: Option<String>,
    #[serde(rename = "sourceUnitId", default, skip_serializing_if = "Option::is_none")]
    pub source_unit_id: Option<String>,
}

impl StatusEffectInstance {
    pub fn kind(&self) -> StatusEffectKind {
        StatusEffectKind::from_tag(&self.effect_type)
    }
}

/// One entry per defeated enemy, fed to the progression engine at battle end.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DefeatedEnemy {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<EnemyTier>,
    #[serde(rename = "expValue")]
    pub exp_value: f64,
}

/// A single pop-up entry the presentation layer animates.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EffectPopup {
    #[serde(rename = "type")]
    pub popup_type: String,
    #[serde(rename = "unitId", default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
}

/// Transient summary of the most recent action, consumed by the presentation
/// layer. Cleared when the turn advances unless re-populated.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LastActionDetails {
    #[serde(rename = "actorId", default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    #[serde(rename = "commandId", default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    #[serde(rename = "commandName", default, skip_serializing_if = "Option::is_none")]
    pub command_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<String>>,
    #[serde(rename = "effectsSummary", default, skip_serializing_if = "Option::is_none")]
    pub effects_summary: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<Vec<EffectPopup>>,
    #[serde(rename = "actionOutcome", default, skip_serializing_if = "Option::is_none")]
    pub action_outcome: Option<String>,
}

/// The root battle document. Every resolution call deserializes one of
/// these, mutates an owned copy, and serializes it back; no state lives
/// outside the document.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct BattleState {
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(rename = "_turnOrder", default)]
    pub turn_order: Vec<String>,
    #[serde(rename = "activeUnitID", default)]
    pub active_unit_id: Option<String>,
    #[serde(rename = "activeUnitType", default, skip_serializing_if = "Option::is_none")]
    pub active_unit_type: Option<UnitType>,
    #[serde(default)]
    pub round: u32,
    #[serde(rename = "turnInRound", default)]
    pub turn_in_round: u32,
    #[serde(rename = "teamSP", default)]
    pub team_sp: i64,
    #[serde(rename = "maxTeamSP", default)]
    pub max_team_sp: i64,
    #[serde(rename = "active_effects", default)]
    pub active_effects: Vec<StatusEffectInstance>,
    #[serde(rename = "battleState", default)]
    pub battle_state: BattleStateTag,
    #[serde(rename = "battleMessage", default)]
    pub battle_message: String,
    #[serde(rename = "lastActionDetails", default)]
    pub last_action_details: Option<LastActionDetails>,
    #[serde(
        rename = "_defeatedEnemiesThisBattle",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub defeated_enemies_this_battle: Option<Vec<DefeatedEnemy>>,
    #[serde(
        rename = "_actorShouldActAgain",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub actor_should_act_again: Option<String>,
    #[serde(
        rename = "_turnOrderModifiedBySkill",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub turn_order_modified_by_skill: Option<bool>,
    #[serde(rename = "progression_snapshot", default, skip_serializing_if = "Option::is_none")]
    pub progression_snapshot: Option<crate::progression_data::ProgressionData>,
    #[serde(rename = "battleResultSummary", default, skip_serializing_if = "Option::is_none")]
    pub battle_result_summary: Option<crate::progression_data::BattleResultSummary>,
}

impl BattleState {
    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn unit_mut(&mut self, id: &str) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    pub fn unit_index(&self, id: &str) -> Option<usize> {
        self.units.iter().position(|u| u.id == id)
    }

    pub fn living_units_of_type(&self, unit_type: UnitType) -> impl Iterator<Item = &Unit> {
        self.units
            .iter()
            .filter(move |u| u.unit_type == unit_type && u.is_alive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_wire_names_round_trip() {
        assert_eq!(serde_json::to_string(&UnitStatus::EndTurn).unwrap(), "\"EndTurn\"");
        assert_eq!(serde_json::to_string(&BattleStateTag::Win).unwrap(), "\"Win\"");
        assert_eq!(
            serde_json::to_string(&TriggerPhase::EndOfTurn).unwrap(),
            "\"end_of_turn\""
        );
        let tag: BattleStateTag = serde_json::from_str("\"Lose\"").unwrap();
        assert_eq!(tag, BattleStateTag::Lose);
    }

    #[test]
    fn battle_state_uses_wire_field_names() {
        let state = BattleState {
            turn_order: vec!["u1".into()],
            active_unit_id: Some("u1".into()),
            team_sp: 3,
            max_team_sp: 10,
            ..Default::default()
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"_turnOrder\""));
        assert!(json.contains("\"activeUnitID\""));
        assert!(json.contains("\"teamSP\""));
        assert!(json.contains("\"battleState\":\"Ongoing\""));
        assert!(!json.contains("\"_defeatedEnemiesThisBattle\""));
    }

    #[test]
    fn status_effect_kind_parses_known_tags() {
        assert_eq!(StatusEffectKind::from_tag("poison"), StatusEffectKind::Poison);
        assert_eq!(
            StatusEffectKind::from_tag("damage_over_time"),
            StatusEffectKind::DamageOverTime
        );
        assert_eq!(StatusEffectKind::from_tag("frenzy"), StatusEffectKind::Unknown);
    }
}
