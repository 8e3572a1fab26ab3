use serde::{Deserialize, Serialize};

use crate::battle_data::StatusEffectInstance;

/// Family of a command. Basic attacks are resolved by a dedicated pipeline;
/// everything else runs through the skill-effect pipeline.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    BasicAttack,
    Skill,
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_targetable_types() -> Vec<String> {
    vec!["Enemy".to_string()]
}

/// Where a skill effect draws its targets from. Unknown values are skipped
/// with a warning at resolution time.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectTarget {
    #[serde(rename = "caster")]
    Caster,
    #[serde(rename = "selected")]
    Selected,
    #[serde(rename = "area")]
    Area,
    #[serde(rename = "caster_adjacent_enemies")]
    CasterAdjacentEnemies,
}

/// One step of a skill's effect pipeline. The `type` tag on the wire selects
/// the variant; dispatch over this enum is exhaustive so a new effect family
/// cannot be silently ignored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum EffectSpec {
    #[serde(rename = "damage")]
    Damage {
        #[serde(default = "default_multiplier")]
        multiplier: f64,
        target: EffectTarget,
    },
    #[serde(rename = "damage_aoe_adjacent")]
    DamageAoeAdjacent {
        #[serde(default = "default_multiplier")]
        multiplier: f64,
        target: EffectTarget,
    },
    #[serde(rename = "heal")]
    Heal {
        #[serde(default = "default_multiplier")]
        multiplier: f64,
        target: EffectTarget,
        /// `"caster_atk"` scales against the caster's attack; absent scales
        /// against the target's max HP.
        #[serde(rename = "basedOn", default, skip_serializing_if = "Option::is_none")]
        based_on: Option<String>,
    },
    #[serde(rename = "shield")]
    Shield {
        #[serde(default = "default_multiplier")]
        multiplier: f64,
        target: EffectTarget,
        /// `"caster_atk"` scales against the caster's attack; absent yields
        /// a zero base, so data must opt in explicitly.
        #[serde(rename = "basedOn", default, skip_serializing_if = "Option::is_none")]
        based_on: Option<String>,
    },
    #[serde(rename = "revive")]
    Revive {
        #[serde(rename = "hpPercentage", default, skip_serializing_if = "Option::is_none")]
        hp_percentage: Option<f64>,
        target: EffectTarget,
    },
    #[serde(rename = "status")]
    Status {
        #[serde(rename = "statusName")]
        status_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chance: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<i64>,
        #[serde(rename = "effectDetails", default, skip_serializing_if = "Option::is_none")]
        effect_details: Option<EffectDetails>,
        target: EffectTarget,
    },
    #[serde(rename = "act_again")]
    ActAgain {},
    #[serde(rename = "heal_lowest_hp_ally")]
    HealLowestHpAlly {
        #[serde(default = "default_multiplier")]
        multiplier: f64,
        #[serde(rename = "basedOn", default, skip_serializing_if = "Option::is_none")]
        based_on: Option<String>,
    },
}

/// Extra payload merged into the queued instance when a `status` effect
/// lands (periodic damage, trigger phase).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct EffectDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<f64>,
    #[serde(rename = "trigger_phase", default, skip_serializing_if = "Option::is_none")]
    pub trigger_phase: Option<crate::battle_data::TriggerPhase>,
}

/// Parsed form of a selection `shape` string. The wire keeps the raw string
/// so an unrecognized shape survives a round trip; resolution degrades it to
/// an empty target set with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionShape {
    Adjacent,
    WithinDistance,
    SpecificPosition,
    SelfOnly,
    AnyDefeatedAlly,
    Unknown,
}

impl SelectionShape {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "Adjacent" => SelectionShape::Adjacent,
            "WithinDistance" => SelectionShape::WithinDistance,
            "SpecificPosition" | "SpecificPositions" => SelectionShape::SpecificPosition,
            "Self" => SelectionShape::SelfOnly,
            "AnyDefeatedAlly" => SelectionShape::AnyDefeatedAlly,
            _ => SelectionShape::Unknown,
        }
    }
}

/// Parsed form of an area `shape` string; unknown shapes degrade to
/// origin-only rather than resolving to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaShape {
    SingleOnSelected,
    RadiusAroundOrigin,
    Unknown,
}

impl AreaShape {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "SingleOnSelected" => AreaShape::SingleOnSelected,
            "RadiusAroundOrigin" => AreaShape::RadiusAroundOrigin,
            _ => AreaShape::Unknown,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetDirection {
    Forward,
    Backward,
    #[default]
    Both,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AreaOrigin {
    Caster,
    #[default]
    SelectedTarget,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SelectionPattern {
    pub shape: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positions: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<TargetDirection>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SelectionParams {
    pub pattern: SelectionPattern,
    /// Unit types eligible as primary targets; the literal `"Self"` is also
    /// accepted for self-targeting skills.
    #[serde(rename = "targetableTypes", default = "default_targetable_types")]
    pub targetable_types: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AreaParams {
    pub shape: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<AreaOrigin>,
    #[serde(rename = "affectedTypes", default = "default_targetable_types")]
    pub affected_types: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TargetingParams {
    pub selection: SelectionParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<AreaParams>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Command {
    #[serde(rename = "commandId")]
    pub command_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub command_type: CommandType,
    #[serde(rename = "spCost", default)]
    pub sp_cost: i64,
    #[serde(rename = "isUltimate", default)]
    pub is_ultimate: bool,
    #[serde(rename = "gaugeCost", default, skip_serializing_if = "Option::is_none")]
    pub gauge_cost: Option<i64>,
    #[serde(rename = "sfxFilename", default, skip_serializing_if = "Option::is_none")]
    pub sfx_filename: Option<String>,
    #[serde(default)]
    pub effects: Vec<EffectSpec>,
    #[serde(rename = "applied_effects", default)]
    pub applied_effects: Vec<StatusEffectInstance>,
    #[serde(rename = "targetingParams", default, skip_serializing_if = "Option::is_none")]
    pub targeting_params: Option<TargetingParams>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_spec_dispatches_on_type_tag() {
        let json = r#"{"type": "damage", "multiplier": 1.5, "target": "selected"}"#;
        let effect: EffectSpec = serde_json::from_str(json).unwrap();
        assert_eq!(
            effect,
            EffectSpec::Damage {
                multiplier: 1.5,
                target: EffectTarget::Selected
            }
        );
    }

    #[test]
    fn effect_spec_defaults_multiplier_to_one() {
        let json = r#"{"type": "heal", "target": "caster"}"#;
        let effect: EffectSpec = serde_json::from_str(json).unwrap();
        match effect {
            EffectSpec::Heal { multiplier, based_on, .. } => {
                assert_eq!(multiplier, 1.0);
                assert!(based_on.is_none());
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn selection_shape_accepts_both_spellings() {
        assert_eq!(SelectionShape::parse("SpecificPosition"), SelectionShape::SpecificPosition);
        assert_eq!(SelectionShape::parse("SpecificPositions"), SelectionShape::SpecificPosition);
        assert_eq!(SelectionShape::parse("Self"), SelectionShape::SelfOnly);
        assert_eq!(SelectionShape::parse("Swirl"), SelectionShape::Unknown);
    }

    #[test]
    fn command_parses_with_defaults() {
        let json = r#"{
            "commandId": "cmd_strike",
            "name": "Strike",
            "type": "Skill",
            "spCost": 2,
            "effects": [{"type": "act_again"}]
        }"#;
        let command: Command = serde_json::from_str(json).unwrap();
        assert_eq!(command.sp_cost, 2);
        assert!(!command.is_ultimate);
        assert!(command.targeting_params.is_none());
        assert_eq!(command.effects, vec![EffectSpec::ActAgain {}]);
    }
}
