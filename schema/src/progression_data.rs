use serde::{Deserialize, Serialize};

/// Which base stat an exercise record feeds at battle setup.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatBoost {
    #[serde(rename = "ATK")]
    Atk,
    #[serde(rename = "HP")]
    Hp,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HeroRecord {
    pub id: String,
    pub level: u32,
    pub exp: i64,
}

/// Shared difficulty level applied to all enemies, with its own exp pool.
/// The pool can move in both directions; the level never drops below 1.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EnemyProgression {
    #[serde(rename = "globalLevel")]
    pub global_level: u32,
    pub exp: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExerciseRecord {
    pub id: String,
    pub level: u32,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatBoost>,
}

/// The externally owned progression document; round-tripped by battle setup
/// and finalization, patched in place.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProgressionData {
    #[serde(default)]
    pub heroes: Vec<HeroRecord>,
    #[serde(rename = "enemyProgression")]
    pub enemy_progression: EnemyProgression,
    #[serde(rename = "exerciseStatsProgression", default)]
    pub exercise_stats_progression: Vec<ExerciseRecord>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DefeatedEnemyExp {
    pub id: String,
    pub name: String,
    #[serde(rename = "expGained")]
    pub exp_gained: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RewardItem {
    pub name: String,
    #[serde(rename = "imageFilename")]
    pub image_filename: String,
    pub quantity: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HeroProgressionSummary {
    pub id: String,
    #[serde(rename = "levelBefore")]
    pub level_before: u32,
    #[serde(rename = "expBefore")]
    pub exp_before: i64,
    #[serde(rename = "expToLevelUpBefore")]
    pub exp_to_level_up_before: i64,
    #[serde(rename = "levelAfter")]
    pub level_after: u32,
    #[serde(rename = "expAfter")]
    pub exp_after: i64,
    #[serde(rename = "expToLevelUpAfter")]
    pub exp_to_level_up_after: i64,
}

/// Injected into the battle document when results are finalized; everything
/// the results screen needs in one object.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BattleResultSummary {
    #[serde(rename = "totalExpGained")]
    pub total_exp_gained: i64,
    #[serde(rename = "baseExpGained")]
    pub base_exp_gained: i64,
    #[serde(rename = "winBonusMultiplier")]
    pub win_bonus_multiplier: f64,
    #[serde(rename = "defeatedEnemiesWithExp", default)]
    pub defeated_enemies_with_exp: Vec<DefeatedEnemyExp>,
    #[serde(default)]
    pub rewards: Vec<RewardItem>,
    #[serde(rename = "heroesProgression", default)]
    pub heroes_progression: Vec<HeroProgressionSummary>,
    #[serde(rename = "enemyLeveledUp")]
    pub enemy_leveled_up: bool,
    #[serde(rename = "enemyLevelBefore")]
    pub enemy_level_before: u32,
    #[serde(rename = "enemyLevelAfter")]
    pub enemy_level_after: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progression_data_round_trips_wire_names() {
        let json = r#"{
            "heroes": [{"id": "hero_ash", "level": 2, "exp": 150}],
            "enemyProgression": {"globalLevel": 3, "exp": 10},
            "exerciseStatsProgression": [
                {"id": "push_up", "level": 4, "exp": 5, "stats": "ATK"}
            ]
        }"#;
        let data: ProgressionData = serde_json::from_str(json).unwrap();
        assert_eq!(data.heroes[0].level, 2);
        assert_eq!(data.enemy_progression.global_level, 3);
        assert_eq!(data.exercise_stats_progression[0].stats, Some(StatBoost::Atk));

        let out = serde_json::to_string(&data).unwrap();
        assert!(out.contains("\"enemyProgression\""));
        assert!(out.contains("\"globalLevel\""));
        assert!(out.contains("\"stats\":\"ATK\""));
    }
}
