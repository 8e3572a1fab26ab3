//! Post-battle progression: experience curves, hero and enemy leveling, and
//! the exercise-stat side system.
//!
//! All three families share the same triangular cost curve shape and the
//! same while-loop leveling pattern, so a single grant can produce several
//! level-ups and always leaves `exp < exp_for_level(level)`.

use crate::battle::log::ExecutionLog;
use crate::errors::{EngineResult, ProgressionError};
use schema::{
    BattleResultSummary, BattleState, BattleStateTag, DefeatedEnemyExp, HeroProgressionSummary,
    ProgressionData, RewardItem,
};

const WIN_BONUS_MULTIPLIER: f64 = 1.25;
const ENEMY_EXP_LEVEL_SCALAR: f64 = 1.25;
const ENEMY_EXP_ON_WIN: i64 = 25;
const ENEMY_EXP_ON_LOSS: i64 = -50;

fn triangular(level: u32) -> i64 {
    let level = level as i64;
    level * (level + 1) / 2
}

/// Experience a hero needs to advance past the given level.
pub fn exp_for_hero_level(level: u32) -> i64 {
    100 * triangular(level)
}

/// Experience an exercise stat needs to advance past the given level.
pub fn exp_for_exercise_level(level: u32) -> i64 {
    10 * triangular(level)
}

/// Experience the enemy pool needs to raise the global level.
pub fn exp_for_enemy_level(level: u32) -> i64 {
    25 * level as i64
}

/// Computes battle rewards, levels every hero, and moves the shared enemy
/// level. Patches the progression document in place and injects the result
/// summary into the battle document, consuming the defeated-enemy
/// accumulator.
pub fn finalize_battle_results(
    state: &mut BattleState,
    progression: &mut ProgressionData,
    log: &mut ExecutionLog,
) {
    log.push("BATTLE_RESULTS: finalization started.".to_string());

    let is_win = state.battle_state == BattleStateTag::Win;
    let defeated = state.defeated_enemies_this_battle.clone().unwrap_or_default();
    let enemy_global_level = progression.enemy_progression.global_level;

    let mut defeated_with_exp: Vec<DefeatedEnemyExp> = Vec::new();
    let mut base_exp_gained: i64 = 0;
    for enemy in &defeated {
        let exp_from_enemy =
            (enemy_global_level as f64 * ENEMY_EXP_LEVEL_SCALAR * enemy.exp_value).round() as i64;
        base_exp_gained += exp_from_enemy;

        let name = state
            .unit(&enemy.id)
            .map(|u| u.name.clone())
            .unwrap_or_else(|| match enemy.tier {
                Some(tier) => format!("Enemy ({})", tier),
                None => "Enemy (N/A)".to_string(),
            });
        defeated_with_exp.push(DefeatedEnemyExp {
            id: enemy.id.clone(),
            name,
            exp_gained: exp_from_enemy,
        });
    }

    let win_bonus_multiplier = if is_win { WIN_BONUS_MULTIPLIER } else { 1.0 };
    let total_exp_gained = (base_exp_gained as f64 * win_bonus_multiplier).round() as i64;
    log.push(format!(
        "BATTLE_RESULTS: base exp {}, total exp {} (win: {}).",
        base_exp_gained, total_exp_gained, is_win
    ));

    let mut rewards = Vec::new();
    if is_win {
        rewards.push(RewardItem {
            name: "Mint Candy".to_string(),
            image_filename: "items/candy.png".to_string(),
            quantity: 1,
        });
    }

    let mut heroes_progression: Vec<HeroProgressionSummary> = Vec::new();
    for hero in &mut progression.heroes {
        let level_before = hero.level;
        let exp_before = hero.exp;

        hero.exp += total_exp_gained;
        while hero.exp >= exp_for_hero_level(hero.level) {
            hero.exp -= exp_for_hero_level(hero.level);
            hero.level += 1;
            log.push(format!("BATTLE_RESULTS: {} reached level {}.", hero.id, hero.level));
        }

        heroes_progression.push(HeroProgressionSummary {
            id: hero.id.clone(),
            level_before,
            exp_before,
            exp_to_level_up_before: exp_for_hero_level(level_before),
            level_after: hero.level,
            exp_after: hero.exp,
            exp_to_level_up_after: exp_for_hero_level(hero.level),
        });
    }

    let enemy = &mut progression.enemy_progression;
    let enemy_level_before = enemy.global_level;
    enemy.exp += if is_win { ENEMY_EXP_ON_WIN } else { ENEMY_EXP_ON_LOSS };

    // Level down while the pool is negative; each step refunds the cost of
    // the level being left.
    while enemy.exp < 0 && enemy.global_level > 1 {
        let refund = 25 * (enemy.global_level as i64 - 1);
        enemy.global_level -= 1;
        enemy.exp += refund;
    }
    if enemy.exp < 0 {
        enemy.exp = 0;
    }
    while enemy.exp >= exp_for_enemy_level(enemy.global_level) {
        enemy.exp -= exp_for_enemy_level(enemy.global_level);
        enemy.global_level += 1;
    }
    log.push(format!(
        "BATTLE_RESULTS: enemy level {} -> {}.",
        enemy_level_before, enemy.global_level
    ));

    state.battle_result_summary = Some(BattleResultSummary {
        total_exp_gained,
        base_exp_gained,
        win_bonus_multiplier,
        defeated_enemies_with_exp: defeated_with_exp,
        rewards,
        heroes_progression,
        enemy_leveled_up: progression.enemy_progression.global_level > enemy_level_before,
        enemy_level_before,
        enemy_level_after: progression.enemy_progression.global_level,
    });
    state.defeated_enemies_this_battle = None;
}

/// Adds experience to one exercise stat and runs its level-up loop. Returns
/// true if at least one level was gained.
pub fn add_exercise_progression(
    progression: &mut ProgressionData,
    exercise_id: &str,
    amount: i64,
    log: &mut ExecutionLog,
) -> EngineResult<bool> {
    let exercise = progression
        .exercise_stats_progression
        .iter_mut()
        .find(|e| e.id == exercise_id)
        .ok_or_else(|| ProgressionError::ExerciseNotFound(exercise_id.to_string()))?;

    log.push(format!(
        "EXERCISE: level {}, exp {}. Adding {} exp.",
        exercise.level, exercise.exp, amount
    ));
    exercise.exp += amount;

    let mut leveled_up = false;
    while exercise.exp >= exp_for_exercise_level(exercise.level) {
        exercise.exp -= exp_for_exercise_level(exercise.level);
        exercise.level += 1;
        leveled_up = true;
        log.push(format!(
            "EXERCISE: level up! Now level {} with {} exp remaining.",
            exercise.level, exercise.exp
        ));
    }

    Ok(leveled_up)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use schema::{
        DefeatedEnemy, EnemyProgression, EnemyTier, ExerciseRecord, HeroRecord, StatBoost,
    };

    fn progression_with(hero_level: u32, hero_exp: i64, enemy_level: u32, enemy_exp: i64) -> ProgressionData {
        ProgressionData {
            heroes: vec![HeroRecord {
                id: "hero_a".to_string(),
                level: hero_level,
                exp: hero_exp,
            }],
            enemy_progression: EnemyProgression {
                global_level: enemy_level,
                exp: enemy_exp,
            },
            exercise_stats_progression: vec![ExerciseRecord {
                id: "push_up".to_string(),
                level: 1,
                exp: 0,
                stats: Some(StatBoost::Atk),
            }],
        }
    }

    fn won_state(defeated_exp: f64) -> BattleState {
        BattleState {
            battle_state: BattleStateTag::Win,
            defeated_enemies_this_battle: Some(vec![DefeatedEnemy {
                id: "e1".to_string(),
                tier: Some(EnemyTier::Minion),
                exp_value: defeated_exp,
            }]),
            ..Default::default()
        }
    }

    #[rstest]
    #[case(1, 100)]
    #[case(2, 300)]
    #[case(3, 600)]
    #[case(10, 5500)]
    fn hero_curve_is_triangular(#[case] level: u32, #[case] expected: i64) {
        assert_eq!(exp_for_hero_level(level), expected);
    }

    #[test]
    fn hero_levels_up_once_and_keeps_remainder() {
        // 150 exp at level 1: one level-up costs 100, leaving 50 toward the
        // 300 needed for level 3.
        let mut progression = progression_with(1, 0, 1, 0);
        let mut state = BattleState {
            battle_state: BattleStateTag::Lose,
            defeated_enemies_this_battle: Some(vec![DefeatedEnemy {
                id: "e1".to_string(),
                tier: None,
                exp_value: 120.0,
            }]),
            ..Default::default()
        };
        let mut log = ExecutionLog::new();
        finalize_battle_results(&mut state, &mut progression, &mut log);

        // base = round(1 * 1.25 * 120) = 150; loss keeps the multiplier at 1.
        let hero = &progression.heroes[0];
        assert_eq!(hero.level, 2);
        assert_eq!(hero.exp, 50);
        assert!(hero.exp < exp_for_hero_level(hero.level));
    }

    #[test]
    fn win_applies_the_bonus_multiplier() {
        let mut progression = progression_with(1, 0, 2, 0);
        let mut state = won_state(10.0);
        let mut log = ExecutionLog::new();
        finalize_battle_results(&mut state, &mut progression, &mut log);

        let summary = state.battle_result_summary.clone().unwrap();
        // base = round(2 * 1.25 * 10) = 25; total = round(25 * 1.25) = 31.
        assert_eq!(summary.base_exp_gained, 25);
        assert_eq!(summary.total_exp_gained, 31);
        assert_eq!(summary.win_bonus_multiplier, 1.25);
        assert_eq!(summary.rewards.len(), 1);
        assert!(state.defeated_enemies_this_battle.is_none());
    }

    #[test]
    fn multiple_level_ups_from_one_grant() {
        let mut progression = progression_with(1, 0, 1, 0);
        let mut state = won_state(400.0);
        let mut log = ExecutionLog::new();
        finalize_battle_results(&mut state, &mut progression, &mut log);

        // base = 500, total = 625: level 1 -> 2 (-100) -> 3 (-300), 225 left.
        let hero = &progression.heroes[0];
        assert_eq!(hero.level, 3);
        assert_eq!(hero.exp, 225);
        assert!(hero.exp < exp_for_hero_level(hero.level));
    }

    #[test]
    fn enemy_pool_gains_on_win_and_levels_up() {
        let mut progression = progression_with(1, 0, 1, 10);
        let mut state = won_state(1.0);
        let mut log = ExecutionLog::new();
        finalize_battle_results(&mut state, &mut progression, &mut log);

        // 10 + 25 = 35: level 1 costs 25, leaving 10 at level 2.
        assert_eq!(progression.enemy_progression.global_level, 2);
        assert_eq!(progression.enemy_progression.exp, 10);
        let summary = state.battle_result_summary.unwrap();
        assert!(summary.enemy_leveled_up);
        assert_eq!(summary.enemy_level_after, 2);
    }

    #[test]
    fn enemy_pool_levels_down_on_loss_and_clamps_at_one() {
        let mut progression = progression_with(1, 0, 2, 5);
        let mut state = BattleState {
            battle_state: BattleStateTag::Lose,
            ..Default::default()
        };
        let mut log = ExecutionLog::new();
        finalize_battle_results(&mut state, &mut progression, &mut log);

        // 5 - 50 = -45: drop to level 1 refunds 25 (-20), then clamp to 0.
        assert_eq!(progression.enemy_progression.global_level, 1);
        assert_eq!(progression.enemy_progression.exp, 0);
    }

    #[rstest]
    #[case(1, 10)]
    #[case(4, 100)]
    fn exercise_curve_is_triangular(#[case] level: u32, #[case] expected: i64) {
        assert_eq!(exp_for_exercise_level(level), expected);
    }

    #[test]
    fn exercise_grant_levels_up_in_a_loop() {
        let mut progression = progression_with(1, 0, 1, 0);
        let mut log = ExecutionLog::new();

        // 35 exp: level 1 -> 2 (-10) -> 3 (-20), 5 left toward the 30 needed.
        let leveled = add_exercise_progression(&mut progression, "push_up", 35, &mut log).unwrap();
        assert!(leveled);
        let exercise = &progression.exercise_stats_progression[0];
        assert_eq!(exercise.level, 3);
        assert_eq!(exercise.exp, 5);
        assert!(exercise.exp < exp_for_exercise_level(exercise.level));
    }

    #[test]
    fn exercise_grant_below_threshold_reports_no_level_up() {
        let mut progression = progression_with(1, 0, 1, 0);
        let mut log = ExecutionLog::new();
        let leveled = add_exercise_progression(&mut progression, "push_up", 5, &mut log).unwrap();
        assert!(!leveled);
        assert_eq!(progression.exercise_stats_progression[0].exp, 5);
    }

    #[test]
    fn unknown_exercise_is_an_error() {
        let mut progression = progression_with(1, 0, 1, 0);
        let mut log = ExecutionLog::new();
        let err = add_exercise_progression(&mut progression, "cartwheel", 5, &mut log).unwrap_err();
        assert!(err.to_string().contains("cartwheel"));
    }
}
