//! Wire-contract definitions for the turnwheel combat resolver.
//!
//! Everything in this crate serializes to the exact JSON field names and
//! enum string values the presentation layer expects; the engine crate
//! depends on these types for every document it touches.

pub mod battle_data;
pub mod command_data;
pub mod progression_data;

pub use battle_data::{
    BattleState, BattleStateTag, DefeatedEnemy, EffectPopup, EnemyTier, LastActionDetails,
    StatusEffectInstance, StatusEffectKind, StatusEffectLists, TriggerPhase, Unit, UnitRole,
    UnitStats, UnitStatus, UnitStatusEffect, UnitType,
};
pub use command_data::{
    AreaOrigin, AreaParams, AreaShape, Command, CommandType, EffectDetails, EffectSpec,
    EffectTarget, SelectionParams, SelectionPattern, SelectionShape, TargetDirection,
    TargetingParams,
};
pub use progression_data::{
    BattleResultSummary, DefeatedEnemyExp, EnemyProgression, ExerciseRecord,
    HeroProgressionSummary, HeroRecord, ProgressionData, RewardItem, StatBoost,
};
