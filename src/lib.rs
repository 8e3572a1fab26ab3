//! Turnwheel Combat Resolver
//!
//! A turn-based combat engine over a circular turn order. Each external
//! trigger (player action, enemy decision, end-of-turn tick) is one discrete
//! call `(battle document, command) -> battle document'`; no state lives
//! between calls. The `api` module is the serialized-document boundary; the
//! `battle` modules hold the in-memory resolvers behind it.

// --- MODULE DECLARATIONS ---
pub mod api;
pub mod battle;
pub mod config;
pub mod errors;
pub mod progression;

// --- PUBLIC API RE-EXPORTS ---

// --- From the `schema` crate ---
// Re-export the wire-contract document types.
pub use schema::{
    BattleResultSummary,
    BattleState,
    BattleStateTag,
    Command,
    CommandType,
    EffectSpec,
    EffectTarget,
    ProgressionData,
    StatusEffectInstance,
    TriggerPhase,
    Unit,
    UnitRole,
    UnitStatus,
    UnitType,
};

// --- From this crate's modules (`src/`) ---

// Core resolvers over in-memory documents.
pub use battle::ai::{resolve_enemy_turn, Behavior, RoleReachBehavior};
pub use battle::engine::{resolve_basic_attack, resolve_skill, BasicAttackOutcome, SkillOutcome};
pub use battle::items::resolve_item_use;
pub use battle::math::{apply_damage, apply_heal, apply_revive, apply_shield, DamageOutcome};
pub use battle::setup::initiate_battle;
pub use battle::turn_order::{advance_turn, check_battle_end, sync_pseudo_positions};

// Supporting runtime types.
pub use battle::log::ExecutionLog;
pub use battle::rng::BattleRng;
pub use config::{EngineConfig, ItemDefinition, ItemKind, StatGrowth, WeightedTable};

// Crate-specific error and result types.
pub use errors::{
    CommandError, DocumentError, EngineError, EngineResult, ProgressionError, UnitError,
};
