//! Toki Battle -- turn-based battle core.
//!
//! Builds on [`toki_ecs`] to run speed-scheduled battles between two teams:
//! effect calculators, a status engine, target selection, an action
//! pipeline, rule-based AI and an event bus, all wired together by the
//! [`BattleEngine`](engine::BattleEngine) state machine. The engine never
//! blocks; it suspends at well-defined points and is resumed by the host.
//!
//! # Quick Start
//!
//! ```
//! use toki_battle::prelude::*;
//!
//! let bite = Skill::new("Bite").with_effect(
//!     EffectDefinition::new(TargetType::AllEnemies)
//!         .with(EffectCalculator::Attack { base_power: 120 }),
//! );
//! let wolf = |name: &str| {
//!     ComponentBundle::new(name)
//!         .with(StatsComponent::new(50, 14, 6, 11))
//!         .with(SkillsComponent::new(vec![bite.clone()]))
//!         .with(StatusEffectsComponent::new())
//!         .with(AiComponent::new())
//! };
//!
//! let mut engine = BattleEngine::new(
//!     BattleConfig::default().with_seed(7),
//!     vec![wolf("Grey")],
//!     vec![wolf("Red"), wolf("Black")],
//! )
//! .unwrap();
//! engine.start_battle().unwrap();
//!
//! // Both sides are computer-controlled, so the battle runs to the end.
//! assert!(engine.is_finished());
//! ```

#![deny(unsafe_code)]

pub mod action;
pub mod ai;
pub mod components;
pub mod config;
pub mod effect;
pub mod element;
pub mod engine;
pub mod error;
pub mod events;
pub mod log;
pub mod presentation;
pub mod replay;
pub mod rng;
pub mod scheduler;
pub mod skill;
pub mod snapshot;
pub mod status;
pub mod targeting;
pub mod teams;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use toki_ecs;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common battle usage.
pub mod prelude {
    pub use toki_ecs::prelude::*;

    pub use crate::action::{
        Action, Consumable, ConsumableId, Inventory, UseConsumableAction, UseSkillAction,
    };
    pub use crate::ai::{AiComponent, AiCondition, AiRule, TargetPreference};
    pub use crate::components::{
        BattleComponent, BattleEntity, BattleWorld, Capability, SkillsComponent, StatDelta,
        StatsComponent, StatsModifier,
    };
    pub use crate::config::{BattleConfig, ConfigError};
    pub use crate::effect::{
        EffectCalculator, EffectContext, EffectKind, EffectResult, SourceSnapshot,
    };
    pub use crate::element::{Effectiveness, Element};
    pub use crate::engine::{BattleEngine, BattlePhase, Outcome};
    pub use crate::error::BattleError;
    pub use crate::events::{
        ActionSummary, BattleEvent, BattleEventKind, EventBus, SubscriptionId,
    };
    pub use crate::log::{BattleLog, BattleLogObserver};
    pub use crate::presentation::{
        AnimationTicket, BattleEffectsDelegate, NullDelegate, Playback, SkillChoice,
    };
    pub use crate::replay::{replay, BattleCommand, BattleRecorder, ReplayLog, ReplayResult};
    pub use crate::rng::BattleRng;
    pub use crate::scheduler::TurnScheduler;
    pub use crate::skill::{EffectDefinition, Skill, TargetType};
    pub use crate::snapshot::BattleSnapshot;
    pub use crate::status::{
        StatusEffect, StatusEffectApplier, StatusEffectsComponent, StatusEngine, StatusKind,
    };
    pub use crate::targeting::{TargetResolution, TargetSelectionFactory};
    pub use crate::teams::{Side, Teams};
}
