//! Errors returned by rejected battle commands.
//!
//! A `BattleError` always means the command was ignored and the battle state
//! is exactly what it was before the call. Hosts are free to drop the error
//! and re-prompt.

use toki_ecs::prelude::{EcsError, EntityId};

use crate::presentation::AnimationTicket;

/// A re-entry call the engine refused to act on.
#[derive(Debug, thiserror::Error)]
pub enum BattleError {
    /// The battle has already reached an outcome.
    #[error("the battle is already finished")]
    BattleFinished,

    /// `start_battle` was called on a battle that is already running.
    #[error("the battle has already started")]
    AlreadyStarted,

    /// A command arrived before `start_battle`.
    #[error("the battle has not started yet")]
    NotStarted,

    /// The engine is not waiting for a skill choice.
    #[error("no entity is waiting for a skill choice")]
    NotAwaitingSkillChoice,

    /// The engine is not waiting for a target choice.
    #[error("no skill is waiting for a target choice")]
    NotAwaitingTargetChoice,

    /// The engine is not waiting for an animation to finish.
    #[error("no animation is in flight")]
    NotAwaitingAnimation,

    /// The completion ticket does not match the animation in flight.
    #[error("stale animation ticket {got:?} (expected {expected:?})")]
    StaleAnimationTicket {
        expected: AnimationTicket,
        got: AnimationTicket,
    },

    /// The acting entity has no skill at this index.
    #[error("skill index {index} out of range (entity has {len} skills)")]
    SkillIndexOutOfRange { index: usize, len: usize },

    /// The selected skill is still cooling down.
    #[error("skill `{name}` is on cooldown for {remaining} more turns")]
    SkillOnCooldown { name: String, remaining: u32 },

    /// The selected skill has no living target to act on.
    #[error("skill `{name}` has no valid targets")]
    NoValidTargets { name: String },

    /// The chosen target is not among the offered candidates.
    #[error("entity {target:?} is not a selectable target")]
    TargetNotSelectable { target: EntityId },

    /// No consumable with this name is in the inventory.
    #[error("no consumable named `{name}` in the inventory")]
    UnknownConsumable { name: String },

    /// A snapshot's stored hash does not match its contents.
    #[error("snapshot hash mismatch: stored {stored}, computed {computed}")]
    SnapshotHashMismatch { stored: String, computed: String },

    /// The battle state could not be serialized for hashing.
    #[error("failed to serialize battle state: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A snapshot carries a config the engine cannot run with.
    #[error("snapshot config is invalid: {0}")]
    InvalidConfig(#[from] crate::config::ConfigError),

    /// The entity store rejected an operation.
    #[error(transparent)]
    World(#[from] EcsError),
}
