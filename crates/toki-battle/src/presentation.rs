//! The presentation side of the engine.
//!
//! A [`BattleEffectsDelegate`] is told what to show. Calls that may animate
//! receive an [`AnimationTicket`] and answer with a [`Playback`]: either the
//! work is already [`Finished`](Playback::Finished), or it is
//! [`Pending`](Playback::Pending) and the host must later hand the same
//! ticket to `BattleEngine::complete_animation`. A delegate that never does so
//! stalls the battle; the engine does not time out.

use serde::{Deserialize, Serialize};
use toki_ecs::prelude::EntityId;

/// Identifies one in-flight animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnimationTicket(pub u64);

/// Whether the engine may continue right away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Finished,
    Pending,
}

/// What the skill picker should show for one skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillChoice {
    pub name: String,
    pub icon: String,
    pub cooldown: u32,
    pub ready: bool,
}

/// Host hooks for visual feedback.
///
/// Every method has a no-op default that completes immediately.
pub trait BattleEffectsDelegate {
    /// Play the "uses a skill" animation for `entity`.
    fn show_skill_use(&mut self, entity: EntityId, is_ally: bool, ticket: AnimationTicket) -> Playback {
        let _ = (entity, is_ally, ticket);
        Playback::Finished
    }

    /// Refresh the skill picker. `None` hides it.
    fn update_skill_choices(&mut self, choices: Option<&[SkillChoice]>) {
        let _ = choices;
    }

    /// Animate a health bar to its new value.
    fn update_health_bar(
        &mut self,
        entity: EntityId,
        current_health: i32,
        max_health: i32,
        ticket: AnimationTicket,
    ) -> Playback {
        let _ = (entity, current_health, max_health, ticket);
        Playback::Finished
    }

    fn remove_defeated(&mut self, entity: EntityId) {
        let _ = entity;
    }

    fn prompt_ally_target_selection(&mut self, candidates: &[EntityId]) {
        let _ = candidates;
    }

    fn prompt_enemy_target_selection(&mut self, candidates: &[EntityId]) {
        let _ = candidates;
    }
}

/// A delegate that shows nothing and never suspends.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDelegate;

impl BattleEffectsDelegate for NullDelegate {}
