//! Status effects and their end-of-turn lifecycle.
//!
//! Each [`StatusEffect`] is active while `remaining > 0`. On every owner
//! end-of-turn update a damage-over-time effect deals its damage first, then
//! the counter is decremented, and an effect that reaches zero is removed.
//! Same-kind effects stack as independent instances.

use std::fmt;

use serde::{Deserialize, Serialize};
use toki_ecs::prelude::EntityId;

use crate::components::{BattleEntity, StatsComponent};
use crate::effect::{EffectKind, EffectResult};

// ---------------------------------------------------------------------------
// StatusKind
// ---------------------------------------------------------------------------

/// The kinds of timed status effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Stun,
    Frozen,
    Burn,
    Poison,
    Paralysis,
}

impl StatusKind {
    /// Burn and poison deal their strength as damage every tick.
    pub fn is_damage_over_time(self) -> bool {
        matches!(self, StatusKind::Burn | StatusKind::Poison)
    }

    /// Stun and frozen skip the owner's turn.
    pub fn is_immobilizing(self) -> bool {
        matches!(self, StatusKind::Stun | StatusKind::Frozen)
    }

    /// Paralysis slows action meter gain.
    pub fn slows_meter(self) -> bool {
        matches!(self, StatusKind::Paralysis)
    }

    /// Adjective used in log lines: "X is now burned!".
    pub fn adjective(self) -> &'static str {
        match self {
            StatusKind::Stun => "stunned",
            StatusKind::Frozen => "frozen",
            StatusKind::Burn => "burned",
            StatusKind::Poison => "poisoned",
            StatusKind::Paralysis => "paralyzed",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusKind::Stun => "stun",
            StatusKind::Frozen => "freeze",
            StatusKind::Burn => "burn",
            StatusKind::Poison => "poison",
            StatusKind::Paralysis => "paralysis",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// StatusEffect / StatusEffectsComponent
// ---------------------------------------------------------------------------

/// One active status effect instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    /// Owner end-of-turn updates left.
    pub remaining: u32,
    /// Damage per tick for damage-over-time kinds; unused otherwise.
    pub strength: i32,
    pub source: Option<EntityId>,
}

/// The active status effects of an entity, in application order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusEffectsComponent {
    pub effects: Vec<StatusEffect>,
}

impl StatusEffectsComponent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an effect as an independent instance.
    pub fn apply(&mut self, effect: StatusEffect) {
        self.effects.push(effect);
    }

    /// The first immobilizing kind in effect, if any.
    pub fn immobilized_by(&self) -> Option<StatusKind> {
        self.effects
            .iter()
            .map(|e| e.kind)
            .find(|k| k.is_immobilizing())
    }

    pub fn has(&self, kind: StatusKind) -> bool {
        self.effects.iter().any(|e| e.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.effects.iter()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Applier
// ---------------------------------------------------------------------------

/// Attaches status effects on behalf of effect calculators.
pub trait StatusEffectApplier {
    /// Attach `effect` to `target`. Returns `false` when the target cannot
    /// hold status effects (no component, or already dead).
    fn attach(&mut self, target: &mut BattleEntity, effect: StatusEffect) -> bool;
}

/// The default applier and the end-of-turn status ticker.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusEngine;

impl StatusEffectApplier for StatusEngine {
    fn attach(&mut self, target: &mut BattleEntity, effect: StatusEffect) -> bool {
        let alive = target
            .get_component::<StatsComponent>()
            .is_some_and(StatsComponent::is_alive);
        if !alive {
            return false;
        }
        match target.get_component_mut::<StatusEffectsComponent>() {
            Some(status) => {
                status.apply(effect);
                true
            }
            None => false,
        }
    }
}

impl StatusEngine {
    /// Run the owner's end-of-turn status update.
    ///
    /// Returns one result per damage tick and per expiry, in effect order.
    pub fn tick_end_of_turn(&self, entity: &mut BattleEntity) -> Vec<EffectResult> {
        let id = entity.id();
        let name = entity.name().to_string();
        let effects = match entity.get_component_mut::<StatusEffectsComponent>() {
            Some(status) => std::mem::take(&mut status.effects),
            None => return Vec::new(),
        };

        let mut results = Vec::new();
        let mut kept = Vec::with_capacity(effects.len());
        for mut effect in effects {
            if effect.kind.is_damage_over_time() {
                if let Some(stats) = entity.get_component_mut::<StatsComponent>() {
                    if stats.is_alive() {
                        let damage = effect.strength.max(0);
                        stats.apply_damage(damage);
                        results.push(
                            EffectResult::new(
                                id,
                                EffectKind::Damage,
                                damage,
                                format!("{name} took {damage} damage from {}.", effect.kind),
                            )
                            .with_status(effect.kind),
                        );
                    }
                }
            }

            effect.remaining = effect.remaining.saturating_sub(1);
            if effect.remaining == 0 {
                results.push(
                    EffectResult::new(
                        id,
                        EffectKind::StatusRemoved,
                        0,
                        format!("{name} is no longer {}.", effect.kind.adjective()),
                    )
                    .with_status(effect.kind),
                );
            } else {
                kept.push(effect);
            }
        }

        if let Some(status) = entity.get_component_mut::<StatusEffectsComponent>() {
            status.effects = kept;
        }
        results
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use toki_ecs::prelude::EntityId;

    fn entity(hp: i32) -> BattleEntity {
        let mut e = BattleEntity::new(EntityId::new(0), "Pebble");
        e.add_component(StatsComponent::new(hp, 10, 10, 10));
        e.add_component(StatusEffectsComponent::new());
        e
    }

    fn effect(kind: StatusKind, remaining: u32, strength: i32) -> StatusEffect {
        StatusEffect {
            kind,
            remaining,
            strength,
            source: None,
        }
    }

    fn hp(e: &BattleEntity) -> i32 {
        e.get_component::<StatsComponent>().unwrap().current_health
    }

    #[test]
    fn dot_with_one_turn_left_ticks_once_then_expires() {
        let mut e = entity(40);
        assert!(StatusEngine.attach(&mut e, effect(StatusKind::Burn, 1, 6)));

        let results = StatusEngine.tick_end_of_turn(&mut e);
        assert_eq!(hp(&e), 34);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].kind, EffectKind::Damage);
        assert_eq!(results[0].value, 6);
        assert_eq!(results[1].kind, EffectKind::StatusRemoved);
        assert_eq!(results[1].description, "Pebble is no longer burned.");
        assert!(e.get_component::<StatusEffectsComponent>().unwrap().is_empty());

        assert!(StatusEngine.tick_end_of_turn(&mut e).is_empty());
        assert_eq!(hp(&e), 34);
    }

    #[test]
    fn same_kind_effects_stack_independently() {
        let mut e = entity(100);
        StatusEngine.attach(&mut e, effect(StatusKind::Poison, 1, 3));
        StatusEngine.attach(&mut e, effect(StatusKind::Poison, 3, 4));

        StatusEngine.tick_end_of_turn(&mut e);
        assert_eq!(hp(&e), 93);
        let status = e.get_component::<StatusEffectsComponent>().unwrap();
        assert_eq!(status.len(), 1);
        assert_eq!(status.effects[0].remaining, 2);
    }

    #[test]
    fn stun_does_no_damage_and_immobilizes() {
        let mut e = entity(20);
        StatusEngine.attach(&mut e, effect(StatusKind::Stun, 1, 50));
        assert_eq!(
            e.get_component::<StatusEffectsComponent>()
                .unwrap()
                .immobilized_by(),
            Some(StatusKind::Stun)
        );
        let results = StatusEngine.tick_end_of_turn(&mut e);
        assert_eq!(hp(&e), 20);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].description, "Pebble is no longer stunned.");
    }

    #[test]
    fn attach_soft_fails_without_component_or_on_dead_target() {
        let mut bare = BattleEntity::new(EntityId::new(1), "Ghost");
        bare.add_component(StatsComponent::new(10, 1, 1, 1));
        assert!(!StatusEngine.attach(&mut bare, effect(StatusKind::Burn, 2, 1)));

        let mut dead = entity(10);
        dead.get_component_mut::<StatsComponent>()
            .unwrap()
            .apply_damage(10);
        assert!(!StatusEngine.attach(&mut dead, effect(StatusKind::Burn, 2, 1)));
    }

    #[test]
    fn dead_owner_takes_no_further_dot() {
        let mut e = entity(5);
        StatusEngine.attach(&mut e, effect(StatusKind::Burn, 3, 5));
        StatusEngine.attach(&mut e, effect(StatusKind::Poison, 3, 5));
        let results = StatusEngine.tick_end_of_turn(&mut e);
        assert_eq!(hp(&e), 0);
        let damage: Vec<_> = results
            .iter()
            .filter(|r| r.kind == EffectKind::Damage)
            .collect();
        assert_eq!(damage.len(), 1);
    }
}
