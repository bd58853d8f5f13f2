//! Effect calculators and their results.
//!
//! A calculator maps `(source, target)` to exactly one [`EffectResult`] and
//! never fails: a dead or stat-less target yields an [`EffectKind::None`]
//! result with value 0. The only state a calculator touches is the target it
//! was handed, plus the RNG and status applier in its [`EffectContext`].

use serde::{Deserialize, Serialize};
use toki_ecs::prelude::EntityId;

use crate::components::{BattleEntity, StatDelta, StatsComponent, StatsModifier};
use crate::config::BattleConfig;
use crate::element::Element;
use crate::rng::BattleRng;
use crate::status::{StatusEffect, StatusEffectApplier, StatusKind};

// ---------------------------------------------------------------------------
// EffectResult
// ---------------------------------------------------------------------------

/// What an effect did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Damage,
    Heal,
    Defense,
    StatsModified,
    StatusApplied,
    StatusRemoved,
    None,
}

/// The outcome of one calculator against one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectResult {
    pub target: EntityId,
    pub kind: EffectKind,
    pub value: i32,
    pub description: String,
    pub critical: bool,
    pub element: Option<Element>,
    pub status: Option<StatusKind>,
}

impl EffectResult {
    pub fn new(
        target: EntityId,
        kind: EffectKind,
        value: i32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            target,
            kind,
            value,
            description: description.into(),
            critical: false,
            element: None,
            status: None,
        }
    }

    /// The "nothing happened" result.
    pub fn none(target: EntityId) -> Self {
        Self::new(target, EffectKind::None, 0, String::new())
    }

    pub fn with_critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.element = Some(element);
        self
    }

    pub fn with_status(mut self, status: StatusKind) -> Self {
        self.status = Some(status);
        self
    }

    /// Whether the target's health may have changed.
    pub fn touches_health(&self) -> bool {
        matches!(self.kind, EffectKind::Damage | EffectKind::Heal)
    }
}

// ---------------------------------------------------------------------------
// Source snapshot / context
// ---------------------------------------------------------------------------

/// The source-side numbers a calculator reads.
///
/// Copied out of the source entity up front so the target can be borrowed
/// mutably even when source and target are the same entity.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSnapshot {
    pub id: EntityId,
    pub name: String,
    pub attack: i32,
    pub heal_bonus: i32,
    pub crit_chance: f64,
    pub element: Element,
}

impl SourceSnapshot {
    /// `None` when the entity carries no stats.
    pub fn of(entity: &BattleEntity) -> Option<Self> {
        let stats = entity.get_component::<StatsComponent>()?;
        Some(Self {
            id: entity.id(),
            name: entity.name().to_string(),
            attack: stats.effective_attack(),
            heal_bonus: stats.heal_bonus(),
            crit_chance: stats.crit_chance,
            element: stats.element,
        })
    }
}

/// Shared services handed to every calculator call.
pub struct EffectContext<'a> {
    pub config: &'a BattleConfig,
    pub rng: &'a mut BattleRng,
    pub applier: &'a mut dyn StatusEffectApplier,
}

// ---------------------------------------------------------------------------
// EffectCalculator
// ---------------------------------------------------------------------------

/// The calculator variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectCalculator {
    /// `attack * base_power / 100 - defense / 4`, then element and crit.
    Attack { base_power: i32 },
    /// `base_power + attack / 2`, clamped to max health.
    Heal { base_power: i32 },
    /// Flat defense boost for one turn.
    Defense { base_power: i32 },
    /// Chance-based status application.
    StatusEffect {
        kind: StatusKind,
        chance: f64,
        duration: u32,
        #[serde(default)]
        strength: i32,
    },
    /// Timed additive stat modifier.
    StatsModifier { delta: StatDelta, turns: u32 },
}

impl EffectCalculator {
    /// Apply this calculator to `target`.
    pub fn calculate(
        &self,
        source: &SourceSnapshot,
        target: &mut BattleEntity,
        ctx: &mut EffectContext<'_>,
    ) -> EffectResult {
        let target_id = target.id();
        let target_name = target.name().to_string();
        let self_targeted = target_id == source.id;

        match self {
            EffectCalculator::Attack { base_power } => {
                let Some(stats) = living_stats(target) else {
                    return EffectResult::none(target_id);
                };
                let raw = i64::from(source.attack) * i64::from(*base_power) / 100
                    - i64::from(stats.effective_defense() / 4);
                let base = saturate(raw.max(0));
                let effectiveness = source.element.effectiveness_against(stats.element);
                let critical = ctx.rng.roll(source.crit_chance);

                let mut scaled = f64::from(base) * effectiveness.multiplier();
                if critical {
                    scaled *= ctx.config.critical_multiplier;
                }
                let damage = (scaled.round() as i32).max(ctx.config.minimum_damage);
                stats.apply_damage(damage);

                let mut parts = Vec::with_capacity(3);
                if critical {
                    parts.push("A critical hit!".to_string());
                }
                parts.push(format!("{target_name} took {damage} damage."));
                if let Some(note) = effectiveness.annotation() {
                    parts.push(note.to_string());
                }
                EffectResult::new(target_id, EffectKind::Damage, damage, parts.join(" "))
                    .with_critical(critical)
                    .with_element(source.element)
            }

            EffectCalculator::Heal { base_power } => {
                let Some(stats) = living_stats(target) else {
                    return EffectResult::none(target_id);
                };
                let amount = saturate(
                    i64::from(*base_power) + i64::from(source.attack / 2) + i64::from(source.heal_bonus),
                )
                .max(0);
                let healed = stats.heal(amount);
                EffectResult::new(
                    target_id,
                    EffectKind::Heal,
                    healed,
                    format!("{target_name} recovered {healed} HP."),
                )
            }

            EffectCalculator::Defense { base_power } => {
                let Some(stats) = living_stats(target) else {
                    return EffectResult::none(target_id);
                };
                stats.add_modifier(StatsModifier {
                    delta: StatDelta {
                        defense: *base_power,
                        ..Default::default()
                    },
                    remaining_turns: 1,
                    source: Some(source.id),
                    skip_next_tick: self_targeted,
                });
                EffectResult::new(
                    target_id,
                    EffectKind::Defense,
                    *base_power,
                    format!("{target_name}'s defense rose by {base_power}."),
                )
            }

            EffectCalculator::StatusEffect {
                kind,
                chance,
                duration,
                strength,
            } => {
                if living_stats(target).is_none() || *duration == 0 {
                    return EffectResult::none(target_id);
                }
                if !ctx.rng.roll(*chance) {
                    return EffectResult::new(
                        target_id,
                        EffectKind::None,
                        0,
                        format!("{target_name} avoided being {}.", kind.adjective()),
                    );
                }
                let effect = StatusEffect {
                    kind: *kind,
                    remaining: *duration,
                    strength: *strength,
                    source: Some(source.id),
                };
                if !ctx.applier.attach(target, effect) {
                    return EffectResult::none(target_id);
                }
                EffectResult::new(
                    target_id,
                    EffectKind::StatusApplied,
                    *duration as i32,
                    format!("{target_name} is now {}!", kind.adjective()),
                )
                .with_status(*kind)
            }

            EffectCalculator::StatsModifier { delta, turns } => {
                let Some(stats) = living_stats(target) else {
                    return EffectResult::none(target_id);
                };
                if delta.is_zero() || *turns == 0 {
                    return EffectResult::none(target_id);
                }
                stats.add_modifier(StatsModifier {
                    delta: *delta,
                    remaining_turns: *turns,
                    source: Some(source.id),
                    skip_next_tick: self_targeted,
                });
                EffectResult::new(
                    target_id,
                    EffectKind::StatsModified,
                    saturate(
                        i64::from(delta.attack)
                            + i64::from(delta.defense)
                            + i64::from(delta.speed)
                            + i64::from(delta.heal),
                    ),
                    format!(
                        "{target_name}'s stats changed ({}) for {turns} turns.",
                        delta.describe()
                    ),
                )
            }
        }
    }
}

/// Clamp a widened intermediate back into `i32`.
pub(crate) fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn living_stats(target: &mut BattleEntity) -> Option<&mut StatsComponent> {
    target
        .get_component_mut::<StatsComponent>()
        .filter(|stats| stats.is_alive())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{StatusEffectsComponent, StatusEngine};

    fn fighter(id: u32, name: &str, stats: StatsComponent) -> BattleEntity {
        let mut e = BattleEntity::new(EntityId::new(id), name);
        e.add_component(stats);
        e.add_component(StatusEffectsComponent::new());
        e
    }

    fn run(
        calc: &EffectCalculator,
        source: &BattleEntity,
        target: &mut BattleEntity,
        config: &BattleConfig,
        rng: &mut BattleRng,
    ) -> EffectResult {
        let mut applier = StatusEngine;
        let mut ctx = EffectContext {
            config,
            rng,
            applier: &mut applier,
        };
        let snapshot = SourceSnapshot::of(source).unwrap();
        calc.calculate(&snapshot, target, &mut ctx)
    }

    fn hp(e: &BattleEntity) -> i32 {
        e.get_component::<StatsComponent>().unwrap().current_health
    }

    #[test]
    fn neutral_attack_matches_formula() {
        let config = BattleConfig::default();
        let mut rng = BattleRng::new(1);
        let source = fighter(0, "Ember", StatsComponent::new(50, 20, 0, 10));
        let mut target = fighter(1, "Pebble", StatsComponent::new(50, 5, 8, 10));
        let result = run(
            &EffectCalculator::Attack { base_power: 100 },
            &source,
            &mut target,
            &config,
            &mut rng,
        );
        assert_eq!(result.kind, EffectKind::Damage);
        assert_eq!(result.value, 18);
        assert_eq!(hp(&target), 32);
        assert_eq!(result.description, "Pebble took 18 damage.");
        assert!(!result.critical);
    }

    #[test]
    fn fire_into_water_is_halved_and_annotated() {
        let config = BattleConfig::default();
        let mut rng = BattleRng::new(1);
        let source = fighter(
            0,
            "Ember",
            StatsComponent::new(50, 20, 0, 10).with_element(Element::Fire),
        );
        let mut target = fighter(
            1,
            "Droplet",
            StatsComponent::new(50, 5, 8, 10).with_element(Element::Water),
        );
        let result = run(
            &EffectCalculator::Attack { base_power: 100 },
            &source,
            &mut target,
            &config,
            &mut rng,
        );
        assert_eq!(result.value, 9);
        assert!(result.description.contains("not very effective"));
        assert_eq!(result.element, Some(Element::Fire));
    }

    #[test]
    fn certain_crit_is_annotated_and_multiplied() {
        let config = BattleConfig::default();
        let mut rng = BattleRng::new(1);
        let source = fighter(
            0,
            "Ember",
            StatsComponent::new(50, 20, 0, 10)
                .with_element(Element::Water)
                .with_crit_chance(1.0),
        );
        let mut target = fighter(
            1,
            "Cinder",
            StatsComponent::new(100, 5, 8, 10).with_element(Element::Fire),
        );
        let result = run(
            &EffectCalculator::Attack { base_power: 100 },
            &source,
            &mut target,
            &config,
            &mut rng,
        );
        // 18 * 1.5 * 1.5 = 40.5 -> 41
        assert_eq!(result.value, 41);
        assert!(result.critical);
        assert!(result.description.starts_with("A critical hit!"));
        assert!(result.description.contains("super effective"));
    }

    #[test]
    fn attack_respects_minimum_damage() {
        let config = BattleConfig::default();
        let mut rng = BattleRng::new(1);
        let source = fighter(0, "Moth", StatsComponent::new(10, 1, 0, 10));
        let mut target = fighter(1, "Wall", StatsComponent::new(10, 1, 200, 10));
        let result = run(
            &EffectCalculator::Attack { base_power: 50 },
            &source,
            &mut target,
            &config,
            &mut rng,
        );
        assert_eq!(result.value, 1);
    }

    #[test]
    fn heal_is_clamped_to_max() {
        let config = BattleConfig::default();
        let mut rng = BattleRng::new(1);
        let source = fighter(0, "Bloom", StatsComponent::new(50, 10, 0, 10));
        let mut stats = StatsComponent::new(40, 1, 1, 1);
        stats.apply_damage(12);
        let mut target = fighter(1, "Pebble", stats);
        let result = run(
            &EffectCalculator::Heal { base_power: 20 },
            &source,
            &mut target,
            &config,
            &mut rng,
        );
        assert_eq!(result.kind, EffectKind::Heal);
        assert_eq!(result.value, 12);
        assert_eq!(hp(&target), 40);
    }

    #[test]
    fn dead_target_yields_none() {
        let config = BattleConfig::default();
        let mut rng = BattleRng::new(1);
        let source = fighter(0, "Ember", StatsComponent::new(50, 20, 0, 10));
        let mut stats = StatsComponent::new(10, 1, 1, 1);
        stats.apply_damage(10);
        let mut target = fighter(1, "Husk", stats);
        for calc in [
            EffectCalculator::Attack { base_power: 100 },
            EffectCalculator::Heal { base_power: 10 },
            EffectCalculator::Defense { base_power: 10 },
            EffectCalculator::StatusEffect {
                kind: StatusKind::Burn,
                chance: 1.0,
                duration: 2,
                strength: 3,
            },
        ] {
            let result = run(&calc, &source, &mut target, &config, &mut rng);
            assert_eq!(result.kind, EffectKind::None);
            assert_eq!(result.value, 0);
        }
    }

    #[test]
    fn defense_on_other_target_is_a_one_turn_modifier() {
        let config = BattleConfig::default();
        let mut rng = BattleRng::new(1);
        let source = fighter(0, "Shell", StatsComponent::new(50, 10, 5, 10));
        let mut target = fighter(1, "Pebble", StatsComponent::new(50, 10, 5, 10));
        let result = run(
            &EffectCalculator::Defense { base_power: 6 },
            &source,
            &mut target,
            &config,
            &mut rng,
        );
        assert_eq!(result.description, "Pebble's defense rose by 6.");
        let stats = target.get_component_mut::<StatsComponent>().unwrap();
        assert_eq!(stats.effective_defense(), 11);
        assert!(!stats.modifiers[0].skip_next_tick);
        stats.tick_modifiers();
        assert_eq!(stats.effective_defense(), 5);
    }

    #[test]
    fn self_defense_skips_current_turn_tick() {
        let config = BattleConfig::default();
        let mut rng = BattleRng::new(1);
        let mut shell = fighter(0, "Shell", StatsComponent::new(50, 10, 5, 10));
        let snapshot = SourceSnapshot::of(&shell).unwrap();
        let mut applier = StatusEngine;
        let mut ctx = EffectContext {
            config: &config,
            rng: &mut rng,
            applier: &mut applier,
        };
        EffectCalculator::Defense { base_power: 6 }.calculate(&snapshot, &mut shell, &mut ctx);
        let stats = shell.get_component::<StatsComponent>().unwrap();
        assert!(stats.modifiers[0].skip_next_tick);
    }

    #[test]
    fn status_chance_zero_never_applies() {
        let config = BattleConfig::default();
        let mut rng = BattleRng::new(1);
        let source = fighter(0, "Spore", StatsComponent::new(50, 10, 5, 10));
        let mut target = fighter(1, "Pebble", StatsComponent::new(50, 10, 5, 10));
        let calc = EffectCalculator::StatusEffect {
            kind: StatusKind::Poison,
            chance: 0.0,
            duration: 3,
            strength: 2,
        };
        let result = run(&calc, &source, &mut target, &config, &mut rng);
        assert_eq!(result.kind, EffectKind::None);
        assert!(target
            .get_component::<StatusEffectsComponent>()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn certain_status_is_attached_through_the_applier() {
        let config = BattleConfig::default();
        let mut rng = BattleRng::new(1);
        let source = fighter(0, "Spore", StatsComponent::new(50, 10, 5, 10));
        let mut target = fighter(1, "Pebble", StatsComponent::new(50, 10, 5, 10));
        let calc = EffectCalculator::StatusEffect {
            kind: StatusKind::Poison,
            chance: 1.0,
            duration: 3,
            strength: 2,
        };
        let result = run(&calc, &source, &mut target, &config, &mut rng);
        assert_eq!(result.kind, EffectKind::StatusApplied);
        assert_eq!(result.description, "Pebble is now poisoned!");
        let status = target.get_component::<StatusEffectsComponent>().unwrap();
        assert_eq!(status.effects[0].source, Some(EntityId::new(0)));
    }

    #[test]
    fn stats_modifier_is_timed() {
        let config = BattleConfig::default();
        let mut rng = BattleRng::new(1);
        let source = fighter(0, "Drum", StatsComponent::new(50, 10, 5, 10));
        let mut target = fighter(1, "Pebble", StatsComponent::new(50, 10, 5, 10));
        let calc = EffectCalculator::StatsModifier {
            delta: StatDelta {
                attack: 4,
                speed: 2,
                ..Default::default()
            },
            turns: 2,
        };
        let result = run(&calc, &source, &mut target, &config, &mut rng);
        assert_eq!(result.kind, EffectKind::StatsModified);
        let stats = target.get_component_mut::<StatsComponent>().unwrap();
        assert_eq!(stats.effective_attack(), 14);
        assert_eq!(stats.effective_speed(), 12);
        stats.tick_modifiers();
        assert_eq!(stats.effective_attack(), 14);
        stats.tick_modifiers();
        assert_eq!(stats.effective_attack(), 10);
    }

    #[test]
    fn extreme_stats_saturate_instead_of_overflowing() {
        let config = BattleConfig::default();
        let mut rng = BattleRng::new(1);
        let source = fighter(0, "Titan", StatsComponent::new(50, i32::MAX, 0, 10));
        let mut target = fighter(1, "Imp", StatsComponent::new(i32::MAX, 1, 0, 10));

        let attack = EffectCalculator::Attack { base_power: i32::MAX };
        let result = run(&attack, &source, &mut target, &config, &mut rng);
        assert_eq!(result.kind, EffectKind::Damage);
        assert_eq!(result.value, i32::MAX);
        assert_eq!(hp(&target), 0);

        let mut ally = fighter(2, "Sprite", StatsComponent::new(i32::MAX, 1, 0, 10));
        ally.get_component_mut::<StatsComponent>().unwrap().apply_damage(10);
        let heal = EffectCalculator::Heal { base_power: i32::MAX };
        let result = run(&heal, &source, &mut ally, &config, &mut rng);
        assert_eq!(result.value, 10);
        assert_eq!(hp(&ally), i32::MAX);
    }

    #[test]
    fn saturate_clamps_both_ends() {
        assert_eq!(saturate(i64::from(i32::MAX) * 4), i32::MAX);
        assert_eq!(saturate(i64::from(i32::MIN) * 4), i32::MIN);
        assert_eq!(saturate(-7), -7);
    }
}
