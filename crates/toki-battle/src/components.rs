//! Battle capabilities attached to entities.
//!
//! A combatant is an [`Entity`] carrying some subset of the four battle
//! capabilities declared here. Nothing requires all four: code that needs a
//! capability looks it up and treats its absence as a no-op.

use serde::{Deserialize, Serialize};
use toki_ecs::component_slot;
use toki_ecs::prelude::{Entity, EntityId, World};

use crate::ai::AiComponent;
use crate::element::Element;
use crate::skill::Skill;
use crate::status::StatusEffectsComponent;

component_slot! {
    /// Every component a battle entity may carry.
    pub enum BattleComponent keyed by Capability {
        Stats(StatsComponent),
        Skills(SkillsComponent),
        StatusEffects(StatusEffectsComponent),
        Ai(AiComponent),
    }
}

/// A combatant.
pub type BattleEntity = Entity<BattleComponent>;

/// The entity pool of one battle.
pub type BattleWorld = World<BattleComponent>;

// ---------------------------------------------------------------------------
// Stat modifiers
// ---------------------------------------------------------------------------

/// Additive adjustments to an entity's stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatDelta {
    pub attack: i32,
    pub defense: i32,
    pub speed: i32,
    /// Bonus added to heals the owner performs.
    pub heal: i32,
}

impl StatDelta {
    pub fn is_zero(&self) -> bool {
        *self == StatDelta::default()
    }

    /// `"attack +5, speed -2"` style summary of the non-zero fields.
    pub fn describe(&self) -> String {
        [
            ("attack", self.attack),
            ("defense", self.defense),
            ("speed", self.speed),
            ("healing", self.heal),
        ]
        .iter()
        .filter(|(_, v)| *v != 0)
        .map(|(name, v)| format!("{name} {v:+}"))
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// A timed [`StatDelta`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsModifier {
    pub delta: StatDelta,
    /// Owner end-of-turn updates left before the modifier expires.
    pub remaining_turns: u32,
    pub source: Option<EntityId>,
    /// Set when the modifier lands on the acting entity mid-turn; the
    /// end-of-turn update for that same turn leaves it untouched.
    #[serde(default)]
    pub skip_next_tick: bool,
}

// ---------------------------------------------------------------------------
// StatsComponent
// ---------------------------------------------------------------------------

/// Health, combat stats and the action meter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsComponent {
    pub max_health: i32,
    pub current_health: i32,
    pub attack: i32,
    pub defense: i32,
    pub speed: i32,
    /// Probability in `[0, 1]` that an attack from this entity is critical.
    pub crit_chance: f64,
    pub element: Element,
    pub action_meter: f64,
    pub modifiers: Vec<StatsModifier>,
}

impl StatsComponent {
    /// Full-health stats with a neutral element and no crit chance.
    pub fn new(max_health: i32, attack: i32, defense: i32, speed: i32) -> Self {
        let max_health = max_health.max(0);
        Self {
            max_health,
            current_health: max_health,
            attack,
            defense,
            speed,
            crit_chance: 0.0,
            element: Element::Neutral,
            action_meter: 0.0,
            modifiers: Vec::new(),
        }
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.element = element;
        self
    }

    pub fn with_crit_chance(mut self, crit_chance: f64) -> Self {
        self.crit_chance = crit_chance.clamp(0.0, 1.0);
        self
    }

    pub fn is_alive(&self) -> bool {
        self.current_health > 0
    }

    fn modifier_sum(&self, field: impl Fn(&StatDelta) -> i32) -> i32 {
        self.modifiers
            .iter()
            .fold(0i32, |sum, m| sum.saturating_add(field(&m.delta)))
    }

    /// Attack including active modifiers, never negative.
    pub fn effective_attack(&self) -> i32 {
        self.attack.saturating_add(self.modifier_sum(|d| d.attack)).max(0)
    }

    /// Defense including active modifiers, never negative.
    pub fn effective_defense(&self) -> i32 {
        self.defense.saturating_add(self.modifier_sum(|d| d.defense)).max(0)
    }

    /// Speed including active modifiers, never negative.
    pub fn effective_speed(&self) -> i32 {
        self.speed.saturating_add(self.modifier_sum(|d| d.speed)).max(0)
    }

    /// Heal bonus from active modifiers. May be negative.
    pub fn heal_bonus(&self) -> i32 {
        self.modifier_sum(|d| d.heal)
    }

    /// Subtract health, clamped at 0. Returns the health actually lost.
    pub fn apply_damage(&mut self, amount: i32) -> i32 {
        let before = self.current_health;
        self.current_health = before.saturating_sub(amount.max(0)).clamp(0, self.max_health);
        before - self.current_health
    }

    /// Add health, clamped at max. Returns the health actually gained.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.current_health;
        self.current_health = before.saturating_add(amount.max(0)).clamp(0, self.max_health);
        self.current_health - before
    }

    /// Current health as a fraction of max (0 when max is 0).
    pub fn health_ratio(&self) -> f64 {
        if self.max_health <= 0 {
            return 0.0;
        }
        f64::from(self.current_health) / f64::from(self.max_health)
    }

    pub fn add_modifier(&mut self, modifier: StatsModifier) {
        self.modifiers.push(modifier);
    }

    /// End-of-turn update of timed modifiers. Returns how many expired.
    pub fn tick_modifiers(&mut self) -> usize {
        for modifier in &mut self.modifiers {
            if modifier.skip_next_tick {
                modifier.skip_next_tick = false;
            } else {
                modifier.remaining_turns = modifier.remaining_turns.saturating_sub(1);
            }
        }
        let before = self.modifiers.len();
        self.modifiers.retain(|m| m.remaining_turns > 0);
        before - self.modifiers.len()
    }
}

// ---------------------------------------------------------------------------
// SkillsComponent
// ---------------------------------------------------------------------------

/// The ordered skill list of an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillsComponent {
    pub skills: Vec<Skill>,
}

impl SkillsComponent {
    pub fn new(skills: Vec<Skill>) -> Self {
        Self { skills }
    }

    pub fn get(&self, index: usize) -> Option<&Skill> {
        self.skills.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Skill> {
        self.skills.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Skill> {
        self.skills.iter()
    }

    /// Decrement every cooldown by one, except the skill used this turn.
    pub fn tick_cooldowns(&mut self, used: Option<usize>) {
        for (index, skill) in self.skills.iter_mut().enumerate() {
            if Some(index) != used {
                skill.tick_cooldown();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
