//! JSON roster parsing.
//!
//! A roster names both teams, their skills and AI rules, the player's
//! consumables and the [`BattleConfig`]. It is turned into component bundles
//! for [`BattleEngine::new`](toki_battle::engine::BattleEngine::new).

use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use toki_battle::prelude::*;

/// Largest magnitude accepted for any stat or calculator power.
pub const MAX_STAT: i32 = 1_000_000;

/// A complete battle setup loaded from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterFile {
    #[serde(default)]
    pub config: BattleConfig,
    pub players: Vec<EntitySpec>,
    pub opponents: Vec<EntitySpec>,
    #[serde(default)]
    pub inventory: Vec<ItemSpec>,
}

/// One combatant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySpec {
    pub name: String,
    pub stats: StatsSpec,
    #[serde(default)]
    pub skills: Vec<Skill>,
    /// Present for computer-controlled combatants. Player-team members with
    /// an AI block are auto-piloted by the engine itself.
    #[serde(default)]
    pub ai: Option<AiComponent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSpec {
    pub max_health: i32,
    pub attack: i32,
    pub defense: i32,
    pub speed: i32,
    #[serde(default)]
    pub crit_chance: f64,
    #[serde(default)]
    pub element: Element,
}

/// A consumable in the player's inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub effect: EffectCalculator,
}

impl RosterFile {
    /// Load and validate a roster file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read roster {}", path.display()))?;
        Self::from_json(&contents).with_context(|| format!("invalid roster {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let roster: RosterFile = serde_json::from_str(json).context("failed to parse roster JSON")?;
        roster.validate()?;
        Ok(roster)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.players.is_empty(), "players must have at least one member");
        ensure!(!self.opponents.is_empty(), "opponents must have at least one member");
        self.config.validate().context("invalid battle config")?;

        for spec in self.players.iter().chain(&self.opponents) {
            spec.validate()
                .with_context(|| format!("invalid combatant {:?}", spec.name))?;
        }
        for item in &self.inventory {
            ensure!(!item.name.trim().is_empty(), "inventory items need a name");
            check_calculator(&item.effect)
                .with_context(|| format!("invalid inventory item {:?}", item.name))?;
        }
        Ok(())
    }

    pub fn player_bundles(&self) -> Vec<ComponentBundle<BattleComponent>> {
        self.players.iter().map(EntitySpec::to_bundle).collect()
    }

    pub fn opponent_bundles(&self) -> Vec<ComponentBundle<BattleComponent>> {
        self.opponents.iter().map(EntitySpec::to_bundle).collect()
    }

    pub fn to_inventory(&self) -> Inventory {
        self.inventory.iter().fold(Inventory::new(), |inventory, item| {
            inventory.with(item.name.clone(), item.description.clone(), item.effect.clone())
        })
    }
}

impl EntitySpec {
    fn validate(&self) -> Result<()> {
        ensure!(!self.name.trim().is_empty(), "name must not be empty");
        let stats = &self.stats;
        ensure!(
            (1..=MAX_STAT).contains(&stats.max_health),
            "max_health {} is outside 1..={MAX_STAT}",
            stats.max_health
        );
        for (field, value) in [
            ("attack", stats.attack),
            ("defense", stats.defense),
            ("speed", stats.speed),
        ] {
            ensure!(
                (0..=MAX_STAT).contains(&value),
                "{field} {value} is outside 0..={MAX_STAT}"
            );
        }
        ensure!(
            (0.0..=1.0).contains(&stats.crit_chance),
            "crit_chance {} is outside 0..=1",
            stats.crit_chance
        );

        for skill in &self.skills {
            ensure!(!skill.effects.is_empty(), "skill {:?} has no effects", skill.name);
            for calculator in skill.effects.iter().flat_map(|d| &d.calculators) {
                check_calculator(calculator)
                    .with_context(|| format!("invalid skill {:?}", skill.name))?;
            }
        }
        if let Some(ai) = &self.ai {
            let indices = ai
                .rules
                .iter()
                .map(|rule| rule.skill_index)
                .chain(ai.fallback_skills.iter().copied());
            for index in indices {
                if index >= self.skills.len() {
                    bail!(
                        "AI refers to skill {index} but only {} skills are defined",
                        self.skills.len()
                    );
                }
            }
        }
        Ok(())
    }

    /// Component bundle for this combatant.
    pub fn to_bundle(&self) -> ComponentBundle<BattleComponent> {
        let stats = StatsComponent::new(
            self.stats.max_health,
            self.stats.attack,
            self.stats.defense,
            self.stats.speed,
        )
        .with_element(self.stats.element)
        .with_crit_chance(self.stats.crit_chance);

        let bundle = ComponentBundle::new(self.name.clone())
            .with(stats)
            .with(SkillsComponent::new(self.skills.clone()))
            .with(StatusEffectsComponent::new());
        match &self.ai {
            Some(ai) => bundle.with(ai.clone()),
            None => bundle,
        }
    }
}

fn check_calculator(calculator: &EffectCalculator) -> Result<()> {
    let within = |value: i32| (-MAX_STAT..=MAX_STAT).contains(&value);
    match calculator {
        EffectCalculator::Attack { base_power }
        | EffectCalculator::Heal { base_power }
        | EffectCalculator::Defense { base_power } => {
            ensure!(within(*base_power), "base_power {base_power} exceeds {MAX_STAT}");
        }
        EffectCalculator::StatusEffect { strength, .. } => {
            ensure!(within(*strength), "strength {strength} exceeds {MAX_STAT}");
        }
        EffectCalculator::StatsModifier { delta, .. } => {
            for value in [delta.attack, delta.defense, delta.speed, delta.heal] {
                ensure!(within(value), "stat delta {value} exceeds {MAX_STAT}");
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
