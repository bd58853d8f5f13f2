//! Skills, effect definitions and target types.

use serde::{Deserialize, Serialize};

use crate::effect::EffectCalculator;

/// Breadth of a skill effect and whether it needs a chosen target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Ownself,
    SingleAlly,
    SingleEnemy,
    AllAllies,
    AllEnemies,
    All,
}

impl TargetType {
    /// True exactly for the single-target types.
    pub fn requires_selection(self) -> bool {
        matches!(self, TargetType::SingleAlly | TargetType::SingleEnemy)
    }

    /// Whether candidates come from the user's own side.
    pub fn is_allied(self) -> bool {
        matches!(
            self,
            TargetType::Ownself | TargetType::SingleAlly | TargetType::AllAllies
        )
    }
}

/// A target type paired with the calculators that run against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDefinition {
    pub target: TargetType,
    pub calculators: Vec<EffectCalculator>,
}

impl EffectDefinition {
    pub fn new(target: TargetType) -> Self {
        Self {
            target,
            calculators: Vec::new(),
        }
    }

    /// Append a calculator (builder style).
    pub fn with(mut self, calculator: EffectCalculator) -> Self {
        self.calculators.push(calculator);
        self
    }
}

/// A usable skill.
///
/// `current_cooldown` counts the owner's remaining end-of-turn updates
/// before the skill can be chosen again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub cooldown: u32,
    #[serde(default)]
    pub current_cooldown: u32,
    pub effects: Vec<EffectDefinition>,
}

impl Skill {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            icon: String::new(),
            cooldown: 0,
            current_cooldown: 0,
            effects: Vec::new(),
        }
    }

    pub fn with_cooldown(mut self, cooldown: u32) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_effect(mut self, effect: EffectDefinition) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn is_ready(&self) -> bool {
        self.current_cooldown == 0
    }

    /// Put the skill on its full cooldown.
    pub fn start_cooldown(&mut self) {
        self.current_cooldown = self.cooldown;
    }

    /// One end-of-turn step. Never goes below zero.
    pub fn tick_cooldown(&mut self) {
        self.current_cooldown = self.current_cooldown.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_single_targets_require_selection() {
        use TargetType::*;
        for t in [Ownself, AllAllies, AllEnemies, All] {
            assert!(!t.requires_selection(), "{t:?}");
        }
        assert!(SingleAlly.requires_selection());
        assert!(SingleEnemy.requires_selection());
    }

    #[test]
    fn cooldown_never_goes_negative() {
        let mut skill = Skill::new("Flare").with_cooldown(1);
        assert!(skill.is_ready());
        skill.start_cooldown();
        assert!(!skill.is_ready());
        skill.tick_cooldown();
        skill.tick_cooldown();
        assert_eq!(skill.current_cooldown, 0);
        assert!(skill.is_ready());
    }

    #[test]
    fn skill_deserializes_with_defaults() {
        let json = r#"{
            "name": "Ember",
            "effects": [
                { "target": "single_enemy",
                  "calculators": [ { "type": "attack", "base_power": 80 } ] }
            ]
        }"#;
        let skill: Skill = serde_json::from_str(json).unwrap();
        assert_eq!(skill.cooldown, 0);
        assert_eq!(skill.effects[0].target, TargetType::SingleEnemy);
        assert_eq!(
            skill.effects[0].calculators,
            vec![EffectCalculator::Attack { base_power: 80 }]
        );
    }
}
