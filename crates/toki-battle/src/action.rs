//! The action pipeline.
//!
//! An [`Action`] is built once its targets are known and executed exactly
//! once. Execution order is calculator-definition order; within one
//! calculator, targets are visited in list order.

use serde::{Deserialize, Serialize};
use toki_ecs::prelude::EntityId;

use crate::components::{BattleWorld, SkillsComponent};
use crate::effect::{EffectCalculator, EffectContext, EffectResult, SourceSnapshot};

// ---------------------------------------------------------------------------
// Consumables & inventory
// ---------------------------------------------------------------------------

/// Identity of one inventory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConsumableId(pub u32);

/// A single-use item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consumable {
    pub id: ConsumableId,
    pub name: String,
    pub description: String,
    pub effect: EffectCalculator,
}

/// The player's consumables. Items with the same name are distinct by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    items: Vec<Consumable>,
    next_id: u32,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item and return its fresh id.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        effect: EffectCalculator,
    ) -> ConsumableId {
        let id = ConsumableId(self.next_id);
        self.next_id += 1;
        self.items.push(Consumable {
            id,
            name: name.into(),
            description: description.into(),
            effect,
        });
        id
    }

    /// Builder-style [`add`](Self::add).
    pub fn with(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        effect: EffectCalculator,
    ) -> Self {
        self.add(name, description, effect);
        self
    }

    /// The oldest item with this name.
    pub fn find_by_name(&self, name: &str) -> Option<&Consumable> {
        self.items.iter().find(|item| item.name == name)
    }

    /// Remove the item with this id.
    pub fn take(&mut self, id: ConsumableId) -> Option<Consumable> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Consumable> {
        self.items.iter()
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Use skill `skill_index` of `user`.
#[derive(Debug, Clone, PartialEq)]
pub struct UseSkillAction {
    pub user: EntityId,
    pub skill_index: usize,
    /// One target list per effect definition of the skill.
    pub targets: Vec<Vec<EntityId>>,
}

/// Use an already-removed inventory item.
#[derive(Debug, Clone, PartialEq)]
pub struct UseConsumableAction {
    pub user: EntityId,
    pub consumable: Consumable,
    pub targets: Vec<EntityId>,
}

/// One turn's worth of intent.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    UseSkill(UseSkillAction),
    UseConsumable(UseConsumableAction),
    NoAction,
}

impl Action {
    /// Skill index used by this action, if any.
    pub fn skill_index(&self) -> Option<usize> {
        match self {
            Action::UseSkill(action) => Some(action.skill_index),
            _ => None,
        }
    }

    /// Run the action against the world.
    pub fn execute(&self, world: &mut BattleWorld, ctx: &mut EffectContext<'_>) -> Vec<EffectResult> {
        match self {
            Action::UseSkill(action) => action.execute(world, ctx),
            Action::UseConsumable(action) => action.execute(world, ctx),
            Action::NoAction => Vec::new(),
        }
    }
}

impl UseSkillAction {
    fn execute(&self, world: &mut BattleWorld, ctx: &mut EffectContext<'_>) -> Vec<EffectResult> {
        let Some(skill) = world
            .get_component::<SkillsComponent>(self.user)
            .and_then(|skills| skills.get(self.skill_index))
            .cloned()
        else {
            return Vec::new();
        };

        let mut results = Vec::new();
        for (definition, targets) in skill.effects.iter().zip(pad(&self.targets)) {
            for calculator in &definition.calculators {
                for &target in targets {
                    results.push(apply(calculator, self.user, target, world, ctx));
                }
            }
        }

        if let Some(skill) = world
            .get_component_mut::<SkillsComponent>(self.user)
            .and_then(|skills| skills.get_mut(self.skill_index))
        {
            skill.start_cooldown();
        }
        results
    }
}

impl UseConsumableAction {
    fn execute(&self, world: &mut BattleWorld, ctx: &mut EffectContext<'_>) -> Vec<EffectResult> {
        self.targets
            .iter()
            .map(|&target| apply(&self.consumable.effect, self.user, target, world, ctx))
            .collect()
    }
}

/// Target lists padded with empty lists for definitions the caller skipped.
fn pad(targets: &[Vec<EntityId>]) -> impl Iterator<Item = &[EntityId]> {
    targets
        .iter()
        .map(Vec::as_slice)
        .chain(std::iter::repeat(&[][..]))
}

fn apply(
    calculator: &EffectCalculator,
    user: EntityId,
    target: EntityId,
    world: &mut BattleWorld,
    ctx: &mut EffectContext<'_>,
) -> EffectResult {
    // Re-read the source every time: an earlier calculator may have buffed it.
    let Some(source) = world.get(user).and_then(SourceSnapshot::of) else {
        return EffectResult::none(target);
    };
    match world.get_mut(target) {
        Some(entity) => calculator.calculate(&source, entity, ctx),
        None => EffectResult::none(target),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::StatsComponent;
    use crate::config::BattleConfig;
    use crate::effect::EffectKind;
    use crate::rng::BattleRng;
    use crate::skill::{EffectDefinition, Skill, TargetType};
    use crate::status::{StatusEffectsComponent, StatusEngine};
    use toki_ecs::prelude::ComponentBundle;

    fn spawn(world: &mut BattleWorld, name: &str, attack: i32, skills: Vec<Skill>) -> EntityId {
        world.spawn_bundle(
            ComponentBundle::new(name)
                .with(StatsComponent::new(100, attack, 0, 10))
                .with(SkillsComponent::new(skills))
                .with(StatusEffectsComponent::new()),
        )
    }

    fn execute(world: &mut BattleWorld, action: &Action) -> Vec<EffectResult> {
        let config = BattleConfig::default();
        let mut rng = BattleRng::new(0);
        let mut applier = StatusEngine;
        let mut ctx = EffectContext {
            config: &config,
            rng: &mut rng,
            applier: &mut applier,
        };
        action.execute(world, &mut ctx)
    }

    #[test]
    fn calculators_run_in_definition_order_over_targets_in_list_order() {
        let sweep = Skill::new("Sweep").with_cooldown(2).with_effect(
            EffectDefinition::new(TargetType::AllEnemies)
                .with(EffectCalculator::Attack { base_power: 100 })
                .with(EffectCalculator::Attack { base_power: 50 }),
        );
        let mut world = BattleWorld::new();
        let user = spawn(&mut world, "Gale", 20, vec![sweep]);
        let a = spawn(&mut world, "A", 1, vec![]);
        let b = spawn(&mut world, "B", 1, vec![]);

        let action = Action::UseSkill(UseSkillAction {
            user,
            skill_index: 0,
            targets: vec![vec![b, a]],
        });
        let results = execute(&mut world, &action);
        let order: Vec<(EntityId, i32)> = results.iter().map(|r| (r.target, r.value)).collect();
        assert_eq!(order, vec![(b, 20), (a, 20), (b, 10), (a, 10)]);

        let skill = &world.get_component::<SkillsComponent>(user).unwrap().skills[0];
        assert_eq!(skill.current_cooldown, 2);
    }

    #[test]
    fn despawned_target_yields_none() {
        let jab = Skill::new("Jab").with_effect(
            EffectDefinition::new(TargetType::SingleEnemy)
                .with(EffectCalculator::Attack { base_power: 100 }),
        );
        let mut world = BattleWorld::new();
        let user = spawn(&mut world, "Gale", 20, vec![jab]);
        let target = spawn(&mut world, "A", 1, vec![]);
        world.despawn(target).unwrap();

        let results = execute(
            &mut world,
            &Action::UseSkill(UseSkillAction {
                user,
                skill_index: 0,
                targets: vec![vec![target]],
            }),
        );
        assert_eq!(results, vec![EffectResult::none(target)]);
    }

    #[test]
    fn no_action_yields_nothing() {
        let mut world = BattleWorld::new();
        assert!(execute(&mut world, &Action::NoAction).is_empty());
    }

    #[test]
    fn out_of_range_skill_yields_nothing() {
        let mut world = BattleWorld::new();
        let user = spawn(&mut world, "Gale", 20, vec![]);
        let action = Action::UseSkill(UseSkillAction {
            user,
            skill_index: 3,
            targets: vec![],
        });
        assert!(execute(&mut world, &action).is_empty());
    }

    #[test]
    fn consumable_is_taken_by_identity() {
        let mut inventory = Inventory::new()
            .with("Potion", "Restores 30 HP", EffectCalculator::Heal { base_power: 30 })
            .with("Potion", "Restores 30 HP", EffectCalculator::Heal { base_power: 30 });
        let first = inventory.find_by_name("Potion").unwrap().id;
        let taken = inventory.take(first).unwrap();
        assert_eq!(taken.id, first);
        assert_eq!(inventory.len(), 1);
        assert!(inventory.take(first).is_none());
        assert_ne!(inventory.find_by_name("Potion").unwrap().id, first);
    }

    #[test]
    fn consumable_action_applies_its_effect() {
        let mut world = BattleWorld::new();
        let user = spawn(&mut world, "Gale", 0, vec![]);
        world
            .get_component_mut::<StatsComponent>(user)
            .unwrap()
            .apply_damage(50);
        let mut inventory = Inventory::new();
        let id = inventory.add("Potion", "", EffectCalculator::Heal { base_power: 30 });
        let consumable = inventory.take(id).unwrap();

        let results = execute(
            &mut world,
            &Action::UseConsumable(UseConsumableAction {
                user,
                consumable,
                targets: vec![user],
            }),
        );
        assert_eq!(results[0].kind, EffectKind::Heal);
        assert_eq!(results[0].value, 30);
    }
}
