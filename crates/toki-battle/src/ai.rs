//! Rule-based decisions for computer-controlled entities.
//!
//! [`AiComponent::determine_action`] is total: it always returns an
//! [`Action`]. Rules are tried in ascending `priority` (declaration order
//! among equal priorities); the first rule whose condition holds and whose
//! skill is ready with at least one target wins. Otherwise the fallback pool
//! is tried in order, then any ready skill, then [`Action::NoAction`].

use serde::{Deserialize, Serialize};
use toki_ecs::prelude::EntityId;

use crate::action::{Action, UseSkillAction};
use crate::components::{BattleEntity, SkillsComponent, StatsComponent};
use crate::skill::{Skill, TargetType};
use crate::status::{StatusEffectsComponent, StatusKind};

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// A predicate over the current battle state, seen from the acting entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AiCondition {
    Always,
    /// Own health ratio strictly below `ratio`.
    SelfHealthBelow { ratio: f64 },
    /// Some living ally (self included) strictly below `ratio`.
    AnyAllyHealthBelow { ratio: f64 },
    /// Some living enemy strictly below `ratio`.
    AnyEnemyHealthBelow { ratio: f64 },
    /// At least `count` living enemies.
    EnemiesAtLeast { count: usize },
    SelfHasStatus { kind: StatusKind },
    /// Every nested condition holds.
    AllOf { conditions: Vec<AiCondition> },
}

/// How a rule picks among single-target candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPreference {
    #[default]
    LowestHealth,
    HighestHealth,
    First,
}

/// `condition -> use skill_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiRule {
    pub priority: u32,
    pub condition: AiCondition,
    pub skill_index: usize,
    #[serde(default)]
    pub preference: TargetPreference,
}

// ---------------------------------------------------------------------------
// AiComponent
// ---------------------------------------------------------------------------

/// Marks an entity as computer-controlled and holds its rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiComponent {
    #[serde(default)]
    pub rules: Vec<AiRule>,
    #[serde(default)]
    pub fallback_skills: Vec<usize>,
}

impl AiComponent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, priority: u32, condition: AiCondition, skill_index: usize) -> Self {
        self.rules.push(AiRule {
            priority,
            condition,
            skill_index,
            preference: TargetPreference::default(),
        });
        self
    }

    pub fn with_fallback(mut self, skill_index: usize) -> Self {
        self.fallback_skills.push(skill_index);
        self
    }

    /// Choose this turn's action.
    ///
    /// `allies` are the living members of the user's team (the user
    /// included) and `enemies` the living members of the other team.
    pub fn determine_action(
        &self,
        user: &BattleEntity,
        allies: &[&BattleEntity],
        enemies: &[&BattleEntity],
    ) -> Action {
        let Some(skills) = user.get_component::<SkillsComponent>() else {
            return Action::NoAction;
        };

        let mut rules: Vec<&AiRule> = self.rules.iter().collect();
        rules.sort_by_key(|rule| rule.priority);

        for rule in rules {
            if !condition_holds(&rule.condition, user, allies, enemies) {
                continue;
            }
            if let Some(action) =
                skill_action(user, skills, rule.skill_index, allies, enemies, rule.preference)
            {
                return action;
            }
        }

        let fallback = self.fallback_skills.iter().copied();
        for index in fallback.chain(0..skills.len()) {
            if let Some(action) = skill_action(
                user,
                skills,
                index,
                allies,
                enemies,
                TargetPreference::default(),
            ) {
                return action;
            }
        }

        Action::NoAction
    }
}

fn health_ratio(entity: &BattleEntity) -> f64 {
    entity
        .get_component::<StatsComponent>()
        .map_or(0.0, StatsComponent::health_ratio)
}

fn condition_holds(
    condition: &AiCondition,
    user: &BattleEntity,
    allies: &[&BattleEntity],
    enemies: &[&BattleEntity],
) -> bool {
    match condition {
        AiCondition::Always => true,
        AiCondition::SelfHealthBelow { ratio } => health_ratio(user) < *ratio,
        AiCondition::AnyAllyHealthBelow { ratio } => {
            allies.iter().any(|e| health_ratio(e) < *ratio)
        }
        AiCondition::AnyEnemyHealthBelow { ratio } => {
            enemies.iter().any(|e| health_ratio(e) < *ratio)
        }
        AiCondition::EnemiesAtLeast { count } => enemies.len() >= *count,
        AiCondition::SelfHasStatus { kind } => user
            .get_component::<StatusEffectsComponent>()
            .is_some_and(|s| s.has(*kind)),
        AiCondition::AllOf { conditions } => conditions
            .iter()
            .all(|c| condition_holds(c, user, allies, enemies)),
    }
}

/// Build a use-skill action if the skill is ready and reaches someone.
fn skill_action(
    user: &BattleEntity,
    skills: &SkillsComponent,
    index: usize,
    allies: &[&BattleEntity],
    enemies: &[&BattleEntity],
    preference: TargetPreference,
) -> Option<Action> {
    let skill: &Skill = skills.get(index).filter(|s| s.is_ready())?;
    let targets: Vec<Vec<EntityId>> = skill
        .effects
        .iter()
        .map(|def| pick_targets(user, def.target, allies, enemies, preference))
        .collect();
    if targets.iter().all(Vec::is_empty) {
        return None;
    }
    Some(Action::UseSkill(UseSkillAction {
        user: user.id(),
        skill_index: index,
        targets,
    }))
}

fn pick_targets(
    user: &BattleEntity,
    target_type: TargetType,
    allies: &[&BattleEntity],
    enemies: &[&BattleEntity],
    preference: TargetPreference,
) -> Vec<EntityId> {
    let ids = |pool: &[&BattleEntity]| pool.iter().map(|e| e.id()).collect::<Vec<_>>();
    match target_type {
        TargetType::Ownself => vec![user.id()],
        TargetType::AllAllies => ids(allies),
        TargetType::AllEnemies => ids(enemies),
        TargetType::All => {
            let mut all = ids(allies);
            all.extend(ids(enemies));
            all
        }
        TargetType::SingleAlly => pick_one(allies, preference).into_iter().collect(),
        TargetType::SingleEnemy => pick_one(enemies, preference).into_iter().collect(),
    }
}

fn pick_one(pool: &[&BattleEntity], preference: TargetPreference) -> Option<EntityId> {
    let mut best: Option<(&BattleEntity, f64)> = None;
    for &entity in pool {
        let ratio = health_ratio(entity);
        let better = match (best, preference) {
            (None, _) => true,
            (Some(_), TargetPreference::First) => false,
            (Some((_, r)), TargetPreference::LowestHealth) => ratio < r,
            (Some((_, r)), TargetPreference::HighestHealth) => ratio > r,
        };
        if better {
            best = Some((entity, ratio));
        }
    }
    best.map(|(entity, _)| entity.id())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::EffectCalculator;
    use crate::skill::EffectDefinition;

    fn attack() -> Skill {
        Skill::new("Bite").with_effect(
            EffectDefinition::new(TargetType::SingleEnemy)
                .with(EffectCalculator::Attack { base_power: 100 }),
        )
    }

    fn mend() -> Skill {
        Skill::new("Mend").with_cooldown(3).with_effect(
            EffectDefinition::new(TargetType::SingleAlly)
                .with(EffectCalculator::Heal { base_power: 20 }),
        )
    }

    fn entity(id: u32, hp: i32, damage: i32, skills: Vec<Skill>) -> BattleEntity {
        let mut e = BattleEntity::new(EntityId::new(id), format!("e{id}"));
        let mut stats = StatsComponent::new(hp, 10, 10, 10);
        stats.apply_damage(damage);
        e.add_component(stats);
        e.add_component(SkillsComponent::new(skills));
        e
    }

    fn used_skill(action: &Action) -> Option<(usize, Vec<Vec<EntityId>>)> {
        match action {
            Action::UseSkill(a) => Some((a.skill_index, a.targets.clone())),
            _ => None,
        }
    }

    #[test]
    fn low_health_rule_heals_weakest_ally() {
        let ai = AiComponent::new()
            .with_rule(0, AiCondition::AnyAllyHealthBelow { ratio: 0.5 }, 1)
            .with_fallback(0);
        let user = entity(0, 100, 0, vec![attack(), mend()]);
        let hurt = entity(1, 100, 70, vec![]);
        let foe = entity(2, 100, 0, vec![]);

        let action = ai.determine_action(&user, &[&user, &hurt], &[&foe]);
        assert_eq!(used_skill(&action), Some((1, vec![vec![EntityId::new(1)]])));
    }

    #[test]
    fn falls_back_when_no_rule_matches() {
        let ai = AiComponent::new()
            .with_rule(0, AiCondition::SelfHealthBelow { ratio: 0.2 }, 1)
            .with_fallback(0);
        let user = entity(0, 100, 0, vec![attack(), mend()]);
        let a = entity(2, 100, 10, vec![]);
        let b = entity(3, 100, 60, vec![]);

        let action = ai.determine_action(&user, &[&user], &[&a, &b]);
        assert_eq!(used_skill(&action), Some((0, vec![vec![EntityId::new(3)]])));
    }

    #[test]
    fn lower_priority_number_wins() {
        let ai = AiComponent::new()
            .with_rule(5, AiCondition::Always, 0)
            .with_rule(1, AiCondition::Always, 1);
        let user = entity(0, 100, 0, vec![attack(), mend()]);
        let foe = entity(2, 100, 0, vec![]);
        let action = ai.determine_action(&user, &[&user], &[&foe]);
        assert_eq!(action.skill_index(), Some(1));
    }

    #[test]
    fn skips_skills_on_cooldown() {
        let mut skills = vec![mend(), attack()];
        skills[0].start_cooldown();
        let ai = AiComponent::new().with_rule(0, AiCondition::Always, 0);
        let user = entity(0, 100, 0, skills);
        let foe = entity(2, 100, 0, vec![]);
        let action = ai.determine_action(&user, &[&user], &[&foe]);
        assert_eq!(action.skill_index(), Some(1));
    }

    #[test]
    fn no_usable_skill_means_no_action() {
        let ai = AiComponent::new();
        let user = entity(0, 100, 0, vec![attack()]);
        assert_eq!(ai.determine_action(&user, &[&user], &[]), Action::NoAction);

        let bare = BattleEntity::new(EntityId::new(9), "bare");
        assert_eq!(ai.determine_action(&bare, &[&bare], &[]), Action::NoAction);
    }

    #[test]
    fn all_of_requires_every_condition() {
        let ai = AiComponent::new().with_rule(
            0,
            AiCondition::AllOf {
                conditions: vec![
                    AiCondition::EnemiesAtLeast { count: 2 },
                    AiCondition::SelfHealthBelow { ratio: 0.5 },
                ],
            },
            1,
        );
        let user = entity(0, 100, 0, vec![attack(), mend()]);
        let a = entity(2, 100, 0, vec![]);
        let b = entity(3, 100, 0, vec![]);
        let action = ai.determine_action(&user, &[&user], &[&a, &b]);
        assert_eq!(action.skill_index(), Some(0));
    }
}
