//! Turning a [`TargetType`] into concrete targets.
//!
//! `allies` always includes the user itself; both slices are expected to hold
//! only living entities, in team order.

use toki_ecs::prelude::EntityId;

use crate::rng::BattleRng;
use crate::skill::TargetType;

/// The result of expanding a target type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetResolution {
    /// Targets are known. May be empty when nobody is left to target.
    Resolved(Vec<EntityId>),
    /// Two or more candidates exist for a single-target type.
    RequiresSelection {
        target_type: TargetType,
        candidates: Vec<EntityId>,
    },
}

/// Target expansion rules.
pub struct TargetSelectionFactory;

impl TargetSelectionFactory {
    /// True exactly for the single-target types.
    pub fn requires_selection(target_type: TargetType) -> bool {
        target_type.requires_selection()
    }

    /// Every entity the target type could reach, in team order.
    pub fn candidates(
        user: EntityId,
        allies: &[EntityId],
        enemies: &[EntityId],
        target_type: TargetType,
    ) -> Vec<EntityId> {
        match target_type {
            TargetType::Ownself => vec![user],
            TargetType::SingleAlly | TargetType::AllAllies => allies.to_vec(),
            TargetType::SingleEnemy | TargetType::AllEnemies => enemies.to_vec(),
            TargetType::All => allies.iter().chain(enemies).copied().collect(),
        }
    }

    /// Expand a target type, or signal that a choice is needed.
    pub fn generate_targets(
        user: EntityId,
        allies: &[EntityId],
        enemies: &[EntityId],
        target_type: TargetType,
    ) -> TargetResolution {
        let candidates = Self::candidates(user, allies, enemies, target_type);
        if target_type.requires_selection() && candidates.len() > 1 {
            TargetResolution::RequiresSelection {
                target_type,
                candidates,
            }
        } else {
            TargetResolution::Resolved(candidates)
        }
    }

    /// Expand a target type without outside input, picking at random
    /// among single-target candidates.
    pub fn auto_resolve(
        user: EntityId,
        allies: &[EntityId],
        enemies: &[EntityId],
        target_type: TargetType,
        rng: &mut BattleRng,
    ) -> Vec<EntityId> {
        match Self::generate_targets(user, allies, enemies, target_type) {
            TargetResolution::Resolved(targets) => targets,
            TargetResolution::RequiresSelection { candidates, .. } => rng
                .pick_index(candidates.len())
                .map(|i| vec![candidates[i]])
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u32]) -> Vec<EntityId> {
        raw.iter().copied().map(EntityId::new).collect()
    }

    #[test]
    fn group_types_expand_deterministically() {
        let allies = ids(&[0, 1]);
        let enemies = ids(&[2, 3]);
        let user = EntityId::new(0);
        use TargetSelectionFactory as F;
        assert_eq!(
            F::generate_targets(user, &allies, &enemies, TargetType::Ownself),
            TargetResolution::Resolved(ids(&[0]))
        );
        assert_eq!(
            F::generate_targets(user, &allies, &enemies, TargetType::AllEnemies),
            TargetResolution::Resolved(ids(&[2, 3]))
        );
        assert_eq!(
            F::generate_targets(user, &allies, &enemies, TargetType::All),
            TargetResolution::Resolved(ids(&[0, 1, 2, 3]))
        );
    }

    #[test]
    fn single_enemy_with_two_candidates_requires_selection() {
        let resolution = TargetSelectionFactory::generate_targets(
            EntityId::new(0),
            &ids(&[0]),
            &ids(&[4, 5]),
            TargetType::SingleEnemy,
        );
        assert_eq!(
            resolution,
            TargetResolution::RequiresSelection {
                target_type: TargetType::SingleEnemy,
                candidates: ids(&[4, 5]),
            }
        );
    }

    #[test]
    fn single_enemy_with_one_candidate_auto_resolves() {
        let resolution = TargetSelectionFactory::generate_targets(
            EntityId::new(0),
            &ids(&[0]),
            &ids(&[4]),
            TargetType::SingleEnemy,
        );
        assert_eq!(resolution, TargetResolution::Resolved(ids(&[4])));
    }

    #[test]
    fn no_candidates_resolves_to_empty() {
        let resolution = TargetSelectionFactory::generate_targets(
            EntityId::new(0),
            &ids(&[0]),
            &[],
            TargetType::SingleEnemy,
        );
        assert_eq!(resolution, TargetResolution::Resolved(Vec::new()));
    }

    #[test]
    fn auto_resolve_picks_one_candidate() {
        let mut rng = BattleRng::new(11);
        let enemies = ids(&[4, 5, 6]);
        let picked = TargetSelectionFactory::auto_resolve(
            EntityId::new(0),
            &ids(&[0]),
            &enemies,
            TargetType::SingleEnemy,
            &mut rng,
        );
        assert_eq!(picked.len(), 1);
        assert!(enemies.contains(&picked[0]));
    }
}
