//! Team membership.

use serde::{Deserialize, Serialize};
use toki_ecs::prelude::EntityId;

/// Which side an entity fights on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Player,
    Opponent,
}

/// The two teams, each in formation order.
///
/// The union view is derived, so removing a member from its team removes it
/// from every view at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teams {
    player: Vec<EntityId>,
    opponent: Vec<EntityId>,
}

impl Teams {
    pub fn new(player: Vec<EntityId>, opponent: Vec<EntityId>) -> Self {
        Self { player, opponent }
    }

    pub fn player(&self) -> &[EntityId] {
        &self.player
    }

    pub fn opponent(&self) -> &[EntityId] {
        &self.opponent
    }

    /// Players first, then opponents.
    pub fn all(&self) -> Vec<EntityId> {
        self.player.iter().chain(&self.opponent).copied().collect()
    }

    pub fn side_of(&self, id: EntityId) -> Option<Side> {
        if self.player.contains(&id) {
            Some(Side::Player)
        } else if self.opponent.contains(&id) {
            Some(Side::Opponent)
        } else {
            None
        }
    }

    pub fn is_player(&self, id: EntityId) -> bool {
        self.side_of(id) == Some(Side::Player)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.side_of(id).is_some()
    }

    /// The team `id` belongs to (empty if it belongs to neither).
    pub fn allies_of(&self, id: EntityId) -> &[EntityId] {
        match self.side_of(id) {
            Some(Side::Player) => &self.player,
            Some(Side::Opponent) => &self.opponent,
            None => &[],
        }
    }

    /// The other team (empty if `id` belongs to neither).
    pub fn enemies_of(&self, id: EntityId) -> &[EntityId] {
        match self.side_of(id) {
            Some(Side::Player) => &self.opponent,
            Some(Side::Opponent) => &self.player,
            None => &[],
        }
    }

    /// Remove `id` from its team. Returns `false` if it was not a member.
    pub fn remove(&mut self, id: EntityId) -> bool {
        let before = self.player.len() + self.opponent.len();
        self.player.retain(|&e| e != id);
        self.opponent.retain(|&e| e != id);
        self.player.len() + self.opponent.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_updates_every_view_once() {
        let (a, b, c) = (EntityId::new(0), EntityId::new(1), EntityId::new(2));
        let mut teams = Teams::new(vec![a], vec![b, c]);
        assert_eq!(teams.all(), vec![a, b, c]);
        assert_eq!(teams.enemies_of(a), &[b, c]);

        assert!(teams.remove(b));
        assert!(!teams.remove(b));
        assert_eq!(teams.opponent(), &[c]);
        assert_eq!(teams.all(), vec![a, c]);
        assert!(!teams.contains(b));
        assert!(teams.allies_of(b).is_empty());
    }
}
