//! Battle snapshots with BLAKE3 hashing.
//!
//! A [`BattleSnapshot`] holds everything that decides how the rest of a
//! battle plays out: config, entity pool, teams, inventory, RNG state and
//! the turn counters. Session state (phase, log, observers, delegate) is not
//! part of it; restoring a snapshot puts the engine back in `Idle`.
//!
//! ```
//! use toki_battle::prelude::*;
//!
//! let hero = ComponentBundle::new("Hero").with(StatsComponent::new(40, 10, 5, 10));
//! let mut engine = BattleEngine::new(BattleConfig::default(), vec![hero], vec![]).unwrap();
//! let snapshot = engine.capture_snapshot().unwrap();
//! assert_eq!(snapshot.hash.len(), 64);
//!
//! engine.restore_from_snapshot(&snapshot).unwrap();
//! assert_eq!(engine.state_hash().unwrap(), snapshot.hash);
//! ```

use serde::{Deserialize, Serialize};
use toki_ecs::prelude::WorldSnapshot;
use tracing::debug;

use crate::action::Inventory;
use crate::components::BattleComponent;
use crate::config::BattleConfig;
use crate::engine::BattleEngine;
use crate::error::BattleError;
use crate::rng::BattleRng;
use crate::scheduler::TurnScheduler;
use crate::teams::Teams;

// ---------------------------------------------------------------------------
// BattleSnapshot
// ---------------------------------------------------------------------------

/// A serializable copy of the deterministic battle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleSnapshot {
    pub config: BattleConfig,
    pub world: WorldSnapshot<BattleComponent>,
    pub teams: Teams,
    pub inventory: Inventory,
    pub rng: BattleRng,
    pub ticks_elapsed: u64,
    pub turns_taken: u32,
    #[serde(default)]
    pub turns_without_damage: u32,
    /// BLAKE3 hex digest of every other field.
    pub hash: String,
}

#[derive(Serialize)]
struct HashableState<'a> {
    config: &'a BattleConfig,
    world: &'a WorldSnapshot<BattleComponent>,
    teams: &'a Teams,
    inventory: &'a Inventory,
    rng: &'a BattleRng,
    ticks_elapsed: u64,
    turns_taken: u32,
    turns_without_damage: u32,
}

impl HashableState<'_> {
    fn digest(&self) -> Result<String, BattleError> {
        let bytes = serde_json::to_vec(self)?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }
}

impl BattleSnapshot {
    fn hashable(&self) -> HashableState<'_> {
        HashableState {
            config: &self.config,
            world: &self.world,
            teams: &self.teams,
            inventory: &self.inventory,
            rng: &self.rng,
            ticks_elapsed: self.ticks_elapsed,
            turns_taken: self.turns_taken,
            turns_without_damage: self.turns_without_damage,
        }
    }

    /// Recompute the hash and compare it with the stored one.
    pub fn verify(&self) -> Result<(), BattleError> {
        let computed = self.hashable().digest()?;
        if computed != self.hash {
            return Err(BattleError::SnapshotHashMismatch {
                stored: self.hash.clone(),
                computed,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BattleEngine snapshot/restore
// ---------------------------------------------------------------------------

impl BattleEngine {
    /// Capture the deterministic battle state.
    pub fn capture_snapshot(&self) -> Result<BattleSnapshot, BattleError> {
        let world = self.world.capture_snapshot();
        let hash = HashableState {
            config: &self.config,
            world: &world,
            teams: &self.teams,
            inventory: &self.inventory,
            rng: &self.rng,
            ticks_elapsed: self.scheduler.ticks_elapsed(),
            turns_taken: self.turns_taken,
            turns_without_damage: self.turns_without_damage,
        }
        .digest()?;

        Ok(BattleSnapshot {
            config: self.config.clone(),
            world,
            teams: self.teams.clone(),
            inventory: self.inventory.clone(),
            rng: self.rng.clone(),
            ticks_elapsed: self.scheduler.ticks_elapsed(),
            turns_taken: self.turns_taken,
            turns_without_damage: self.turns_without_damage,
            hash,
        })
    }

    /// Restore a snapshot and return to `Idle`.
    ///
    /// The snapshot is fully validated first; on error nothing changes.
    ///
    /// # Errors
    ///
    /// [`BattleError::SnapshotHashMismatch`] when the stored hash does not
    /// match the contents, [`BattleError::InvalidConfig`] for an unusable
    /// config, and [`BattleError::World`] when the entity pool is
    /// inconsistent.
    pub fn restore_from_snapshot(&mut self, snapshot: &BattleSnapshot) -> Result<(), BattleError> {
        snapshot.verify()?;
        snapshot.config.validate()?;
        self.world.restore_from_snapshot(&snapshot.world)?;

        self.config = snapshot.config.clone();
        self.teams = snapshot.teams.clone();
        self.inventory = snapshot.inventory.clone();
        self.rng = snapshot.rng.clone();
        self.scheduler = TurnScheduler::new(&self.config);
        self.scheduler.set_ticks_elapsed(snapshot.ticks_elapsed);
        self.turns_taken = snapshot.turns_taken;
        self.turns_without_damage = snapshot.turns_without_damage;
        self.reset_session();
        debug!(hash = %snapshot.hash, "snapshot restored");
        Ok(())
    }

    /// BLAKE3 hash of the current deterministic state.
    pub fn state_hash(&self) -> Result<String, BattleError> {
        Ok(self.capture_snapshot()?.hash)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::StatsComponent;
    use toki_ecs::prelude::ComponentBundle;

    fn engine(seed: u64) -> BattleEngine {
        let hero = ComponentBundle::new("Hero").with(StatsComponent::new(40, 10, 5, 10));
        let slime = ComponentBundle::new("Slime").with(StatsComponent::new(20, 4, 1, 6));
        BattleEngine::new(BattleConfig::default().with_seed(seed), vec![hero], vec![slime]).unwrap()
    }

    #[test]
    fn identical_setups_hash_identically() {
        assert_eq!(engine(3).state_hash().unwrap(), engine(3).state_hash().unwrap());
        assert_ne!(engine(3).state_hash().unwrap(), engine(4).state_hash().unwrap());
    }

    #[test]
    fn tampered_snapshot_is_rejected_without_changes() {
        let mut e = engine(1);
        let mut snapshot = e.capture_snapshot().unwrap();
        snapshot.turns_taken = 99;
        let before = e.state_hash().unwrap();
        assert!(matches!(
            e.restore_from_snapshot(&snapshot),
            Err(BattleError::SnapshotHashMismatch { .. })
        ));
        assert_eq!(e.state_hash().unwrap(), before);
    }

    #[test]
    fn snapshot_survives_json_round_trip() {
        let e = engine(9);
        let snapshot = e.capture_snapshot().unwrap();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: BattleSnapshot = serde_json::from_str(&json).unwrap();
        back.verify().unwrap();

        let mut other = engine(0);
        other.restore_from_snapshot(&back).unwrap();
        assert_eq!(other.state_hash().unwrap(), snapshot.hash);
    }
}
