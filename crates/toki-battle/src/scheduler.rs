//! Speed-driven action meter scheduling.
//!
//! Each tick, every living entity in the turn order gains
//! `effective_speed * meter_rate` meter (scaled down while paralyzed). An
//! entity whose meter reaches the threshold is *ready*. Among several ready
//! entities, the highest meter wins, then the highest speed, then the entity
//! earliest in the turn order.
//!
//! Immobilized entities keep accumulating meter; the orchestrator skips their
//! turn once they are picked.
//!
//! # Example
//!
//! ```
//! use toki_battle::prelude::*;
//!
//! let mut world = BattleWorld::new();
//! let slow = world.spawn_bundle(ComponentBundle::new("Slow").with(StatsComponent::new(10, 1, 1, 10)));
//! let fast = world.spawn_bundle(ComponentBundle::new("Fast").with(StatsComponent::new(10, 1, 1, 25)));
//!
//! let mut scheduler = TurnScheduler::new(&BattleConfig::default());
//! assert_eq!(scheduler.next_ready(&mut world, &[slow, fast]), Some(fast));
//! ```

use serde::{Deserialize, Serialize};
use toki_ecs::prelude::EntityId;
use tracing::{debug, warn};

use crate::components::{BattleWorld, StatsComponent};
use crate::config::BattleConfig;
use crate::status::StatusEffectsComponent;

/// Meter bookkeeping for one battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnScheduler {
    meter_rate: f64,
    threshold: f64,
    paralysis_factor: f64,
    max_idle_ticks: u32,
    ticks_elapsed: u64,
}

impl TurnScheduler {
    pub fn new(config: &BattleConfig) -> Self {
        Self {
            meter_rate: config.meter_rate,
            threshold: config.meter_threshold,
            paralysis_factor: config.paralysis_speed_factor,
            max_idle_ticks: config.max_idle_ticks,
            ticks_elapsed: 0,
        }
    }

    /// Total ticks simulated so far.
    pub fn ticks_elapsed(&self) -> u64 {
        self.ticks_elapsed
    }

    pub(crate) fn set_ticks_elapsed(&mut self, ticks: u64) {
        self.ticks_elapsed = ticks;
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Advance every living entity's meter by one tick.
    pub fn tick(&mut self, world: &mut BattleWorld, order: &[EntityId]) {
        for &id in order {
            let paralyzed = world
                .get_component::<StatusEffectsComponent>(id)
                .is_some_and(|s| s.iter().any(|e| e.kind.slows_meter()));
            let Some(stats) = world.get_component_mut::<StatsComponent>(id) else {
                continue;
            };
            if !stats.is_alive() {
                continue;
            }
            let mut gain = f64::from(stats.effective_speed()) * self.meter_rate;
            if paralyzed {
                gain *= self.paralysis_factor;
            }
            stats.action_meter += gain;
        }
        self.ticks_elapsed += 1;
    }

    /// The ready entity that acts first, without ticking.
    pub fn ready_entity(&self, world: &BattleWorld, order: &[EntityId]) -> Option<EntityId> {
        let mut best: Option<(EntityId, f64, i32)> = None;
        for &id in order {
            let Some(stats) = world.get_component::<StatsComponent>(id) else {
                continue;
            };
            if !stats.is_alive() || stats.action_meter < self.threshold {
                continue;
            }
            let (meter, speed) = (stats.action_meter, stats.effective_speed());
            let better = match best {
                None => true,
                Some((_, best_meter, best_speed)) => {
                    meter > best_meter || (meter == best_meter && speed > best_speed)
                }
            };
            if better {
                best = Some((id, meter, speed));
            }
        }
        best.map(|(id, _, _)| id)
    }

    /// Tick until someone is ready, bounded by `max_idle_ticks`.
    ///
    /// Returns `None` when nobody became ready in time (for example when
    /// every living entity has zero speed).
    pub fn next_ready(&mut self, world: &mut BattleWorld, order: &[EntityId]) -> Option<EntityId> {
        if let Some(id) = self.ready_entity(world, order) {
            return Some(id);
        }
        for _ in 0..self.max_idle_ticks {
            self.tick(world, order);
            if let Some(id) = self.ready_entity(world, order) {
                debug!(entity = %id, ticks = self.ticks_elapsed, "entity ready");
                return Some(id);
            }
        }
        warn!(
            max_idle_ticks = self.max_idle_ticks,
            "no entity became ready within the tick budget"
        );
        None
    }

    /// Reset an entity's meter after its turn.
    pub fn consume(&self, world: &mut BattleWorld, id: EntityId) {
        if let Some(stats) = world.get_component_mut::<StatsComponent>(id) {
            stats.action_meter = 0.0;
        }
    }
}
