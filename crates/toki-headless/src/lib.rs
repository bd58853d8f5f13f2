//! Headless battle host.
//!
//! Loads a JSON roster, runs one battle to completion with the player team on
//! autopilot and reports the outcome. No presentation layer is involved; the
//! battle log is forwarded to `tracing`.
//!
//! ```bash
//! toki-headless --roster rosters/duel.json --seed 7 --json-summary
//! ```
//!
//! ## Roster format
//!
//! ```json
//! {
//!   "config": { "seed": 3, "max_turns": 200 },
//!   "players": [
//!     { "name": "Hero",
//!       "stats": { "max_health": 80, "attack": 18, "defense": 6, "speed": 12 },
//!       "skills": [ { "name": "Slash", "effects": [
//!         { "target": "single_enemy",
//!           "calculators": [ { "type": "attack", "base_power": 100 } ] } ] } ] }
//!   ],
//!   "opponents": [ ... ],
//!   "inventory": [ { "name": "Potion", "effect": { "type": "heal", "base_power": 30 } } ]
//! }
//! ```

#![deny(unsafe_code)]

pub mod cli;
pub mod roster;
pub mod runner;

pub use roster::{EntitySpec, ItemSpec, RosterFile, StatsSpec};
pub use runner::{run_battle, BattleSummary, CombatantSummary, RunOptions};
