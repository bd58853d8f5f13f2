//! Command recording and deterministic replay.
//!
//! The engine records every accepted re-entry command in a
//! [`BattleRecorder`], next to the snapshot captured when the battle first
//! started. [`BattleRecorder::finish`] turns that into a [`ReplayLog`];
//! [`replay`] restores the log's snapshot on any engine, feeds the same
//! commands back in and compares the final state hash.
//!
//! Animations are not part of the log: replay completes every pending
//! animation as soon as it is requested.
//!
//! ```
//! use toki_battle::prelude::*;
//!
//! let strike = Skill::new("Strike").with_effect(
//!     EffectDefinition::new(TargetType::SingleEnemy)
//!         .with(EffectCalculator::Attack { base_power: 100 }),
//! );
//! let team = |name: &str| {
//!     ComponentBundle::new(name)
//!         .with(StatsComponent::new(40, 12, 4, 10).with_crit_chance(0.3))
//!         .with(SkillsComponent::new(vec![strike.clone()]))
//!         .with(StatusEffectsComponent::new())
//! };
//!
//! let mut engine = BattleEngine::new(
//!     BattleConfig::default().with_seed(5),
//!     vec![team("Hero")],
//!     vec![team("Slime").with(AiComponent::new())],
//! )
//! .unwrap();
//! engine.start_battle().unwrap();
//! while !engine.is_finished() {
//!     engine.use_skill(0).unwrap();
//! }
//! let log = engine.replay_log().unwrap();
//!
//! let mut fresh = BattleEngine::new(BattleConfig::default(), vec![], vec![]).unwrap();
//! let result = replay(&mut fresh, &log).unwrap();
//! assert!(result.matches);
//! assert_eq!(fresh.outcome(), engine.outcome());
//! ```

use serde::{Deserialize, Serialize};
use toki_ecs::prelude::EntityId;
use tracing::debug;

use crate::engine::BattleEngine;
use crate::error::BattleError;
use crate::snapshot::BattleSnapshot;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// One accepted re-entry call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleCommand {
    UseSkill { index: usize },
    UseSingleTargetSkill { target: EntityId },
    UseConsumable { name: String },
    TakeNoAction,
    CancelTargetSelection,
}

impl BattleEngine {
    /// Dispatch a recorded command to the matching re-entry call.
    pub fn apply_command(&mut self, command: &BattleCommand) -> Result<(), BattleError> {
        match command {
            BattleCommand::UseSkill { index } => self.use_skill(*index),
            BattleCommand::UseSingleTargetSkill { target } => self.use_single_target_skill(*target),
            BattleCommand::UseConsumable { name } => self.use_consumable(name),
            BattleCommand::TakeNoAction => self.take_no_action(),
            BattleCommand::CancelTargetSelection => self.cancel_target_selection(),
        }
    }

    /// Complete animations until the engine stops waiting for one.
    pub fn complete_pending_animations(&mut self) -> Result<usize, BattleError> {
        let mut completed = 0;
        while let Some(ticket) = self.pending_animation() {
            self.complete_animation(ticket)?;
            completed += 1;
        }
        Ok(completed)
    }

    /// The replay log of the battle so far.
    ///
    /// # Errors
    ///
    /// [`BattleError::NotStarted`] before the first `start_battle`.
    pub fn replay_log(&self) -> Result<ReplayLog, BattleError> {
        let recorder = self.recorder().ok_or(BattleError::NotStarted)?;
        Ok(recorder.finish(self.state_hash()?))
    }
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// Initial snapshot plus the commands accepted since.
#[derive(Debug, Clone)]
pub struct BattleRecorder {
    initial: BattleSnapshot,
    commands: Vec<BattleCommand>,
}

impl BattleRecorder {
    pub fn new(initial: BattleSnapshot) -> Self {
        Self {
            initial,
            commands: Vec::new(),
        }
    }

    pub fn record(&mut self, command: BattleCommand) {
        self.commands.push(command);
    }

    pub fn initial(&self) -> &BattleSnapshot {
        &self.initial
    }

    pub fn commands(&self) -> &[BattleCommand] {
        &self.commands
    }

    /// Package the recording with the hash the replay must reach.
    pub fn finish(&self, final_hash: String) -> ReplayLog {
        ReplayLog {
            initial_snapshot: self.initial.clone(),
            commands: self.commands.clone(),
            final_hash,
        }
    }
}

// ---------------------------------------------------------------------------
// ReplayLog / ReplayResult
// ---------------------------------------------------------------------------

/// A serializable battle recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayLog {
    /// State at the first `start_battle`.
    pub initial_snapshot: BattleSnapshot,
    pub commands: Vec<BattleCommand>,
    /// State hash when the log was taken.
    pub final_hash: String,
}

/// What happened when a [`ReplayLog`] was played back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayResult {
    pub commands_applied: usize,
    pub final_hash: String,
    /// Whether `final_hash` equals the log's recorded hash.
    pub matches: bool,
}

/// Play `log` back on `engine`.
///
/// Session state of `engine` (log lines, phase) is replaced; observers,
/// subscriptions and the delegate are kept.
///
/// # Errors
///
/// Fails if the initial snapshot is rejected or a recorded command is
/// refused during playback. Both indicate the log does not belong to a
/// deterministic run of this engine version.
pub fn replay(engine: &mut BattleEngine, log: &ReplayLog) -> Result<ReplayResult, BattleError> {
    engine.restore_from_snapshot(&log.initial_snapshot)?;
    engine.start_battle()?;
    engine.complete_pending_animations()?;

    for command in &log.commands {
        engine.apply_command(command)?;
        engine.complete_pending_animations()?;
    }

    let final_hash = engine.state_hash()?;
    let matches = final_hash == log.final_hash;
    debug!(commands = log.commands.len(), matches, "replay finished");
    Ok(ReplayResult {
        commands_applied: log.commands.len(),
        final_hash,
        matches,
    })
}
