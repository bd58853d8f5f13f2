//! The battle orchestrator.
//!
//! [`BattleEngine`] owns the entity pool, the teams and every per-battle
//! service, and is the only writer of battle state. It never blocks: whenever
//! it needs outside input (a skill choice, a target choice, or the end of an
//! animation) it records the suspend point in [`BattlePhase`] and returns.
//! The host resumes it through one of the re-entry calls.
//!
//! ```text
//! Idle ──start_battle──▶ Running ─┬─▶ AwaitingSkillChoice ──use_skill──┐
//!                          ▲      ├─▶ AwaitingTargetChoice ─select─────┤
//!                          │      ├─▶ AwaitingAnimation ─complete──────┤
//!                          └──────┴────────────────────────────────────┘
//!                                 └─▶ Finished
//! ```
//!
//! Every re-entry call returns `Err` without touching state when it does not
//! fit the current phase, so hosts may ignore the error and re-prompt.
//!
//! # Example
//!
//! ```
//! use toki_battle::prelude::*;
//!
//! let strike = Skill::new("Strike").with_effect(
//!     EffectDefinition::new(TargetType::SingleEnemy)
//!         .with(EffectCalculator::Attack { base_power: 100 }),
//! );
//! let hero = ComponentBundle::new("Hero")
//!     .with(StatsComponent::new(60, 20, 5, 12))
//!     .with(SkillsComponent::new(vec![strike.clone()]))
//!     .with(StatusEffectsComponent::new());
//! let slime = ComponentBundle::new("Slime")
//!     .with(StatsComponent::new(30, 8, 2, 8))
//!     .with(SkillsComponent::new(vec![strike]))
//!     .with(StatusEffectsComponent::new())
//!     .with(AiComponent::new());
//!
//! let mut engine = BattleEngine::new(BattleConfig::default(), vec![hero], vec![slime]).unwrap();
//! engine.start_battle().unwrap();
//! assert!(matches!(engine.phase(), BattlePhase::AwaitingSkillChoice { .. }));
//!
//! while !engine.is_finished() {
//!     engine.use_skill(0).unwrap();
//! }
//! assert_eq!(engine.outcome(), Some(Outcome::Victory));
//! assert!(engine.log().contains("You won the battle!"));
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use toki_ecs::prelude::{ComponentBundle, EntityId};
use tracing::{debug, info, warn};

use crate::action::{Action, Inventory, UseConsumableAction, UseSkillAction};
use crate::ai::AiComponent;
use crate::components::{BattleComponent, BattleEntity, BattleWorld, SkillsComponent, StatsComponent};
use crate::config::{BattleConfig, ConfigError};
use crate::effect::{EffectContext, EffectKind, EffectResult};
use crate::error::BattleError;
use crate::events::{ActionSummary, BattleEvent, EventBus};
use crate::log::{BattleLog, BattleLogObserver};
use crate::presentation::{AnimationTicket, BattleEffectsDelegate, NullDelegate, Playback, SkillChoice};
use crate::replay::{BattleCommand, BattleRecorder};
use crate::rng::BattleRng;
use crate::scheduler::TurnScheduler;
use crate::skill::TargetType;
use crate::status::{StatusEffectsComponent, StatusEngine};
use crate::targeting::{TargetResolution, TargetSelectionFactory};
use crate::teams::Teams;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// How a finished battle ended, from the player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Victory,
    Defeat,
    Draw,
}

impl Outcome {
    /// The closing battle log line.
    pub fn log_line(self) -> &'static str {
        match self {
            Outcome::Victory => "You won the battle!",
            Outcome::Defeat => "You lost the battle...",
            Outcome::Draw => "The battle ended in a draw.",
        }
    }
}

/// Where the orchestrator currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum BattlePhase {
    Idle,
    /// Only observable from inside event handlers and delegate calls.
    Running,
    AwaitingSkillChoice {
        entity: EntityId,
    },
    AwaitingTargetChoice {
        entity: EntityId,
        skill_index: usize,
        target_type: TargetType,
        candidates: Vec<EntityId>,
    },
    AwaitingAnimation {
        entity: EntityId,
        ticket: AnimationTicket,
    },
    Finished {
        outcome: Outcome,
    },
}

/// Whether control should keep flowing or return to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Suspend,
}

#[derive(Debug, Clone, Copy)]
enum PresentationStep {
    SkillUse {
        entity: EntityId,
        is_ally: bool,
    },
    HealthBar {
        entity: EntityId,
        current: i32,
        max: i32,
    },
}

#[derive(Debug)]
struct TurnInProgress {
    actor: EntityId,
    used_skill: Option<usize>,
    pending: VecDeque<PresentationStep>,
    /// Cooldowns, modifiers and status ticks already ran.
    bookkeeping_done: bool,
    dealt_damage: bool,
}

impl TurnInProgress {
    fn new(actor: EntityId) -> Self {
        Self {
            actor,
            used_skill: None,
            pending: VecDeque::new(),
            bookkeeping_done: false,
            dealt_damage: false,
        }
    }
}

// ---------------------------------------------------------------------------
// BattleEngine
// ---------------------------------------------------------------------------

/// One battle session.
pub struct BattleEngine {
    pub(crate) config: BattleConfig,
    pub(crate) world: BattleWorld,
    pub(crate) teams: Teams,
    pub(crate) scheduler: TurnScheduler,
    pub(crate) rng: BattleRng,
    status_engine: StatusEngine,
    pub(crate) inventory: Inventory,
    log: BattleLog,
    events: EventBus,
    delegate: Box<dyn BattleEffectsDelegate>,
    phase: BattlePhase,
    turn: Option<TurnInProgress>,
    next_ticket: u64,
    pub(crate) turns_taken: u32,
    /// Consecutive completed turns in which nobody lost health.
    pub(crate) turns_without_damage: u32,
    recorder: Option<BattleRecorder>,
}

impl std::fmt::Debug for BattleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BattleEngine")
            .field("phase", &self.phase)
            .field("teams", &self.teams)
            .field("turns_taken", &self.turns_taken)
            .field("entities", &self.world.entity_count())
            .finish_non_exhaustive()
    }
}

impl BattleEngine {
    /// Build a battle from two already-assembled teams.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` fails validation.
    pub fn new(
        config: BattleConfig,
        player: Vec<ComponentBundle<BattleComponent>>,
        opponent: Vec<ComponentBundle<BattleComponent>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut world = BattleWorld::new();
        let player: Vec<EntityId> = player.into_iter().map(|b| world.spawn_bundle(b)).collect();
        let opponent: Vec<EntityId> = opponent.into_iter().map(|b| world.spawn_bundle(b)).collect();

        Ok(Self {
            scheduler: TurnScheduler::new(&config),
            rng: BattleRng::new(config.seed),
            config,
            world,
            teams: Teams::new(player, opponent),
            status_engine: StatusEngine,
            inventory: Inventory::new(),
            log: BattleLog::new(),
            events: EventBus::new(),
            delegate: Box::new(NullDelegate),
            phase: BattlePhase::Idle,
            turn: None,
            next_ticket: 0,
            turns_taken: 0,
            turns_without_damage: 0,
            recorder: None,
        })
    }

    pub fn with_delegate(mut self, delegate: impl BattleEffectsDelegate + 'static) -> Self {
        self.delegate = Box::new(delegate);
        self
    }

    pub fn with_inventory(mut self, inventory: Inventory) -> Self {
        self.inventory = inventory;
        self
    }

    pub fn add_log_observer(&mut self, observer: impl BattleLogObserver + 'static) {
        self.log.add_observer(observer);
    }

    /// The event bus, for subscribing.
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    // -- accessors ----------------------------------------------------------

    pub fn phase(&self) -> &BattlePhase {
        &self.phase
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    pub fn world(&self) -> &BattleWorld {
        &self.world
    }

    pub fn teams(&self) -> &Teams {
        &self.teams
    }

    pub fn log(&self) -> &BattleLog {
        &self.log
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn turns_taken(&self) -> u32 {
        self.turns_taken
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, BattlePhase::Finished { .. })
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            BattlePhase::Finished { outcome } => Some(outcome),
            _ => None,
        }
    }

    /// The entity whose turn is being resolved, if any.
    pub fn current_actor(&self) -> Option<EntityId> {
        self.turn.as_ref().map(|t| t.actor)
    }

    /// The ticket of the animation in flight, if the engine waits for one.
    pub fn pending_animation(&self) -> Option<AnimationTicket> {
        match self.phase {
            BattlePhase::AwaitingAnimation { ticket, .. } => Some(ticket),
            _ => None,
        }
    }

    /// Re-entry commands accepted since the battle (re)started.
    pub fn history(&self) -> &[BattleCommand] {
        self.recorder
            .as_ref()
            .map(BattleRecorder::commands)
            .unwrap_or_default()
    }

    pub fn recorder(&self) -> Option<&BattleRecorder> {
        self.recorder.as_ref()
    }

    /// Whether `id` is alive and still on a team.
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.teams.contains(id) && self.has_living_stats(id)
    }

    fn has_living_stats(&self, id: EntityId) -> bool {
        self.world
            .get_component::<StatsComponent>(id)
            .is_some_and(StatsComponent::is_alive)
    }

    fn living(&self, ids: &[EntityId]) -> Vec<EntityId> {
        ids.iter().copied().filter(|&id| self.has_living_stats(id)).collect()
    }

    fn living_entities(&self, ids: &[EntityId]) -> Vec<&BattleEntity> {
        ids.iter()
            .filter(|&&id| self.has_living_stats(id))
            .filter_map(|&id| self.world.get(id))
            .collect()
    }

    fn name_of(&self, id: EntityId) -> String {
        self.world
            .get(id)
            .map_or_else(|| id.to_string(), |e| e.name().to_string())
    }

    fn is_interactive(&self, id: EntityId) -> bool {
        self.teams.is_player(id) && !self.world.has_component::<AiComponent>(id)
    }

    /// What the skill picker should show for `id`.
    pub fn skill_choices(&self, id: EntityId) -> Vec<SkillChoice> {
        self.world
            .get_component::<SkillsComponent>(id)
            .map(|skills| {
                skills
                    .iter()
                    .map(|skill| SkillChoice {
                        name: skill.name.clone(),
                        icon: skill.icon.clone(),
                        cooldown: skill.current_cooldown,
                        ready: skill.is_ready(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    // -- re-entry calls -----------------------------------------------------

    /// Begin the battle and run until the first suspend point.
    ///
    /// The first call captures the initial snapshot used by [`restart`].
    ///
    /// [`restart`]: Self::restart
    pub fn start_battle(&mut self) -> Result<(), BattleError> {
        match self.phase {
            BattlePhase::Idle => {}
            BattlePhase::Finished { .. } => return self.reject(BattleError::BattleFinished),
            _ => return self.reject(BattleError::AlreadyStarted),
        }
        if self.recorder.is_none() {
            let initial = self.capture_snapshot()?;
            self.recorder = Some(BattleRecorder::new(initial));
        }

        info!(
            players = self.teams.player().len(),
            opponents = self.teams.opponent().len(),
            seed = self.config.seed,
            "battle started"
        );
        self.phase = BattlePhase::Running;
        self.log.push("The battle begins!");
        self.events.publish(&BattleEvent::BattleStarted);
        self.advance();
        Ok(())
    }

    /// Use skill `index` of the entity awaiting a skill choice.
    ///
    /// Single-target skills with two or more candidates move to
    /// [`BattlePhase::AwaitingTargetChoice`] instead of acting.
    pub fn use_skill(&mut self, index: usize) -> Result<(), BattleError> {
        self.ensure_active()?;
        let BattlePhase::AwaitingSkillChoice { entity } = self.phase else {
            return self.reject(BattleError::NotAwaitingSkillChoice);
        };

        let skill = match self.world.get_component::<SkillsComponent>(entity) {
            Some(skills) => match skills.get(index) {
                Some(skill) => skill.clone(),
                None => {
                    let len = skills.len();
                    return self.reject(BattleError::SkillIndexOutOfRange { index, len });
                }
            },
            None => return self.reject(BattleError::SkillIndexOutOfRange { index, len: 0 }),
        };
        if !skill.is_ready() {
            return self.reject(BattleError::SkillOnCooldown {
                name: skill.name,
                remaining: skill.current_cooldown,
            });
        }

        let allies = self.living(self.teams.allies_of(entity));
        let enemies = self.living(self.teams.enemies_of(entity));
        let mut targets = Vec::with_capacity(skill.effects.len());
        let mut selection = None;
        for definition in &skill.effects {
            match TargetSelectionFactory::generate_targets(entity, &allies, &enemies, definition.target) {
                TargetResolution::Resolved(resolved) => targets.push(resolved),
                TargetResolution::RequiresSelection {
                    target_type,
                    candidates,
                } => {
                    if selection.is_none() {
                        selection = Some((target_type, candidates));
                    }
                    targets.push(Vec::new());
                }
            }
        }

        if let Some((target_type, candidates)) = selection {
            self.record(BattleCommand::UseSkill { index });
            if target_type.is_allied() {
                self.delegate.prompt_ally_target_selection(&candidates);
            } else {
                self.delegate.prompt_enemy_target_selection(&candidates);
            }
            self.events.publish(&BattleEvent::AwaitingTargetChoice {
                entity,
                candidates: candidates.clone(),
            });
            self.phase = BattlePhase::AwaitingTargetChoice {
                entity,
                skill_index: index,
                target_type,
                candidates,
            };
            return Ok(());
        }

        if targets.iter().all(Vec::is_empty) {
            return self.reject(BattleError::NoValidTargets { name: skill.name });
        }

        self.record(BattleCommand::UseSkill { index });
        let action = Action::UseSkill(UseSkillAction {
            user: entity,
            skill_index: index,
            targets,
        });
        self.run_player_action(entity, action);
        Ok(())
    }

    /// Finish a pending single-target skill with `target`.
    pub fn use_single_target_skill(&mut self, target: EntityId) -> Result<(), BattleError> {
        self.ensure_active()?;
        let BattlePhase::AwaitingTargetChoice {
            entity,
            skill_index,
            ref candidates,
            ..
        } = self.phase
        else {
            return self.reject(BattleError::NotAwaitingTargetChoice);
        };
        if !candidates.contains(&target) {
            return self.reject(BattleError::TargetNotSelectable { target });
        }
        let Some(skill) = self
            .world
            .get_component::<SkillsComponent>(entity)
            .and_then(|skills| skills.get(skill_index))
            .cloned()
        else {
            return self.reject(BattleError::SkillIndexOutOfRange {
                index: skill_index,
                len: 0,
            });
        };

        let allies = self.living(self.teams.allies_of(entity));
        let enemies = self.living(self.teams.enemies_of(entity));
        let targets = skill
            .effects
            .iter()
            .map(|definition| {
                let reachable =
                    TargetSelectionFactory::candidates(entity, &allies, &enemies, definition.target);
                if definition.target.requires_selection() && reachable.contains(&target) {
                    vec![target]
                } else {
                    TargetSelectionFactory::auto_resolve(
                        entity,
                        &allies,
                        &enemies,
                        definition.target,
                        &mut self.rng,
                    )
                }
            })
            .collect();

        self.record(BattleCommand::UseSingleTargetSkill { target });
        let action = Action::UseSkill(UseSkillAction {
            user: entity,
            skill_index,
            targets,
        });
        self.run_player_action(entity, action);
        Ok(())
    }

    /// Back out of a pending target choice to the skill picker.
    pub fn cancel_target_selection(&mut self) -> Result<(), BattleError> {
        self.ensure_active()?;
        let BattlePhase::AwaitingTargetChoice { entity, .. } = self.phase else {
            return self.reject(BattleError::NotAwaitingTargetChoice);
        };
        self.record(BattleCommand::CancelTargetSelection);
        self.await_skill_choice(entity);
        Ok(())
    }

    /// Use the first inventory item called `name` on the acting entity.
    pub fn use_consumable(&mut self, name: &str) -> Result<(), BattleError> {
        self.ensure_active()?;
        let BattlePhase::AwaitingSkillChoice { entity } = self.phase else {
            return self.reject(BattleError::NotAwaitingSkillChoice);
        };
        let Some(consumable) = self
            .inventory
            .find_by_name(name)
            .map(|item| item.id)
            .and_then(|id| self.inventory.take(id))
        else {
            return self.reject(BattleError::UnknownConsumable {
                name: name.to_string(),
            });
        };

        self.record(BattleCommand::UseConsumable {
            name: name.to_string(),
        });
        let action = Action::UseConsumable(UseConsumableAction {
            user: entity,
            consumable,
            targets: vec![entity],
        });
        self.run_player_action(entity, action);
        Ok(())
    }

    /// Pass the acting entity's turn.
    pub fn take_no_action(&mut self) -> Result<(), BattleError> {
        self.ensure_active()?;
        let BattlePhase::AwaitingSkillChoice { entity } = self.phase else {
            return self.reject(BattleError::NotAwaitingSkillChoice);
        };
        self.record(BattleCommand::TakeNoAction);
        self.run_player_action(entity, Action::NoAction);
        Ok(())
    }

    /// Resume after the delegate finished the animation for `ticket`.
    pub fn complete_animation(&mut self, ticket: AnimationTicket) -> Result<(), BattleError> {
        self.ensure_active()?;
        let BattlePhase::AwaitingAnimation {
            ticket: expected, ..
        } = self.phase
        else {
            return self.reject(BattleError::NotAwaitingAnimation);
        };
        if ticket != expected {
            return self.reject(BattleError::StaleAnimationTicket {
                expected,
                got: ticket,
            });
        }
        self.phase = BattlePhase::Running;
        if self.play_presentation() == Flow::Continue {
            self.advance();
        }
        Ok(())
    }

    /// Reset every entity and team to the state captured at the first
    /// [`start_battle`](Self::start_battle), then start again.
    pub fn restart(&mut self) -> Result<(), BattleError> {
        let Some(initial) = self.recorder.as_ref().map(|r| r.initial().clone()) else {
            return self.reject(BattleError::NotStarted);
        };
        self.restore_from_snapshot(&initial)?;
        info!("battle restarted");
        self.start_battle()
    }

    /// Drop all per-session progress and return to `Idle`.
    pub(crate) fn reset_session(&mut self) {
        self.turn = None;
        self.phase = BattlePhase::Idle;
        self.recorder = None;
        self.log.clear();
        self.delegate.update_skill_choices(None);
    }

    // -- internals ----------------------------------------------------------

    fn reject<T>(&self, error: BattleError) -> Result<T, BattleError> {
        debug!(%error, phase = ?self.phase, "command rejected");
        Err(error)
    }

    fn ensure_active(&self) -> Result<(), BattleError> {
        match self.phase {
            BattlePhase::Idle => self.reject(BattleError::NotStarted),
            BattlePhase::Finished { .. } => self.reject(BattleError::BattleFinished),
            _ => Ok(()),
        }
    }

    fn record(&mut self, command: BattleCommand) {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record(command);
        }
    }

    fn issue_ticket(&mut self) -> AnimationTicket {
        let ticket = AnimationTicket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    fn await_skill_choice(&mut self, entity: EntityId) {
        let choices = self.skill_choices(entity);
        self.delegate.update_skill_choices(Some(&choices));
        self.phase = BattlePhase::AwaitingSkillChoice { entity };
        self.events.publish(&BattleEvent::AwaitingSkillChoice { entity });
    }

    fn run_player_action(&mut self, actor: EntityId, action: Action) {
        self.phase = BattlePhase::Running;
        self.delegate.update_skill_choices(None);
        if self.perform(actor, action) == Flow::Continue {
            self.advance();
        }
    }

    /// Scheduling loop: runs turns until a suspend point or the end.
    fn advance(&mut self) {
        loop {
            if self.finish_if_decided() {
                return;
            }
            if let Some(max_turns) = self.config.max_turns {
                if self.turns_taken >= max_turns {
                    info!(max_turns, "turn limit reached");
                    self.finish(Outcome::Draw);
                    return;
                }
            }
            if self.turns_without_damage >= self.config.stalemate_turns {
                warn!(
                    turns = self.turns_without_damage,
                    "no damage dealt for too long; ending the battle"
                );
                self.finish(Outcome::Draw);
                return;
            }

            let order = self.teams.all();
            let Some(actor) = self.scheduler.next_ready(&mut self.world, &order) else {
                warn!(
                    ticks = self.scheduler.ticks_elapsed(),
                    "scheduler stalled; ending the battle"
                );
                self.finish(Outcome::Draw);
                return;
            };

            if self.begin_turn(actor) == Flow::Suspend {
                return;
            }
        }
    }

    fn begin_turn(&mut self, actor: EntityId) -> Flow {
        debug!(entity = %actor, "turn started");
        self.turn = Some(TurnInProgress::new(actor));
        self.events.publish(&BattleEvent::TurnStarted { entity: actor });

        let immobilized = self
            .world
            .get_component::<StatusEffectsComponent>(actor)
            .and_then(StatusEffectsComponent::immobilized_by);
        if let Some(status) = immobilized {
            let name = self.name_of(actor);
            self.log
                .push(format!("{name} is {} and cannot move!", status.adjective()));
            self.events.publish(&BattleEvent::TurnSkipped {
                entity: actor,
                status,
            });
            return self.play_presentation();
        }

        if self.is_interactive(actor) {
            self.await_skill_choice(actor);
            return Flow::Suspend;
        }

        let action = self.ai_action(actor);
        self.perform(actor, action)
    }

    fn ai_action(&self, actor: EntityId) -> Action {
        let Some(user) = self.world.get(actor) else {
            return Action::NoAction;
        };
        let allies = self.living_entities(self.teams.allies_of(actor));
        let enemies = self.living_entities(self.teams.enemies_of(actor));
        match user.get_component::<AiComponent>() {
            Some(ai) => ai.determine_action(user, &allies, &enemies),
            None => AiComponent::default().determine_action(user, &allies, &enemies),
        }
    }

    /// Execute one action and queue its presentation.
    fn perform(&mut self, actor: EntityId, action: Action) -> Flow {
        let name = self.name_of(actor);
        let summary = match &action {
            Action::UseSkill(a) => ActionSummary::Skill {
                index: a.skill_index,
                name: self
                    .world
                    .get_component::<SkillsComponent>(actor)
                    .and_then(|s| s.get(a.skill_index))
                    .map_or_else(String::new, |s| s.name.clone()),
            },
            Action::UseConsumable(a) => ActionSummary::Consumable {
                name: a.consumable.name.clone(),
            },
            Action::NoAction => ActionSummary::NoAction,
        };
        match &summary {
            ActionSummary::Skill { name: skill, .. } => self.log.push(format!("{name} used {skill}!")),
            ActionSummary::Consumable { name: item } => self.log.push(format!("{name} used {item}!")),
            ActionSummary::NoAction => self.log.push(format!("{name} took no action.")),
        }
        self.events.publish(&BattleEvent::ActionExecuted {
            user: actor,
            action: summary,
        });

        let results = {
            let mut ctx = EffectContext {
                config: &self.config,
                rng: &mut self.rng,
                applier: &mut self.status_engine,
            };
            action.execute(&mut self.world, &mut ctx)
        };
        for result in &results {
            self.record_result(Some(actor), result);
        }

        let mut steps = VecDeque::new();
        if action != Action::NoAction {
            steps.push_back(PresentationStep::SkillUse {
                entity: actor,
                is_ally: self.teams.is_player(actor),
            });
        }
        let mut touched: Vec<EntityId> = Vec::new();
        for result in results.iter().filter(|r| r.touches_health()) {
            if !touched.contains(&result.target) {
                touched.push(result.target);
            }
        }
        for entity in touched {
            if let Some(stats) = self.world.get_component::<StatsComponent>(entity) {
                steps.push_back(PresentationStep::HealthBar {
                    entity,
                    current: stats.current_health,
                    max: stats.max_health,
                });
            }
        }

        if let Some(turn) = self.turn.as_mut() {
            turn.used_skill = action.skill_index();
            turn.pending = steps;
        }
        self.play_presentation()
    }

    fn record_result(&mut self, source: Option<EntityId>, result: &EffectResult) {
        if result.kind == EffectKind::Damage && result.value > 0 {
            if let Some(turn) = self.turn.as_mut() {
                turn.dealt_damage = true;
            }
        }
        if !result.description.is_empty() {
            self.log.push(result.description.clone());
        }
        self.events.publish(&BattleEvent::EffectApplied {
            source,
            result: result.clone(),
        });
    }

    /// Hand queued steps to the delegate until one is pending.
    fn play_presentation(&mut self) -> Flow {
        loop {
            let Some(turn) = self.turn.as_mut() else {
                return Flow::Continue;
            };
            let actor = turn.actor;
            let Some(step) = turn.pending.pop_front() else {
                if turn.bookkeeping_done {
                    break;
                }
                turn.bookkeeping_done = true;
                self.end_of_turn_bookkeeping();
                continue;
            };
            let ticket = self.issue_ticket();
            let playback = match step {
                PresentationStep::SkillUse { entity, is_ally } => {
                    self.delegate.show_skill_use(entity, is_ally, ticket)
                }
                PresentationStep::HealthBar {
                    entity,
                    current,
                    max,
                } => self.delegate.update_health_bar(entity, current, max, ticket),
            };
            if playback == Playback::Pending {
                self.phase = BattlePhase::AwaitingAnimation {
                    entity: actor,
                    ticket,
                };
                return Flow::Suspend;
            }
        }
        self.phase = BattlePhase::Running;
        self.close_turn();
        Flow::Continue
    }

    /// Meter, cooldowns, modifiers and status ticks of the acting entity.
    /// A status tick that changes health queues a health bar for the owner.
    fn end_of_turn_bookkeeping(&mut self) {
        let Some((actor, used_skill)) = self.turn.as_ref().map(|t| (t.actor, t.used_skill)) else {
            return;
        };
        self.scheduler.consume(&mut self.world, actor);

        let mut status_results = Vec::new();
        if let Some(entity) = self.world.get_mut(actor) {
            if let Some(skills) = entity.get_component_mut::<SkillsComponent>() {
                skills.tick_cooldowns(used_skill);
            }
            if let Some(stats) = entity.get_component_mut::<StatsComponent>() {
                stats.tick_modifiers();
            }
            status_results = self.status_engine.tick_end_of_turn(entity);
        }
        for result in &status_results {
            self.record_result(None, result);
        }

        if !status_results.iter().any(EffectResult::touches_health) {
            return;
        }
        let Some(step) = self
            .world
            .get_component::<StatsComponent>(actor)
            .map(|stats| PresentationStep::HealthBar {
                entity: actor,
                current: stats.current_health,
                max: stats.max_health,
            })
        else {
            return;
        };
        if let Some(turn) = self.turn.as_mut() {
            turn.pending.push_back(step);
        }
    }

    /// Count the turn, then run the death check.
    fn close_turn(&mut self) {
        let Some(turn) = self.turn.take() else {
            return;
        };
        self.turns_taken += 1;
        self.turns_without_damage = if turn.dealt_damage {
            0
        } else {
            self.turns_without_damage.saturating_add(1)
        };
        self.events.publish(&BattleEvent::TurnEnded { entity: turn.actor });
        self.remove_defeated();
    }

    /// Remove every team member that is no longer alive, exactly once.
    fn remove_defeated(&mut self) {
        let defeated: Vec<EntityId> = self
            .teams
            .all()
            .into_iter()
            .filter(|&id| !self.has_living_stats(id))
            .collect();
        for id in defeated {
            if !self.teams.remove(id) {
                continue;
            }
            let name = self.name_of(id);
            if let Err(err) = self.world.despawn(id) {
                warn!(entity = %id, %err, "defeated entity was already gone");
            }
            debug!(entity = %id, "entity defeated");
            self.log.push(format!("{name} was defeated!"));
            self.events.publish(&BattleEvent::EntityDefeated { entity: id });
            self.delegate.remove_defeated(id);
        }
    }

    /// Finish the battle if a team has no living member left.
    fn finish_if_decided(&mut self) -> bool {
        if self.is_finished() {
            return true;
        }
        let players = !self.living(self.teams.player()).is_empty();
        let opponents = !self.living(self.teams.opponent()).is_empty();
        let outcome = match (players, opponents) {
            (true, true) => return false,
            (true, false) => Outcome::Victory,
            (false, true) => Outcome::Defeat,
            (false, false) => Outcome::Draw,
        };
        self.finish(outcome);
        true
    }

    fn finish(&mut self, outcome: Outcome) {
        self.log.push(outcome.log_line());
        info!(?outcome, turns = self.turns_taken, "battle finished");
        self.turn = None;
        self.phase = BattlePhase::Finished { outcome };
        self.delegate.update_skill_choices(None);
        self.events.publish(&BattleEvent::BattleEnded { outcome });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
