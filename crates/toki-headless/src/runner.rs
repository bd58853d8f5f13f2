//! Headless battle execution.
//!
//! Runs a battle without presentation: the effects delegate is the engine's
//! [`NullDelegate`], battle-log lines are forwarded to `tracing`, and the
//! player team is auto-piloted.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use toki_battle::prelude::*;
use tracing::{debug, info};

use crate::roster::RosterFile;

/// Upper bound on re-entry calls issued by the autopilot in one battle.
const MAX_COMMANDS: usize = 100_000;

/// Health ratio below which the autopilot reaches for a consumable.
const CONSUMABLE_HEALTH_RATIO: f64 = 0.3;

/// Overrides applied on top of the roster's config.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub seed: Option<u64>,
    pub max_turns: Option<u32>,
}

/// Result of a completed headless battle.
#[derive(Debug, Clone, Serialize)]
pub struct BattleSummary {
    pub outcome: Outcome,
    pub turns: u32,
    pub seed: u64,
    pub combatants: Vec<CombatantSummary>,
    pub log: Vec<String>,
    pub final_hash: String,
    /// Number of player commands the battle took.
    pub commands: usize,
    #[serde(skip)]
    pub replay: ReplayLog,
}

/// Statistics for a single combatant after the battle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombatantSummary {
    pub name: String,
    pub side: Side,
    pub max_health: i32,
    /// Health remaining at the end (0 if defeated).
    pub final_health: i32,
    pub survived: bool,
    pub damage_dealt: i32,
    pub damage_taken: i32,
}

#[derive(Debug, Clone, Copy, Default)]
struct DamageTally {
    dealt: i32,
    taken: i32,
}

/// Run the roster's battle to completion.
pub fn run_battle(roster: &RosterFile, options: &RunOptions) -> Result<BattleSummary> {
    let mut config = roster.config.clone();
    if let Some(seed) = options.seed {
        config.seed = seed;
    }
    if options.max_turns.is_some() {
        config.max_turns = options.max_turns;
    }
    let seed = config.seed;

    let mut engine = BattleEngine::new(config, roster.player_bundles(), roster.opponent_bundles())
        .context("invalid battle config")?
        .with_inventory(roster.to_inventory());

    let mut forwarded = 0;
    engine.add_log_observer(move |lines: &[String]| {
        if lines.len() < forwarded {
            forwarded = 0;
        }
        for line in &lines[forwarded..] {
            info!(target: "battle_log", "{line}");
        }
        forwarded = lines.len();
    });

    let tally: Rc<RefCell<BTreeMap<EntityId, DamageTally>>> = Rc::default();
    let sink = Rc::clone(&tally);
    engine
        .events_mut()
        .subscribe_to([BattleEventKind::EffectApplied], move |event| {
            let BattleEvent::EffectApplied { source, result } = event else {
                return;
            };
            if result.kind != EffectKind::Damage {
                return;
            }
            let mut tally = sink.borrow_mut();
            tally.entry(result.target).or_default().taken += result.value;
            if let Some(source) = source {
                tally.entry(*source).or_default().dealt += result.value;
            }
        });

    let roster_entries = roster_entries(&engine);

    engine.start_battle()?;
    let mut commands = 0;
    while !engine.is_finished() {
        if commands >= MAX_COMMANDS {
            bail!("battle did not finish within {MAX_COMMANDS} commands");
        }
        autopilot_step(&mut engine)?;
        commands += 1;
    }

    let outcome = engine
        .outcome()
        .context("battle finished without an outcome")?;
    let replay = engine.replay_log()?;
    let tally = tally.borrow();
    let combatants = roster_entries
        .into_iter()
        .map(|(id, name, side, max_health)| {
            let final_health = if engine.is_alive(id) {
                engine
                    .world()
                    .get_component::<StatsComponent>(id)
                    .map_or(0, |stats| stats.current_health)
            } else {
                0
            };
            let damage = tally.get(&id).copied().unwrap_or_default();
            CombatantSummary {
                name,
                side,
                max_health,
                final_health,
                survived: final_health > 0,
                damage_dealt: damage.dealt,
                damage_taken: damage.taken,
            }
        })
        .collect();

    info!(?outcome, turns = engine.turns_taken(), commands, "headless battle finished");
    Ok(BattleSummary {
        outcome,
        turns: engine.turns_taken(),
        seed,
        combatants,
        log: engine.log().lines().to_vec(),
        final_hash: replay.final_hash.clone(),
        commands: replay.commands.len(),
        replay,
    })
}

/// `(id, name, side, max_health)` for every combatant, captured before
/// defeated entities leave the world.
fn roster_entries(engine: &BattleEngine) -> Vec<(EntityId, String, Side, i32)> {
    let sides = engine
        .teams()
        .player()
        .iter()
        .map(|&id| (id, Side::Player))
        .chain(engine.teams().opponent().iter().map(|&id| (id, Side::Opponent)));
    sides
        .filter_map(|(id, side)| {
            let entity = engine.world().get(id)?;
            let max_health = entity
                .get_component::<StatsComponent>()
                .map_or(0, |stats| stats.max_health);
            Some((id, entity.name().to_string(), side, max_health))
        })
        .collect()
}

/// Issue one re-entry call for the phase the engine is waiting in.
fn autopilot_step(engine: &mut BattleEngine) -> Result<()> {
    match engine.phase().clone() {
        BattlePhase::AwaitingSkillChoice { entity } => {
            if wants_consumable(engine, entity) {
                let first = engine.inventory().iter().next().map(|item| item.name.clone());
                if let Some(name) = first {
                    debug!(%entity, item = %name, "autopilot uses a consumable");
                    engine.use_consumable(&name)?;
                    return Ok(());
                }
            }
            let ready: Vec<usize> = engine
                .skill_choices(entity)
                .iter()
                .enumerate()
                .filter(|(_, choice)| choice.ready)
                .map(|(index, _)| index)
                .collect();
            for index in ready {
                if engine.use_skill(index).is_ok() {
                    return Ok(());
                }
            }
            engine.take_no_action()?;
        }
        BattlePhase::AwaitingTargetChoice {
            target_type,
            candidates,
            ..
        } => {
            let target = pick_target(engine, &candidates, target_type)
                .context("target choice offered no candidates")?;
            engine.use_single_target_skill(target)?;
        }
        BattlePhase::AwaitingAnimation { ticket, .. } => engine.complete_animation(ticket)?,
        phase => bail!("battle stopped in unexpected phase {phase:?}"),
    }
    Ok(())
}

fn wants_consumable(engine: &BattleEngine, entity: EntityId) -> bool {
    !engine.inventory().is_empty()
        && engine
            .world()
            .get_component::<StatsComponent>(entity)
            .is_some_and(|stats| stats.health_ratio() < CONSUMABLE_HEALTH_RATIO)
}

/// Most wounded ally for support skills, weakest enemy otherwise.
fn pick_target(engine: &BattleEngine, candidates: &[EntityId], target_type: TargetType) -> Option<EntityId> {
    let stats = |id: &EntityId| engine.world().get_component::<StatsComponent>(*id);
    if target_type.is_allied() {
        candidates.iter().copied().min_by(|a, b| {
            let ratio = |id| stats(id).map_or(f64::MAX, StatsComponent::health_ratio);
            ratio(a).total_cmp(&ratio(b))
        })
    } else {
        candidates
            .iter()
            .copied()
            .min_by_key(|id| stats(id).map_or(i32::MAX, |s| s.current_health))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> RosterFile {
        RosterFile::from_json(
            r#"{
            "players": [
                { "name": "Medic",
                  "stats": { "max_health": 60, "attack": 10, "defense": 3, "speed": 14 },
                  "skills": [
                    { "name": "Patch", "cooldown": 2, "effects": [
                      { "target": "single_ally", "calculators": [ { "type": "heal", "base_power": 12 } ] } ] },
                    { "name": "Jab", "effects": [
                      { "target": "single_enemy", "calculators": [ { "type": "attack", "base_power": 100 } ] } ] } ] },
                { "name": "Brute",
                  "stats": { "max_health": 90, "attack": 20, "defense": 6, "speed": 9 },
                  "skills": [ { "name": "Smash", "effects": [
                      { "target": "single_enemy", "calculators": [ { "type": "attack", "base_power": 110 } ] } ] } ] }
            ],
            "opponents": [
                { "name": "Goblin",
                  "stats": { "max_health": 40, "attack": 12, "defense": 2, "speed": 11 },
                  "skills": [ { "name": "Stab", "effects": [
                      { "target": "single_enemy", "calculators": [ { "type": "attack", "base_power": 100 } ] } ] } ],
                  "ai": {} },
                { "name": "Shaman",
                  "stats": { "max_health": 35, "attack": 9, "defense": 1, "speed": 12 },
                  "skills": [ { "name": "Hex", "effects": [
                      { "target": "all_enemies", "calculators": [
                        { "type": "attack", "base_power": 60 },
                        { "type": "status_effect", "kind": "poison", "chance": 0.5, "duration": 2, "strength": 2 } ] } ] } ],
                  "ai": {} }
            ],
            "inventory": [ { "name": "Salve", "effect": { "type": "heal", "base_power": 25 } } ]
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn battle_runs_to_completion() {
        let summary = run_battle(&roster(), &RunOptions::default()).unwrap();
        assert!(summary.turns > 0);
        assert_eq!(summary.log.first().map(String::as_str), Some("The battle begins!"));
        assert_eq!(summary.log.last().map(String::as_str), Some(summary.outcome.log_line()));
        assert_eq!(summary.combatants.len(), 4);
        assert_eq!(summary.commands, summary.replay.commands.len());
        assert!(summary.combatants.iter().any(|c| c.damage_dealt > 0));
    }

    #[test]
    fn overrides_take_precedence_over_the_roster() {
        let options = RunOptions {
            seed: Some(77),
            max_turns: Some(1),
        };
        let summary = run_battle(&roster(), &options).unwrap();
        assert_eq!(summary.seed, 77);
        assert_eq!(summary.turns, 1);
        assert_eq!(summary.outcome, Outcome::Draw);
    }

    #[test]
    fn wounded_player_drinks_from_the_inventory() {
        let roster = RosterFile::from_json(
            r#"{
            "players": [
                { "name": "Knight",
                  "stats": { "max_health": 100, "attack": 1, "defense": 0, "speed": 5 },
                  "skills": [ { "name": "Poke", "effects": [
                      { "target": "single_enemy", "calculators": [ { "type": "attack", "base_power": 100 } ] } ] } ] }
            ],
            "opponents": [
                { "name": "Ogre",
                  "stats": { "max_health": 1000, "attack": 75, "defense": 0, "speed": 10 },
                  "skills": [ { "name": "Club", "effects": [
                      { "target": "single_enemy", "calculators": [ { "type": "attack", "base_power": 100 } ] } ] } ],
                  "ai": {} }
            ],
            "inventory": [ { "name": "Salve", "effect": { "type": "heal", "base_power": 25 } } ]
        }"#,
        )
        .unwrap();
        let summary = run_battle(&roster, &RunOptions::default()).unwrap();
        assert_eq!(
            summary.replay.commands.first(),
            Some(&BattleCommand::UseConsumable {
                name: "Salve".to_string()
            })
        );
        assert_eq!(summary.outcome, Outcome::Defeat);
    }

    #[test]
    fn survivors_keep_their_health() {
        let summary = run_battle(&roster(), &RunOptions::default()).unwrap();
        for combatant in &summary.combatants {
            assert_eq!(combatant.survived, combatant.final_health > 0);
            assert!(combatant.final_health <= combatant.max_health);
        }
    }
}
