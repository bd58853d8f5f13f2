//! Typed publish/subscribe for battle events.
//!
//! The [`EventBus`] is owned by one battle session. Handlers run
//! synchronously, in subscription order, during [`EventBus::publish`].

use std::fmt;

use serde::{Deserialize, Serialize};
use toki_ecs::prelude::EntityId;

use crate::effect::EffectResult;
use crate::engine::Outcome;
use crate::status::StatusKind;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// What an action was, for event consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionSummary {
    Skill { index: usize, name: String },
    Consumable { name: String },
    NoAction,
}

/// Everything the engine announces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BattleEvent {
    BattleStarted,
    TurnStarted {
        entity: EntityId,
    },
    TurnSkipped {
        entity: EntityId,
        status: StatusKind,
    },
    AwaitingSkillChoice {
        entity: EntityId,
    },
    AwaitingTargetChoice {
        entity: EntityId,
        candidates: Vec<EntityId>,
    },
    ActionExecuted {
        user: EntityId,
        action: ActionSummary,
    },
    /// One effect result; `source` is `None` for end-of-turn status ticks.
    EffectApplied {
        source: Option<EntityId>,
        result: EffectResult,
    },
    TurnEnded {
        entity: EntityId,
    },
    EntityDefeated {
        entity: EntityId,
    },
    BattleEnded {
        outcome: Outcome,
    },
}

/// Discriminant of [`BattleEvent`], used for filtered subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleEventKind {
    BattleStarted,
    TurnStarted,
    TurnSkipped,
    AwaitingSkillChoice,
    AwaitingTargetChoice,
    ActionExecuted,
    EffectApplied,
    TurnEnded,
    EntityDefeated,
    BattleEnded,
}

impl BattleEvent {
    pub fn kind(&self) -> BattleEventKind {
        match self {
            BattleEvent::BattleStarted => BattleEventKind::BattleStarted,
            BattleEvent::TurnStarted { .. } => BattleEventKind::TurnStarted,
            BattleEvent::TurnSkipped { .. } => BattleEventKind::TurnSkipped,
            BattleEvent::AwaitingSkillChoice { .. } => BattleEventKind::AwaitingSkillChoice,
            BattleEvent::AwaitingTargetChoice { .. } => BattleEventKind::AwaitingTargetChoice,
            BattleEvent::ActionExecuted { .. } => BattleEventKind::ActionExecuted,
            BattleEvent::EffectApplied { .. } => BattleEventKind::EffectApplied,
            BattleEvent::TurnEnded { .. } => BattleEventKind::TurnEnded,
            BattleEvent::EntityDefeated { .. } => BattleEventKind::EntityDefeated,
            BattleEvent::BattleEnded { .. } => BattleEventKind::BattleEnded,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&BattleEvent)>;

struct Subscriber {
    id: SubscriptionId,
    /// `None` receives everything.
    filter: Option<Vec<BattleEventKind>>,
    handler: Handler,
}

/// A per-battle event channel.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event.
    pub fn subscribe(&mut self, handler: impl FnMut(&BattleEvent) + 'static) -> SubscriptionId {
        self.insert(None, Box::new(handler))
    }

    /// Receive only events whose kind is in `kinds`.
    pub fn subscribe_to(
        &mut self,
        kinds: impl IntoIterator<Item = BattleEventKind>,
        handler: impl FnMut(&BattleEvent) + 'static,
    ) -> SubscriptionId {
        self.insert(Some(kinds.into_iter().collect()), Box::new(handler))
    }

    fn insert(&mut self, filter: Option<Vec<BattleEventKind>>, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            filter,
            handler,
        });
        id
    }

    /// Drop a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Deliver `event` to every interested subscriber.
    pub fn publish(&mut self, event: &BattleEvent) {
        let kind = event.kind();
        for subscriber in &mut self.subscribers {
            let wanted = subscriber
                .filter
                .as_ref()
                .map_or(true, |kinds| kinds.contains(&kind));
            if wanted {
                (subscriber.handler)(event);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
