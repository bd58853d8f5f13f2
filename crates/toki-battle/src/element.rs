//! Elemental typing and the effectiveness matrix.
//!
//! The four non-neutral elements form a cycle in which each element beats the
//! next one: Water > Fire > Earth > Air > Water. The winner of a pairing deals
//! [`SUPER_EFFECTIVE`] damage, the reverse direction deals
//! [`NOT_VERY_EFFECTIVE`], and every other pairing (including anything
//! involving [`Element::Neutral`]) is [`NEUTRAL`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Multiplier when the attacker's element beats the defender's.
pub const SUPER_EFFECTIVE: f64 = 1.5;
/// Multiplier when the defender's element beats the attacker's.
pub const NOT_VERY_EFFECTIVE: f64 = 0.5;
/// Multiplier for unrelated pairings.
pub const NEUTRAL: f64 = 1.0;

/// Elemental type of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    #[default]
    Neutral,
    Fire,
    Water,
    Earth,
    Air,
}

impl Element {
    /// Every element, in declaration order.
    pub const ALL: [Element; 5] = [
        Element::Neutral,
        Element::Fire,
        Element::Water,
        Element::Earth,
        Element::Air,
    ];

    /// Whether `self` is super effective against `other`.
    pub fn beats(self, other: Element) -> bool {
        matches!(
            (self, other),
            (Element::Water, Element::Fire)
                | (Element::Fire, Element::Earth)
                | (Element::Earth, Element::Air)
                | (Element::Air, Element::Water)
        )
    }

    /// How an attack of this element fares against `defender`.
    pub fn effectiveness_against(self, defender: Element) -> Effectiveness {
        if self.beats(defender) {
            Effectiveness::Super
        } else if defender.beats(self) {
            Effectiveness::NotVery
        } else {
            Effectiveness::Neutral
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Element::Neutral => "neutral",
            Element::Fire => "fire",
            Element::Water => "water",
            Element::Earth => "earth",
            Element::Air => "air",
        };
        f.write_str(name)
    }
}

/// Outcome of an element matchup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effectiveness {
    Super,
    Neutral,
    NotVery,
}

impl Effectiveness {
    /// Damage multiplier for this matchup.
    pub fn multiplier(self) -> f64 {
        match self {
            Effectiveness::Super => SUPER_EFFECTIVE,
            Effectiveness::Neutral => NEUTRAL,
            Effectiveness::NotVery => NOT_VERY_EFFECTIVE,
        }
    }

    /// Log annotation appended to damage descriptions.
    pub fn annotation(self) -> Option<&'static str> {
        match self {
            Effectiveness::Super => Some("It's super effective!"),
            Effectiveness::Neutral => None,
            Effectiveness::NotVery => Some("It's not very effective..."),
        }
    }
}
