use serde::{Deserialize, Serialize};

use crate::combatant::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Fire,
    Water,
    Wind,
    Earth,
    Light,
    Dark,
    #[default]
    #[serde(alias = "none")]
    Neutral,
}

pub const FAVORABLE: f64 = 1.5;
pub const UNFAVORABLE: f64 = 0.75;

impl Element {
    /// The element this one deals bonus damage to in the fire → wind → earth → water cycle.
    fn beats(self) -> Option<Element> {
        use Element::*;
        match self {
            Fire => Some(Wind),
            Wind => Some(Earth),
            Earth => Some(Water),
            Water => Some(Fire),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Option<Element> {
        use Element::*;
        match s.trim().to_lowercase().as_str() {
            "fire" => Some(Fire),
            "water" => Some(Water),
            "wind" => Some(Wind),
            "earth" => Some(Earth),
            "light" => Some(Light),
            "dark" => Some(Dark),
            "none" | "neutral" => Some(Neutral),
            _ => None,
        }
    }
}

/// Damage multiplier for `attacker` hitting `defender`.
///
/// Light and dark oppose each other but the exchange always favors the
/// player side; this is decided before the generic cycle is consulted.
pub fn element_multiplier(attacker_side: Side, attacker: Element, defender: Element) -> f64 {
    use Element::*;
    if matches!((attacker, defender), (Light, Dark) | (Dark, Light)) {
        return match attacker_side {
            Side::Player => FAVORABLE,
            Side::Enemy => UNFAVORABLE,
        };
    }
    if attacker.beats() == Some(defender) {
        FAVORABLE
    } else if defender.beats() == Some(attacker) {
        UNFAVORABLE
    } else {
        1.0
    }
}
