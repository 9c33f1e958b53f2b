use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub mod api;
pub mod battle;
pub mod buffs;
pub mod combat;
pub mod combatant;
pub mod content;
pub mod data;
pub mod element;
pub mod error;
pub mod log;
pub mod roster;
pub mod session;

pub use battle::{resolve_battle, BattleEvent, BattleOptions, BattleResult};
pub use buffs::{Buff, BuffKind, ValueInteraction};
pub use combatant::{Combatant, CombatantId, Side, Stats};
pub use data::{MonsterData, RosterEntry, SkillBook};
pub use element::Element;
pub use error::DataError;
pub use log::{BattleLog, LogLevel};
pub use session::BattleSession;

enum Source {
    Seeded(ChaCha8Rng),
    Scripted { rolls: Vec<f64>, cursor: usize },
}

/// Every random draw of a battle goes through here so runs replay exactly.
pub struct Dice {
    source: Source,
}

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self { source: Source::Seeded(ChaCha8Rng::seed_from_u64(seed)) }
    }

    /// Replays `rolls` (each in `[0, 1)`) in order, repeating the last one once exhausted.
    pub fn from_scripted(rolls: Vec<f64>) -> Self {
        Self { source: Source::Scripted { rolls, cursor: 0 } }
    }

    /// Uniform draw in `[0, 1)`.
    pub fn roll(&mut self) -> f64 {
        match &mut self.source {
            Source::Seeded(rng) => rng.gen_range(0.0..1.0),
            Source::Scripted { rolls, cursor } => {
                let value = match rolls.get(*cursor) {
                    Some(v) => *v,
                    None => rolls.last().copied().unwrap_or(0.0),
                };
                *cursor += 1;
                value.clamp(0.0, 0.999_999)
            }
        }
    }

    /// True with probability `p`. Always consumes one roll.
    pub fn chance(&mut self, p: f64) -> bool {
        self.roll() < p
    }

    pub fn between(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.roll() * (hi - lo)
    }

    /// Uniform integer in `lo..=hi`.
    pub fn range_inclusive(&mut self, lo: u64, hi: u64) -> u64 {
        if hi <= lo {
            return lo;
        }
        let span = (hi - lo + 1) as f64;
        (lo + (self.roll() * span) as u64).min(hi)
    }

    /// Index into `weights` picked proportionally; uniform when every weight is zero.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        if weights.is_empty() {
            return None;
        }
        let total: f64 = weights.iter().map(|w| w.max(0.0)).sum();
        let r = self.roll();
        if total <= 0.0 {
            return Some(((r * weights.len() as f64) as usize).min(weights.len() - 1));
        }
        let mut point = r * total;
        for (idx, w) in weights.iter().enumerate() {
            let w = w.max(0.0);
            if point < w {
                return Some(idx);
            }
            point -= w;
        }
        Some(weights.len() - 1)
    }
}
