use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::buffs::{Buff, BuffKind};
use crate::element::Element;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CombatantId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    Enemy,
}

pub const PLAYER_DA_RATE: f64 = 0.15;
pub const PLAYER_TA_RATE: f64 = 0.05;
pub const MONSTER_DA_RATE: f64 = 0.10;
pub const MONSTER_TA_RATE: f64 = 0.03;
pub const BASE_CRIT_RATE: f64 = 0.05;
pub const BASE_CRIT_DAMAGE: f64 = 1.5;

/// Combat stats. Used both for the immutable per-battle snapshot and for the
/// values derived from it by the active buffs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    pub max_hp: i64,
    pub attack: f64,
    pub defense: f64,
    pub crit_rate: f64,
    pub crit_damage: f64,
    pub da_rate: f64,
    pub ta_rate: f64,
    pub ignore_defense: f64,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            max_hp: 1,
            attack: 0.0,
            defense: 0.0,
            crit_rate: BASE_CRIT_RATE,
            crit_damage: BASE_CRIT_DAMAGE,
            da_rate: PLAYER_DA_RATE,
            ta_rate: PLAYER_TA_RATE,
            ignore_defense: 0.0,
        }
    }
}

/// Running per-combatant counters, reported in the battle result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatCounters {
    pub total_damage: i64,
    pub total_healing: i64,
    pub da_count: u32,
    pub ta_count: u32,
    pub crit_count: u32,
    pub buffs_applied: u32,
    pub debuffs_applied: u32,
    pub skills_used: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Combatant {
    pub key: String,
    pub name: String,
    pub side: Side,
    pub element: Element,
    pub base: Stats,
    pub current: Stats,
    pub hp: i64,
    pub buffs: Vec<Buff>,
    pub skills: Vec<String>,
    pub passives: Vec<String>,
    pub cooldowns: IndexMap<String, u32>,
    pub usage_count: IndexMap<String, u32>,
    pub shield: i64,
    pub stats: CombatCounters,
    #[serde(skip)]
    pub(crate) next_buff_id: u64,
}

impl Combatant {
    pub fn new(key: impl Into<String>, name: impl Into<String>, side: Side, base: Stats) -> Self {
        let hp = base.max_hp.max(0);
        Self {
            key: key.into(),
            name: name.into(),
            side,
            element: Element::Neutral,
            base,
            current: base,
            hp,
            buffs: Vec::new(),
            skills: Vec::new(),
            passives: Vec::new(),
            cooldowns: IndexMap::new(),
            usage_count: IndexMap::new(),
            shield: 0,
            stats: CombatCounters::default(),
            next_buff_id: 0,
        }
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.element = element;
        self
    }

    pub fn with_skills(mut self, skills: Vec<String>) -> Self {
        self.skills = skills;
        self
    }

    pub fn with_passives(mut self, passives: Vec<String>) -> Self {
        self.passives = passives;
        self
    }

    pub fn with_hp(mut self, hp: i64) -> Self {
        self.hp = hp.clamp(0, self.current.max_hp);
        self
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn max_hp(&self) -> i64 {
        self.current.max_hp
    }

    pub fn hp_ratio(&self) -> f64 {
        if self.current.max_hp <= 0 {
            0.0
        } else {
            self.hp as f64 / self.current.max_hp as f64
        }
    }

    /// Lowers HP, never below zero. Returns the amount actually removed.
    pub fn take_damage(&mut self, amount: i64) -> i64 {
        let before = self.hp;
        self.hp = (self.hp - amount.max(0)).max(0);
        before - self.hp
    }

    /// Raises HP, never above max. Dead combatants are not healed; use
    /// [`Combatant::revive`] for that. Returns the amount actually restored.
    pub fn heal(&mut self, amount: i64) -> i64 {
        if !self.is_alive() {
            return 0;
        }
        let before = self.hp;
        self.hp = (self.hp + amount.max(0)).min(self.current.max_hp);
        self.hp - before
    }

    pub fn revive(&mut self, hp_ratio: f64) -> i64 {
        if self.is_alive() {
            return 0;
        }
        let restored = ((self.current.max_hp as f64 * hp_ratio).floor() as i64).max(1);
        self.hp = restored.min(self.current.max_hp);
        self.hp
    }

    pub fn has_buff(&self, kind: BuffKind) -> bool {
        self.buffs.iter().any(|b| b.kind == kind && b.duration != 0)
    }

    pub fn buffs_of(&self, kind: BuffKind) -> impl Iterator<Item = &Buff> {
        self.buffs.iter().filter(move |b| b.kind == kind && b.duration != 0)
    }

    /// Sum of the values of all live buffs of `kind`.
    pub fn buff_total(&self, kind: BuffKind) -> f64 {
        self.buffs_of(kind).map(|b| b.value).sum()
    }

    pub fn buff_max(&self, kind: BuffKind) -> Option<f64> {
        self.buffs_of(kind).map(|b| b.value).reduce(f64::max)
    }

    pub fn is_on_cooldown(&self, skill: &str) -> bool {
        self.cooldowns.get(skill).copied().unwrap_or(0) > 0
    }

    pub fn has_used(&self, skill: &str) -> bool {
        self.usage_count.get(skill).copied().unwrap_or(0) > 0
    }

    /// Cooldowns tick down once per turn end.
    pub fn tick_cooldowns(&mut self) {
        for cd in self.cooldowns.values_mut() {
            *cd = cd.saturating_sub(1);
        }
    }

    /// Re-derives `current` from `base` and the active buffs and clamps HP into the new bounds.
    pub fn refresh_stats(&mut self) {
        self.current = crate::buffs::recalc::recalculate(&self.base, &self.buffs);
        self.hp = self.hp.clamp(0, self.current.max_hp);
    }
}
