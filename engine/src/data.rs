//! Skill, monster and roster tables.
//!
//! Everything here is parsed into closed enums, so a misspelled effect or
//! buff type is rejected while loading instead of being skipped mid-battle.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::buffs::package::BuffPackage;
use crate::buffs::BuffSpec;
use crate::combatant::Stats;
use crate::element::Element;
use crate::error::DataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TargetType {
    SelfOnly,
    /// Lowest HP ratio among living allies other than the caster.
    Ally,
    /// Lowest HP ratio among living allies, caster included.
    AllyLowestHp,
    AllyDead,
    AllAllies,
    AllAlliesOf(Element),
    Enemy,
    AllEnemies,
    All,
}

impl TargetType {
    pub fn is_hostile(self) -> bool {
        matches!(self, TargetType::Enemy | TargetType::AllEnemies | TargetType::All)
    }

    pub fn is_single(self) -> bool {
        matches!(
            self,
            TargetType::SelfOnly
                | TargetType::Ally
                | TargetType::AllyLowestHp
                | TargetType::AllyDead
                | TargetType::Enemy
        )
    }
}

impl TryFrom<String> for TargetType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Ok(match s.as_str() {
            "self" => TargetType::SelfOnly,
            "ally" => TargetType::Ally,
            "ally_lowest_hp" => TargetType::AllyLowestHp,
            "ally_dead" => TargetType::AllyDead,
            "all_allies" => TargetType::AllAllies,
            "enemy" => TargetType::Enemy,
            "all_enemies" => TargetType::AllEnemies,
            "all" => TargetType::All,
            other => match other.strip_prefix("all_allies_").and_then(Element::parse) {
                Some(el) => TargetType::AllAlliesOf(el),
                None => return Err(format!("unknown target type '{}'", other)),
            },
        })
    }
}

impl From<TargetType> for String {
    fn from(t: TargetType) -> String {
        match t {
            TargetType::SelfOnly => "self".into(),
            TargetType::Ally => "ally".into(),
            TargetType::AllyLowestHp => "ally_lowest_hp".into(),
            TargetType::AllyDead => "ally_dead".into(),
            TargetType::AllAllies => "all_allies".into(),
            TargetType::AllAlliesOf(el) => format!("all_allies_{}", String::from(el)),
            TargetType::Enemy => "enemy".into(),
            TargetType::AllEnemies => "all_enemies".into(),
            TargetType::All => "all".into(),
        }
    }
}

impl From<Element> for String {
    fn from(el: Element) -> String {
        match el {
            Element::Fire => "fire",
            Element::Water => "water",
            Element::Wind => "wind",
            Element::Earth => "earth",
            Element::Light => "light",
            Element::Dark => "dark",
            Element::Neutral => "neutral",
        }
        .to_string()
    }
}

/// Top-level category of a skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    Damage,
    Heal,
    Buff,
    Debuff,
    Dispel,
    Revive,
    #[serde(alias = "trigger")]
    MultiEffect,
    Passive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HpBasis {
    #[default]
    Current,
    MaxHp,
}

fn one() -> f64 {
    1.0
}

fn one_hit() -> u32 {
    1
}

fn revive_ratio() -> f64 {
    0.3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageEffect {
    #[serde(default = "one")]
    pub multiplier: f64,
    #[serde(default)]
    pub min_multiplier: Option<f64>,
    #[serde(default)]
    pub max_multiplier: Option<f64>,
    #[serde(default = "one_hit")]
    pub count: u32,
    #[serde(default)]
    pub element: Option<Element>,
    #[serde(default, alias = "fixedDamageValue")]
    pub fixed: Option<f64>,
    #[serde(default)]
    pub ignore_defense: bool,
    #[serde(default)]
    pub skip_critical: Option<bool>,
    #[serde(default)]
    pub target: Option<TargetType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealEffect {
    #[serde(default)]
    pub value: f64,
    /// Fraction of the target's max HP added on top of `value`.
    #[serde(default)]
    pub percentage: f64,
    #[serde(default)]
    pub target: Option<TargetType>,
}

/// One effect inside a skill or proc. The set is closed: anything else fails to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SkillEffect {
    #[serde(alias = "enmity", alias = "multi_attack")]
    Damage(DamageEffect),
    /// Extra multiplier folded into the damage effects of the same list.
    #[serde(alias = "directDamageBonus")]
    AdditionalDamage {
        #[serde(default)]
        multiplier: f64,
    },
    Heal(HealEffect),
    Buff {
        buff: BuffSpec,
        #[serde(default)]
        target: Option<TargetType>,
    },
    Debuff {
        buff: BuffSpec,
        #[serde(default)]
        target: Option<TargetType>,
    },
    #[serde(alias = "applyDebuffPackage")]
    ApplyBuffPackage {
        package: BuffPackage,
        #[serde(default)]
        target: Option<TargetType>,
    },
    Dispel {
        #[serde(default, alias = "dispelPositive")]
        positive: bool,
        #[serde(default = "one_hit")]
        count: u32,
        #[serde(default)]
        target: Option<TargetType>,
    },
    ClearDebuff {
        #[serde(default)]
        count: Option<u32>,
        #[serde(default)]
        target: Option<TargetType>,
    },
    Revive {
        #[serde(default = "revive_ratio")]
        hp_ratio: f64,
        #[serde(default)]
        target: Option<TargetType>,
    },
    CastSkill {
        skill_id: String,
    },
    Proc {
        #[serde(default = "one")]
        chance: f64,
        #[serde(alias = "additionalEffects")]
        effects: Vec<SkillEffect>,
    },
    #[serde(rename = "hpCostPercentageCurrent")]
    HpCost {
        #[serde(alias = "value")]
        percentage: f64,
        #[serde(default)]
        based_on: HpBasis,
    },
}

/// Handler key for each effect variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Damage,
    AdditionalDamage,
    Heal,
    Buff,
    Debuff,
    ApplyBuffPackage,
    Dispel,
    ClearDebuff,
    Revive,
    CastSkill,
    Proc,
    HpCost,
}

impl SkillEffect {
    pub fn kind(&self) -> EffectKind {
        match self {
            SkillEffect::Damage(_) => EffectKind::Damage,
            SkillEffect::AdditionalDamage { .. } => EffectKind::AdditionalDamage,
            SkillEffect::Heal(_) => EffectKind::Heal,
            SkillEffect::Buff { .. } => EffectKind::Buff,
            SkillEffect::Debuff { .. } => EffectKind::Debuff,
            SkillEffect::ApplyBuffPackage { .. } => EffectKind::ApplyBuffPackage,
            SkillEffect::Dispel { .. } => EffectKind::Dispel,
            SkillEffect::ClearDebuff { .. } => EffectKind::ClearDebuff,
            SkillEffect::Revive { .. } => EffectKind::Revive,
            SkillEffect::CastSkill { .. } => EffectKind::CastSkill,
            SkillEffect::Proc { .. } => EffectKind::Proc,
            SkillEffect::HpCost { .. } => EffectKind::HpCost,
        }
    }
}

/// Battle events a passive or buff can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    BattleStart,
    OnTurnStart,
    OnAttackHit,
    OnDamaged,
    OnDamagedByEnemy,
    OnSkillUse,
    OnTurnEnd,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcDef {
    #[serde(alias = "triggerCondition")]
    pub trigger: Trigger,
    #[serde(default)]
    pub chance: Option<f64>,
    #[serde(default)]
    pub max_activations: Option<u32>,
    #[serde(default)]
    pub target: Option<TargetType>,
    pub effects: Vec<SkillEffect>,
}

fn default_target() -> TargetType {
    TargetType::Enemy
}

fn default_buff_duration() -> i32 {
    3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(alias = "effectType")]
    pub kind: SkillKind,
    #[serde(default = "default_target")]
    pub target_type: TargetType,
    #[serde(default)]
    pub cooldown: Option<u32>,
    #[serde(default)]
    pub next_cooldown: Option<u32>,
    #[serde(default)]
    pub initial_cooldown: Option<u32>,
    /// Default duration for buffs that do not carry their own.
    #[serde(default = "default_buff_duration")]
    pub duration: i32,
    #[serde(default)]
    pub skip_critical: Option<bool>,
    /// Element of damage effects that do not name their own.
    #[serde(default)]
    pub element: Option<Element>,
    #[serde(default)]
    pub effects: Vec<SkillEffect>,
    #[serde(default)]
    pub procs: Vec<ProcDef>,
    /// Monster skills: fire once when HP ratio drops to or below this.
    #[serde(default)]
    pub hp_threshold: Option<f64>,
    #[serde(default)]
    pub priority: i32,
}

impl Skill {
    pub fn is_passive(&self) -> bool {
        self.kind == SkillKind::Passive
    }
}

/// Read-only table of skills and passives keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SkillBook {
    skills: IndexMap<String, Skill>,
}

impl SkillBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: IndexMap<String, Skill>) -> Result<Self, DataError> {
        let mut book = Self::new();
        book.extend(map);
        book.validate()?;
        Ok(book)
    }

    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        let map: IndexMap<String, Skill> = serde_json::from_str(text)?;
        Ok(Self::from_map(map)?)
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        let map: IndexMap<String, Skill> = serde_yaml::from_str(text)?;
        Ok(Self::from_map(map)?)
    }

    /// Adds skills, later ids overriding earlier ones.
    pub fn extend(&mut self, map: IndexMap<String, Skill>) {
        for (id, mut skill) in map {
            if skill.id.is_empty() {
                skill.id = id.clone();
            }
            self.skills.insert(id, skill);
        }
    }

    pub fn insert(&mut self, skill: Skill) {
        self.skills.insert(skill.id.clone(), skill);
    }

    pub fn merge(&mut self, other: SkillBook) {
        self.skills.extend(other.skills);
    }

    pub fn get(&self, id: &str) -> Option<&Skill> {
        self.skills.get(id)
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.skills.keys().map(String::as_str)
    }

    /// Checks references between skills and the shape of every effect.
    pub fn validate(&self) -> Result<(), DataError> {
        for (id, skill) in &self.skills {
            self.validate_effects(id, &skill.effects)?;
            for proc_def in &skill.procs {
                if let Some(chance) = proc_def.chance {
                    if !(0.0..=1.0).contains(&chance) {
                        return Err(DataError::InvalidSkill {
                            skill: id.clone(),
                            reason: format!("proc chance {} outside [0, 1]", chance),
                        });
                    }
                }
                self.validate_effects(id, &proc_def.effects)?;
            }
            if skill.is_passive() && !skill.effects.is_empty() {
                return Err(DataError::InvalidSkill {
                    skill: id.clone(),
                    reason: "passive skills carry procs, not effects".to_string(),
                });
            }
        }
        Ok(())
    }

    fn validate_effects(&self, id: &str, effects: &[SkillEffect]) -> Result<(), DataError> {
        for effect in effects {
            match effect {
                SkillEffect::Damage(d) => {
                    if d.count == 0 || !d.multiplier.is_finite() {
                        return Err(DataError::InvalidSkill {
                            skill: id.to_string(),
                            reason: "damage needs a finite multiplier and at least one hit".to_string(),
                        });
                    }
                    if let (Some(lo), Some(hi)) = (d.min_multiplier, d.max_multiplier) {
                        if lo > hi {
                            return Err(DataError::InvalidSkill {
                                skill: id.to_string(),
                                reason: format!("multiplier range {}..{} is empty", lo, hi),
                            });
                        }
                    }
                }
                SkillEffect::CastSkill { skill_id } if !self.skills.contains_key(skill_id) => {
                    return Err(DataError::DanglingCast {
                        skill: id.to_string(),
                        target: skill_id.clone(),
                    });
                }
                SkillEffect::ApplyBuffPackage { package, .. } if package.buffs_per_stack.is_empty() => {
                    return Err(DataError::EmptyPackage {
                        skill: id.to_string(),
                        package: package.name.clone(),
                    });
                }
                SkillEffect::Proc { effects, .. } => self.validate_effects(id, effects)?,
                _ => {}
            }
        }
        Ok(())
    }
}

/// Accepts numbers, numeric strings and garbage; garbage becomes `None`.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GoldReward {
    #[serde(default)]
    pub min: u64,
    #[serde(default)]
    pub max: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonsterData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub element: Element,
    #[serde(default, alias = "hp", deserialize_with = "lenient_number")]
    pub max_hp: Option<f64>,
    #[serde(default)]
    pub attack: f64,
    #[serde(default)]
    pub defense: f64,
    #[serde(default)]
    pub crit_rate: Option<f64>,
    #[serde(default)]
    pub da_rate: Option<f64>,
    #[serde(default)]
    pub ta_rate: Option<f64>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub passives: Vec<String>,
    #[serde(default)]
    pub xp_reward: u64,
    #[serde(default)]
    pub gold_reward: GoldReward,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub element: Element,
    #[serde(default)]
    pub stats: Stats,
    /// Current HP carried over from earlier fights; full when absent.
    #[serde(default)]
    pub hp: Option<i64>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub passives: Vec<String>,
    /// Buffs carried over from a previous encounter of a dungeon run.
    #[serde(default)]
    pub carried_buffs: Vec<BuffSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_filtered_target_round_trips_through_string() {
        let t = TargetType::try_from("all_allies_fire".to_string()).unwrap();
        assert_eq!(t, TargetType::AllAlliesOf(Element::Fire));
        assert_eq!(String::from(t), "all_allies_fire");
    }

    #[test]
    fn unknown_target_is_rejected() {
        assert!(TargetType::try_from("everyone_nearby".to_string()).is_err());
    }
}
