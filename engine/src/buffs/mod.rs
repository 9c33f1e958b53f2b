//! Buff lifecycle: creation, stacking, immunity, expiry and dispel.
//!
//! Every function here works on one [`Combatant`] and leaves its derived
//! stats up to date on return.

pub mod package;
pub mod recalc;

use serde::{Deserialize, Serialize};

use crate::combatant::{Combatant, CombatantId};
use crate::data::ProcDef;
use crate::element::Element;
use crate::log::BattleLog;

pub type BuffId = u64;

pub const PERMANENT: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuffKind {
    AttackUp,
    AttackDown,
    DefenseUp,
    DefenseDown,
    CritRate,
    CritDamage,
    DaBoost,
    TaBoost,
    DaDown,
    TaDown,
    MissRate,
    DamageIncrease,
    DamageReduction,
    AllDamageTakenReduction,
    ElementalResistance,
    SkillDamageUp,
    ExAttackUp,
    StaminaUp,
    EnmityUp,
    Chase,
    Dot,
    Hot,
    Regen,
    Numbness,
    Stun,
    Silence,
    Shield,
    Invincible,
    Evade,
    EvasionAll,
    Reflect,
    FireEnhance,
    WaterEnhance,
    WindEnhance,
    EarthEnhance,
    LightEnhance,
    DarkEnhance,
    ElementConversion,
    DamageCap,
    DamageCapUp,
    SkillDamageCapUp,
    Cover,
    CounterAttack,
    Guts,
    AllStatsUp,
    ThreatUp,
    ThreatDown,
    DebuffImmunity,
    StatusImmunity,
    DebuffResistOnce,
    CompositeBuff,
}

/// How a re-applied buff's value combines with the live instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueInteraction {
    Add,
    Max,
    Replace,
    Independent,
}

/// Default behavior of a buff kind. Data may override the stacking fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuffProfile {
    pub positive: bool,
    pub dispellable: bool,
    pub stackable: bool,
    pub max_stacks: u32,
    pub interaction: ValueInteraction,
}

const STACKS: u32 = 10;

impl BuffKind {
    pub fn profile(self) -> BuffProfile {
        use BuffKind::*;
        use ValueInteraction::*;
        let (positive, dispellable, stackable, interaction) = match self {
            AttackUp | DefenseUp | CritRate | CritDamage | DaBoost | TaBoost | DamageIncrease
            | DamageReduction | SkillDamageUp | ExAttackUp | Hot | Reflect | FireEnhance
            | WaterEnhance | WindEnhance | EarthEnhance | LightEnhance | DarkEnhance
            | AllStatsUp | ThreatUp | ThreatDown => (true, true, true, Add),
            AttackDown | DefenseDown | DaDown | TaDown | MissRate | Dot => (false, true, true, Add),
            StaminaUp | EnmityUp => (true, true, true, Max),
            Shield => (true, false, true, Add),
            Chase | Regen | Evade | AllDamageTakenReduction | ElementalResistance
            | DamageCapUp | SkillDamageCapUp | CounterAttack => (true, true, false, Max),
            ElementConversion | DamageCap | Cover => (true, true, false, Replace),
            Invincible | EvasionAll | Guts | DebuffImmunity | StatusImmunity
            | DebuffResistOnce => (true, false, false, Replace),
            Numbness | Stun | Silence => (false, true, false, Replace),
            CompositeBuff => (true, true, true, Replace),
        };
        let max_stacks = match self {
            CompositeBuff => package::DEFAULT_PACKAGE_STACKS,
            _ if stackable => STACKS,
            _ => 1,
        };
        BuffProfile { positive, dispellable, stackable, max_stacks, interaction }
    }

    /// Action-denying statuses guarded by `statusImmunity`.
    pub fn is_status(self) -> bool {
        matches!(self, BuffKind::Stun | BuffKind::Silence | BuffKind::Numbness)
    }

    /// Element boosted by an `<element>Enhance` buff.
    pub fn enhanced_element(self) -> Option<Element> {
        match self {
            BuffKind::FireEnhance => Some(Element::Fire),
            BuffKind::WaterEnhance => Some(Element::Water),
            BuffKind::WindEnhance => Some(Element::Wind),
            BuffKind::EarthEnhance => Some(Element::Earth),
            BuffKind::LightEnhance => Some(Element::Light),
            BuffKind::DarkEnhance => Some(Element::Dark),
            _ => None,
        }
    }

    pub fn parse(name: &str) -> Option<BuffKind> {
        serde_json::from_value(serde_json::Value::String(name.to_string())).ok()
    }

    pub fn label(self) -> String {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(s)) => s,
            _ => format!("{:?}", self),
        }
    }
}

/// Authored description of a buff, as it appears inside skill effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuffSpec {
    #[serde(rename = "type")]
    pub kind: BuffKind,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub stackable: Option<bool>,
    #[serde(default)]
    pub max_stacks: Option<u32>,
    #[serde(default)]
    pub interaction: Option<ValueInteraction>,
    #[serde(default)]
    pub element: Option<Element>,
    #[serde(default, alias = "maxHits")]
    pub charges: Option<u32>,
    #[serde(default)]
    pub guards: Option<BuffKind>,
    #[serde(default)]
    pub chance: Option<f64>,
    #[serde(default)]
    pub dispellable: Option<bool>,
    #[serde(default)]
    pub procs: Vec<ProcDef>,
}

impl BuffSpec {
    pub fn new(kind: BuffKind, value: f64, duration: i32) -> Self {
        Self {
            kind,
            value,
            duration: Some(duration),
            name: None,
            stackable: None,
            max_stacks: None,
            interaction: None,
            element: None,
            charges: None,
            guards: None,
            chance: None,
            dispellable: None,
            procs: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn stackable(mut self, stackable: bool) -> Self {
        self.stackable = Some(stackable);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buff {
    pub id: BuffId,
    pub kind: BuffKind,
    pub name: String,
    pub value: f64,
    pub duration: i32,
    pub current_stacks: u32,
    pub max_stacks: u32,
    pub stackable: bool,
    pub interaction: ValueInteraction,
    pub can_dispel: bool,
    pub is_positive: bool,
    pub source: Option<CombatantId>,
    pub parent: Option<BuffId>,
    pub element: Option<Element>,
    pub charges: Option<u32>,
    pub guards: Option<BuffKind>,
    pub chance: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub procs: Vec<ProcDef>,
}

impl Buff {
    pub fn from_spec(spec: &BuffSpec, source: Option<CombatantId>, default_duration: i32) -> Self {
        let profile = spec.kind.profile();
        let stackable = spec.stackable.unwrap_or(profile.stackable);
        let max_stacks = spec
            .max_stacks
            .unwrap_or(if stackable { profile.max_stacks.max(1) } else { 1 })
            .max(1);
        Self {
            id: 0,
            kind: spec.kind,
            name: spec.name.clone().unwrap_or_else(|| spec.kind.label()),
            value: spec.value,
            duration: spec.duration.unwrap_or(default_duration),
            current_stacks: 1,
            max_stacks,
            stackable,
            interaction: spec.interaction.unwrap_or(profile.interaction),
            can_dispel: spec.dispellable.unwrap_or(profile.dispellable),
            is_positive: profile.positive,
            source,
            parent: None,
            element: spec.element,
            charges: spec.charges,
            guards: spec.guards,
            chance: spec.chance,
            procs: spec.procs.clone(),
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.duration == PERMANENT
    }

    pub fn is_sub_buff(&self) -> bool {
        self.parent.is_some()
    }

    fn same_instance_key(&self, other: &Buff) -> bool {
        self.kind == other.kind
            && self.name == other.name
            && self.source == other.source
            && self.parent == other.parent
    }
}

/// Creates a buff from its type name. Unknown names yield `None`.
pub fn create_buff(kind: &str, value: f64, duration: i32, source: Option<CombatantId>) -> Option<Buff> {
    let kind = BuffKind::parse(kind)?;
    Some(Buff::from_spec(&BuffSpec::new(kind, value, duration), source, duration))
}

/// What happened to a buff handed to [`apply_buff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Added(BuffId),
    Stacked(BuffId),
    Refreshed(BuffId),
    Blocked(BlockReason),
}

impl ApplyOutcome {
    pub fn landed(self) -> bool {
        !matches!(self, ApplyOutcome::Blocked(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    DebuffImmunity,
    StatusImmunity,
    ResistedOnce,
    Dead,
}

/// Longer duration wins; permanent beats everything.
pub fn merge_duration(a: i32, b: i32) -> i32 {
    if a == PERMANENT || b == PERMANENT { PERMANENT } else { a.max(b) }
}

fn merge_value(interaction: ValueInteraction, current: f64, incoming: f64) -> f64 {
    match interaction {
        ValueInteraction::Add => current + incoming,
        ValueInteraction::Max => current.max(incoming),
        ValueInteraction::Replace | ValueInteraction::Independent => incoming,
    }
}

pub(crate) fn insert(target: &mut Combatant, mut buff: Buff) -> BuffId {
    target.next_buff_id += 1;
    buff.id = target.next_buff_id;
    let id = buff.id;
    target.buffs.push(buff);
    id
}

pub(crate) fn check_immunity(target: &mut Combatant, buff: &Buff) -> Option<BlockReason> {
    if buff.is_positive {
        return None;
    }
    if target.has_buff(BuffKind::DebuffImmunity) {
        return Some(BlockReason::DebuffImmunity);
    }
    if target
        .buffs_of(BuffKind::StatusImmunity)
        .any(|b| b.guards.map_or(buff.kind.is_status(), |g| g == buff.kind))
    {
        return Some(BlockReason::StatusImmunity);
    }
    let resist = target
        .buffs
        .iter_mut()
        .find(|b| b.kind == BuffKind::DebuffResistOnce && b.duration != 0)?;
    let left = resist.charges.unwrap_or(1).saturating_sub(1);
    resist.charges = Some(left);
    if left == 0 {
        let id = resist.id;
        target.buffs.retain(|b| b.id != id);
    }
    Some(BlockReason::ResistedOnce)
}

/// Applies `buff` to `target`, merging with an equivalent live instance when
/// there is one.
pub fn apply_buff(target: &mut Combatant, buff: Buff, log: &mut BattleLog) -> ApplyOutcome {
    if !target.is_alive() {
        return ApplyOutcome::Blocked(BlockReason::Dead);
    }
    if let Some(reason) = check_immunity(target, &buff) {
        log.info(format!(
            "[BUFF][{}] {} blocked ({:?})",
            target.name, buff.name, reason
        ));
        target.refresh_stats();
        return ApplyOutcome::Blocked(reason);
    }

    if buff.kind == BuffKind::Shield {
        target.shield += buff.value.max(0.0) as i64;
    }

    let existing = if buff.interaction == ValueInteraction::Independent {
        None
    } else {
        target
            .buffs
            .iter_mut()
            .find(|b| b.duration != 0 && b.same_instance_key(&buff))
    };

    let outcome = match existing {
        Some(live) if live.stackable || live.is_sub_buff() => {
            live.duration = merge_duration(live.duration, buff.duration);
            if live.current_stacks < live.max_stacks {
                live.current_stacks += 1;
                live.value = merge_value(live.interaction, live.value, buff.value);
                log.detail(format!(
                    "[BUFF][{}] {} stacks {}/{} value={:.3} duration={}",
                    target.name, live.name, live.current_stacks, live.max_stacks, live.value, live.duration
                ));
                ApplyOutcome::Stacked(live.id)
            } else {
                if live.interaction != ValueInteraction::Add {
                    live.value = merge_value(live.interaction, live.value, buff.value);
                }
                log.detail(format!(
                    "[BUFF][{}] {} at max stacks, refreshed to duration={}",
                    target.name, live.name, live.duration
                ));
                ApplyOutcome::Refreshed(live.id)
            }
        }
        Some(live) => {
            live.duration = merge_duration(live.duration, buff.duration);
            let interaction = match live.interaction {
                ValueInteraction::Add => ValueInteraction::Replace,
                other => other,
            };
            live.value = merge_value(interaction, live.value, buff.value);
            if buff.charges.is_some() {
                live.charges = buff.charges;
            }
            log.detail(format!(
                "[BUFF][{}] {} refreshed value={:.3} duration={}",
                target.name, live.name, live.value, live.duration
            ));
            ApplyOutcome::Refreshed(live.id)
        }
        None => {
            let label = format!(
                "[BUFF][{}] gains {} ({:.3}, {})",
                target.name,
                buff.name,
                buff.value,
                describe_duration(buff.duration)
            );
            let id = insert(target, buff);
            log.detail(label);
            ApplyOutcome::Added(id)
        }
    };
    target.refresh_stats();
    outcome
}

pub fn describe_duration(duration: i32) -> String {
    if duration == PERMANENT {
        "permanent".to_string()
    } else {
        format!("{} turns", duration)
    }
}

fn ids_with_children(target: &Combatant, id: BuffId) -> Vec<BuffId> {
    let mut ids = vec![id];
    ids.extend(target.buffs.iter().filter(|b| b.parent == Some(id)).map(|b| b.id));
    ids
}

fn drop_ids(target: &mut Combatant, ids: &[BuffId]) -> Vec<Buff> {
    let mut removed = Vec::new();
    let mut kept = Vec::with_capacity(target.buffs.len());
    for b in target.buffs.drain(..) {
        if ids.contains(&b.id) {
            removed.push(b);
        } else {
            kept.push(b);
        }
    }
    target.buffs = kept;
    if !target.has_buff(BuffKind::Shield) {
        target.shield = 0;
    }
    removed
}

/// Removes one buff and, for a package, every sub-buff it owns.
pub fn remove_buff(target: &mut Combatant, id: BuffId) -> Option<Buff> {
    if !target.buffs.iter().any(|b| b.id == id) {
        return None;
    }
    let ids = ids_with_children(target, id);
    let removed = drop_ids(target, &ids);
    target.refresh_stats();
    removed.into_iter().find(|b| b.id == id)
}

/// End-of-turn tick. Returns the top-level buffs that expired.
pub fn update_durations(target: &mut Combatant, log: &mut BattleLog) -> Vec<Buff> {
    let parents: Vec<BuffId> = target.buffs.iter().filter(|b| !b.is_sub_buff()).map(|b| b.id).collect();
    // subs whose package is gone
    let orphans: Vec<BuffId> = target
        .buffs
        .iter()
        .filter(|b| b.parent.is_some_and(|p| !parents.contains(&p)))
        .map(|b| b.id)
        .collect();
    if !orphans.is_empty() {
        drop_ids(target, &orphans);
    }

    for b in target.buffs.iter_mut().filter(|b| !b.is_sub_buff()) {
        if b.duration > 0 {
            b.duration -= 1;
        }
    }
    let durations: Vec<(BuffId, i32)> = target.buffs.iter().map(|b| (b.id, b.duration)).collect();
    for b in target.buffs.iter_mut() {
        if let Some(parent) = b.parent {
            if let Some((_, d)) = durations.iter().find(|(id, _)| *id == parent) {
                b.duration = *d;
            }
        }
    }

    let expired_ids: Vec<BuffId> = target
        .buffs
        .iter()
        .filter(|b| b.duration == 0 && !b.is_sub_buff())
        .flat_map(|b| ids_with_children(target, b.id))
        .collect();
    let expired: Vec<Buff> = drop_ids(target, &expired_ids)
        .into_iter()
        .filter(|b| !b.is_sub_buff())
        .collect();
    for b in &expired {
        log.detail(format!("[BUFF][{}] {} expired", target.name, b.name));
    }
    target.refresh_stats();
    expired
}

/// Removes up to `count` dispellable buffs of the given polarity, oldest first.
pub fn dispel(target: &mut Combatant, positive: bool, count: usize, log: &mut BattleLog) -> Vec<Buff> {
    let picked: Vec<BuffId> = target
        .buffs
        .iter()
        .filter(|b| b.can_dispel && b.is_positive == positive && !b.is_sub_buff() && b.duration != 0)
        .take(count)
        .map(|b| b.id)
        .collect();
    let removed: Vec<Buff> = picked.into_iter().filter_map(|id| remove_buff(target, id)).collect();
    for b in &removed {
        log.info(format!("[DISPEL][{}] {} removed", target.name, b.name));
    }
    removed
}

/// Clears negative buffs regardless of dispellability. `None` clears all of them.
pub fn clear_debuffs(target: &mut Combatant, count: Option<usize>, log: &mut BattleLog) -> Vec<Buff> {
    let picked: Vec<BuffId> = target
        .buffs
        .iter()
        .filter(|b| !b.is_positive && !b.is_sub_buff())
        .take(count.unwrap_or(usize::MAX))
        .map(|b| b.id)
        .collect();
    let removed: Vec<Buff> = picked.into_iter().filter_map(|id| remove_buff(target, id)).collect();
    for b in &removed {
        log.info(format!("[CLEANSE][{}] {} removed", target.name, b.name));
    }
    removed
}

pub fn clear_all(target: &mut Combatant) {
    target.buffs.clear();
    target.shield = 0;
    target.refresh_stats();
}

/// Damage and healing dealt by damage-over-time and heal-over-time buffs at turn start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnStartTick {
    pub damage: i64,
    pub healing: i64,
}

pub fn process_turn_start(target: &mut Combatant, log: &mut BattleLog) -> TurnStartTick {
    if !target.is_alive() {
        return TurnStartTick::default();
    }
    let dot = target.buff_total(BuffKind::Dot).max(0.0) as i64;
    let hot = (target.buff_total(BuffKind::Hot) + target.buff_total(BuffKind::Regen)).max(0.0) as i64;
    let damage = if dot > 0 { target.take_damage(dot) } else { 0 };
    let healing = if hot > 0 { target.heal(hot) } else { 0 };
    if damage > 0 {
        log.battle(format!("[DOT][{}] takes {} damage (HP {})", target.name, damage, target.hp));
    }
    if healing > 0 {
        log.battle(format!("[HOT][{}] recovers {} HP (HP {})", target.name, healing, target.hp));
    }
    TurnStartTick { damage, healing }
}
