//! Effect dispatch shared by skills and procs.
//!
//! Each [`EffectKind`] maps to one handler registered when the session is
//! built. Skills and procs both go through [`apply_effects`], so they log
//! and account identically.

use std::collections::HashMap;

use crate::buffs::{self, package, ApplyOutcome, Buff};
use crate::combat::damage::{apply_damage, attack_power, DamageOptions};
use crate::combat::skills;
use crate::combat::targets::get_targets;
use crate::combatant::CombatantId;
use crate::data::{EffectKind, HpBasis, SkillEffect, TargetType};
use crate::element::Element;
use crate::session::BattleSession;

/// Who is acting and with what defaults.
#[derive(Debug, Clone)]
pub struct EffectCtx {
    pub caster: CombatantId,
    pub label: String,
    pub target_type: TargetType,
    /// Enemy already picked by the caller, e.g. by the monster's threat roll.
    pub primary: Option<CombatantId>,
    pub default_duration: i32,
    pub skip_critical: Option<bool>,
    pub element: Option<Element>,
    pub is_skill: bool,
    /// Sum of `additionalDamage` siblings, added to every damage multiplier.
    pub damage_bonus: f64,
}

impl EffectCtx {
    pub fn new(caster: CombatantId, label: impl Into<String>, target_type: TargetType) -> Self {
        Self {
            caster,
            label: label.into(),
            target_type,
            primary: None,
            default_duration: 3,
            skip_critical: None,
            element: None,
            is_skill: true,
            damage_bonus: 0.0,
        }
    }

    fn friendly(&self, explicit: Option<TargetType>) -> TargetType {
        explicit.unwrap_or(if self.target_type.is_hostile() {
            TargetType::SelfOnly
        } else {
            self.target_type
        })
    }

    fn hostile(&self, explicit: Option<TargetType>) -> TargetType {
        explicit.unwrap_or(if self.target_type.is_hostile() {
            self.target_type
        } else {
            TargetType::Enemy
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectReport {
    pub success: bool,
    pub damage: i64,
    pub healing: i64,
    /// HP the caster spent on costs before any effect ran.
    pub hp_paid: i64,
    /// Kinds of the effects that took hold, in order.
    pub applied: Vec<EffectKind>,
}

impl EffectReport {
    fn merge(&mut self, other: EffectReport) {
        self.success |= other.success;
        self.damage += other.damage;
        self.healing += other.healing;
        self.hp_paid += other.hp_paid;
        self.applied.extend(other.applied);
    }
}

pub type EffectHandler = fn(&mut BattleSession, &EffectCtx, &SkillEffect) -> EffectReport;

#[derive(Clone, Default)]
pub struct EffectRegistry {
    handlers: HashMap<EffectKind, EffectHandler>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(EffectKind::Damage, damage);
        registry.register(EffectKind::Heal, heal);
        registry.register(EffectKind::Buff, buff);
        registry.register(EffectKind::Debuff, buff);
        registry.register(EffectKind::ApplyBuffPackage, apply_package);
        registry.register(EffectKind::Dispel, dispel);
        registry.register(EffectKind::ClearDebuff, clear_debuff);
        registry.register(EffectKind::Revive, revive);
        registry.register(EffectKind::CastSkill, cast_skill);
        registry.register(EffectKind::Proc, nested_proc);
        registry
    }

    pub fn register(&mut self, kind: EffectKind, handler: EffectHandler) {
        self.handlers.insert(kind, handler);
    }

    pub fn unregister(&mut self, kind: EffectKind) {
        self.handlers.remove(&kind);
    }

    pub fn get(&self, kind: EffectKind) -> Option<EffectHandler> {
        self.handlers.get(&kind).copied()
    }
}

impl std::fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectRegistry").field("handlers", &self.handlers.len()).finish()
    }
}

/// Pays every HP cost in `effects` and returns the total spent. `None` when
/// a cost cannot be paid, in which case nothing else of the skill may happen.
fn pay_hp_costs(session: &mut BattleSession, ctx: &EffectCtx, effects: &[SkillEffect]) -> Option<i64> {
    let mut paid = 0;
    for effect in effects {
        let SkillEffect::HpCost { percentage, based_on } = effect else {
            continue;
        };
        let c = session.get_mut(ctx.caster);
        let basis = match based_on {
            HpBasis::Current => c.hp,
            HpBasis::MaxHp => c.max_hp(),
        };
        let cost = ((basis as f64) * percentage).floor().max(0.0) as i64;
        let line = if c.hp - cost >= 1 {
            c.hp -= cost;
            paid += cost;
            format!("[COST][{}] pays {} HP for {}", c.name, cost, ctx.label)
        } else if c.hp > 1 {
            paid += c.hp - 1;
            c.hp = 1;
            format!("[COST][{}] pays HP down to 1 for {}", c.name, ctx.label)
        } else {
            let line = format!("[COST][{}] cannot pay the HP cost of {}", c.name, ctx.label);
            session.log.info(line);
            return None;
        };
        session.log.info(line);
    }
    Some(paid)
}

/// Runs a list of effects. Each effect succeeds or fails on its own; the
/// list succeeds when at least one of them did.
pub fn apply_effects(session: &mut BattleSession, ctx: &EffectCtx, effects: &[SkillEffect]) -> EffectReport {
    let Some(hp_paid) = pay_hp_costs(session, ctx, effects) else {
        return EffectReport::default();
    };
    let mut ctx = ctx.clone();
    ctx.damage_bonus += effects
        .iter()
        .filter_map(|e| match e {
            SkillEffect::AdditionalDamage { multiplier } => Some(*multiplier),
            _ => None,
        })
        .sum::<f64>();

    let mut report = EffectReport { hp_paid, ..EffectReport::default() };
    for effect in effects {
        let kind = effect.kind();
        if matches!(kind, EffectKind::HpCost | EffectKind::AdditionalDamage) {
            continue;
        }
        if !session.get(ctx.caster).is_alive() && kind != EffectKind::Revive {
            break;
        }
        match session.registry.get(kind) {
            Some(handler) => {
                let outcome = handler(session, &ctx, effect);
                if outcome.success {
                    report.applied.push(kind);
                }
                report.merge(outcome);
            }
            None => {
                let line = format!("no handler for {:?} in {}; skipped", kind, ctx.label);
                session.log.warn(line);
            }
        }
    }
    report
}

fn damage(session: &mut BattleSession, ctx: &EffectCtx, effect: &SkillEffect) -> EffectReport {
    let SkillEffect::Damage(d) = effect else {
        return EffectReport::default();
    };
    let target_type = ctx.hostile(d.target);
    let targets = get_targets(session, ctx.caster, target_type, ctx.primary);
    let mut multiplier = match (d.min_multiplier, d.max_multiplier) {
        (Some(lo), Some(hi)) => session.dice.between(lo, hi),
        _ => d.multiplier,
    };
    multiplier += session.get(ctx.caster).buff_total(crate::buffs::BuffKind::SkillDamageUp) + ctx.damage_bonus;

    let opts = DamageOptions {
        is_skill: ctx.is_skill,
        skip_critical: d.skip_critical.or(ctx.skip_critical).unwrap_or(ctx.is_skill),
        element: d.element.or(ctx.element),
        ignore_defense: d.ignore_defense,
        fixed: d.fixed.is_some(),
        single_target: target_type.is_single(),
        label: ctx.label.clone(),
    };
    let mut report = EffectReport::default();
    for target in targets {
        for _ in 0..d.count {
            if !session.get(target).is_alive() || !session.get(ctx.caster).is_alive() {
                break;
            }
            let raw = match d.fixed {
                Some(v) => v,
                None => (attack_power(session.get(ctx.caster)) * multiplier).floor(),
            };
            let outcome = apply_damage(session, ctx.caster, target, raw, &opts);
            report.success = true;
            report.damage += outcome.damage;
        }
    }
    report
}

fn heal(session: &mut BattleSession, ctx: &EffectCtx, effect: &SkillEffect) -> EffectReport {
    let SkillEffect::Heal(h) = effect else {
        return EffectReport::default();
    };
    let targets = get_targets(session, ctx.caster, ctx.friendly(h.target), ctx.primary);
    let mut report = EffectReport::default();
    for target in targets {
        let t = session.get_mut(target);
        let amount = (h.value + h.percentage * t.max_hp() as f64).floor() as i64;
        let healed = t.heal(amount);
        if healed > 0 {
            let line = format!("[HEAL][{}] recovers {} HP (HP {}/{})", t.name, healed, t.hp, t.max_hp());
            session.log.battle(line);
            report.success = true;
            report.healing += healed;
        }
    }
    if report.healing > 0 {
        session.get_mut(ctx.caster).stats.total_healing += report.healing;
    } else {
        let line = format!("[HEAL][{}] {}: nobody needs healing", session.name(ctx.caster), ctx.label);
        session.log.info(line);
    }
    report
}

fn buff(session: &mut BattleSession, ctx: &EffectCtx, effect: &SkillEffect) -> EffectReport {
    let (spec, target_type) = match effect {
        SkillEffect::Buff { buff, target } => (buff, ctx.friendly(*target)),
        SkillEffect::Debuff { buff, target } => (buff, ctx.hostile(*target)),
        _ => return EffectReport::default(),
    };
    let targets = get_targets(session, ctx.caster, target_type, ctx.primary);
    let mut report = EffectReport::default();
    for target in targets {
        let instance = Buff::from_spec(spec, Some(ctx.caster), ctx.default_duration);
        let positive = instance.is_positive;
        let name = instance.name.clone();
        let outcome = buffs::apply_buff(&mut session.combatants[target.0], instance, &mut session.log);
        if outcome.landed() {
            report.success = true;
            let caster = session.get_mut(ctx.caster);
            if positive {
                caster.stats.buffs_applied += 1;
            } else {
                caster.stats.debuffs_applied += 1;
            }
            let line = format!("[BUFF][{}] {} from {}", session.name(target), name, ctx.label);
            session.log.battle(line);
        }
    }
    report
}

fn apply_package(session: &mut BattleSession, ctx: &EffectCtx, effect: &SkillEffect) -> EffectReport {
    let SkillEffect::ApplyBuffPackage { package: pkg, target } = effect else {
        return EffectReport::default();
    };
    let target_type = if pkg.positive { ctx.friendly(*target) } else { ctx.hostile(*target) };
    let targets = get_targets(session, ctx.caster, target_type, ctx.primary);
    let mut report = EffectReport::default();
    for target in targets {
        let outcome =
            package::apply_package(&mut session.combatants[target.0], pkg, Some(ctx.caster), &mut session.log);
        if outcome.landed() {
            report.success = true;
            let stacks = match outcome {
                ApplyOutcome::Added(_) => "new".to_string(),
                _ => "stacked".to_string(),
            };
            let caster = session.get_mut(ctx.caster);
            if pkg.positive {
                caster.stats.buffs_applied += 1;
            } else {
                caster.stats.debuffs_applied += 1;
            }
            let line = format!("[PACKAGE][{}] {} ({})", session.name(target), pkg.name, stacks);
            session.log.battle(line);
        }
    }
    report
}

fn dispel(session: &mut BattleSession, ctx: &EffectCtx, effect: &SkillEffect) -> EffectReport {
    let SkillEffect::Dispel { positive, count, target } = effect else {
        return EffectReport::default();
    };
    let target_type = if *positive { ctx.hostile(*target) } else { ctx.friendly(*target) };
    let targets = get_targets(session, ctx.caster, target_type, ctx.primary);
    let mut report = EffectReport::default();
    for target in targets {
        let removed = buffs::dispel(
            &mut session.combatants[target.0],
            *positive,
            *count as usize,
            &mut session.log,
        );
        report.success |= !removed.is_empty();
    }
    report
}

fn clear_debuff(session: &mut BattleSession, ctx: &EffectCtx, effect: &SkillEffect) -> EffectReport {
    let SkillEffect::ClearDebuff { count, target } = effect else {
        return EffectReport::default();
    };
    let targets = get_targets(session, ctx.caster, ctx.friendly(*target), ctx.primary);
    let mut report = EffectReport::default();
    for target in targets {
        let removed = buffs::clear_debuffs(
            &mut session.combatants[target.0],
            count.map(|c| c as usize),
            &mut session.log,
        );
        report.success |= !removed.is_empty();
    }
    report
}

fn revive(session: &mut BattleSession, ctx: &EffectCtx, effect: &SkillEffect) -> EffectReport {
    let SkillEffect::Revive { hp_ratio, target } = effect else {
        return EffectReport::default();
    };
    let targets = get_targets(session, ctx.caster, target.unwrap_or(TargetType::AllyDead), ctx.primary);
    let mut report = EffectReport::default();
    for target in targets {
        let t = session.get_mut(target);
        let hp = t.revive(*hp_ratio);
        if hp > 0 {
            let line = format!("[REVIVE][{}] returns with {} HP", t.name, hp);
            session.log.battle(line);
            report.success = true;
            report.healing += hp;
        }
    }
    report
}

fn cast_skill(session: &mut BattleSession, ctx: &EffectCtx, effect: &SkillEffect) -> EffectReport {
    let SkillEffect::CastSkill { skill_id } = effect else {
        return EffectReport::default();
    };
    let outcome = skills::cast_triggered(session, ctx.caster, skill_id, ctx.primary);
    EffectReport {
        success: outcome.success,
        damage: outcome.damage,
        healing: outcome.healing,
        hp_paid: 0,
        applied: outcome.effects,
    }
}

fn nested_proc(session: &mut BattleSession, ctx: &EffectCtx, effect: &SkillEffect) -> EffectReport {
    let SkillEffect::Proc { chance, effects } = effect else {
        return EffectReport::default();
    };
    if *chance < 1.0 && !session.dice.chance(*chance) {
        return EffectReport::default();
    }
    apply_effects(session, ctx, effects)
}
