//! Passive triggers.
//!
//! A proc is an effect list attached to a passive skill or to a live buff,
//! fired when a matching battle event happens to its owner.

use crate::buffs::BuffKind;
use crate::combat::damage::{apply_damage, attack_power, DamageOptions};
use crate::combat::effects::{apply_effects, EffectCtx};
use crate::combatant::CombatantId;
use crate::data::{ProcDef, TargetType, Trigger};
use crate::session::{BattleSession, ProcKey};

/// Procs may trigger procs, but only this many levels deep.
pub const MAX_PROC_DEPTH: u32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcContext {
    /// Damage dealt or taken by the event, when there is one.
    pub amount: i64,
    /// The other party of the event: the attacker for `onDamaged`, the
    /// target for `onAttackHit`.
    pub other: Option<CombatantId>,
}

struct Candidate {
    source: String,
    label: String,
    def: ProcDef,
}

fn candidates(session: &BattleSession, entity: CombatantId, trigger: Trigger) -> Vec<Candidate> {
    let c = session.get(entity);
    let mut out = Vec::new();
    for passive in &c.passives {
        let Some(skill) = session.book.get(passive) else {
            continue;
        };
        for (idx, def) in skill.procs.iter().enumerate().filter(|(_, d)| d.trigger == trigger) {
            out.push(Candidate {
                source: format!("{}#{}", skill.id, idx),
                label: skill.name.clone(),
                def: def.clone(),
            });
        }
    }
    for buff in c.buffs.iter().filter(|b| b.duration != 0) {
        for (idx, def) in buff.procs.iter().enumerate().filter(|(_, d)| d.trigger == trigger) {
            out.push(Candidate {
                source: format!("buff:{}#{}", buff.name, idx),
                label: buff.name.clone(),
                def: def.clone(),
            });
        }
    }
    out
}

/// Fires every proc of `entity` listening to `trigger`.
pub fn fire(session: &mut BattleSession, entity: CombatantId, trigger: Trigger, ctx: ProcContext) {
    if session.proc_depth >= MAX_PROC_DEPTH || !session.get(entity).is_alive() {
        return;
    }
    session.proc_depth += 1;

    if trigger == Trigger::OnDamagedByEnemy {
        counter_attack(session, entity, ctx);
    }

    for candidate in candidates(session, entity, trigger) {
        if !session.get(entity).is_alive() {
            break;
        }
        let key = ProcKey { entity, source: candidate.source.clone(), trigger };
        let used = session.proc_counts.get(&key).copied().unwrap_or(0);
        if candidate.def.max_activations.is_some_and(|max| used >= max) {
            continue;
        }
        let chance = candidate.def.chance.unwrap_or(1.0);
        if chance < 1.0 && !session.dice.chance(chance) {
            continue;
        }
        session.proc_counts.insert(key, used + 1);

        let line = format!("[PROC][{}] {} ({:?})", session.name(entity), candidate.label, trigger);
        session.log.info(line);
        let mut effect_ctx = EffectCtx::new(
            entity,
            candidate.label.clone(),
            candidate.def.target.unwrap_or(TargetType::Enemy),
        );
        effect_ctx.primary = ctx.other;
        effect_ctx.default_duration = match trigger {
            Trigger::BattleStart => crate::buffs::PERMANENT,
            _ => 3,
        };
        apply_effects(session, &effect_ctx, &candidate.def.effects);
    }

    session.proc_depth -= 1;
}

/// `counterAttack`: strike back at an enemy attacker for value × attack power.
fn counter_attack(session: &mut BattleSession, entity: CombatantId, ctx: ProcContext) {
    let Some(attacker) = ctx.other else {
        return;
    };
    let c = session.get(entity);
    let Some(multiplier) = c.buff_max(BuffKind::CounterAttack) else {
        return;
    };
    if !session.get(attacker).is_alive() {
        return;
    }
    let raw = (attack_power(c) * multiplier).floor();
    let c = session.get_mut(entity);
    if let Some(buff) = c.buffs.iter_mut().find(|b| b.kind == BuffKind::CounterAttack && b.duration != 0) {
        if let Some(left) = buff.charges {
            let left = left.saturating_sub(1);
            buff.charges = Some(left);
            if left == 0 {
                let id = buff.id;
                crate::buffs::remove_buff(c, id);
            }
        }
    }
    let opts = DamageOptions {
        single_target: false,
        label: "counter".to_string(),
        ..DamageOptions::normal_attack()
    };
    apply_damage(session, entity, attacker, raw, &opts);
}
