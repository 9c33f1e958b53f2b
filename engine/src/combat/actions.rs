//! Normal attacks and the monster's threat roll.

use crate::buffs::BuffKind;
use crate::combat::damage::{apply_damage, attack_power, DamageOptions};
use crate::combat::procs::{self, ProcContext};
use crate::combatant::CombatantId;
use crate::data::Trigger;
use crate::session::BattleSession;

pub const BASE_THREAT: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttackOutcome {
    pub hits: u32,
    pub damage: i64,
}

/// Number of hits for one normal attack. A single roll decides it: below
/// the TA rate is a triple attack, below TA + DA a double.
fn roll_hits(session: &mut BattleSession, attacker: CombatantId) -> u32 {
    let c = session.get(attacker);
    let da = c.current.da_rate.max(0.0);
    let ta = c.current.ta_rate.max(0.0);
    let r = session.dice.roll();
    let c = session.get_mut(attacker);
    if r < ta {
        c.stats.ta_count += 1;
        3
    } else if r < ta + da {
        c.stats.da_count += 1;
        2
    } else {
        1
    }
}

/// One normal attack of `attacker` on `target`, including multi-hit,
/// `chase` follow-ups and `onAttackHit` procs.
pub fn normal_attack(session: &mut BattleSession, attacker: CombatantId, target: CombatantId) -> AttackOutcome {
    let hits = roll_hits(session, attacker);
    let mut outcome = AttackOutcome::default();
    for _ in 0..hits {
        if !session.get(attacker).is_alive() || !session.get(target).is_alive() {
            break;
        }
        let raw = attack_power(session.get(attacker)).floor();
        let hit = apply_damage(session, attacker, target, raw, &DamageOptions::normal_attack());
        outcome.hits += 1;
        outcome.damage += hit.damage;
        if hit.missed || hit.damage == 0 {
            continue;
        }

        if let Some(chase) = session.get(attacker).buff_max(BuffKind::Chase) {
            if session.get(hit.actual_target).is_alive() {
                let extra = ((hit.damage as f64) * chase).floor();
                let follow = apply_damage(session, attacker, hit.actual_target, extra, &DamageOptions::fixed("chase"));
                outcome.damage += follow.damage;
            }
        }

        let ctx = ProcContext { amount: hit.damage, other: Some(hit.actual_target) };
        procs::fire(session, attacker, Trigger::OnAttackHit, ctx);
    }

    let line = match hits {
        3 => format!("[ATK][{}] triple attack for {} total", session.name(attacker), outcome.damage),
        2 => format!("[ATK][{}] double attack for {} total", session.name(attacker), outcome.damage),
        _ => format!("[ATK][{}] attacks for {}", session.name(attacker), outcome.damage),
    };
    session.log.info(line);
    outcome
}

/// Picks the monster's target among the living front line, weighted by
/// `100 + threatUp − threatDown` (floored at 0, uniform when all are 0).
pub fn pick_threat_target(session: &mut BattleSession) -> Option<CombatantId> {
    let candidates = session.living_front();
    let weights: Vec<f64> = candidates
        .iter()
        .map(|id| {
            let c = session.get(*id);
            (BASE_THREAT + c.buff_total(BuffKind::ThreatUp) - c.buff_total(BuffKind::ThreatDown)).max(0.0)
        })
        .collect();
    let idx = session.dice.weighted_index(&weights)?;
    let target = candidates.get(idx).copied()?;
    let line = format!("[THREAT] {} is targeted", session.name(target));
    session.log.detail(line);
    Some(target)
}
