//! Damage resolution: attack power, mitigation layers and caps.

use crate::buffs::{self, BuffKind};
use crate::combat::procs::{self, ProcContext};
use crate::combatant::{Combatant, CombatantId};
use crate::data::Trigger;
use crate::element::{element_multiplier, Element};
use crate::roster;
use crate::session::BattleSession;

pub const NORMAL_DAMAGE_CAP: f64 = 199_999.0;
pub const SKILL_DAMAGE_CAP: f64 = 799_999.0;
pub const MAX_DAMAGE_REDUCTION: f64 = 0.8;
pub const VARIANCE_LOW: f64 = 0.95;
pub const VARIANCE_HIGH: f64 = 1.05;

#[derive(Debug, Clone, Default)]
pub struct DamageOptions {
    pub is_skill: bool,
    pub skip_critical: bool,
    pub element: Option<Element>,
    pub ignore_defense: bool,
    /// Fixed damage skips crit, element, variance and defense.
    pub fixed: bool,
    /// Single-target hits can be redirected by `cover`.
    pub single_target: bool,
    pub label: String,
}

impl DamageOptions {
    pub fn normal_attack() -> Self {
        Self { single_target: true, label: "attack".to_string(), ..Self::default() }
    }

    pub fn skill(label: impl Into<String>) -> Self {
        Self { is_skill: true, skip_critical: true, label: label.into(), ..Self::default() }
    }

    pub fn fixed(label: impl Into<String>) -> Self {
        Self { fixed: true, skip_critical: true, label: label.into(), ..Self::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageOutcome {
    pub damage: i64,
    pub is_critical: bool,
    pub missed: bool,
    pub actual_target: CombatantId,
}

/// Effective attack including stamina, enmity, EX attack and flat bonuses.
///
/// # Formula
///
/// ```text
/// stamina = value × (0.05 + hp% × 0.45)
/// enmity  = value × (0.5 − hp% × 0.45)
/// power   = attack × (1 + stamina + enmity) × (1 + ex) + flat
/// ```
pub fn attack_power(c: &Combatant) -> f64 {
    let ratio = c.hp_ratio();
    let stamina = c.buff_max(BuffKind::StaminaUp).map_or(0.0, |v| v * (0.05 + ratio * 0.45));
    let enmity = c.buff_max(BuffKind::EnmityUp).map_or(0.0, |v| v * (0.5 - ratio * 0.45));
    let ex = c.buff_total(BuffKind::ExAttackUp);
    let flat = c.buff_total(BuffKind::DamageIncrease);
    (c.current.attack * (1.0 + stamina + enmity) * (1.0 + ex) + flat).max(0.0)
}

/// First living front-line ally of `target` with an active cover buff.
fn cover_redirect(session: &mut BattleSession, target: CombatantId) -> CombatantId {
    let candidates: Vec<(CombatantId, Option<f64>)> = session
        .allies_of(target)
        .into_iter()
        .filter(|id| *id != target)
        .filter_map(|id| {
            session
                .get(id)
                .buffs_of(BuffKind::Cover)
                .next()
                .map(|b| (id, b.chance))
        })
        .collect();
    for (id, chance) in candidates {
        let covers = match chance {
            Some(p) if p < 1.0 => session.dice.chance(p),
            _ => true,
        };
        if covers {
            let line = format!(
                "[COVER][{}] takes the hit for {}",
                session.name(id),
                session.name(target)
            );
            session.log.battle(line);
            return id;
        }
    }
    target
}

fn consume_charge(c: &mut Combatant, kind: BuffKind) {
    let Some(buff) = c.buffs.iter_mut().find(|b| b.kind == kind && b.duration != 0) else {
        return;
    };
    let Some(left) = buff.charges else {
        return;
    };
    let left = left.saturating_sub(1);
    buff.charges = Some(left);
    if left == 0 {
        let id = buff.id;
        buffs::remove_buff(c, id);
    }
}

/// Resolves one hit of `raw` damage from `attacker` on `target`.
///
/// Steps run in a fixed order: miss, cover, crit, element, variance,
/// defense, floor, the target's defensive layers, the attacker's cap and
/// finally the HP change with its defeat and proc side effects.
pub fn apply_damage(
    session: &mut BattleSession,
    attacker: CombatantId,
    target: CombatantId,
    raw: f64,
    opts: &DamageOptions,
) -> DamageOutcome {
    let mut steps: Vec<String> = vec![format!("raw={:.0}", raw)];
    let miss_rate = session.get(attacker).buff_total(BuffKind::MissRate).min(1.0);
    if !opts.fixed && miss_rate > 0.0 && session.dice.chance(miss_rate) {
        let line = format!("[MISS][{}] {} misses", session.name(attacker), opts.label);
        session.log.battle(line);
        return DamageOutcome { damage: 0, is_critical: false, missed: true, actual_target: target };
    }

    let actual = if opts.single_target { cover_redirect(session, target) } else { target };
    let atk = session.get(attacker);
    let def = session.get(actual);
    let attacker_side = atk.side;
    let attack_element = opts.element.unwrap_or(atk.element);
    let defender_element = def.element;
    let crit_rate = atk.current.crit_rate;
    let crit_damage = atk.current.crit_damage;
    let enhance: f64 = atk
        .buffs
        .iter()
        .filter(|b| b.duration != 0 && b.kind.enhanced_element() == Some(attack_element))
        .map(|b| b.value)
        .sum();
    let effective_defense = (def.current.defense - atk.current.ignore_defense).max(0.0);
    let skill_cap_up = atk.buff_max(BuffKind::SkillDamageCapUp);
    let cap_up = atk.buff_max(BuffKind::DamageCapUp);

    let mut dmg = raw.max(0.0);
    let mut is_critical = false;
    if !opts.fixed {
        if !opts.skip_critical && session.dice.chance(crit_rate) {
            is_critical = true;
            dmg *= crit_damage;
            steps.push(format!("crit x{:.2}", crit_damage));
        }
        let mult = element_multiplier(attacker_side, attack_element, defender_element) + enhance;
        dmg *= mult;
        steps.push(format!("element x{:.2}", mult));
        let variance = session.dice.between(VARIANCE_LOW, VARIANCE_HIGH);
        dmg *= variance;
        steps.push(format!("variance x{:.3}", variance));
        if !opts.ignore_defense {
            dmg /= 1.0 + effective_defense / 100.0;
            steps.push(format!("defense {:.0}", effective_defense));
        }
    }
    let mut dmg = (dmg.floor() as i64).max(1);
    let mut missed = false;

    // defensive layers of whoever actually takes the hit
    let def = session.get(actual);
    if def.has_buff(BuffKind::Invincible) {
        dmg = 0;
        steps.push("invincible".to_string());
        consume_charge(session.get_mut(actual), BuffKind::Invincible);
    } else if def.has_buff(BuffKind::EvasionAll) {
        dmg = 0;
        missed = true;
        steps.push("evaded".to_string());
    } else if let Some(p) = def.buff_max(BuffKind::Evade).filter(|_| !opts.fixed) {
        if session.dice.chance(p) {
            dmg = 0;
            missed = true;
            steps.push("evaded".to_string());
        }
    }

    if dmg > 0 {
        let target_c = session.get_mut(actual);
        if target_c.shield > 0 {
            let absorbed = dmg.min(target_c.shield);
            target_c.shield -= absorbed;
            dmg -= absorbed;
            steps.push(format!("shield -{}", absorbed));
            if target_c.shield == 0 {
                target_c.buffs.retain(|b| b.kind != BuffKind::Shield);
                target_c.refresh_stats();
            }
        }
    }

    if dmg > 0 {
        let def = session.get(actual);
        let cap = def
            .buffs_of(BuffKind::DamageCap)
            .filter(|b| b.element.is_none_or(|el| el == attack_element))
            .map(|b| b.value)
            .reduce(f64::min);
        if let Some(cap) = cap {
            if (dmg as f64) > cap {
                dmg = cap.max(0.0) as i64;
                steps.push(format!("element cap {:.0}", cap));
            }
        }
        let resist: f64 = def
            .buffs_of(BuffKind::ElementalResistance)
            .filter(|b| b.element.is_none_or(|el| el == attack_element))
            .map(|b| b.value)
            .sum();
        let reduction = (def.buff_total(BuffKind::AllDamageTakenReduction)
            + def.buff_total(BuffKind::DamageReduction)
            + resist)
            .clamp(0.0, MAX_DAMAGE_REDUCTION);
        if reduction > 0.0 {
            dmg = ((dmg as f64) * (1.0 - reduction)).floor() as i64;
            steps.push(format!("reduction {:.0}%", reduction * 100.0));
        }
    }

    let base_cap = if opts.is_skill { SKILL_DAMAGE_CAP } else { NORMAL_DAMAGE_CAP };
    let raise = if opts.is_skill {
        skill_cap_up.into_iter().chain(cap_up).reduce(f64::max)
    } else {
        cap_up
    };
    let cap = base_cap * (1.0 + raise.unwrap_or(0.0).max(0.0));
    if dmg as f64 > cap {
        dmg = cap as i64;
        steps.push(format!("cap {:.0}", cap));
    }

    let target_c = session.get_mut(actual);
    let dealt = target_c.take_damage(dmg);
    if target_c.hp == 0 && dealt > 0 && target_c.has_buff(BuffKind::Guts) {
        target_c.hp = 1;
        consume_charge(target_c, BuffKind::Guts);
        steps.push("guts".to_string());
    }
    let survived = target_c.is_alive();
    let hp_after = target_c.hp;
    let max_hp = target_c.max_hp();

    {
        let a = session.get_mut(attacker);
        a.stats.total_damage += dmg;
        if is_critical {
            a.stats.crit_count += 1;
        }
    }

    let detail = format!(
        "[DMG][{}] {} on {}: {} = {}",
        session.name(attacker),
        opts.label,
        session.name(actual),
        steps.join(" | "),
        dmg
    );
    session.log.detail(detail);
    let line = format!(
        "[HIT][{}] {} hits {} for {}{} (HP {}/{})",
        session.name(attacker),
        opts.label,
        session.name(actual),
        dmg,
        if is_critical { " CRIT" } else { "" },
        hp_after,
        max_hp
    );
    session.log.battle(line);

    if dmg > 0 && attacker != actual {
        let reflect = session.get(actual).buff_total(BuffKind::Reflect);
        if reflect > 0.0 && session.get(attacker).is_alive() {
            let back = ((dmg as f64) * reflect).floor() as i64;
            let a = session.get_mut(attacker);
            let taken = a.take_damage(back);
            let still_up = a.is_alive();
            let line = format!("[REFLECT][{}] takes {} reflected damage", session.name(attacker), taken);
            session.log.battle(line);
            if !still_up {
                roster::handle_defeat(session, attacker);
            }
        }
    }

    if !survived && dealt > 0 {
        roster::handle_defeat(session, actual);
    }

    if dmg > 0 && survived {
        let ctx = ProcContext { amount: dmg, other: Some(attacker) };
        procs::fire(session, actual, Trigger::OnDamaged, ctx);
        if session.get(attacker).side != session.get(actual).side {
            procs::fire(session, actual, Trigger::OnDamagedByEnemy, ctx);
        }
    }

    DamageOutcome { damage: dmg, is_critical, missed, actual_target: actual }
}
