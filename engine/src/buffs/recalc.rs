use super::{Buff, BuffKind};
use crate::combatant::Stats;

pub const MAX_ATTACK_DOWN: f64 = 0.5;
pub const MAX_DEFENSE_DOWN: f64 = 0.5;

/// Derives combat stats from a base snapshot and the buffs on a combatant.
///
/// Percentage buffs always scale the base value, so the result does not
/// depend on the order buffs were applied in. Stackable attack buffs are
/// summed into one multiplier; non-stackable ("stance") attack buffs each
/// multiply the already-buffed value.
///
/// # Formula
///
/// ```text
/// attack  = base.attack × (1 + Σup + all − min(Σdown, 0.5)) × Π(1 + stance)
/// defense = base.defense × (1 + Σup + all − min(Σdown, 0.5))
/// max_hp  = base.max_hp × (1 + all)
/// ```
pub fn recalculate(base: &Stats, buffs: &[Buff]) -> Stats {
    let mut attack_up = 0.0;
    let mut attack_down = 0.0;
    let mut stance = 1.0;
    let mut defense_up = 0.0;
    let mut defense_down = 0.0;
    let mut all_stats = 0.0;
    let mut crit_rate = 0.0;
    let mut crit_damage = 0.0;
    let mut da = 0.0;
    let mut ta = 0.0;

    for b in buffs.iter().filter(|b| b.duration != 0) {
        match b.kind {
            BuffKind::AttackUp if b.stackable => attack_up += b.value,
            BuffKind::AttackUp => stance *= 1.0 + b.value,
            BuffKind::AttackDown => attack_down += b.value,
            BuffKind::DefenseUp => defense_up += b.value,
            BuffKind::DefenseDown => defense_down += b.value,
            BuffKind::AllStatsUp => all_stats += b.value,
            BuffKind::CritRate => crit_rate += b.value,
            BuffKind::CritDamage => crit_damage += b.value,
            BuffKind::DaBoost => da += b.value,
            BuffKind::DaDown => da -= b.value,
            BuffKind::TaBoost => ta += b.value,
            BuffKind::TaDown => ta -= b.value,
            _ => {}
        }
    }

    let attack_mult = 1.0 + attack_up + all_stats - attack_down.min(MAX_ATTACK_DOWN);
    let defense_mult = 1.0 + defense_up + all_stats - defense_down.min(MAX_DEFENSE_DOWN);

    Stats {
        max_hp: ((base.max_hp as f64) * (1.0 + all_stats)).round().max(1.0) as i64,
        attack: (base.attack * attack_mult.max(0.0) * stance).max(0.0),
        defense: (base.defense * defense_mult.max(0.0)).max(0.0),
        crit_rate: (base.crit_rate + crit_rate).clamp(0.0, 1.0),
        crit_damage: (base.crit_damage + crit_damage).max(1.0),
        da_rate: (base.da_rate + da).max(0.0),
        ta_rate: (base.ta_rate + ta).max(0.0),
        ignore_defense: base.ignore_defense,
    }
}
