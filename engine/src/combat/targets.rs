use std::cmp::Ordering;

use crate::combatant::CombatantId;
use crate::data::TargetType;
use crate::session::BattleSession;

fn by_hp_ratio(session: &BattleSession, a: CombatantId, b: CombatantId) -> Ordering {
    session
        .get(a)
        .hp_ratio()
        .partial_cmp(&session.get(b).hp_ratio())
        .unwrap_or(Ordering::Equal)
}

/// Resolves a target tag against the current field. Pure: reads the
/// session, never mutates it.
///
/// `primary` is the single enemy already chosen by the caller (the
/// monster's threat roll); when it is absent or dead the first living
/// enemy is used.
pub fn get_targets(
    session: &BattleSession,
    caster: CombatantId,
    target_type: TargetType,
    primary: Option<CombatantId>,
) -> Vec<CombatantId> {
    let allies = session.allies_of(caster);
    match target_type {
        TargetType::SelfOnly => vec![caster],
        TargetType::Ally => {
            let lowest = allies
                .iter()
                .copied()
                .filter(|id| *id != caster)
                .min_by(|a, b| by_hp_ratio(session, *a, *b));
            vec![lowest.unwrap_or(caster)]
        }
        TargetType::AllyLowestHp => allies
            .iter()
            .copied()
            .min_by(|a, b| by_hp_ratio(session, *a, *b))
            .into_iter()
            .collect(),
        TargetType::AllyDead => {
            let side = session.get(caster).side;
            session
                .combatants
                .iter()
                .enumerate()
                .find(|(_, c)| c.side == side && !c.is_alive())
                .map(|(idx, _)| CombatantId(idx))
                .into_iter()
                .collect()
        }
        TargetType::AllAllies => allies,
        TargetType::AllAlliesOf(element) => allies
            .into_iter()
            .filter(|id| session.get(*id).element == element)
            .collect(),
        TargetType::Enemy => {
            let enemies = session.enemies_of(caster);
            match primary.filter(|p| enemies.contains(p)) {
                Some(p) => vec![p],
                None => enemies.into_iter().take(1).collect(),
            }
        }
        TargetType::AllEnemies => session.enemies_of(caster),
        TargetType::All => {
            let mut all = allies;
            all.extend(session.enemies_of(caster));
            all
        }
    }
}
