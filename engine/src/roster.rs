use crate::battle::BattleEvent;
use crate::combatant::{CombatantId, Side};
use crate::session::BattleSession;

/// Called when a combatant's HP reaches zero. A defeated front-line player
/// leaves its slot and goes to the back of the reserve queue.
pub fn handle_defeat(session: &mut BattleSession, id: CombatantId) {
    let name = session.name(id).to_string();
    if session.get(id).side == Side::Enemy {
        session.log.battle(format!("[DEFEAT][{}] falls", name));
        return;
    }
    let Some(slot) = session.front_line.iter().position(|s| *s == Some(id)) else {
        return;
    };
    session.front_line[slot] = None;
    session.back_line.push_back(id);
    session.log.battle(format!("[DEFEAT][{}] falls, slot {} is empty", name, slot + 1));
}

/// Fills empty front slots left to right with the next living reserve
/// member. Defeated reserves keep their place in the queue.
pub fn check_reinforcement(session: &mut BattleSession) -> bool {
    let mut changed = false;
    for slot in 0..session.front_line.len() {
        if session.front_line[slot].is_some() {
            continue;
        }
        let Some(pos) = session.back_line.iter().position(|id| session.get(*id).is_alive()) else {
            break;
        };
        let Some(id) = session.back_line.remove(pos) else {
            break;
        };
        session.front_line[slot] = Some(id);
        changed = true;
        let key = session.get(id).key.clone();
        let name = session.name(id).to_string();
        session
            .log
            .battle(format!("[ROSTER][{}] moves from the back line to slot {}", name, slot + 1));
        let front_line = session.front_line_keys();
        session.events.push(BattleEvent::FrontlineChanged { slot, combatant: key, front_line });
    }
    changed
}

/// The party has lost once nobody is standing in the front line and no
/// living reserve is left to step in.
pub fn is_team_defeated(session: &BattleSession) -> bool {
    session.living_front().is_empty()
        && !session.back_line.iter().any(|id| session.get(*id).is_alive())
}
