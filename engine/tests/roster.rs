use std::collections::VecDeque;

use gacha_engine::roster::{check_reinforcement, handle_defeat, is_team_defeated};
use gacha_engine::{BattleEvent, BattleSession, Combatant, CombatantId, Dice, Side, SkillBook, Stats};

fn party(keys: &[&str]) -> BattleSession {
    let players = keys
        .iter()
        .map(|k| Combatant::new(*k, *k, Side::Player, Stats { max_hp: 100, attack: 10.0, ..Stats::default() }))
        .collect();
    let monster = Combatant::new("boss", "Boss", Side::Enemy, Stats { max_hp: 1000, ..Stats::default() });
    BattleSession::new(players, monster, SkillBook::new(), Dice::from_seed(1))
}

fn kill(s: &mut BattleSession, id: CombatantId) {
    s.get_mut(id).hp = 0;
    handle_defeat(s, id);
}

#[test]
fn first_four_start_in_front() {
    let s = party(&["a", "b", "c", "d", "e", "f"]);
    assert_eq!(s.front_ids(), vec![CombatantId(0), CombatantId(1), CombatantId(2), CombatantId(3)]);
    assert_eq!(s.back_line, VecDeque::from(vec![CombatantId(4), CombatantId(5)]));
    assert_eq!(s.monster, CombatantId(6));
}

#[test]
fn knocked_out_starters_wait_behind_the_reserves() {
    let players = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|k| {
            let c = Combatant::new(*k, *k, Side::Player, Stats { max_hp: 100, ..Stats::default() });
            if *k == "a" || *k == "c" { c.with_hp(0) } else { c }
        })
        .collect();
    let monster = Combatant::new("boss", "Boss", Side::Enemy, Stats { max_hp: 1000, ..Stats::default() });
    let mut s = BattleSession::new(players, monster, SkillBook::new(), Dice::from_seed(1));

    assert_eq!(s.front_line, [None, Some(CombatantId(1)), None, Some(CombatantId(3))]);
    assert_eq!(s.back_line, VecDeque::from(vec![CombatantId(4), CombatantId(0), CombatantId(2)]));

    assert!(check_reinforcement(&mut s));
    assert_eq!(s.front_line, [Some(CombatantId(4)), Some(CombatantId(1)), None, Some(CombatantId(3))]);
    assert_eq!(s.back_line, VecDeque::from(vec![CombatantId(0), CombatantId(2)]));
    assert!(!is_team_defeated(&s));
}

#[test]
fn small_party_leaves_slots_empty() {
    let s = party(&["a", "b"]);
    assert_eq!(s.front_line, [Some(CombatantId(0)), Some(CombatantId(1)), None, None]);
    assert!(s.back_line.is_empty());
}

#[test]
fn empty_slots_fill_left_to_right() {
    let mut s = party(&["a", "b", "c", "d"]);
    s.front_line = [Some(CombatantId(0)), None, Some(CombatantId(1)), None];
    s.back_line = VecDeque::from(vec![CombatantId(2), CombatantId(3)]);

    assert!(check_reinforcement(&mut s));
    assert_eq!(
        s.front_line,
        [Some(CombatantId(0)), Some(CombatantId(2)), Some(CombatantId(1)), Some(CombatantId(3))]
    );
    assert!(s.back_line.is_empty());

    let slots: Vec<usize> = s
        .events
        .iter()
        .filter_map(|e| match e {
            BattleEvent::FrontlineChanged { slot, .. } => Some(*slot),
            _ => None,
        })
        .collect();
    assert_eq!(slots, vec![1, 3]);
    assert!(!check_reinforcement(&mut s));
}

#[test]
fn defeated_member_rotates_to_the_back() {
    let mut s = party(&["a", "b", "c", "d", "e"]);
    kill(&mut s, CombatantId(1));
    assert_eq!(s.front_line[1], None);
    assert_eq!(s.back_line, VecDeque::from(vec![CombatantId(4), CombatantId(1)]));
    assert!(s.log.contains("[DEFEAT][b] falls, slot 2 is empty"));

    check_reinforcement(&mut s);
    assert_eq!(s.front_line[1], Some(CombatantId(4)));
    assert_eq!(s.back_line, VecDeque::from(vec![CombatantId(1)]));
    assert!(s.log.contains("[ROSTER][e] moves from the back line to slot 2"));
}

#[test]
fn dead_reserves_are_skipped_until_revived() {
    let mut s = party(&["a", "b", "c", "d", "e"]);
    kill(&mut s, CombatantId(0));
    check_reinforcement(&mut s);
    kill(&mut s, CombatantId(4));
    assert!(!check_reinforcement(&mut s));
    assert_eq!(s.front_line[0], None);

    s.get_mut(CombatantId(0)).revive(0.5);
    assert!(check_reinforcement(&mut s));
    assert_eq!(s.front_line[0], Some(CombatantId(0)));
    assert_eq!(s.get(CombatantId(0)).hp, 50);
}

#[test]
fn team_is_defeated_only_without_living_reserves() {
    let mut s = party(&["a", "b", "c", "d", "e"]);
    for idx in 0..4 {
        kill(&mut s, CombatantId(idx));
    }
    assert!(!is_team_defeated(&s));
    check_reinforcement(&mut s);
    assert!(!is_team_defeated(&s));
    kill(&mut s, CombatantId(4));
    assert!(is_team_defeated(&s));
}

#[test]
fn monster_defeat_does_not_touch_the_lines() {
    let mut s = party(&["a"]);
    let monster = s.monster;
    kill(&mut s, monster);
    assert_eq!(s.front_line[0], Some(CombatantId(0)));
    assert!(s.log.contains("[DEFEAT][Boss] falls"));
}
