use gacha_engine::battle::{build_session, mvp, BattleController, Rewards, MAX_TURNS};
use gacha_engine::buffs::{BuffKind, BuffSpec};
use gacha_engine::combatant::CombatCounters;
use gacha_engine::{
    resolve_battle, BattleEvent, BattleLog, BattleOptions, Combatant, DataError, Dice, LogLevel, MonsterData, RosterEntry,
    Side, SkillBook, Stats,
};
use serde_json::json;

fn member(id: &str, max_hp: i64, attack: f64) -> RosterEntry {
    serde_json::from_value(json!({
        "id": id,
        "name": id.to_uppercase(),
        "stats": { "maxHp": max_hp, "attack": attack }
    }))
    .unwrap()
}

fn monster(value: serde_json::Value) -> MonsterData {
    serde_json::from_value(value).unwrap()
}

fn slime() -> MonsterData {
    monster(json!({
        "id": "slime", "name": "Slime", "maxHp": 1, "attack": 0,
        "xpReward": 5, "goldReward": { "min": 10, "max": 20 }
    }))
}

fn dummy(max_hp: f64, attack: f64) -> MonsterData {
    monster(json!({ "id": "dummy", "name": "Dummy", "maxHp": max_hp, "attack": attack }))
}

/// Runs with every roll at 0.5, which makes damage exact.
fn run_scripted(roster: &[RosterEntry], m: &MonsterData, book: SkillBook, options: BattleOptions) -> gacha_engine::BattleResult {
    let session = build_session(roster, m, book, Dice::from_scripted(vec![0.5])).unwrap();
    BattleController::new(session, Rewards::from(m), options).run()
}

#[test]
fn one_hit_victory_log() {
    let hero = serde_json::from_value::<RosterEntry>(json!({
        "id": "hero", "name": "Hero", "stats": { "maxHp": 500, "attack": 100 }
    }))
    .unwrap();
    let result = run_scripted(&[hero], &slime(), SkillBook::new(), BattleOptions::default());

    assert!(result.success);
    assert!(result.victory);
    assert_eq!(result.turns, 1);
    assert_eq!(result.exp, 5);
    assert_eq!(result.gold, 15);
    insta::assert_debug_snapshot!(result.battle_log, @r###"
    [
        "[BATTLE] 1 party members vs Slime (1 HP)",
        "[T1] [TURN] turn 1 begins",
        "[T1] [HIT][Hero] attack hits Slime for 100 (HP 0/1)",
        "[T1] [DEFEAT][Slime] falls",
        "[T1] [VICTORY] Slime falls after 1 turns",
        "[T1] [REWARD] 5 exp, 15 gold",
    ]
    "###);
}

#[test]
fn events_bracket_the_battle() {
    let result = run_scripted(&[member("hero", 500, 100.0)], &slime(), SkillBook::new(), BattleOptions::default());
    match result.events.first() {
        Some(BattleEvent::Start { front_line, back_line, monster }) => {
            assert_eq!(front_line, &vec![Some("hero".to_string()), None, None, None]);
            assert!(back_line.is_empty());
            assert_eq!(monster, "slime");
        }
        other => panic!("unexpected first event {:?}", other),
    }
    assert_eq!(result.events.last(), Some(&BattleEvent::End { victory: true, turns: 1 }));

    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["events"][0]["event"], "battle:start");
    assert_eq!(value["battleStats"]["totalDamage"], 100);
    assert!(value["battleLog"].is_array());
    assert!(value.get("fullLog").is_none());
}

#[test]
fn turn_cap_is_a_loss_without_rewards() {
    let hero = member("hero", 1_000_000, 1.0);
    let result = resolve_battle(&[hero], &dummy(1e9, 0.0), SkillBook::new(), BattleOptions::default()).unwrap();
    assert!(result.success);
    assert!(!result.victory);
    assert_eq!(result.turns, MAX_TURNS);
    assert_eq!(result.gold, 0);
    assert_eq!(result.exp, 0);
    assert!(result.full_log.contains("[BATTLE] turn limit reached"));
    assert!(result.full_log.contains("[DEFEAT] Dummy is still standing"));
    let turn_ends = result.events.iter().filter(|e| matches!(e, BattleEvent::TurnEnd { .. })).count();
    assert_eq!(turn_ends, 99);
}

#[test]
fn max_turns_option_is_honored() {
    let hero = member("hero", 1_000_000, 1.0);
    let options = BattleOptions { max_turns: 5, ..BattleOptions::default() };
    let result = resolve_battle(&[hero], &dummy(1e9, 0.0), SkillBook::new(), options).unwrap();
    assert_eq!(result.turns, 5);
    assert!(!result.victory);
}

#[test]
fn wiped_party_is_a_defeat() {
    let hero = member("hero", 100, 1.0);
    let result = run_scripted(&[hero], &dummy(1e9, 1000.0), SkillBook::new(), BattleOptions::default());
    assert!(!result.victory);
    assert_eq!(result.turns, 1);
    assert!(result.battle_log.iter().any(|l| l.contains("[DEFEAT] the party is wiped out on turn 1")));
}

#[test]
fn same_seed_replays_exactly() {
    let roster = vec![member("a", 2000, 150.0), member("b", 1500, 200.0)];
    let m = dummy(20_000.0, 120.0);
    let options = BattleOptions { seed: 99, ..BattleOptions::default() };
    let first = resolve_battle(&roster, &m, SkillBook::new(), options).unwrap();
    let second = resolve_battle(&roster, &m, SkillBook::new(), options).unwrap();
    assert_eq!(first.battle_log, second.battle_log);
    assert_eq!(first.turns, second.turns);
}

#[test]
fn malformed_monster_hp_falls_back() {
    let m = monster(json!({ "id": "odd", "name": "Odd", "maxHp": "lots", "attack": 0 }));
    let options = BattleOptions { max_turns: 1, ..BattleOptions::default() };
    let result = resolve_battle(&[member("hero", 1000, 1.0)], &m, SkillBook::new(), options).unwrap();
    let odd = result.combatants.iter().find(|c| c.key == "odd").unwrap();
    assert_eq!(odd.max_hp(), 10_000);
    assert!(result.full_log.contains("[ERROR] monster 'odd' has no usable max HP; using 10000"));
}

#[test]
fn numeric_strings_are_accepted_for_hp() {
    let m = monster(json!({ "id": "odd", "name": "Odd", "hp": "2500" }));
    assert_eq!(m.max_hp, Some(2500.0));
}

#[test]
fn roster_problems_are_errors() {
    let err = resolve_battle(&[], &slime(), SkillBook::new(), BattleOptions::default()).unwrap_err();
    assert_eq!(err, DataError::EmptyRoster);

    let twins = vec![member("twin", 100, 1.0), member("twin", 100, 1.0)];
    let err = resolve_battle(&twins, &slime(), SkillBook::new(), BattleOptions::default()).unwrap_err();
    assert_eq!(err, DataError::DuplicateCombatant("twin".to_string()));

    let clash = vec![member("slime", 100, 1.0)];
    let err = resolve_battle(&clash, &slime(), SkillBook::new(), BattleOptions::default()).unwrap_err();
    assert_eq!(err, DataError::DuplicateCombatant("slime".to_string()));
}

#[test]
fn unknown_skill_ids_only_warn() {
    let mut hero = member("hero", 500, 100.0);
    hero.skills = vec!["meteor".to_string()];
    let result = run_scripted(&[hero], &slime(), SkillBook::new(), BattleOptions::default());
    assert!(result.victory);
    assert!(result.full_log.contains("[WARN] [DATA][HERO] unknown skill 'meteor' will be ignored"));
}

#[test]
fn threshold_skill_fires_once() {
    let book = SkillBook::from_json_str(
        r#"{
          "enrage": { "name": "Enrage", "kind": "buff", "targetType": "self", "hpThreshold": 0.5, "priority": 10,
                      "effects": [{ "type": "buff", "buff": { "type": "attackUp", "value": 0.5, "duration": -1, "stackable": false } }] }
        }"#,
    )
    .unwrap();
    let mut m = dummy(1000.0, 10.0);
    m.skills = vec!["enrage".to_string()];
    let roster = vec![member("hero", 100_000, 1.0)];

    let mut session = build_session(&roster, &m, book, Dice::from_scripted(vec![0.5])).unwrap();
    let boss = session.monster;
    session.get_mut(boss).hp = 400;
    let options = BattleOptions { max_turns: 4, keep_buffs: true, ..BattleOptions::default() };
    let result = BattleController::new(session, Rewards::from(&m), options).run();

    assert_eq!(result.battle_stats.skills_used.get("Enrage"), Some(&1));
    assert_eq!(result.battle_stats.monster_stats.skills_used, 1);
    // the monster attacked normally on the other turns
    let monster_hits = result.battle_log.iter().filter(|l| l.contains("[HIT][Dummy] attack")).count();
    assert_eq!(monster_hits, 3);
}

#[test]
fn buffs_survive_a_win_only_when_kept() {
    let hero: RosterEntry = serde_json::from_value(json!({
        "id": "hero", "name": "Hero", "stats": { "maxHp": 500, "attack": 100 },
        "carriedBuffs": [{ "type": "attackUp", "value": 0.2, "duration": 5 }]
    }))
    .unwrap();

    let kept = run_scripted(
        std::slice::from_ref(&hero),
        &slime(),
        SkillBook::new(),
        BattleOptions { keep_buffs: true, ..BattleOptions::default() },
    );
    assert!(kept.combatants[0].has_buff(BuffKind::AttackUp));
    assert_eq!(kept.battle_stats.total_damage, 120);

    let cleared = run_scripted(&[hero], &slime(), SkillBook::new(), BattleOptions::default());
    assert!(cleared.combatants[0].buffs.is_empty());
}

#[test]
fn victory_heals_a_quarter() {
    let mut hero = member("hero", 1000, 100.0);
    hero.hp = Some(100);
    let result = run_scripted(&[hero], &slime(), SkillBook::new(), BattleOptions::default());
    assert_eq!(result.combatants[0].hp, 350);
    assert!(result.full_log.lines(LogLevel::Info).any(|l| l.contains("[REST][HERO] recovers 250 HP")));
}

#[test]
fn reserve_steps_in_after_a_defeat() {
    // the threat roll of 0.5 over four equal weights lands on the third slot
    let roster = vec![
        member("a", 100_000, 1.0),
        member("b", 100_000, 1.0),
        member("c", 500, 1.0),
        member("d", 100_000, 1.0),
        member("e", 100_000, 1.0),
    ];
    let options = BattleOptions { max_turns: 2, ..BattleOptions::default() };
    let result = run_scripted(&roster, &dummy(1e9, 1000.0), SkillBook::new(), options);

    match &result.events[0] {
        BattleEvent::Start { back_line, .. } => assert_eq!(back_line, &vec!["e".to_string()]),
        other => panic!("unexpected first event {:?}", other),
    }
    let change = result.events.iter().find_map(|e| match e {
        BattleEvent::FrontlineChanged { slot, combatant, front_line } => Some((*slot, combatant.clone(), front_line.clone())),
        _ => None,
    });
    let (slot, combatant, front_line) = change.unwrap();
    assert_eq!(slot, 2);
    assert_eq!(combatant, "e");
    assert_eq!(front_line[2], Some("e".to_string()));
    assert!(result.full_log.contains("[T1] [DEFEAT][C] falls, slot 3 is empty"));
    // the slot is refilled when the next turn starts
    assert!(result.battle_log.iter().any(|l| l == "[T2] [ROSTER][E] moves from the back line to slot 3"));
}

#[test]
fn mvp_weighs_healing_higher() {
    let mut dealer = Combatant::new("dealer", "Dealer", Side::Player, Stats::default());
    dealer.stats = CombatCounters { total_damage: 100, ..CombatCounters::default() };
    let mut healer = Combatant::new("healer", "Healer", Side::Player, Stats::default());
    healer.stats = CombatCounters { total_healing: 80, ..CombatCounters::default() };
    let mut boss = Combatant::new("boss", "Boss", Side::Enemy, Stats::default());
    boss.stats = CombatCounters { total_damage: 10_000, ..CombatCounters::default() };

    let best = mvp(&[dealer.clone(), healer, boss]).unwrap();
    assert_eq!(best.id, "healer");
    assert_eq!(best.score, 120.0);

    let mut twin = dealer.clone();
    twin.key = "twin".into();
    assert_eq!(mvp(&[dealer, twin]).unwrap().id, "dealer");

    let idle = Combatant::new("idle", "Idle", Side::Player, Stats::default());
    assert!(mvp(&[idle]).is_none());
}

#[test]
fn knocked_out_front_line_gives_way_to_a_reserve() {
    let mut roster: Vec<RosterEntry> = ["a", "b", "c", "d"]
        .iter()
        .map(|id| RosterEntry { hp: Some(0), ..member(id, 500, 100.0) })
        .collect();
    roster.push(member("e", 500, 100.0));

    let result = run_scripted(&roster, &slime(), SkillBook::new(), BattleOptions::default());
    assert!(result.victory);
    assert_eq!(result.turns, 1);
    assert!(result.battle_log.iter().any(|l| l == "[T1] [ROSTER][E] moves from the back line to slot 1"));
}

fn bolt_caster(status: Option<BuffKind>) -> RosterEntry {
    let carried_buffs = status.map(|kind| vec![BuffSpec::new(kind, 1.0, 2)]).unwrap_or_default();
    RosterEntry { skills: vec!["bolt".into()], carried_buffs, ..member("hero", 500, 100.0) }
}

fn one_turn_against_dummy(hero: RosterEntry) -> (i64, BattleLog) {
    let book = SkillBook::from_json_str(
        r#"{ "bolt": { "name": "Bolt", "kind": "damage", "effects": [{ "type": "damage", "fixed": 1000 }] } }"#,
    )
    .unwrap();
    let options = BattleOptions { max_turns: 1, ..BattleOptions::default() };
    let result = run_scripted(&[hero], &dummy(100_000.0, 0.0), book, options);
    let monster_hp = result.combatants.iter().find(|c| c.key == "dummy").unwrap().hp;
    (monster_hp, result.full_log)
}

#[test]
fn unhindered_member_casts_and_attacks() {
    let (hp, _) = one_turn_against_dummy(bolt_caster(None));
    assert_eq!(hp, 100_000 - 1000 - 100);
}

#[test]
fn stunned_member_neither_casts_nor_attacks() {
    let (hp, log) = one_turn_against_dummy(bolt_caster(Some(BuffKind::Stun)));
    assert_eq!(hp, 100_000);
    assert!(log.lines(LogLevel::Info).any(|l| l.contains("[ATK][HERO] cannot move")));
}

#[test]
fn numbed_member_casts_but_does_not_attack() {
    let (hp, log) = one_turn_against_dummy(bolt_caster(Some(BuffKind::Numbness)));
    assert_eq!(hp, 100_000 - 1000);
    assert!(log.lines(LogLevel::Info).any(|l| l.contains("[ATK][HERO] cannot move")));
}
