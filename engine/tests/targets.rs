use gacha_engine::combat::targets::get_targets;
use gacha_engine::data::TargetType;
use gacha_engine::{BattleSession, Combatant, CombatantId, Dice, Element, Side, SkillBook, Stats};

fn member(key: &str, element: Element, hp: i64) -> Combatant {
    Combatant::new(key, key, Side::Player, Stats { max_hp: 1000, ..Stats::default() })
        .with_element(element)
        .with_hp(hp)
}

/// a(fire, 900) b(water, 300) c(fire, 600) d(wind, 1000) | e(fire, 100) in reserve
fn field() -> BattleSession {
    let players = vec![
        member("a", Element::Fire, 900),
        member("b", Element::Water, 300),
        member("c", Element::Fire, 600),
        member("d", Element::Wind, 1000),
        member("e", Element::Fire, 100),
    ];
    let monster = Combatant::new("boss", "Boss", Side::Enemy, Stats { max_hp: 5000, ..Stats::default() });
    BattleSession::new(players, monster, SkillBook::new(), Dice::from_seed(0))
}

fn id(n: usize) -> CombatantId {
    CombatantId(n)
}

#[test]
fn self_is_the_caster() {
    let s = field();
    assert_eq!(get_targets(&s, id(2), TargetType::SelfOnly, None), vec![id(2)]);
}

#[test]
fn ally_is_lowest_ratio_other_than_caster() {
    let s = field();
    assert_eq!(get_targets(&s, id(0), TargetType::Ally, None), vec![id(1)]);
    assert_eq!(get_targets(&s, id(1), TargetType::Ally, None), vec![id(2)]);
}

#[test]
fn ally_lowest_hp_may_pick_the_caster() {
    let s = field();
    assert_eq!(get_targets(&s, id(1), TargetType::AllyLowestHp, None), vec![id(1)]);
}

#[test]
fn reserves_are_never_targeted() {
    let s = field();
    let all = get_targets(&s, id(0), TargetType::AllAllies, None);
    assert_eq!(all, vec![id(0), id(1), id(2), id(3)]);
    let fire = get_targets(&s, id(0), TargetType::AllAlliesOf(Element::Fire), None);
    assert_eq!(fire, vec![id(0), id(2)]);
}

#[test]
fn dead_allies_drop_out() {
    let mut s = field();
    s.get_mut(id(1)).hp = 0;
    assert_eq!(get_targets(&s, id(0), TargetType::Ally, None), vec![id(2)]);
    assert_eq!(get_targets(&s, id(0), TargetType::AllyDead, None), vec![id(1)]);
    assert_eq!(get_targets(&s, s.monster, TargetType::AllEnemies, None), vec![id(0), id(2), id(3)]);
}

#[test]
fn enemy_uses_primary_when_valid() {
    let mut s = field();
    let boss = s.monster;
    assert_eq!(get_targets(&s, id(0), TargetType::Enemy, None), vec![boss]);
    assert_eq!(get_targets(&s, boss, TargetType::Enemy, Some(id(3))), vec![id(3)]);
    s.get_mut(id(3)).hp = 0;
    assert_eq!(get_targets(&s, boss, TargetType::Enemy, Some(id(3))), vec![id(0)]);
    // a reserve is no valid primary either
    assert_eq!(get_targets(&s, boss, TargetType::Enemy, Some(id(4))), vec![id(0)]);
}

#[test]
fn all_is_both_sides() {
    let s = field();
    let everyone = get_targets(&s, id(0), TargetType::All, None);
    assert_eq!(everyone.len(), 5);
    assert!(everyone.contains(&s.monster));
}

#[test]
fn dead_monster_leaves_no_enemy() {
    let mut s = field();
    let boss = s.monster;
    s.get_mut(boss).hp = 0;
    assert!(get_targets(&s, id(0), TargetType::Enemy, None).is_empty());
}
