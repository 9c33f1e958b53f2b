use gacha_engine::buffs::BuffKind;
use gacha_engine::content;
use gacha_engine::data::{SkillEffect, SkillKind, TargetType, Trigger};
use gacha_engine::{DataError, Element, SkillBook};

fn data_error(text: &str) -> DataError {
    let err = SkillBook::from_json_str(text).unwrap_err();
    err.downcast_ref::<DataError>().cloned().unwrap_or_else(|| panic!("not a data error: {:#}", err))
}

#[test]
fn unknown_effect_type_fails_to_load() {
    let text = r#"{ "odd": { "name": "Odd", "kind": "damage", "effects": [{ "type": "teleport" }] } }"#;
    assert!(SkillBook::from_json_str(text).is_err());
}

#[test]
fn unknown_buff_type_fails_to_load() {
    let text = r#"{ "odd": { "name": "Odd", "kind": "buff",
                   "effects": [{ "type": "buff", "buff": { "type": "superSpeed", "value": 1 } }] } }"#;
    assert!(SkillBook::from_json_str(text).is_err());
}

#[test]
fn unknown_target_type_fails_to_load() {
    let text = r#"{ "odd": { "name": "Odd", "kind": "damage", "targetType": "everyone_nearby" } }"#;
    assert!(SkillBook::from_json_str(text).is_err());
}

#[test]
fn cast_skill_must_point_at_a_known_skill() {
    let err = data_error(
        r#"{ "echo": { "name": "Echo", "kind": "multi_effect",
                       "effects": [{ "type": "castSkill", "skillId": "ghost" }] } }"#,
    );
    assert_eq!(err, DataError::DanglingCast { skill: "echo".into(), target: "ghost".into() });
}

#[test]
fn packages_need_sub_buffs() {
    let err = data_error(
        r#"{ "hollow": { "name": "Hollow", "kind": "buff",
                         "effects": [{ "type": "applyBuffPackage",
                                       "package": { "name": "Nothing", "buffsPerStack": [] } }] } }"#,
    );
    assert_eq!(err, DataError::EmptyPackage { skill: "hollow".into(), package: "Nothing".into() });
}

#[test]
fn shape_errors_are_reported() {
    let zero_hits = data_error(
        r#"{ "nil": { "name": "Nil", "kind": "damage", "effects": [{ "type": "damage", "count": 0 }] } }"#,
    );
    assert!(matches!(zero_hits, DataError::InvalidSkill { .. }));

    let inverted = data_error(
        r#"{ "wobble": { "name": "Wobble", "kind": "damage",
                         "effects": [{ "type": "damage", "minMultiplier": 2.0, "maxMultiplier": 1.0 }] } }"#,
    );
    assert!(matches!(inverted, DataError::InvalidSkill { .. }));

    let busy_passive = data_error(
        r#"{ "busy": { "name": "Busy", "kind": "passive", "effects": [{ "type": "damage" }] } }"#,
    );
    assert!(matches!(busy_passive, DataError::InvalidSkill { .. }));

    let wild_chance = data_error(
        r#"{ "wild": { "name": "Wild", "kind": "passive",
                       "procs": [{ "trigger": "onTurnEnd", "chance": 1.5, "effects": [] }] } }"#,
    );
    assert!(matches!(wild_chance, DataError::InvalidSkill { .. }));
}

#[test]
fn legacy_field_names_are_accepted() {
    let book = SkillBook::from_json_str(
        r#"{
          "old": { "name": "Old", "effectType": "trigger", "targetType": "all_allies_fire",
                   "effects": [
                     { "type": "enmity", "fixedDamageValue": 40 },
                     { "type": "directDamageBonus", "multiplier": 0.2 },
                     { "type": "dispel", "dispelPositive": true },
                     { "type": "applyDebuffPackage",
                       "package": { "name": "Rot", "positive": false,
                                    "buffsPerStack": [{ "type": "defenseDown", "value": 0.1 }] } },
                     { "type": "proc", "chance": 0.5,
                       "additionalEffects": [{ "type": "buff", "buff": { "type": "invincible", "maxHits": 2 } }] }
                   ],
                   "procs": [{ "triggerCondition": "onSkillUse", "effects": [] }] }
        }"#,
    )
    .unwrap();
    let skill = book.get("old").unwrap();
    assert_eq!(skill.id, "old");
    assert_eq!(skill.kind, SkillKind::MultiEffect);
    assert_eq!(skill.target_type, TargetType::AllAlliesOf(Element::Fire));
    assert_eq!(skill.procs[0].trigger, Trigger::OnSkillUse);
    match &skill.effects[0] {
        SkillEffect::Damage(d) => assert_eq!(d.fixed, Some(40.0)),
        other => panic!("expected damage, got {:?}", other),
    }
    assert!(matches!(skill.effects[2], SkillEffect::Dispel { positive: true, count: 1, .. }));
    match &skill.effects[4] {
        SkillEffect::Proc { effects, .. } => match &effects[0] {
            SkillEffect::Buff { buff, .. } => {
                assert_eq!(buff.kind, BuffKind::Invincible);
                assert_eq!(buff.charges, Some(2));
            }
            other => panic!("expected buff, got {:?}", other),
        },
        other => panic!("expected proc, got {:?}", other),
    }
}

#[test]
fn yaml_tables_load_too() {
    let book = SkillBook::from_yaml_str(
        "cleave:\n  name: Cleave\n  kind: damage\n  targetType: all_enemies\n  effects:\n    - type: damage\n      multiplier: 0.7\n",
    )
    .unwrap();
    assert_eq!(book.get("cleave").unwrap().target_type, TargetType::AllEnemies);
}

#[test]
fn later_tables_override_earlier_ones() {
    let mut book = content::skill_book().unwrap();
    let before = book.len();
    book.merge(
        SkillBook::from_json_str(r#"{ "power_strike": { "name": "Power Strike+", "kind": "damage", "cooldown": 2 } }"#)
            .unwrap(),
    );
    assert_eq!(book.len(), before);
    assert_eq!(book.get("power_strike").unwrap().cooldown, Some(2));
}

#[test]
fn bundled_content_is_consistent() {
    let book = content::skill_book().unwrap();
    for id in content::builtin_monsters().keys() {
        let m = content::monster(id).unwrap();
        for skill in m.skills.iter().chain(&m.passives) {
            assert!(book.get(skill).is_some(), "monster {} uses unknown skill {}", id, skill);
        }
    }
    for id in content::builtin_rosters().keys() {
        for entry in content::roster(id).unwrap() {
            for skill in entry.skills.iter().chain(&entry.passives) {
                assert!(book.get(skill).is_some(), "{} uses unknown skill {}", entry.id, skill);
            }
        }
    }
    assert!(content::monster("kraken").is_err());
}
