use assert_cmd::Command;
use predicates::prelude::*;

fn cli() -> Command {
    Command::cargo_bin("gacha-cli").unwrap()
}

#[test]
fn quick_battle_prints_a_summary() {
    cli()
        .args(["quick", "--seed", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[BATTLE] 6 party members vs Goblin Chief"))
        .stdout(predicate::str::contains("victory="));
}

#[test]
fn quick_battle_is_deterministic() {
    let run = || cli().args(["quick", "--seed", "11", "--log", "detail"]).output().unwrap().stdout;
    assert_eq!(run(), run());
}

#[test]
fn content_lists_bundled_monsters() {
    cli()
        .args(["content", "monsters"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ancient_dragon").and(predicate::str::contains("goblin_chief")));
}

#[test]
fn unknown_content_id_fails() {
    cli().args(["content", "rosters", "--id", "nobody"]).assert().failure();
}

#[test]
fn json_mode_reads_stdin() {
    cli()
        .arg("json")
        .write_stdin(r#"{"roster_id":"starter_party","monster_id":"goblin_chief","options":{"seed":2}}"#)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(r#"{"ok":true"#));
}

#[test]
fn json_mode_reports_bad_input() {
    cli()
        .arg("json")
        .write_stdin("[]")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""ok":false"#));
}

#[test]
fn battle_reads_a_config_with_bom() {
    let dir = std::env::temp_dir().join(format!("gacha-cli-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("battle.json");
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(br#"{"roster_id":"starter_party","monster_id":"goblin_chief","max_turns":3}"#);
    std::fs::write(&path, bytes).unwrap();

    cli()
        .args(["battle", "--config"])
        .arg(&path)
        .args(["--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"battleLog\""));
}

#[test]
fn simulate_many_reports_a_win_rate() {
    Command::cargo_bin("simulate-many")
        .unwrap()
        .args(["--trials", "4", "--max-turns", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("win rate:"));
}
