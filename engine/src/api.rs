use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::battle::{resolve_battle, BattleOptions, BattleResult, MAX_TURNS};
use crate::content;
use crate::data::{MonsterData, RosterEntry, SkillBook};

/// One battle described by files on disk or bundled ids.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BattleConfig {
    #[serde(default)]
    pub roster_path: Option<String>,
    #[serde(default)]
    pub roster_id: Option<String>,
    #[serde(default)]
    pub monster_path: Option<String>,
    #[serde(default)]
    pub monster_id: Option<String>,
    /// Extra skill tables, merged over the bundled one in order.
    #[serde(default)]
    pub skill_paths: Vec<String>,
    #[serde(default = "default_true")]
    pub include_builtin_skills: bool,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub keep_buffs: bool,
    #[serde(default)]
    pub max_turns: Option<u32>,
}

fn default_true() -> bool {
    true
}

impl BattleConfig {
    pub fn options(&self) -> BattleOptions {
        BattleOptions {
            seed: self.seed,
            keep_buffs: self.keep_buffs,
            max_turns: self.max_turns.unwrap_or(MAX_TURNS),
        }
    }
}

/// Aggregate of many seeded runs of the same battle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchStats {
    pub samples: u32,
    pub victories: u32,
    pub win_rate: f64,
    pub avg_turns: f64,
    pub avg_gold: f64,
    pub avg_damage: f64,
    pub min_turns: u32,
    pub max_turns: u32,
}

fn is_yaml(path: &str) -> bool {
    matches!(
        Path::new(path).extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn read_data<T: DeserializeOwned>(path: &str, what: &str) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}: {}", what, path))?;
    parse_data(&text, path, what)
}

fn parse_data<T: DeserializeOwned>(text: &str, path: &str, what: &str) -> Result<T> {
    if is_yaml(path) {
        serde_yaml::from_str(text).with_context(|| format!("failed to parse {} YAML: {}", what, path))
    } else {
        serde_json::from_str(text).with_context(|| format!("failed to parse {} JSON: {}", what, path))
    }
}

pub fn load_config(path: &str) -> Result<BattleConfig> {
    read_data(path, "battle config")
}

/// Like [`load_config`] for text already in memory; `name` only picks the format.
pub fn parse_config(text: &str, name: &str) -> Result<BattleConfig> {
    parse_data(text, name, "battle config")
}

pub fn load_roster(cfg: &BattleConfig) -> Result<Vec<RosterEntry>> {
    match (&cfg.roster_path, &cfg.roster_id) {
        (Some(path), _) => read_data(path, "roster"),
        (None, Some(id)) => content::roster(id),
        (None, None) => bail!("config names neither roster_path nor roster_id"),
    }
}

pub fn load_monster(cfg: &BattleConfig) -> Result<MonsterData> {
    match (&cfg.monster_path, &cfg.monster_id) {
        (Some(path), _) => read_data(path, "monster"),
        (None, Some(id)) => content::monster(id),
        (None, None) => bail!("config names neither monster_path nor monster_id"),
    }
}

pub fn load_skill_book(cfg: &BattleConfig) -> Result<SkillBook> {
    let mut book = if cfg.include_builtin_skills {
        content::skill_book()?
    } else {
        SkillBook::new()
    };
    for path in &cfg.skill_paths {
        let map = read_data(path, "skill table")?;
        book.extend(map);
    }
    book.validate()
        .with_context(|| format!("skill tables {:?} do not fit together", cfg.skill_paths))?;
    Ok(book)
}

pub fn simulate_battle(cfg: &BattleConfig) -> Result<BattleResult> {
    let roster = load_roster(cfg)?;
    let monster = load_monster(cfg)?;
    let book = load_skill_book(cfg)?;
    let result = resolve_battle(&roster, &monster, book, cfg.options())
        .with_context(|| format!("cannot start battle against '{}'", monster.id))?;
    Ok(result)
}

/// Runs the configured battle `samples` times with seeds `seed, seed+1, ...`.
pub fn simulate_many(cfg: &BattleConfig, samples: u32) -> Result<BatchStats> {
    let roster = load_roster(cfg)?;
    let monster = load_monster(cfg)?;
    let book = load_skill_book(cfg)?;
    run_batch(&roster, &monster, &book, cfg.options(), samples)
}

/// The seed loop behind [`simulate_many`], for callers that already hold
/// the tables. Sample `i` runs with `options.seed + i`.
pub fn run_batch(
    roster: &[RosterEntry],
    monster: &MonsterData,
    book: &SkillBook,
    options: BattleOptions,
    samples: u32,
) -> Result<BatchStats> {
    if samples == 0 {
        bail!("samples must be at least 1");
    }
    let mut stats = BatchStats { samples, min_turns: u32::MAX, ..BatchStats::default() };
    let mut turns_sum = 0u64;
    let mut gold_sum = 0u64;
    let mut damage_sum = 0i64;
    for i in 0..samples {
        let run = BattleOptions { seed: options.seed.wrapping_add(u64::from(i)), ..options };
        let result = resolve_battle(roster, monster, book.clone(), run)
            .with_context(|| format!("cannot start battle against '{}'", monster.id))?;
        if result.victory {
            stats.victories += 1;
        }
        turns_sum += u64::from(result.turns);
        gold_sum += result.gold;
        damage_sum += result.battle_stats.total_damage;
        stats.min_turns = stats.min_turns.min(result.turns);
        stats.max_turns = stats.max_turns.max(result.turns);
    }
    let n = f64::from(samples);
    stats.win_rate = f64::from(stats.victories) / n;
    stats.avg_turns = turns_sum as f64 / n;
    stats.avg_gold = gold_sum as f64 / n;
    stats.avg_damage = damage_sum as f64 / n;
    Ok(stats)
}
